//! Pairwise agreement measures and the aggregate result counter.
//!
//! Entity agreements are reported as precision / recall / F1 over aligned
//! annotations; relation (TLINK) agreements as detection F-scores plus
//! relation-type accuracies, recorded pair by pair into an
//! [`AggregateCounter`] and chance-corrected later from the contingency
//! tables stored alongside the plain counts.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::align::{find_annotation_mappings, Mapping, TieBreak};
use crate::corpus::{Annotator, EntityLoc, Relation};
use crate::error::{Error, Result};
use crate::tree::EntityKind;

/// An aggregate counter for recording different aspects of annotation.
///
/// Counts are keyed by task (e.g. `EVENT-extent`), then by annotator pair
/// (e.g. `j vs c`), then by metric (e.g. `correct`). Contingency-table cells
/// are stored under `table:<responseA>___<responseB>` metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateCounter {
    results: BTreeMap<String, BTreeMap<String, BTreeMap<String, i64>>>,
}

impl AggregateCounter {
    /// An empty counter.
    #[must_use]
    pub fn new() -> Self {
        AggregateCounter::default()
    }

    /// Adds `value` to the count of `(task, pair, metric)`.
    pub fn add(&mut self, task: &str, pair: &str, metric: &str, value: i64) {
        *self
            .results
            .entry(task.to_string())
            .or_default()
            .entry(pair.to_string())
            .or_default()
            .entry(metric.to_string())
            .or_default() += value;
    }

    /// The count of `(task, pair, metric)`, zero when never recorded.
    #[must_use]
    pub fn get(&self, task: &str, pair: &str, metric: &str) -> i64 {
        self.results
            .get(task)
            .and_then(|pairs| pairs.get(pair))
            .and_then(|metrics| metrics.get(metric))
            .copied()
            .unwrap_or(0)
    }

    /// Folds the counts of `other` into this counter, e.g. for combining
    /// per-chunk counters of a corpus processed in parts.
    pub fn merge(&mut self, other: &AggregateCounter) {
        for (task, pairs) in &other.results {
            for (pair, metrics) in pairs {
                for (metric, &value) in metrics {
                    self.add(task, pair, metric, value);
                }
            }
        }
    }

    /// True when any count has been recorded under `task`.
    #[must_use]
    pub fn has_task(&self, task: &str) -> bool {
        self.results.contains_key(task)
    }

    /// All recorded task names, sorted.
    #[must_use]
    pub fn tasks(&self) -> Vec<&str> {
        self.results.keys().map(String::as_str).collect()
    }

    /// The metrics recorded for `(task, pair)`.
    #[must_use]
    pub fn metrics(&self, task: &str, pair: &str) -> Option<&BTreeMap<String, i64>> {
        self.results.get(task).and_then(|pairs| pairs.get(pair))
    }

    /// The pairs of `task` in sorted order. When a judge label is given, all
    /// pairs involving the judge move to the end of the list, regardless of
    /// the alphabetical order.
    #[must_use]
    pub fn sorted_pairs(&self, task: &str, judge: Option<Annotator>) -> Vec<String> {
        let Some(pairs) = self.results.get(task) else {
            return Vec::new();
        };
        match judge {
            Some(judge) => {
                let label = judge.as_label();
                let (judge_pairs, mut other_pairs): (Vec<String>, Vec<String>) =
                    pairs.keys().cloned().partition(|p| p.contains(label));
                other_pairs.extend(judge_pairs);
                other_pairs
            }
            None => pairs.keys().cloned().collect(),
        }
    }
}

/// Formats the counter label of an annotator pair.
#[must_use]
pub fn pair_label(sug: Annotator, reference: Annotator) -> String {
    format!("{} vs {}", sug.as_label(), reference.as_label())
}

/// Orders two annotators for comparison: alphabetically, except that the
/// judge always comes first.
#[must_use]
pub fn ordered_pair(a: Annotator, b: Annotator) -> (Annotator, Annotator) {
    let (lo, hi) = if a.as_label() <= b.as_label() { (a, b) } else { (b, a) };
    if a == Annotator::Judge || b == Annotator::Judge {
        (hi, lo)
    } else {
        (lo, hi)
    }
}

/// Returns all annotator pairings of a roster of two to four annotators.
///
/// The roster is first sorted in reverse label order (so the judge leads);
/// pairings then go around the roster before crossing it, which keeps the
/// non-judge pairs in a stable, readable order.
#[must_use]
pub fn annotator_pairs(annotators: &[Annotator]) -> Vec<(Annotator, Annotator)> {
    let mut roster = annotators.to_vec();
    roster.sort_by(|x, y| y.as_label().cmp(x.as_label()));
    match roster.len() {
        2 => vec![(roster[0], roster[1])],
        3 => vec![
            (roster[0], roster[1]),
            (roster[1], roster[2]),
            (roster[0], roster[2]),
        ],
        4 => vec![
            (roster[0], roster[1]),
            (roster[1], roster[2]),
            (roster[2], roster[3]),
            (roster[0], roster[3]),
            (roster[1], roster[3]),
            (roster[0], roster[2]),
        ],
        _ => Vec::new(),
    }
}

// ------------------------------------------------------------
//    Entity extent agreement
// ------------------------------------------------------------

/// Precision / recall / F1 of one extent comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ExtentScores {
    /// Matching annotations (or tokens, in legacy mode).
    pub correct: i64,
    /// Reference annotations (or tokens).
    pub all_in_ref: i64,
    /// Suggested annotations (or tokens).
    pub all_in_sug: i64,
    /// correct / all_in_ref, zero when the reference is empty.
    pub recall: f64,
    /// correct / all_in_sug, zero when the suggestion set is empty.
    pub precision: f64,
    /// Harmonic mean of precision and recall.
    pub fscore: f64,
}

fn prf(correct: i64, all_in_ref: i64, all_in_sug: i64) -> (f64, f64, f64) {
    let rec = if all_in_ref > 0 {
        correct as f64 / all_in_ref as f64
    } else {
        0.0
    };
    let prec = if all_in_sug > 0 {
        correct as f64 / all_in_sug as f64
    } else {
        0.0
    };
    let fscore = if prec + rec > 0.0 {
        (2.0 * prec * rec) / (prec + rec)
    } else {
        0.0
    };
    (rec, prec, fscore)
}

fn word_set(locs: &[EntityLoc]) -> std::collections::BTreeSet<usize> {
    locs.iter().map(|l| l.word_id).collect()
}

/// Finds the agreement on entity extent (token coverage) from precomputed
/// alignments.
///
/// With `one_best_match`, each suggestion counts as correct when it has any
/// aligned reference (the one with the largest token overlap); a single
/// shared token suffices. Without it, the legacy token-level totals are used,
/// which mistakenly discard exact phrase boundaries.
#[must_use]
pub fn evaluate_entity_extent(
    ann_sug: &BTreeMap<String, Vec<EntityLoc>>,
    ann_ref: &BTreeMap<String, Vec<EntityLoc>>,
    sug_to_ref: &Mapping,
    one_best_match: bool,
) -> ExtentScores {
    let mut correct = 0i64;
    let mut all_in_ref = 0i64;
    let mut all_in_sug = 0i64;
    if one_best_match {
        for (sug_id, sug_locs) in ann_sug {
            let tokens_sug = word_set(sug_locs);
            let mut biggest_overlap = 0;
            let mut best_match: Option<&str> = None;
            if let Some(refs) = sug_to_ref.get(sug_id) {
                let mut refs: Vec<&String> = refs.iter().collect();
                refs.sort();
                for ref_id in refs {
                    let tokens_ref = ann_ref.get(ref_id).map(|l| word_set(l)).unwrap_or_default();
                    let common = tokens_sug.intersection(&tokens_ref).count();
                    if common > biggest_overlap {
                        biggest_overlap = common;
                        best_match = Some(ref_id);
                    }
                }
            }
            all_in_sug += 1;
            if best_match.is_some() {
                correct += 1;
            }
        }
        all_in_ref += ann_ref.len() as i64;
    } else {
        for (sug_id, sug_locs) in ann_sug {
            let tokens_sug = word_set(sug_locs);
            all_in_sug += tokens_sug.len() as i64;
            if let Some(refs) = sug_to_ref.get(sug_id) {
                for ref_id in refs {
                    let tokens_ref = ann_ref.get(ref_id).map(|l| word_set(l)).unwrap_or_default();
                    correct += tokens_sug.intersection(&tokens_ref).count() as i64;
                }
            }
        }
        for ref_locs in ann_ref.values() {
            all_in_ref += word_set(ref_locs).len() as i64;
        }
    }
    let (recall, precision, fscore) = prf(correct, all_in_ref, all_in_sug);
    ExtentScores {
        correct,
        all_in_ref,
        all_in_sug,
        recall,
        precision,
        fscore,
    }
}

/// Aligns annotations of two annotators and records inter-annotator
/// agreement on annotation extents under the `<ENTITY>-extent` task.
pub fn comp_annotation_extents(
    kind: EntityKind,
    sug: Annotator,
    reference: Annotator,
    ann_sug: &BTreeMap<String, Vec<EntityLoc>>,
    ann_ref: &BTreeMap<String, Vec<EntityLoc>>,
    counter: &mut AggregateCounter,
) -> ExtentScores {
    let pair = pair_label(sug, reference);
    let (sug_to_ref, _) = find_annotation_mappings(ann_sug, ann_ref, TieBreak::Largest, true);
    let scores = evaluate_entity_extent(ann_sug, ann_ref, &sug_to_ref, true);
    let task = format!("{}-extent", kind.name());
    counter.add(&task, &pair, "correct", scores.correct);
    counter.add(&task, &pair, "all_in_ref", scores.all_in_ref);
    counter.add(&task, &pair, "all_in_sug", scores.all_in_sug);
    counter.add(&task, &pair, "counted_files", 1);
    scores
}

// ------------------------------------------------------------
//    Entity attribute agreement
// ------------------------------------------------------------

static EVENT_HEADER_QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^EVENT\s+"[^"]+"\s+([A-Z_]+)"#).unwrap());
static EVENT_HEADER_PLAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^EVENT\s+([A-Z_]+)").unwrap());
static TIMEX_HEADER_QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^TIMEX\s+"[^"]+"\s+([A-Z_]+)\s+\S+"#).unwrap());
static TIMEX_HEADER_PLAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^TIMEX\s+([A-Z_]+)\s+\S+").unwrap());

static EVENT_ATTRIBS_QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^EVENT\s+"[^"]+"\s*(\S+)"#).unwrap());
static EVENT_ATTRIBS_PLAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^EVENT\s+(\S+)").unwrap());
static TIMEX_ATTRIBS_QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^TIMEX\s+"[^"]+"\s*(\S+)\s+(\S+)"#).unwrap());
static TIMEX_ATTRIBS_PLAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^TIMEX\s+(\S+)\s+(\S+)").unwrap());

/// Finds (approximately) whether the given tag is an entity header tag,
/// with or without a quoted expression.
#[must_use]
pub fn is_entity_header(tag: &str) -> bool {
    EVENT_HEADER_QUOTED_RE.is_match(tag)
        || EVENT_HEADER_PLAIN_RE.is_match(tag)
        || TIMEX_HEADER_QUOTED_RE.is_match(tag)
        || TIMEX_HEADER_PLAIN_RE.is_match(tag)
}

/// Extracts the main attributes from an EVENT or TIMEX header tag as
/// `(attribute name, value)` pairs: `class` for events, `type` and `value`
/// for timexes. The value `UNK` stands for a missing attribute and is
/// skipped by the scoring below.
#[must_use]
pub fn entity_attribs(kind: EntityKind, tag: &str) -> Option<Vec<(&'static str, String)>> {
    match kind {
        EntityKind::Event => {
            let caps = EVENT_ATTRIBS_QUOTED_RE
                .captures(tag)
                .or_else(|| EVENT_ATTRIBS_PLAIN_RE.captures(tag))?;
            Some(vec![("class", caps[1].to_string())])
        }
        EntityKind::Timex => {
            let caps = TIMEX_ATTRIBS_QUOTED_RE
                .captures(tag)
                .or_else(|| TIMEX_ATTRIBS_PLAIN_RE.captures(tag))?;
            Some(vec![
                ("type", caps[1].to_string()),
                ("value", caps[2].to_string()),
            ])
        }
    }
}

fn attrib_names(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Event => &["class"],
        EntityKind::Timex => &["type", "value"],
    }
}

fn header_tag_of(locs: &[EntityLoc]) -> Option<&str> {
    // the last header location wins
    locs.iter()
        .rev()
        .find(|l| is_entity_header(&l.tag))
        .map(|l| l.tag.as_str())
}

/// Precision / recall / F1 per attribute name.
pub type AttribScores = BTreeMap<&'static str, ExtentScores>;

fn inc(counts: &mut BTreeMap<&'static str, i64>, key: &'static str) {
    *counts.entry(key).or_default() += 1;
}

fn finish_attrib_scores(
    kind: EntityKind,
    correct: BTreeMap<&'static str, i64>,
    all_in_ref: BTreeMap<&'static str, i64>,
    all_in_sug: BTreeMap<&'static str, i64>,
) -> AttribScores {
    let mut scores = AttribScores::new();
    for &attrib in attrib_names(kind) {
        let c = correct.get(attrib).copied().unwrap_or(0);
        let r = all_in_ref.get(attrib).copied().unwrap_or(0);
        let s = all_in_sug.get(attrib).copied().unwrap_or(0);
        let (recall, precision, fscore) = prf(c, r, s);
        scores.insert(
            attrib,
            ExtentScores {
                correct: c,
                all_in_ref: r,
                all_in_sug: s,
                recall,
                precision,
                fscore,
            },
        );
    }
    scores
}

/// Evaluates main attribute agreement only on successfully aligned
/// annotations; unaligned annotations do not affect the result.
///
/// Each aligned suggestion is compared against the one reference with the
/// largest extent overlap. Both sides must carry a header tag.
pub fn evaluate_attribs_aligned(
    kind: EntityKind,
    ann_sug: &BTreeMap<String, Vec<EntityLoc>>,
    ann_ref: &BTreeMap<String, Vec<EntityLoc>>,
    sug_to_ref: &Mapping,
) -> Result<AttribScores> {
    let mut correct = BTreeMap::new();
    let mut all_in_ref = BTreeMap::new();
    let mut all_in_sug = BTreeMap::new();
    for (sug_id, sug_locs) in ann_sug {
        let Some(refs) = sug_to_ref.get(sug_id).filter(|r| !r.is_empty()) else {
            continue;
        };
        // 1) One best match among the aligned references
        let tokens_sug = word_set(sug_locs);
        let mut refs: Vec<&String> = refs.iter().collect();
        refs.sort();
        let mut biggest_overlap = 0;
        let mut best_match: Option<&str> = None;
        for ref_id in refs {
            let tokens_ref = ann_ref.get(ref_id).map(|l| word_set(l)).unwrap_or_default();
            let common = tokens_sug.intersection(&tokens_ref).count();
            if common > biggest_overlap {
                biggest_overlap = common;
                best_match = Some(ref_id);
            }
        }
        let best_match = best_match
            .ok_or_else(|| Error::invariant(format!("no best match found for {sug_id}")))?;
        // 2) Headers of both annotations
        let header_sug = header_tag_of(sug_locs)
            .ok_or_else(|| Error::invariant(format!("header annotation not found for {sug_id}")))?;
        let ref_locs = ann_ref.get(best_match).map(Vec::as_slice).unwrap_or(&[]);
        let header_ref = header_tag_of(ref_locs).ok_or_else(|| {
            Error::invariant(format!("header annotation not found for {best_match}"))
        })?;
        // 3) Record counts and matches
        let attribs_sug = entity_attribs(kind, header_sug);
        if let Some(attribs) = &attribs_sug {
            for (name, value) in attribs {
                if value != "UNK" {
                    inc(&mut all_in_sug, name);
                }
            }
        }
        if let Some(attribs_ref) = entity_attribs(kind, header_ref) {
            for (i, (name, value)) in attribs_ref.iter().enumerate() {
                if value == "UNK" {
                    continue;
                }
                inc(&mut all_in_ref, name);
                let matching = attribs_sug
                    .as_ref()
                    .and_then(|a| a.get(i))
                    .is_some_and(|(_, v)| v == value);
                if matching {
                    inc(&mut correct, name);
                }
            }
        }
    }
    Ok(finish_attrib_scores(kind, correct, all_in_ref, all_in_sug))
}

/// Evaluates main attribute agreement the strict way: disagreements on
/// extent also penalize the attribute score. Unaligned suggestions lower
/// precision and unaligned references lower recall.
#[must_use]
pub fn evaluate_attribs_strict(
    kind: EntityKind,
    ann_sug: &BTreeMap<String, Vec<EntityLoc>>,
    ann_ref: &BTreeMap<String, Vec<EntityLoc>>,
    sug_to_ref: &Mapping,
) -> AttribScores {
    let mut correct = BTreeMap::new();
    let mut all_in_ref = BTreeMap::new();
    let mut all_in_sug = BTreeMap::new();
    let mut matched_ref: Vec<&str> = Vec::new();
    for (sug_id, sug_locs) in ann_sug {
        let mut match_found = false;
        for loc in sug_locs {
            if !is_entity_header(&loc.tag) {
                continue;
            }
            let attribs_sug = entity_attribs(kind, &loc.tag);
            if let Some(attribs) = &attribs_sug {
                for (name, value) in attribs {
                    if value != "UNK" {
                        inc(&mut all_in_sug, name);
                    }
                }
            }
            let Some(refs) = sug_to_ref.get(sug_id) else {
                continue;
            };
            'refs: for ref_id in refs {
                let ref_locs = ann_ref.get(ref_id).map(Vec::as_slice).unwrap_or(&[]);
                for ref_loc in ref_locs {
                    if !is_entity_header(&ref_loc.tag) || matched_ref.contains(&ref_id.as_str()) {
                        continue;
                    }
                    if let Some(attribs_ref) = entity_attribs(kind, &ref_loc.tag) {
                        for (i, (name, value)) in attribs_ref.iter().enumerate() {
                            if value == "UNK" {
                                continue;
                            }
                            let matching = attribs_sug
                                .as_ref()
                                .and_then(|a| a.get(i))
                                .is_some_and(|(_, v)| v == value);
                            if matching {
                                inc(&mut correct, name);
                            }
                        }
                    }
                    matched_ref.push(ref_id.as_str());
                    match_found = true;
                    break 'refs;
                }
            }
            if match_found {
                break;
            }
        }
    }
    for ref_locs in ann_ref.values() {
        for loc in ref_locs {
            if !is_entity_header(&loc.tag) {
                continue;
            }
            if let Some(attribs) = entity_attribs(kind, &loc.tag) {
                for (name, value) in &attribs {
                    if value != "UNK" {
                        inc(&mut all_in_ref, name);
                    }
                }
            }
        }
    }
    finish_attrib_scores(kind, correct, all_in_ref, all_in_sug)
}

/// Aligns annotations of two annotators and records inter-annotator
/// agreement on main attributes under the `<ENTITY>-<attrib>` tasks.
///
/// With `count_only_aligned`, agreements are calculated on aligned
/// annotations only; otherwise the strict scoring is used, where extent
/// disagreements also penalize the attribute scores.
pub fn comp_annotation_attribs(
    kind: EntityKind,
    sug: Annotator,
    reference: Annotator,
    ann_sug: &BTreeMap<String, Vec<EntityLoc>>,
    ann_ref: &BTreeMap<String, Vec<EntityLoc>>,
    counter: &mut AggregateCounter,
    count_only_aligned: bool,
) -> Result<AttribScores> {
    let pair = pair_label(sug, reference);
    let (sug_to_ref, _) = find_annotation_mappings(ann_sug, ann_ref, TieBreak::Largest, true);
    let scores = if count_only_aligned {
        evaluate_attribs_aligned(kind, ann_sug, ann_ref, &sug_to_ref)?
    } else {
        evaluate_attribs_strict(kind, ann_sug, ann_ref, &sug_to_ref)
    };
    for (attrib, score) in &scores {
        let task = format!("{}-{}", kind.name(), attrib);
        counter.add(&task, &pair, "correct", score.correct);
        counter.add(&task, &pair, "all_in_ref", score.all_in_ref);
        counter.add(&task, &pair, "all_in_sug", score.all_in_sug);
    }
    Ok(scores)
}

// ------------------------------------------------------------
//    Relation (TLINK) agreement
// ------------------------------------------------------------

/// The four TLINK layers of the corpus, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum TlinkLayer {
    /// Event-to-timex relations.
    EventTimex,
    /// Event-to-document-creation-time relations.
    EventDct,
    /// Relations between main events of adjacent sentences.
    MainEvents,
    /// Relations between syntactically subordinated event pairs.
    EventEvent,
}

impl TlinkLayer {
    /// The layers in reporting order.
    pub const ALL: [TlinkLayer; 4] = [
        TlinkLayer::EventTimex,
        TlinkLayer::EventDct,
        TlinkLayer::MainEvents,
        TlinkLayer::EventEvent,
    ];

    /// The layer key as used in counter task names.
    #[must_use]
    pub fn as_key(&self) -> &'static str {
        match self {
            TlinkLayer::EventTimex => "event_timex",
            TlinkLayer::EventDct => "event_dct",
            TlinkLayer::MainEvents => "main_events",
            TlinkLayer::EventEvent => "event_event",
        }
    }

    /// Counter task for relation detection on this layer.
    #[must_use]
    pub fn find_task(&self) -> String {
        format!("tlink-{}-find", self.as_key())
    }

    /// Counter task for relation-type matching on this layer, under the
    /// given merging scheme.
    #[must_use]
    pub fn rel_match_task(&self, merging: RelationMerging) -> String {
        format!("tlink-{}-rel_match-{}", self.as_key(), merging.as_key())
    }
}

/// Schemes for merging semantically similar relation types before
/// comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelationMerging {
    /// Keep relation types as annotated.
    Base,
    /// Collapse to OVERLAP / BEFORE / AFTER, mapping the disjunctive types
    /// to their temporal direction.
    Rel31,
    /// Like [`RelationMerging::Rel31`], but VAGUE also becomes OVERLAP.
    Rel31Vague,
    /// Collapse to OVERLAP / BEFORE / AFTER, mapping the disjunctive types
    /// to OVERLAP.
    Rel32,
    /// Like [`RelationMerging::Rel32`], but VAGUE also becomes OVERLAP.
    Rel32Vague,
    /// Only collapse the overlap-family types to OVERLAP.
    RelOvrl,
}

impl RelationMerging {
    /// All merging schemes.
    pub const ALL: [RelationMerging; 6] = [
        RelationMerging::Base,
        RelationMerging::Rel31,
        RelationMerging::Rel31Vague,
        RelationMerging::Rel32,
        RelationMerging::Rel32Vague,
        RelationMerging::RelOvrl,
    ];

    /// The schemes recorded by the combined-agreement run.
    pub const RECORDED: [RelationMerging; 4] = [
        RelationMerging::Base,
        RelationMerging::Rel31,
        RelationMerging::Rel32,
        RelationMerging::RelOvrl,
    ];

    /// The scheme key as used in counter task names.
    #[must_use]
    pub fn as_key(&self) -> &'static str {
        match self {
            RelationMerging::Base => "base",
            RelationMerging::Rel31 => "rel_3_1",
            RelationMerging::Rel31Vague => "rel_3_1_vague",
            RelationMerging::Rel32 => "rel_3_2",
            RelationMerging::Rel32Vague => "rel_3_2_vague",
            RelationMerging::RelOvrl => "rel_ovrl",
        }
    }
}

static KNOWN_MERGED_REL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(OVERLAP|BEFORE|AFTER|VAGUE|IDENTITY)\s*$").unwrap());

const OVERLAP_FAMILY: [&str; 4] = ["SIMULTANEOUS", "INCLUDES", "IS_INCLUDED", "IDENTITY"];

/// Merges semantically similar relation types under the given scheme.
///
/// With `unknown_to_vague`, a relation type outside the merged vocabulary
/// maps to VAGUE (the base scheme never rewrites anything).
#[must_use]
pub fn merge_relation(
    relation: &str,
    merging: RelationMerging,
    unknown_to_vague: bool,
) -> String {
    match merging {
        RelationMerging::Rel31 | RelationMerging::Rel31Vague => {
            if OVERLAP_FAMILY.contains(&relation) {
                "OVERLAP".to_string()
            } else if relation == "OVERLAP-OR-AFTER" {
                "AFTER".to_string()
            } else if relation == "BEFORE-OR-OVERLAP" {
                "BEFORE".to_string()
            } else if unknown_to_vague && !KNOWN_MERGED_REL_RE.is_match(relation) {
                "VAGUE".to_string()
            } else if relation == "VAGUE" && merging == RelationMerging::Rel31Vague {
                "OVERLAP".to_string()
            } else {
                relation.to_string()
            }
        }
        RelationMerging::Rel32 | RelationMerging::Rel32Vague => {
            if OVERLAP_FAMILY.contains(&relation)
                || relation == "OVERLAP-OR-AFTER"
                || relation == "BEFORE-OR-OVERLAP"
            {
                "OVERLAP".to_string()
            } else if unknown_to_vague && !KNOWN_MERGED_REL_RE.is_match(relation) {
                "VAGUE".to_string()
            } else if relation == "VAGUE" && merging == RelationMerging::Rel32Vague {
                "OVERLAP".to_string()
            } else {
                relation.to_string()
            }
        }
        RelationMerging::RelOvrl => {
            if OVERLAP_FAMILY.contains(&relation) {
                "OVERLAP".to_string()
            } else {
                relation.to_string()
            }
        }
        RelationMerging::Base => relation.to_string(),
    }
}

/// Corrects a relation pair annotated over switched endpoints: given
/// `X relA Y` and `Y relB X`, returns matching types when the switch makes
/// the relations equivalent (`A BEFORE B == B AFTER A`, and the
/// INCLUDES / IS_INCLUDED pair likewise).
#[must_use]
pub fn make_comm_correction<'a>(rel_a: &'a str, rel_b: &'a str) -> (&'a str, &'a str) {
    match (rel_a, rel_b) {
        ("BEFORE", "AFTER") => ("BEFORE", "BEFORE"),
        ("AFTER", "BEFORE") => ("AFTER", "AFTER"),
        ("INCLUDES", "IS_INCLUDED") => ("INCLUDES", "INCLUDES"),
        ("IS_INCLUDED", "INCLUDES") => ("IS_INCLUDED", "IS_INCLUDED"),
        _ => (rel_a, rel_b),
    }
}

/// Records the contingency table cell of one response pair.
pub fn update_contingency_table(
    response_a: &str,
    response_b: &str,
    counter: &mut AggregateCounter,
    task: &str,
    pair: &str,
) {
    let cell = format!("table:{response_a}___{response_b}");
    counter.add(task, pair, &cell, 1);
}

fn endpoint_key(relation: &Relation) -> String {
    let mut endpoints = [relation.entity_a.as_str(), relation.entity_b.as_str()];
    endpoints.sort_unstable();
    format!("{}_{}", endpoints[0], endpoints[1])
}

/// Finds all the TLINK matches between all annotator pairs on one layer and
/// records the counts (matches and mismatches) into the counter.
///
/// Relations are matched by their (sorted) endpoint pair; a match counts
/// towards relation detection, and the (merged) relation types then feed
/// the relation-type agreement and its contingency table. Files an
/// annotator was not tasked to annotate are skipped for the pairs that
/// involve that annotator.
///
/// With `apply_comm_correction`, relation pairs annotated over switched
/// endpoints (e.g. `A BEFORE B` vs `B AFTER A`) still count as matching
/// types.
pub fn record_tlinks_matches(
    all_relations: &BTreeMap<Annotator, Vec<(String, Relation)>>,
    layer: TlinkLayer,
    merging: RelationMerging,
    counter: &mut AggregateCounter,
    file_to_annotators: &BTreeMap<String, Vec<Annotator>>,
    apply_comm_correction: bool,
) {
    let all_pairs = annotator_pairs(&Annotator::ALL);
    // Divide relations into groups by files
    let mut file_to_rels: BTreeMap<&str, Vec<(Annotator, &Relation)>> = BTreeMap::new();
    for (&annotator, relations) in all_relations {
        for (file, relation) in relations {
            file_to_rels
                .entry(file.as_str())
                .or_default()
                .push((annotator, relation));
        }
    }
    let find_task = layer.find_task();
    let match_task = layer.rel_match_task(merging);
    for (a, b) in all_pairs {
        let pair = pair_label(a, b);
        for (file, relations) in &file_to_rels {
            let tasked = file_to_annotators.get(*file);
            let both_tasked = tasked
                .is_some_and(|anns| anns.contains(&a) && anns.contains(&b));
            if !both_tasked {
                continue;
            }
            for &(annotator1, relation1) in relations {
                if annotator1 == a {
                    counter.add(&find_task, &pair, "all_in_ref", 1);
                }
                if annotator1 == b {
                    counter.add(&find_task, &pair, "all_in_sug", 1);
                }
                if annotator1 != a {
                    continue;
                }
                let key1 = endpoint_key(relation1);
                // Find whether we have a matching relation from the other
                // annotator
                for &(annotator2, relation2) in relations {
                    if annotator2 != b || endpoint_key(relation2) != key1 {
                        continue;
                    }
                    // Both annotators draw a relation
                    // in this place
                    counter.add(&find_task, &pair, "correct", 1);
                    counter.add(&match_task, &pair, "all", 1);
                    let mut rel_type1 = relation1.relation.as_str();
                    let mut rel_type2 = relation2.relation.as_str();
                    if relation1.entity_a != relation2.entity_a && apply_comm_correction {
                        // The endpoints are in different order; correct the
                        // clear opposite relations, e.g. A AFTER B vs
                        // B BEFORE A. Mixed cases like A BEFORE-OR-OVERLAP B
                        // vs B AFTER A stay uncorrected.
                        (rel_type1, rel_type2) = make_comm_correction(rel_type1, rel_type2);
                    }
                    let merged1 = merge_relation(rel_type1, merging, true);
                    let merged2 = merge_relation(rel_type2, merging, true);
                    update_contingency_table(&merged1, &merged2, counter, &match_task, &pair);
                    if merged1 == merged2 {
                        counter.add(&match_task, &pair, "agree", 1);
                    }
                    break;
                }
            }
        }
    }
}
