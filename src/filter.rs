//! Linguistically motivated filtering of EVENT annotations.
//!
//! A filter policy selects a subset of the annotated events, based either on
//! the underlying morphosyntactic annotations or on other entity annotations
//! of the sentence. Agreement is then evaluated on the surviving subset only.
//!
//! | Code | Events kept |
//! |------|-------------|
//! | `0`    | all (no filtering) |
//! | `1a`-`1e`  | by part of speech (verbs, +nouns, +adjectives, ...) |
//! | `2a`-`2e`  | by membership in the clause predicate, or direct dependency on it |
//! | `2*a`-`2*g` | predicate membership refined by the syntactic function of the dependent |
//! | `3a`-`3n`  | predicate members by grammatical tense |
//! | `4a`-`4f`  | predicate members by presence of governed temporal expressions |
//! | `4*a`-`4*e` | governed temporal expressions combined with tense grids |
//! | `5a`-`5d`  | predicate members by negation and modality |
//! | `6*a`-`6*i` | by the TimeML class controlling the argument structure |
//!
//! A policy decision marks a token location as deleted; the actual removal
//! happens through [`delete_at`](crate::corpus::FileEntities::delete_at), so
//! deleting the header token
//! of a multi-word event takes the whole span with it, while deleting a
//! continuation token leaves the entity itself in place. Relations whose
//! event endpoints disappeared are swept up afterwards by
//! [`filter_out_deleted_relations`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::argstruct::{self, ArgStructOptions};
use crate::clause::{self, ClauseLabel, PredicateTense};
use crate::corpus::{
    Annotator, EntityAnnotations, LocKey, RelationLayer, SentAnnotation, Sentence,
    TlinkCollections, Token,
};
use crate::error::{Error, Result};
use crate::morph::{self, VerbMood, VerbType};
use crate::tree::SentenceForest;

static POLICY_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9])(\*?)([a-z]?)$").unwrap());
static TIMEX_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*TIMEX3?\s(DATE|TIME|SET|DURATION|UNK)").unwrap());
static TIMEX_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^t[0-9]+$").unwrap());

/// Filtering criterion family, selected by the leading digit (and optional
/// `*`) of the policy code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterFamily {
    KeepAll,
    PosTag,
    Predicate,
    PredicateSyntax,
    PredicateTense,
    GovernedTimexes,
    TimexesAndTenses,
    ModalityNegation,
    ArgStructures,
}

impl FilterFamily {
    fn prefix(self) -> &'static str {
        match self {
            FilterFamily::KeepAll => "0",
            FilterFamily::PosTag => "1",
            FilterFamily::Predicate => "2",
            FilterFamily::PredicateSyntax => "2*",
            FilterFamily::PredicateTense => "3",
            FilterFamily::GovernedTimexes => "4",
            FilterFamily::TimexesAndTenses => "4*",
            FilterFamily::ModalityNegation => "5",
            FilterFamily::ArgStructures => "6*",
        }
    }
}

/// A parsed and validated filtering policy code, e.g. `2a` or `6*i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPolicy {
    family: FilterFamily,
    variant: char,
}

impl FromStr for FilterPolicy {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        let caps = POLICY_CODE_RE
            .captures(code)
            .ok_or_else(|| Error::invalid_input(format!("malformed filter code: {code:?}")))?;
        let star = !caps[2].is_empty();
        let (family, last) = match (&caps[1], star) {
            ("0", false) => {
                return Ok(FilterPolicy { family: FilterFamily::KeepAll, variant: '0' });
            }
            ("1", false) => (FilterFamily::PosTag, 'e'),
            ("2", false) => (FilterFamily::Predicate, 'e'),
            ("2", true) => (FilterFamily::PredicateSyntax, 'g'),
            ("3", false) => (FilterFamily::PredicateTense, 'n'),
            ("4", false) => (FilterFamily::GovernedTimexes, 'f'),
            ("4", true) => (FilterFamily::TimexesAndTenses, 'e'),
            ("5", false) => (FilterFamily::ModalityNegation, 'd'),
            ("6", true) => (FilterFamily::ArgStructures, 'i'),
            _ => {
                return Err(Error::invalid_input(format!("unknown filter code: {code:?}")));
            }
        };
        let variant = caps[3]
            .chars()
            .next()
            .ok_or_else(|| Error::invalid_input(format!("filter code {code:?} lacks a variant")))?;
        if !('a'..=last).contains(&variant) {
            return Err(Error::invalid_input(format!("unknown filter code: {code:?}")));
        }
        Ok(FilterPolicy { family, variant })
    }
}

impl fmt::Display for FilterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.family == FilterFamily::KeepAll {
            return f.write_str("0");
        }
        write!(f, "{}{}", self.family.prefix(), self.variant)
    }
}

/// Per-annotator filtering statistics, accumulated over files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    /// Entity ids fully deleted (header token filtered out).
    pub del_ids: i64,
    /// All annotated entity ids before filtering.
    pub all_ids: i64,
    /// Token annotations deleted, including cascaded span parts.
    pub del_tokens: i64,
    /// All annotated token locations before filtering.
    pub all_tokens: i64,
}

/// Filtering statistics of the whole roster.
pub type FilterStatistics = BTreeMap<Annotator, FilterStats>;

/// Gathers the entity annotations of every annotator over one sentence into
/// the flat working form used by the filtering predicates.
pub fn gather_sentence_annotations(
    file: &str,
    annotators: &[Annotator],
    sentence_id: usize,
    events: &EntityAnnotations,
    timexes: &EntityAnnotations,
) -> Result<Vec<SentAnnotation>> {
    let mut annotations = Vec::new();
    for &annotator in annotators {
        for source in [events, timexes] {
            let store = source.get(&annotator).ok_or_else(|| {
                Error::invariant(format!("missing annotations for annotator {annotator}"))
            })?;
            let Some(entities) = store.get(file) else {
                continue;
            };
            for (&(sid, word_id), spans) in &entities.by_loc {
                if sid != sentence_id {
                    continue;
                }
                for span in spans {
                    annotations.push(SentAnnotation {
                        annotator,
                        sentence_id: sid,
                        word_id,
                        entity_id: span.entity_id.clone(),
                        expression: span.expression.clone(),
                        tag: span.tag.clone(),
                    });
                }
            }
        }
    }
    Ok(annotations)
}

/// Syntactic ids of the tokens of one verb chain.
fn chain_synt_ids<'a>(sentence: &'a Sentence, chain: &[usize]) -> Vec<&'a str> {
    chain.iter().map(|&i| sentence[i].synt_id.as_str()).collect()
}

fn chain_has_negation(sentence: &Sentence, chain: &[usize]) -> bool {
    chain
        .iter()
        .any(|&i| morph::syntactic_function(&sentence[i].morph) == Some("@NEG"))
}

fn chain_has_modality(sentence: &Sentence, chain: &[usize]) -> bool {
    chain
        .iter()
        .any(|&i| morph::verb_type(&sentence[i].morph) == Some(VerbType::Mod))
}

fn chain_has_indicative(sentence: &Sentence, chain: &[usize]) -> bool {
    chain
        .iter()
        .any(|&i| morph::verb_mood(&sentence[i].morph) == Some(VerbMood::Indic))
}

/// Finds the temporal expressions of `focus` that are syntactically governed
/// by the tokens carrying the given syntactic ids, staying within the clause
/// of the first one. Returns the header tags of the found expressions.
///
/// A governed continuation token contributes the header tag of its entity;
/// a continuation whose entity has no header in the sentence is an
/// invariant violation.
fn subordinated_timexes(
    sentence: &Sentence,
    synt_ids: &[&str],
    labels: &[ClauseLabel],
    annotations: &[SentAnnotation],
    focus: Annotator,
) -> Result<Vec<String>> {
    let mut found = Vec::new();
    let Some(first) = synt_ids.first() else {
        return Ok(found);
    };
    for token in sentence {
        if !synt_ids.contains(&token.synt_head.as_str()) {
            continue;
        }
        if clause::in_different_clauses(sentence, first, &token.synt_id, labels, false) {
            continue;
        }
        for ann in annotations {
            if ann.word_id != token.word_id
                || ann.annotator != focus
                || !ann.tag.trim().starts_with("TIMEX")
            {
                continue;
            }
            if TIMEX_HEADER_RE.is_match(&ann.tag) {
                found.push(ann.tag.clone());
            } else {
                let header = annotations
                    .iter()
                    .find(|a| {
                        a.annotator == focus
                            && a.entity_id == ann.entity_id
                            && TIMEX_HEADER_RE.is_match(&a.tag)
                    })
                    .ok_or_else(|| {
                        Error::invariant(format!("no header found for timex {}", ann.entity_id))
                    })?;
                found.push(header.tag.clone());
            }
        }
    }
    Ok(found)
}

/// Decides whether one event annotation falls outside the policy's subset
/// and should be deleted. Non-EVENT annotations are never deleted.
fn should_delete(
    policy: &FilterPolicy,
    annotation: &SentAnnotation,
    token: &Token,
    sentence: &Sentence,
    forest: &SentenceForest,
    labels: &[ClauseLabel],
    annotations: &[SentAnnotation],
    judge: Annotator,
) -> Result<bool> {
    use PredicateTense::{Impf, Pf, Pqpf, Pres};

    if !annotation.tag.trim().starts_with("EVENT") {
        return Ok(false);
    }
    let variant = policy.variant;
    // Every family apart from keep-all and argument structures reads the
    // POS tag up front, so a malformed tag fails the run instead of
    // silently deleting the event.
    let pos = match policy.family {
        FilterFamily::KeepAll | FilterFamily::ArgStructures => None,
        _ => Some(morph::pos(&token.morph)?),
    };
    match policy.family {
        FilterFamily::KeepAll => Ok(false),
        FilterFamily::PosTag => {
            let keep = match variant {
                'a' => pos == Some("V"),
                'b' => matches!(pos, Some("V" | "S")),
                'c' => matches!(pos, Some("V" | "A")),
                'd' => matches!(pos, Some("V" | "A" | "S")),
                'e' => true,
                _ => return Err(Error::invariant(format!("unhandled filter code {policy}"))),
            };
            Ok(!keep)
        }
        FilterFamily::Predicate => {
            let structure = clause::predicate_structure(sentence, &token.synt_id, labels)?;
            let mut delete = true;
            let mut is_predicate_or_child = false;
            for chain in &structure.chains {
                let ids = chain_synt_ids(sentence, chain);
                let in_chain = ids.contains(&token.synt_id.as_str());
                let parent_in_chain = ids.contains(&token.synt_head.as_str());
                if in_chain || parent_in_chain {
                    is_predicate_or_child = true;
                }
                let keep = match variant {
                    'a' | 'd' => in_chain,
                    'b' => in_chain || (parent_in_chain && pos == Some("V")),
                    'c' => in_chain || (parent_in_chain && pos != Some("V")),
                    'e' => true,
                    _ => return Err(Error::invariant(format!("unhandled filter code {policy}"))),
                };
                if keep {
                    delete = false;
                }
            }
            // `d` additionally keeps everything not connected to a predicate.
            if variant == 'd' && !is_predicate_or_child {
                delete = false;
            }
            Ok(delete)
        }
        FilterFamily::PredicateSyntax => {
            let structure = clause::predicate_structure(sentence, &token.synt_id, labels)?;
            let synt_func = morph::syntactic_function(&token.morph);
            let mut delete = true;
            for chain in &structure.chains {
                let ids = chain_synt_ids(sentence, chain);
                if ids.contains(&token.synt_id.as_str()) {
                    delete = false;
                    continue;
                }
                if !ids.contains(&token.synt_head.as_str()) {
                    continue;
                }
                let (wanted_func, verbal) = match variant {
                    'a' => continue,
                    'b' => ("@OBJ", true),
                    'c' => ("@OBJ", false),
                    'd' => ("@SUBJ", true),
                    'e' => ("@SUBJ", false),
                    'f' => ("@ADVL", true),
                    'g' => ("@ADVL", false),
                    _ => return Err(Error::invariant(format!("unhandled filter code {policy}"))),
                };
                let pos_fits = if verbal {
                    pos == Some("V")
                } else {
                    pos.is_some_and(|p| p != "V")
                };
                if synt_func == Some(wanted_func) && pos_fits {
                    delete = false;
                }
            }
            Ok(delete)
        }
        FilterFamily::PredicateTense => {
            let structure = clause::predicate_structure(sentence, &token.synt_id, labels)?;
            let tenses = clause::predicate_tenses(sentence, &structure);
            let mut delete = true;
            for (chain, &tense) in structure.chains.iter().zip(&tenses) {
                let ids = chain_synt_ids(sentence, chain);
                if !ids.contains(&token.synt_id.as_str()) {
                    continue;
                }
                match variant {
                    'a' => {
                        if tense == Impf {
                            delete = false;
                        }
                    }
                    'b' => {
                        if matches!(tense, Impf | Pqpf) {
                            delete = false;
                        }
                    }
                    'c' => {
                        if matches!(tense, Impf | Pf) {
                            delete = false;
                        }
                    }
                    'd' => {
                        if matches!(tense, Impf | Pf | Pqpf) {
                            delete = false;
                        }
                    }
                    'e' => {
                        if matches!(tense, Impf | Pf | Pqpf | Pres) {
                            delete = false;
                        }
                    }
                    'f' => {
                        if matches!(tense, Impf | Pres) {
                            delete = false;
                        }
                    }
                    'g' => {
                        delete = false;
                    }
                    'h' => {
                        if matches!(tense, Impf | Pf | Pqpf | Pres) {
                            delete = false;
                            if clause::is_olema_single_pres_predicate(tense, sentence, chain) {
                                delete = true;
                            }
                        }
                    }
                    'i' => {
                        if matches!(tense, Impf | Pf | Pqpf | Pres) {
                            delete = false;
                            if tense == Pres {
                                delete = !chain_has_indicative(sentence, chain);
                            }
                        }
                    }
                    'j' => {
                        if matches!(tense, Impf | Pf | Pqpf | Pres) {
                            delete = false;
                            if tense == Pres {
                                delete = !chain_has_indicative(sentence, chain);
                                if clause::is_olema_single_pres_predicate(tense, sentence, chain) {
                                    delete = true;
                                }
                            }
                        }
                    }
                    'k' => {
                        if matches!(tense, Impf | Pf | Pqpf | Pres) {
                            delete = false;
                            if tense == Pres {
                                delete = !chain_has_indicative(sentence, chain);
                            }
                            if clause::is_olema_single_pres_predicate(tense, sentence, chain) {
                                delete = true;
                            }
                            if chain_has_negation(sentence, chain)
                                || chain_has_modality(sentence, chain)
                            {
                                delete = true;
                            }
                        }
                    }
                    'l' => {
                        if tense == Pres {
                            delete = false;
                        }
                    }
                    'm' => {
                        if tense == Pqpf {
                            delete = false;
                        }
                    }
                    'n' => {
                        if tense == Pf {
                            delete = false;
                        }
                    }
                    _ => return Err(Error::invariant(format!("unhandled filter code {policy}"))),
                }
            }
            Ok(delete)
        }
        FilterFamily::GovernedTimexes => {
            let structure = clause::predicate_structure(sentence, &token.synt_id, labels)?;
            let mut delete = true;
            let mut governed_anywhere = false;
            for chain in &structure.chains {
                let ids = chain_synt_ids(sentence, chain);
                let governed =
                    subordinated_timexes(sentence, &ids, labels, annotations, judge)?;
                if !governed.is_empty() {
                    governed_anywhere = true;
                }
                let in_chain = ids.contains(&token.synt_id.as_str());
                match variant {
                    'a' => {
                        if in_chain && !governed.is_empty() {
                            delete = false;
                        }
                    }
                    'b' => {
                        if in_chain && governed.is_empty() {
                            delete = false;
                        }
                    }
                    'c' => {
                        if in_chain {
                            delete = false;
                        }
                    }
                    'd' => {
                        if in_chain && !governed.is_empty() {
                            delete = false;
                        } else {
                            let own = subordinated_timexes(
                                sentence,
                                &[token.synt_id.as_str()],
                                labels,
                                annotations,
                                judge,
                            )?;
                            if !own.is_empty() {
                                delete = false;
                            }
                        }
                    }
                    'e' | 'f' => {}
                    _ => return Err(Error::invariant(format!("unhandled filter code {policy}"))),
                }
            }
            // `e` and `f` decide on the sentence level: does any predicate of
            // the clause govern a temporal expression?
            if variant == 'e' && governed_anywhere {
                delete = false;
            }
            if variant == 'f' && !governed_anywhere {
                delete = false;
            }
            Ok(delete)
        }
        FilterFamily::TimexesAndTenses => {
            let structure = clause::predicate_structure(sentence, &token.synt_id, labels)?;
            let tenses = clause::predicate_tenses(sentence, &structure);
            let mut delete = true;
            for (chain, &tense) in structure.chains.iter().zip(&tenses) {
                let ids = chain_synt_ids(sentence, chain);
                if !ids.contains(&token.synt_id.as_str()) {
                    continue;
                }
                let governed =
                    subordinated_timexes(sentence, &ids, labels, annotations, judge)?;
                let tense_fits = match variant {
                    'a' => tense == Impf,
                    'b' => matches!(tense, Impf | Pqpf),
                    'c' => matches!(tense, Impf | Pf),
                    'd' => matches!(tense, Impf | Pf | Pqpf),
                    'e' => matches!(tense, Impf | Pf | Pqpf | Pres),
                    _ => return Err(Error::invariant(format!("unhandled filter code {policy}"))),
                };
                if !governed.is_empty() || tense_fits {
                    delete = false;
                }
            }
            Ok(delete)
        }
        FilterFamily::ModalityNegation => {
            let structure = clause::predicate_structure(sentence, &token.synt_id, labels)?;
            let mut delete = true;
            for chain in &structure.chains {
                let ids = chain_synt_ids(sentence, chain);
                if !ids.contains(&token.synt_id.as_str()) {
                    continue;
                }
                let negation = chain_has_negation(sentence, chain);
                let modality = chain_has_modality(sentence, chain);
                let keep = match variant {
                    'a' => !modality && !negation,
                    'b' => !negation,
                    'c' => !modality,
                    'd' => true,
                    _ => return Err(Error::invariant(format!("unhandled filter code {policy}"))),
                };
                if keep {
                    delete = false;
                }
            }
            Ok(delete)
        }
        FilterFamily::ArgStructures => {
            // Continuation tokens without a header tag stay untouched.
            if argstruct::event_class(&annotation.tag).is_none() {
                return Ok(false);
            }
            let mut delete = true;
            let mut in_arg_struct = false;
            let judge_annotations: Vec<SentAnnotation> = annotations
                .iter()
                .filter(|a| a.annotator == judge)
                .cloned()
                .collect();
            let options = ArgStructOptions { use_all_classes: true, ..Default::default() };
            let structures = argstruct::event_arg_structures(
                sentence,
                forest,
                &judge_annotations,
                labels,
                options,
            )?;
            for s in &structures {
                let nodes: Vec<usize> =
                    std::iter::once(s.head).chain(s.args.iter().copied()).collect();
                if !nodes
                    .iter()
                    .any(|&n| forest.nodes[n].label == token.synt_id)
                {
                    continue;
                }
                in_arg_struct = true;
                if variant == 'i' {
                    continue;
                }
                let head_word = forest.nodes[s.head].word_id;
                let controlling = judge_annotations
                    .iter()
                    .filter(|a| a.word_id == head_word)
                    .find_map(|a| argstruct::event_class(&a.tag))
                    .unwrap_or("---");
                let wanted = match variant {
                    'a' => "REPORTING",
                    'b' => "I_ACTION",
                    'c' => "I_STATE",
                    'd' => "ASPECTUAL",
                    'e' => "PERCEPTION",
                    'f' => "MODAL",
                    'g' => "OCCURRENCE",
                    'h' => "STATE",
                    _ => return Err(Error::invariant(format!("unhandled filter code {policy}"))),
                };
                if controlling == wanted {
                    delete = false;
                }
            }
            // `i` keeps exactly the events belonging to no argument structure.
            if variant == 'i' {
                delete = in_arg_struct;
            }
            Ok(delete)
        }
    }
}

/// Applies the filtering policy to the event annotations of one file.
///
/// Works in two phases: first every event annotation of every annotator is
/// judged against the policy and offending token locations are marked, then
/// the marked locations are deleted through
/// [`delete_at`](crate::corpus::FileEntities::delete_at) and per-annotator
/// statistics are accumulated into `stats`.
pub fn filter_annotations(
    file: &str,
    annotators: &[Annotator],
    judge: Annotator,
    sentences: &[Sentence],
    forests: &[SentenceForest],
    events: &mut EntityAnnotations,
    timexes: &EntityAnnotations,
    policy: &FilterPolicy,
    stats: &mut FilterStatistics,
) -> Result<()> {
    let mut marked: BTreeMap<Annotator, BTreeSet<LocKey>> = BTreeMap::new();
    for (sentence_id, sentence) in sentences.iter().enumerate() {
        let forest = forests.get(sentence_id).ok_or_else(|| {
            Error::invariant(format!("no dependency forest for sentence {sentence_id}"))
        })?;
        let labels = clause::clause_labels(sentence);
        let annotations =
            gather_sentence_annotations(file, annotators, sentence_id, events, timexes)?;
        for token in sentence {
            for annotation in annotations
                .iter()
                .filter(|a| a.sentence_id == sentence_id && a.word_id == token.word_id)
            {
                if should_delete(
                    policy,
                    annotation,
                    token,
                    sentence,
                    forest,
                    &labels,
                    &annotations,
                    judge,
                )? {
                    marked
                        .entry(annotation.annotator)
                        .or_default()
                        .insert((sentence_id, token.word_id));
                }
            }
        }
    }

    for &annotator in annotators {
        let store = events.get_mut(&annotator).ok_or_else(|| {
            Error::invariant(format!("missing annotations for annotator {annotator}"))
        })?;
        let mut local = FilterStats::default();
        if let Some(entities) = store.get_mut(file) {
            local.all_ids = entities.by_id.values().filter(|v| !v.is_empty()).count() as i64;
            local.all_tokens = entities.by_loc.values().filter(|v| !v.is_empty()).count() as i64;
            if let Some(locs) = marked.get(&annotator) {
                for &loc in locs {
                    let outcome = entities.delete_at(loc);
                    local.del_ids += outcome.fully_removed.len() as i64;
                    local.del_tokens += outcome.tokens_removed as i64;
                }
            }
        }
        log::debug!(
            "{file}: filter {policy} deleted {} of {} event annotations of {annotator}",
            local.del_ids,
            local.all_ids
        );
        let total = stats.entry(annotator).or_default();
        total.del_ids += local.del_ids;
        total.all_ids += local.all_ids;
        total.del_tokens += local.del_tokens;
        total.all_tokens += local.all_tokens;
    }
    Ok(())
}

/// Removes from one relation layer every relation touching `entity_id`:
/// the entry indexed under the id itself, and any relation under another
/// index whose endpoint matches.
fn delete_relations_for_entity(
    layer: &mut RelationLayer,
    annotator: Annotator,
    file: &str,
    entity_id: &str,
) {
    let Some(store) = layer.get_mut(&annotator) else {
        return;
    };
    let Some(by_entity) = store.get_mut(file) else {
        return;
    };
    by_entity.remove(entity_id);
    for relations in by_entity.values_mut() {
        relations.retain(|r| r.entity_a != entity_id && r.entity_b != entity_id);
    }
}

/// Sweeps all four relation layers, deleting relations whose event endpoint
/// no longer exists in the judge's (filtered) event annotations. Timex ids
/// (`t<N>`) are exempt: temporal expressions are never filtered.
pub fn filter_out_deleted_relations(
    tlinks: &mut TlinkCollections,
    events: &EntityAnnotations,
    judge: Annotator,
) -> Result<()> {
    let judge_events = events
        .get(&judge)
        .ok_or_else(|| Error::invariant(format!("missing annotations for annotator {judge}")))?;
    for (file, entities) in judge_events {
        let existing: BTreeSet<&str> =
            entities.by_id.keys().map(String::as_str).collect();
        for annotator in Annotator::ALL {
            let mut to_delete: BTreeSet<String> = BTreeSet::new();
            for layer in [
                &tlinks.event_timex,
                &tlinks.event_dct,
                &tlinks.main_events,
                &tlinks.sub_events,
            ] {
                let Some(by_entity) = layer.get(&annotator).and_then(|s| s.get(file)) else {
                    continue;
                };
                for index in by_entity.keys() {
                    if !existing.contains(index.as_str()) && !TIMEX_ID_RE.is_match(index) {
                        to_delete.insert(index.clone());
                    }
                }
            }
            for entity_id in &to_delete {
                delete_relations_for_entity(&mut tlinks.event_timex, annotator, file, entity_id);
                delete_relations_for_entity(&mut tlinks.event_dct, annotator, file, entity_id);
                delete_relations_for_entity(&mut tlinks.main_events, annotator, file, entity_id);
                delete_relations_for_entity(&mut tlinks.sub_events, annotator, file, entity_id);
            }
            if !to_delete.is_empty() {
                log::debug!(
                    "{file}: dropped relations of {} deleted events of {annotator}",
                    to_delete.len()
                );
            }
        }
    }
    Ok(())
}
