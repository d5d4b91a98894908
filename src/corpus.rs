//! Corpus model and TSV loaders.
//!
//! A corpus directory holds one base-segmentation file plus per-annotator
//! annotation files. The judge's files carry no suffix; the files of
//! annotators `a`, `b` and `c` carry an `.ann-<x>` suffix:
//!
//! | File | Columns |
//! |------|---------|
//! | `base-segmentation-morph-syntax` | file, sentence, word, token, morph tag, syntactic id, head id |
//! | `event-annotation[.ann-x]` | file, sentence, word, expression, tag, entity id |
//! | `timex-annotation[.ann-x]` | file, sentence, word, expression, tag, entity id |
//! | `timex-annotation-dct[.ann-x]` | file, document creation time |
//! | `tlink-*[.ann-x]` | file, entity A, relation, entity B, comment |
//!
//! Lines starting with `#` are comments. A row with an unexpected number of
//! columns is a fatal parse error.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Base segmentation file name.
pub const BASE_ANNOTATION_FILE: &str = "base-segmentation-morph-syntax";
/// EVENT annotation file name (judge's copy; annotators add a suffix).
pub const EVENT_ANNOTATION_FILE: &str = "event-annotation";
/// TIMEX annotation file name.
pub const TIMEX_ANNOTATION_FILE: &str = "timex-annotation";
/// Document creation time file name.
pub const TIMEX_DCT_FILE: &str = "timex-annotation-dct";
/// Event-to-timex TLINK file name.
pub const TLINK_EVENT_TIMEX_FILE: &str = "tlink-event-timex";
/// Event-to-DCT TLINK file name.
pub const TLINK_EVENT_DCT_FILE: &str = "tlink-event-dct";
/// Main-event-to-main-event TLINK file name.
pub const TLINK_MAIN_EVENTS_FILE: &str = "tlink-main-events";
/// Subordinated event pair TLINK file name.
pub const TLINK_SUB_EVENTS_FILE: &str = "tlink-subordinate-events";

static HEADER_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(EVENT|TIMEX)\s+[A-Z_]+\s*").unwrap());

/// Tests whether an annotation tag has the shape of an entity header
/// (`EVENT CLASS …` or `TIMEX TYPE …`). Continuation locations of a
/// multi-word entity carry only the bare entity name.
#[must_use]
pub fn is_header_tag(tag: &str) -> bool {
    HEADER_TAG_RE.is_match(tag)
}

/// One of the three annotators or the adjudicating judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Annotator {
    /// Annotator `a`.
    A,
    /// Annotator `b`.
    B,
    /// Annotator `c`.
    C,
    /// The judge (`j`), whose annotations act as the adjudicated gold.
    Judge,
}

impl Annotator {
    /// All annotators, in roster order `a`, `b`, `c`, `j`.
    pub const ALL: [Annotator; 4] =
        [Annotator::A, Annotator::B, Annotator::C, Annotator::Judge];

    /// The single-letter roster label.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Annotator::A => "a",
            Annotator::B => "b",
            Annotator::C => "c",
            Annotator::Judge => "j",
        }
    }

    /// Parses a roster label.
    pub fn from_label(label: &str) -> Result<Self> {
        match label {
            "a" => Ok(Annotator::A),
            "b" => Ok(Annotator::B),
            "c" => Ok(Annotator::C),
            "j" => Ok(Annotator::Judge),
            other => Err(Error::invalid_input(format!("unknown annotator: {other:?}"))),
        }
    }

    /// The file-name suffix of this annotator's files (empty for the judge).
    #[must_use]
    pub fn file_suffix(&self) -> String {
        match self {
            Annotator::Judge => String::new(),
            other => format!(".ann-{}", other.as_label()),
        }
    }
}

impl fmt::Display for Annotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// One token of the base segmentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Sentence index within the file.
    pub sentence_id: usize,
    /// Word index within the sentence.
    pub word_id: usize,
    /// Surface form.
    pub surface: String,
    /// Raw CG morphosyntactic tag.
    pub morph: String,
    /// Syntactic id of the token (small-integer string).
    pub synt_id: String,
    /// Syntactic id of the head token (`"0"` for the root).
    pub synt_head: String,
}

/// A sentence is a run of tokens sharing a sentence id.
pub type Sentence = Vec<Token>;

/// Base segmentation of the corpus: file name to its sentences.
pub type BaseSegmentation = BTreeMap<String, Vec<Sentence>>;

/// Location key: (sentence id, word id) within a file.
pub type LocKey = (usize, usize);

/// An entity annotation as seen from its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Entity id (e.g. `e12`, `t3`); shared across a multi-word entity.
    pub entity_id: String,
    /// Annotated expression.
    pub expression: String,
    /// Annotation tag (header tag on the head location, bare name elsewhere).
    pub tag: String,
}

/// An entity annotation as seen from its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLoc {
    /// Sentence index within the file.
    pub sentence_id: usize,
    /// Word index within the sentence.
    pub word_id: usize,
    /// Annotated expression.
    pub expression: String,
    /// Annotation tag.
    pub tag: String,
}

/// Entity annotations of one annotator over one file, indexed both by
/// location and by entity id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEntities {
    /// Annotations keyed by (sentence, word) location.
    pub by_loc: BTreeMap<LocKey, Vec<EntitySpan>>,
    /// Annotations keyed by entity id.
    pub by_id: BTreeMap<String, Vec<EntityLoc>>,
}

/// Outcome of a location-level deletion cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionOutcome {
    /// Entity ids whose whole span was removed (header location deleted).
    pub fully_removed: Vec<String>,
    /// Entity ids that lost only the deleted location.
    pub partially_removed: Vec<String>,
    /// Number of token locations removed, including cascaded ones.
    pub tokens_removed: usize,
}

impl FileEntities {
    fn insert(&mut self, sentence_id: usize, word_id: usize, span: EntitySpan) {
        self.by_id
            .entry(span.entity_id.clone())
            .or_default()
            .push(EntityLoc {
                sentence_id,
                word_id,
                expression: span.expression.clone(),
                tag: span.tag.clone(),
            });
        self.by_loc
            .entry((sentence_id, word_id))
            .or_default()
            .push(span);
    }

    /// Deletes every annotation at `loc` and cascades.
    ///
    /// A header-tagged annotation takes its whole entity with it: the id is
    /// dropped from the id index and the remaining locations of the span are
    /// cleared. A continuation annotation removes only the one location from
    /// the id index; the entity itself survives.
    pub fn delete_at(&mut self, loc: LocKey) -> DeletionOutcome {
        let mut outcome = DeletionOutcome::default();
        let Some(spans) = self.by_loc.remove(&loc) else {
            return outcome;
        };
        for span in &spans {
            if is_header_tag(&span.tag) {
                outcome.fully_removed.push(span.entity_id.clone());
            } else {
                outcome.partially_removed.push(span.entity_id.clone());
            }
            outcome.tokens_removed += 1;
        }
        // Cascade fully-removed entities to their other locations.
        for eid in &outcome.fully_removed {
            let locs: Vec<LocKey> = self
                .by_id
                .remove(eid)
                .unwrap_or_default()
                .iter()
                .filter(|l| (l.sentence_id, l.word_id) != loc)
                .map(|l| (l.sentence_id, l.word_id))
                .collect();
            for other in locs {
                outcome.tokens_removed += 1;
                if let Some(entries) = self.by_loc.get_mut(&other) {
                    entries.retain(|s| &s.entity_id != eid);
                    if entries.is_empty() {
                        self.by_loc.remove(&other);
                    }
                }
            }
        }
        // Partially-removed entities lose just this location.
        for eid in &outcome.partially_removed {
            if let Some(entries) = self.by_id.get_mut(eid) {
                if let Some(pos) = entries
                    .iter()
                    .position(|l| (l.sentence_id, l.word_id) == loc)
                {
                    entries.remove(pos);
                }
            }
        }
        outcome
    }
}

/// Entity annotations of one annotator: file name to [`FileEntities`].
pub type EntityStore = BTreeMap<String, FileEntities>;

/// Entity annotations of the whole roster.
pub type EntityAnnotations = BTreeMap<Annotator, EntityStore>;

/// One entity annotation gathered over a sentence, tagged with its author.
///
/// This is the working form used by tree searches and filtering predicates,
/// where the annotations of every annotator are inspected side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentAnnotation {
    /// The annotator who produced the annotation.
    pub annotator: Annotator,
    /// Sentence index within the file.
    pub sentence_id: usize,
    /// Word index within the sentence.
    pub word_id: usize,
    /// Entity id.
    pub entity_id: String,
    /// Annotated expression.
    pub expression: String,
    /// Annotation tag.
    pub tag: String,
}

/// One temporal relation between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// First endpoint id.
    pub entity_a: String,
    /// Relation type (e.g. `BEFORE`, `SIMULTANEOUS`).
    pub relation: String,
    /// Second endpoint id (`t0` for relations to the creation time).
    pub entity_b: String,
    /// Free-form annotator comment.
    pub comment: String,
}

/// Relations of one annotator over one file, indexed under both endpoints.
pub type FileRelations = BTreeMap<String, Vec<Relation>>;

/// Relations of one annotator: file name to [`FileRelations`].
pub type RelationStore = BTreeMap<String, FileRelations>;

/// One relation layer over the whole roster.
pub type RelationLayer = BTreeMap<Annotator, RelationStore>;

/// The four parallel TLINK layers of the corpus.
#[derive(Debug, Clone, Default)]
pub struct TlinkCollections {
    /// Event-to-timex relations.
    pub event_timex: RelationLayer,
    /// Event-to-document-creation-time relations (endpoint `t0`).
    pub event_dct: RelationLayer,
    /// Relations between main events of adjacent sentences.
    pub main_events: RelationLayer,
    /// Relations between syntactically subordinated event pairs.
    pub sub_events: RelationLayer,
}

/// Flattens one annotator's relation store into a deduplicated
/// `(file, relation)` list, preserving first-seen order per file.
#[must_use]
pub fn relations_as_list(store: &RelationStore) -> Vec<(String, Relation)> {
    let mut out = Vec::new();
    for (file, by_entity) in store {
        let mut seen: Vec<&Relation> = Vec::new();
        for relations in by_entity.values() {
            for relation in relations {
                if !seen.contains(&relation) {
                    seen.push(relation);
                    out.push((file.clone(), relation.clone()));
                }
            }
        }
    }
    out
}

fn read_rows(path: &Path, expected_cols: usize, trim_line: bool) -> Result<Vec<Vec<String>>> {
    let file = File::open(path)
        .map_err(|e| Error::corpus(format!("cannot open {}: {e}", path.display())))?;
    let reader = BufReader::new(file);
    let mut rows = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with('#') {
            continue;
        }
        let body = if trim_line { line.trim_end() } else { line.as_str() };
        let items: Vec<String> = body.split('\t').map(str::to_string).collect();
        if items.len() != expected_cols {
            return Err(Error::parse(format!(
                "{}:{}: expected {} columns, found {}",
                path.display(),
                lineno + 1,
                expected_cols,
                items.len()
            )));
        }
        rows.push(items);
    }
    Ok(rows)
}

fn parse_id(value: &str, path: &Path) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        Error::parse(format!("{}: non-numeric id {value:?}", path.display()))
    })
}

/// Loads the base segmentation (7 columns per row). Sentences break whenever
/// the sentence id changes between consecutive rows.
pub fn load_base_segmentation(path: &Path) -> Result<BaseSegmentation> {
    let mut segmentation = BaseSegmentation::new();
    let mut last_sentence: Option<String> = None;
    for items in read_rows(path, 7, true)? {
        let file = items[0].clone();
        let sentences = segmentation.entry(file).or_default();
        if last_sentence.as_deref() != Some(items[1].as_str()) || sentences.is_empty() {
            sentences.push(Vec::new());
        }
        let token = Token {
            sentence_id: parse_id(&items[1], path)?,
            word_id: parse_id(&items[2], path)?,
            surface: items[3].clone(),
            morph: items[4].clone(),
            synt_id: items[5].clone(),
            synt_head: items[6].clone(),
        };
        sentences
            .last_mut()
            .ok_or_else(|| Error::invariant("no open sentence"))?
            .push(token);
        last_sentence = Some(items[1].clone());
    }
    Ok(segmentation)
}

/// Loads one entity annotation file (6 columns per row).
pub fn load_entity_annotation(path: &Path) -> Result<EntityStore> {
    let mut store = EntityStore::new();
    for items in read_rows(path, 6, true)? {
        let entities = store.entry(items[0].clone()).or_default();
        let sentence_id = parse_id(&items[1], path)?;
        let word_id = parse_id(&items[2], path)?;
        entities.insert(
            sentence_id,
            word_id,
            EntitySpan {
                entity_id: items[5].clone(),
                expression: items[3].clone(),
                tag: items[4].clone(),
            },
        );
    }
    Ok(store)
}

/// Loads document creation times (2 columns per row).
pub fn load_dct_annotation(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut dcts = BTreeMap::new();
    for items in read_rows(path, 2, true)? {
        dcts.insert(items[0].clone(), items[1].clone());
    }
    Ok(dcts)
}

/// Loads one entity-to-entity relation file (5 columns; only the trailing
/// comment column is whitespace-trimmed, so an empty comment is accepted).
pub fn load_relation_annotation(path: &Path) -> Result<RelationStore> {
    let mut store = RelationStore::new();
    for items in read_rows(path, 5, false)? {
        let relation = Relation {
            entity_a: items[1].clone(),
            relation: items[2].clone(),
            entity_b: items[3].clone(),
            comment: items[4].trim_end().to_string(),
        };
        let by_entity = store.entry(items[0].clone()).or_default();
        by_entity
            .entry(relation.entity_a.clone())
            .or_default()
            .push(relation.clone());
        by_entity
            .entry(relation.entity_b.clone())
            .or_default()
            .push(relation);
    }
    Ok(store)
}

/// Loads one entity-to-DCT relation file (4 columns). The second endpoint of
/// every relation is the synthetic creation-time entity `t0`.
pub fn load_relation_to_dct_annotation(path: &Path) -> Result<RelationStore> {
    let mut store = RelationStore::new();
    for items in read_rows(path, 4, false)? {
        let relation = Relation {
            entity_a: items[1].clone(),
            relation: items[2].clone(),
            entity_b: "t0".to_string(),
            comment: items[3].trim_end().to_string(),
        };
        store
            .entry(items[0].clone())
            .or_default()
            .entry(relation.entity_a.clone())
            .or_default()
            .push(relation);
    }
    Ok(store)
}

/// Entity annotations of the whole roster, EVENTs and TIMEXes separately.
#[derive(Debug, Clone, Default)]
pub struct CorpusEntities {
    /// EVENT annotations per annotator.
    pub events: EntityAnnotations,
    /// TIMEX annotations per annotator.
    pub timexes: EntityAnnotations,
}

/// Loads EVENT and TIMEX annotations of all four annotators.
pub fn load_all_entity_annotations(corpus_dir: &Path) -> Result<CorpusEntities> {
    let mut corpus = CorpusEntities::default();
    for annotator in Annotator::ALL {
        let suffix = annotator.file_suffix();
        let events = load_entity_annotation(
            &corpus_dir.join(format!("{EVENT_ANNOTATION_FILE}{suffix}")),
        )?;
        let timexes = load_entity_annotation(
            &corpus_dir.join(format!("{TIMEX_ANNOTATION_FILE}{suffix}")),
        )?;
        log::info!(
            "loaded {} event files, {} timex files for annotator {annotator}",
            events.len(),
            timexes.len()
        );
        corpus.events.insert(annotator, events);
        corpus.timexes.insert(annotator, timexes);
    }
    Ok(corpus)
}

/// Loads the four TLINK layers of all four annotators.
pub fn load_all_tlink_annotations(corpus_dir: &Path) -> Result<TlinkCollections> {
    let mut tlinks = TlinkCollections::default();
    for annotator in Annotator::ALL {
        let suffix = annotator.file_suffix();
        tlinks.event_timex.insert(
            annotator,
            load_relation_annotation(
                &corpus_dir.join(format!("{TLINK_EVENT_TIMEX_FILE}{suffix}")),
            )?,
        );
        tlinks.event_dct.insert(
            annotator,
            load_relation_to_dct_annotation(
                &corpus_dir.join(format!("{TLINK_EVENT_DCT_FILE}{suffix}")),
            )?,
        );
        tlinks.main_events.insert(
            annotator,
            load_relation_annotation(
                &corpus_dir.join(format!("{TLINK_MAIN_EVENTS_FILE}{suffix}")),
            )?,
        );
        tlinks.sub_events.insert(
            annotator,
            load_relation_annotation(
                &corpus_dir.join(format!("{TLINK_SUB_EVENTS_FILE}{suffix}")),
            )?,
        );
    }
    Ok(tlinks)
}
