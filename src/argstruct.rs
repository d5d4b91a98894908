//! Sentence-internal event-to-event argument structures.
//!
//! TimeML event classes like REPORTING or MODAL normally take another event
//! as an argument. This module suggests those argument structures from the
//! dependency forest: direct event children of an argument-demanding event,
//! or, failing that, an event parent within the same clause. The results are
//! deliberately over-generating; downstream filters decide what to keep.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::clause::{self, ClauseLabel};
use crate::corpus::{SentAnnotation, Sentence};
use crate::error::{Error, Result};
use crate::tree::{EntityKind, NodeId, SentenceForest};

static EVENT_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^EVENT\s+([A-Z_]+)").unwrap());

/// TimeML classes that demand an event argument.
pub const ARG_DEMANDING_CLASSES: [&str; 6] = [
    "REPORTING",
    "I_ACTION",
    "ASPECTUAL",
    "I_STATE",
    "PERCEPTION",
    "MODAL",
];

/// Extracts the event class from an EVENT header tag.
#[must_use]
pub fn event_class(tag: &str) -> Option<&str> {
    EVENT_HEADER_RE
        .captures(tag)
        .and_then(|c| c.get(1))
        .map(|m| &tag[m.range()])
}

/// One suggested argument structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgStructure {
    /// True when every argument is also a syntactic child of the head; false
    /// when the argument was actually found as the syntactic parent.
    pub syntax_consistent: bool,
    /// Node of the argument-demanding event.
    pub head: NodeId,
    /// Nodes of the suggested argument events.
    pub args: Vec<NodeId>,
}

/// Options for [`event_arg_structures`].
#[derive(Debug, Clone, Copy)]
pub struct ArgStructOptions {
    /// Drop arguments that sit in a different clause than the head.
    pub only_intra_clause: bool,
    /// Consider every event class a potential head, not just the
    /// argument-demanding ones.
    pub use_all_classes: bool,
    /// When no direct child qualifies, accept a single deeper descendant.
    pub only_depth_one: bool,
}

impl Default for ArgStructOptions {
    fn default() -> Self {
        ArgStructOptions {
            only_intra_clause: false,
            use_all_classes: false,
            only_depth_one: true,
        }
    }
}

fn keep_direct_children(
    forest: &SentenceForest,
    head: NodeId,
    candidates: Vec<NodeId>,
    only_depth_one: bool,
) -> Vec<NodeId> {
    let direct: Vec<NodeId> = candidates
        .iter()
        .copied()
        .filter(|&c| forest.nodes[c].parent == Some(head))
        .collect();
    if !direct.is_empty() {
        return direct;
    }
    // Nothing directly below: a lone deeper descendant may still be the
    // intended argument.
    if (only_depth_one && candidates.len() == 1) || (!only_depth_one && !candidates.is_empty()) {
        candidates
    } else {
        Vec::new()
    }
}

/// Finds the argument structures of all (argument-demanding) events of a
/// sentence, based on the given annotations.
pub fn event_arg_structures(
    sentence: &Sentence,
    forest: &SentenceForest,
    annotations: &[SentAnnotation],
    labels: &[ClauseLabel],
    options: ArgStructOptions,
) -> Result<Vec<ArgStructure>> {
    // 1) Locate argument-demanding events and their tree nodes.
    let mut heads: Vec<(NodeId, String)> = Vec::new();
    for token in sentence {
        for ann in annotations.iter().filter(|a| a.word_id == token.word_id) {
            let Some(class) = event_class(&ann.tag) else {
                continue;
            };
            if ARG_DEMANDING_CLASSES.contains(&class) || options.use_all_classes {
                let node = forest.find_node(&token.synt_id).ok_or_else(|| {
                    Error::invariant(format!(
                        "no tree node for syntactic id {}",
                        token.synt_id
                    ))
                })?;
                heads.push((node, class.to_string()));
            }
        }
    }
    // 2) Collect argument candidates for each head.
    let mut structures = Vec::new();
    for (head, class) in heads {
        let below = forest.tagged_subtrees(head, annotations, EntityKind::Event, -1, true);
        if !below.is_empty() {
            let args = keep_direct_children(forest, head, below, options.only_depth_one);
            structures.push(ArgStructure {
                syntax_consistent: true,
                head,
                args,
            });
            continue;
        }
        // No event below: try the syntactic parents, staying in the clause.
        let above = forest.tagged_parents(head, annotations, EntityKind::Event, -1, true);
        let mut added = false;
        if ARG_DEMANDING_CLASSES.contains(&class.as_str()) {
            for parent in above {
                let head_label = &forest.nodes[head].label;
                let parent_label = &forest.nodes[parent].label;
                if clause::in_different_clauses(sentence, head_label, parent_label, labels, false) {
                    continue;
                }
                let amongst_children = forest.nodes[parent].children.contains(&head);
                if amongst_children {
                    structures.push(ArgStructure {
                        syntax_consistent: false,
                        head,
                        args: vec![parent],
                    });
                    added = true;
                    break;
                }
            }
        }
        if !added {
            structures.push(ArgStructure {
                syntax_consistent: false,
                head,
                args: Vec::new(),
            });
        }
    }
    // 3) Optionally keep only same-clause arguments.
    if options.only_intra_clause {
        for structure in &mut structures {
            let head_label = forest.nodes[structure.head].label.clone();
            structure.args.retain(|&arg| {
                !clause::in_different_clauses(
                    sentence,
                    &head_label,
                    &forest.nodes[arg].label,
                    labels,
                    false,
                )
            });
        }
    }
    Ok(structures)
}

/// Re-roots argument structures of multi-word events.
///
/// A multi-word head may have picked up its own continuation tokens as
/// arguments; those are dropped, and the event children of the other parts
/// of the multi-word span are pulled in instead.
pub fn fix_multiword_arg_structures(
    sentence: &Sentence,
    forest: &SentenceForest,
    annotations: &[SentAnnotation],
    structures: Vec<ArgStructure>,
    only_depth_one: bool,
) -> Result<Vec<ArgStructure>> {
    let mut fixed = Vec::new();
    for structure in structures {
        let head_word = forest.nodes[structure.head].word_id;
        let mw_anns: Vec<&SentAnnotation> = annotations
            .iter()
            .filter(|a| {
                a.word_id == head_word
                    && event_class(&a.tag).is_some()
                    && a.expression.contains(' ')
            })
            .collect();
        if mw_anns.is_empty() {
            fixed.push(structure);
            continue;
        }
        for mw in mw_anns {
            // Locate the other parts of the multi-word span.
            let mut other_labels: Vec<String> = Vec::new();
            for other in annotations
                .iter()
                .filter(|a| a.word_id != mw.word_id && a.entity_id == mw.entity_id)
            {
                for token in sentence {
                    if token.word_id == other.word_id {
                        other_labels.push(token.synt_id.clone());
                    }
                }
            }
            if other_labels.is_empty() {
                return Err(Error::invariant(format!(
                    "no continuation parts found for multi-word event {}",
                    mw.entity_id
                )));
            }
            let mut rebuilt = ArgStructure {
                syntax_consistent: structure.syntax_consistent,
                head: structure.head,
                args: structure
                    .args
                    .iter()
                    .copied()
                    .filter(|&a| !other_labels.contains(&forest.nodes[a].label))
                    .collect(),
            };
            // Adopt the event children of the other parts.
            for label in &other_labels {
                let part = forest.find_node(label).ok_or_else(|| {
                    Error::invariant(format!("no tree node for syntactic id {label}"))
                })?;
                let below =
                    forest.tagged_subtrees(part, annotations, EntityKind::Event, -1, true);
                if !below.is_empty() {
                    rebuilt
                        .args
                        .extend(keep_direct_children(forest, part, below, only_depth_one));
                }
            }
            fixed.push(rebuilt);
        }
    }
    Ok(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Annotator, Token};

    fn token(word_id: usize, surface: &str, morph: &str, synt_id: &str, head: &str) -> Token {
        Token {
            sentence_id: 0,
            word_id,
            surface: surface.to_string(),
            morph: morph.to_string(),
            synt_id: synt_id.to_string(),
            synt_head: head.to_string(),
        }
    }

    fn ann(word_id: usize, entity_id: &str, expr: &str, tag: &str) -> SentAnnotation {
        SentAnnotation {
            annotator: Annotator::Judge,
            sentence_id: 0,
            word_id,
            entity_id: entity_id.to_string(),
            expression: expr.to_string(),
            tag: tag.to_string(),
        }
    }

    // "ütles , et lahkus": REPORTING verb governing a subordinate event
    fn reporting_sentence() -> Sentence {
        vec![
            token(0, "ütles", r#""ütle" Ls V main indic impf ps3 sg ps af @FMV"#, "1", "0"),
            token(1, ",", r#""," Z Com CLB"#, "2", "1"),
            token(2, "et", r#""et" L0 J sub @J"#, "3", "4"),
            token(3, "lahkus", r#""lahku" Ls V main indic impf ps3 sg ps af @FMV"#, "4", "1"),
        ]
    }

    #[test]
    fn test_event_class_extraction() {
        assert_eq!(event_class("EVENT REPORTING"), Some("REPORTING"));
        assert_eq!(event_class("EVENT I_STATE some note"), Some("I_STATE"));
        assert_eq!(event_class("TIMEX DATE"), None);
        assert_eq!(event_class("EVENT"), None);
    }

    #[test]
    fn test_direct_child_argument() {
        let sentence = reporting_sentence();
        let forest = SentenceForest::build(&sentence);
        let labels = clause::clause_labels(&sentence);
        let annotations = vec![
            ann(0, "e1", "ütles", "EVENT REPORTING"),
            ann(3, "e2", "lahkus", "EVENT OCCURRENCE"),
        ];
        let structures = event_arg_structures(
            &sentence,
            &forest,
            &annotations,
            &labels,
            ArgStructOptions::default(),
        )
        .unwrap();
        assert_eq!(structures.len(), 1);
        assert!(structures[0].syntax_consistent);
        assert_eq!(forest.nodes[structures[0].head].word_id, 0);
        assert_eq!(structures[0].args.len(), 1);
        assert_eq!(forest.nodes[structures[0].args[0]].word_id, 3);
    }

    #[test]
    fn test_parent_argument_marks_syntax_mismatch() {
        // MODAL event whose only related event is its syntactic parent
        let sentence = vec![
            token(0, "lahkus", r#""lahku" Ls V main indic impf ps3 sg ps af @FMV"#, "1", "0"),
            token(1, "võis", r#""või" Ls V mod indic impf ps3 sg ps af @IMV"#, "2", "1"),
        ];
        let forest = SentenceForest::build(&sentence);
        let labels = clause::clause_labels(&sentence);
        let annotations = vec![
            ann(0, "e1", "lahkus", "EVENT OCCURRENCE"),
            ann(1, "e2", "võis", "EVENT MODAL"),
        ];
        let structures = event_arg_structures(
            &sentence,
            &forest,
            &annotations,
            &labels,
            ArgStructOptions::default(),
        )
        .unwrap();
        // e2 (MODAL) resolves through its parent; e1 is not arg-demanding
        assert_eq!(structures.len(), 1);
        assert!(!structures[0].syntax_consistent);
        assert_eq!(forest.nodes[structures[0].head].word_id, 1);
        assert_eq!(structures[0].args.len(), 1);
        assert_eq!(forest.nodes[structures[0].args[0]].word_id, 0);
    }

    #[test]
    fn test_use_all_classes_takes_every_event() {
        let sentence = reporting_sentence();
        let forest = SentenceForest::build(&sentence);
        let labels = clause::clause_labels(&sentence);
        let annotations = vec![
            ann(0, "e1", "ütles", "EVENT REPORTING"),
            ann(3, "e2", "lahkus", "EVENT OCCURRENCE"),
        ];
        let options = ArgStructOptions { use_all_classes: true, ..Default::default() };
        let structures =
            event_arg_structures(&sentence, &forest, &annotations, &labels, options).unwrap();
        assert_eq!(structures.len(), 2);
    }

    #[test]
    fn test_multiword_fix_adopts_other_parts() {
        // "võttis vastu" multi-word head; its continuation governs an event
        let sentence = vec![
            token(0, "võttis", r#""võt" Lis V main indic impf ps3 sg ps af @FMV"#, "1", "0"),
            token(1, "vastu", r#""vastu" L0 K post @ADVL"#, "2", "1"),
            token(2, "otsuse", r#""otsus" L0 S com sg gen @OBJ"#, "3", "2"),
        ];
        let forest = SentenceForest::build(&sentence);
        let labels = clause::clause_labels(&sentence);
        let annotations = vec![
            ann(0, "e1", "võttis vastu", "EVENT ASPECTUAL"),
            ann(1, "e1", "võttis vastu", "EVENT"),
            ann(2, "e2", "otsuse", "EVENT OCCURRENCE"),
        ];
        let structures = event_arg_structures(
            &sentence,
            &forest,
            &annotations,
            &labels,
            ArgStructOptions::default(),
        )
        .unwrap();
        let fixed =
            fix_multiword_arg_structures(&sentence, &forest, &annotations, structures, true)
                .unwrap();
        assert_eq!(fixed.len(), 1);
        let arg_words: Vec<usize> =
            fixed[0].args.iter().map(|&a| forest.nodes[a].word_id).collect();
        // the continuation token itself is not an argument, but the event
        // below it is
        assert!(!arg_words.contains(&1));
        assert!(arg_words.contains(&2));
    }
}
