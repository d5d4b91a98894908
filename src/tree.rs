//! Dependency forests over sentences.
//!
//! Each sentence yields a forest of dependency trees built from the
//! syntactic id / head id columns. Nodes live in an arena (`Vec`) and refer
//! to each other by index, so trees are plain data with no interior
//! mutability.

use crate::clause::{self, ClauseLabel};
use crate::corpus::{is_header_tag, SentAnnotation, Sentence};
use crate::error::{Error, Result};

/// Index of a node in its [`SentenceForest`] arena.
pub type NodeId = usize;

/// Relation of a node to the clause structure of its sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseRelation {
    /// The node is a tree root.
    Root,
    /// The node and its head sit in different clauses.
    BetweenClauses,
    /// The node and its head share a clause.
    InClause,
}

/// Entity kind selector for tagged tree searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// EVENT annotations.
    Event,
    /// TIMEX annotations.
    Timex,
}

impl EntityKind {
    /// The entity name as used in annotation tags and result tables.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Event => "EVENT",
            EntityKind::Timex => "TIMEX",
        }
    }

    /// Tests whether an annotation tag belongs to this entity kind.
    #[must_use]
    pub fn matches(&self, tag: &str) -> bool {
        tag.starts_with(self.name())
    }
}

/// One node of a dependency tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Syntactic id of the token.
    pub label: String,
    /// Word index of the token within its sentence.
    pub word_id: usize,
    /// Index of the token within its sentence.
    pub token_idx: usize,
    /// Parent node, if any.
    pub parent: Option<NodeId>,
    /// Child nodes, in attachment order.
    pub children: Vec<NodeId>,
    /// Clause relation of the node to its head, filled in by
    /// [`SentenceForest::add_clause_info`].
    pub clause_rel: Option<ClauseRelation>,
    /// True when the clause boundary between node and head is coordinating.
    pub coordinating: bool,
}

/// Dependency forest of one sentence.
#[derive(Debug, Clone, Default)]
pub struct SentenceForest {
    /// Node arena.
    pub nodes: Vec<TreeNode>,
    /// Root nodes (heads attached to the synthetic id `"0"`).
    pub roots: Vec<NodeId>,
}

impl SentenceForest {
    /// Builds the forest by breadth-first expansion from the synthetic root
    /// id `"0"`. Self-loops (tokens heading themselves) are skipped; a token
    /// whose head is already in the forest attaches under it, wherever that
    /// head sits.
    #[must_use]
    pub fn build(sentence: &Sentence) -> Self {
        let mut forest = SentenceForest::default();
        let mut queue: Vec<String> = vec!["0".to_string()];
        let mut qpos = 0;
        while qpos < queue.len() {
            let head = queue[qpos].clone();
            qpos += 1;
            for (token_idx, token) in sentence.iter().enumerate() {
                if token.synt_head != head || token.synt_id == token.synt_head {
                    continue;
                }
                let node_id = forest.nodes.len();
                forest.nodes.push(TreeNode {
                    label: token.synt_id.clone(),
                    word_id: token.word_id,
                    token_idx,
                    parent: None,
                    children: Vec::new(),
                    clause_rel: None,
                    coordinating: false,
                });
                if head == "0" {
                    forest.roots.push(node_id);
                } else if let Some(parent_id) =
                    forest.nodes[..node_id].iter().position(|n| n.label == head)
                {
                    forest.nodes[node_id].parent = Some(parent_id);
                    forest.nodes[parent_id].children.push(node_id);
                }
                queue.push(token.synt_id.clone());
            }
        }
        forest
    }

    /// Finds the node with the given syntactic id, searching the roots in
    /// order.
    #[must_use]
    pub fn find_node(&self, label: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.label == label)
    }

    /// Depth of the subtree under `node` (a leaf has depth 0).
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        self.nodes[node]
            .children
            .iter()
            .map(|&c| 1 + self.depth(c))
            .max()
            .unwrap_or(0)
    }

    /// Collects descendants of `node` whose word location carries an
    /// annotation of the given kind, visiting children breadth-before-depth
    /// and stopping at `depth_limit` levels (negative = unlimited).
    ///
    /// A child appears once per matching annotation, so a location
    /// annotated by several annotators may repeat. With `only_header`, only
    /// header-shaped tags count.
    #[must_use]
    pub fn tagged_subtrees(
        &self,
        node: NodeId,
        annotations: &[SentAnnotation],
        kind: EntityKind,
        depth_limit: i32,
        only_header: bool,
    ) -> Vec<NodeId> {
        let mut found = Vec::new();
        if depth_limit == 0 {
            return found;
        }
        for &child in &self.nodes[node].children {
            for ann in annotations {
                if ann.word_id != self.nodes[child].word_id {
                    continue;
                }
                if only_header && !is_header_tag(&ann.tag) {
                    continue;
                }
                if kind.matches(&ann.tag) {
                    found.push(child);
                }
            }
        }
        for &child in &self.nodes[node].children {
            found.extend(self.tagged_subtrees(child, annotations, kind, depth_limit - 1, only_header));
        }
        found
    }

    /// Collects ancestors of `node` annotated with the given kind, walking
    /// up at most `height_limit` levels (negative = unlimited).
    #[must_use]
    pub fn tagged_parents(
        &self,
        node: NodeId,
        annotations: &[SentAnnotation],
        kind: EntityKind,
        height_limit: i32,
        only_header: bool,
    ) -> Vec<NodeId> {
        let mut found = Vec::new();
        if height_limit == 0 {
            return found;
        }
        let Some(parent) = self.nodes[node].parent else {
            return found;
        };
        for ann in annotations {
            if ann.word_id != self.nodes[parent].word_id {
                continue;
            }
            if only_header && !is_header_tag(&ann.tag) {
                continue;
            }
            if kind.matches(&ann.tag) {
                found.push(parent);
            }
        }
        found.extend(self.tagged_parents(parent, annotations, kind, height_limit - 1, only_header));
        found
    }

    /// Classifies every node against the clause structure of the sentence:
    /// roots, nodes whose head is in the same clause, and nodes whose head
    /// sits across a clause boundary (further split into coordinating and
    /// subordinating boundaries).
    pub fn add_clause_info(&mut self, sentence: &Sentence, labels: &[ClauseLabel]) {
        for id in 0..self.nodes.len() {
            let Some(parent) = self.nodes[id].parent else {
                self.nodes[id].clause_rel = Some(ClauseRelation::Root);
                continue;
            };
            let node_label = self.nodes[id].label.clone();
            let parent_label = self.nodes[parent].label.clone();
            if clause::in_different_clauses(sentence, &node_label, &parent_label, labels, false) {
                self.nodes[id].clause_rel = Some(ClauseRelation::BetweenClauses);
                // A boundary that disappears in subordination-only mode was
                // purely coordinating.
                self.nodes[id].coordinating = !clause::in_different_clauses(
                    sentence,
                    &node_label,
                    &parent_label,
                    labels,
                    true,
                );
            } else {
                self.nodes[id].clause_rel = Some(ClauseRelation::InClause);
            }
        }
    }
}

/// Builds the forests of every sentence of a file and annotates them with
/// clause information.
pub fn build_annotated_forests(sentences: &[Sentence]) -> Result<Vec<SentenceForest>> {
    let mut forests = Vec::with_capacity(sentences.len());
    for sentence in sentences {
        let labels = clause::clause_labels(sentence);
        if labels.len() != sentence.len() {
            return Err(Error::invariant("clause labels out of step with sentence"));
        }
        let mut forest = SentenceForest::build(sentence);
        forest.add_clause_info(sentence, &labels);
        forests.push(forest);
    }
    Ok(forests)
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

    fn ann(word_id: usize, entity_id: &str, tag: &str) -> SentAnnotation {
        SentAnnotation {
            annotator: Annotator::Judge,
            sentence_id: 0,
            word_id,
            entity_id: entity_id.to_string(),
            expression: String::new(),
            tag: tag.to_string(),
        }
    }

    //        tuli(2)
    //       /    \
    //  mees(1)   eile(3)
    fn simple_sentence() -> Sentence {
        vec![
            token(0, "Mees", r#""mees" L0 S com sg nom @SUBJ"#, "1", "2"),
            token(1, "tuli", r#""tule" Li V main indic impf ps3 sg ps af @FMV"#, "2", "0"),
            token(2, "eile", r#""eile" L0 D @ADVL"#, "3", "2"),
        ]
    }

    #[test]
    fn test_build_simple_forest() {
        let forest = SentenceForest::build(&simple_sentence());
        assert_eq!(forest.roots.len(), 1);
        let root = forest.roots[0];
        assert_eq!(forest.nodes[root].label, "2");
        let mut children: Vec<&str> = forest.nodes[root]
            .children
            .iter()
            .map(|&c| forest.nodes[c].label.as_str())
            .collect();
        children.sort_unstable();
        assert_eq!(children, vec!["1", "3"]);
        assert_eq!(forest.depth(root), 1);
    }

    #[test]
    fn test_self_loop_is_skipped() {
        let mut sentence = simple_sentence();
        sentence.push(token(3, "!", r#""!" Z Exc"#, "4", "4"));
        let forest = SentenceForest::build(&sentence);
        assert!(forest.find_node("4").is_none());
    }

    #[test]
    fn test_tagged_subtrees_header_only() {
        let sentence = simple_sentence();
        let forest = SentenceForest::build(&sentence);
        let root = forest.roots[0];
        let annotations = vec![
            ann(0, "e1", "EVENT OCCURRENCE"),
            ann(2, "t1", "TIMEX DATE eile"),
            ann(2, "t2", "TIMEX"), // continuation tag, skipped by header-only
        ];
        let events = forest.tagged_subtrees(root, &annotations, EntityKind::Event, -1, true);
        assert_eq!(events.len(), 1);
        assert_eq!(forest.nodes[events[0]].word_id, 0);
        let timexes = forest.tagged_subtrees(root, &annotations, EntityKind::Timex, -1, true);
        assert_eq!(timexes.len(), 1);
        assert_eq!(forest.nodes[timexes[0]].word_id, 2);
    }

    #[test]
    fn test_tagged_subtrees_depth_limit() {
        // chain 2 -> 1 -> 3
        let sentence = vec![
            token(0, "a", r#""a" L0 S com sg nom @SUBJ"#, "1", "2"),
            token(1, "b", r#""b" Li V main indic impf ps af @FMV"#, "2", "0"),
            token(2, "c", r#""c" L0 S com sg gen @ADVL"#, "3", "1"),
        ];
        let forest = SentenceForest::build(&sentence);
        let root = forest.roots[0];
        let annotations = vec![ann(2, "e1", "EVENT OCCURRENCE")];
        assert!(forest
            .tagged_subtrees(root, &annotations, EntityKind::Event, 1, true)
            .is_empty());
        assert_eq!(
            forest
                .tagged_subtrees(root, &annotations, EntityKind::Event, 2, true)
                .len(),
            1
        );
    }

    #[test]
    fn test_tagged_parents() {
        let sentence = simple_sentence();
        let forest = SentenceForest::build(&sentence);
        let child = forest.find_node("1").unwrap();
        let annotations = vec![ann(1, "e1", "EVENT REPORTING")];
        let parents = forest.tagged_parents(child, &annotations, EntityKind::Event, -1, true);
        assert_eq!(parents.len(), 1);
        assert_eq!(forest.nodes[parents[0]].label, "2");
    }

    #[test]
    fn test_clause_info_between_clauses() {
        // "Mees tuli , sest ta lahkus" with lahkus headed by tuli
        let sentence = vec![
            token(0, "Mees", r#""mees" L0 S com sg nom @SUBJ"#, "1", "2"),
            token(1, "tuli", r#""tule" Li V main indic impf ps3 sg ps af @FMV"#, "2", "0"),
            token(2, ",", r#""," Z Com CLB"#, "3", "2"),
            token(3, "ta", r#""tema" L0 P pers ps3 sg nom @SUBJ"#, "4", "5"),
            token(4, "lahkus", r#""lahku" Ls V main indic impf ps3 sg ps af @FMV"#, "5", "2"),
        ];
        let labels = clause::clause_labels(&sentence);
        let mut forest = SentenceForest::build(&sentence);
        forest.add_clause_info(&sentence, &labels);
        let root = forest.roots[0];
        assert_eq!(forest.nodes[root].clause_rel, Some(ClauseRelation::Root));
        let subj = forest.find_node("1").unwrap();
        assert_eq!(forest.nodes[subj].clause_rel, Some(ClauseRelation::InClause));
        let second_verb = forest.find_node("5").unwrap();
        assert_eq!(
            forest.nodes[second_verb].clause_rel,
            Some(ClauseRelation::BetweenClauses)
        );
        // a plain CLB is subordinating
        assert!(!forest.nodes[second_verb].coordinating);
    }
}
