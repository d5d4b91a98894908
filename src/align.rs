//! Alignment of entity annotations between two annotators.
//!
//! Two annotations align when they cover at least one identical
//! (sentence, word) location. Ties between overlapping candidates are broken
//! by a [`TieBreak`] policy; [`TieBreak::None`] keeps every candidate and so
//! produces one-to-many mappings.

use std::collections::{BTreeMap, BTreeSet};

use crate::corpus::EntityLoc;

/// How to choose among multiple aligned candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// Keep every overlapping candidate.
    None,
    /// Keep the first overlapping candidate (ids are visited in sorted order).
    First,
    /// Keep the candidate with the largest token overlap; earlier candidates
    /// win ties.
    Largest,
}

/// Mapping from entity ids of one annotator to entity ids of another.
pub type Mapping = BTreeMap<String, Vec<String>>;

fn word_overlap(a: &[EntityLoc], b: &[EntityLoc]) -> Option<usize> {
    let exact = a.iter().any(|la| {
        b.iter()
            .any(|lb| la.sentence_id == lb.sentence_id && la.word_id == lb.word_id)
    });
    if !exact {
        return None;
    }
    let words_a: BTreeSet<usize> = a.iter().map(|l| l.word_id).collect();
    let words_b: BTreeSet<usize> = b.iter().map(|l| l.word_id).collect();
    Some(words_a.intersection(&words_b).count())
}

fn map_one_direction(
    from: &BTreeMap<String, Vec<EntityLoc>>,
    to: &BTreeMap<String, Vec<EntityLoc>>,
    tie: TieBreak,
    force_unique: bool,
) -> Mapping {
    let mut mapping: Mapping = from.keys().map(|id| (id.clone(), Vec::new())).collect();
    let mut used: BTreeSet<&str> = BTreeSet::new();
    for (from_id, from_locs) in from {
        let mut biggest_overlap = 0usize;
        for (to_id, to_locs) in to {
            if force_unique && used.contains(to_id.as_str()) {
                continue;
            }
            let slot = &mapping[from_id];
            if slot.contains(to_id) {
                continue;
            }
            let Some(overlap) = word_overlap(from_locs, to_locs) else {
                continue;
            };
            match tie {
                TieBreak::None => {
                    if let Some(slot) = mapping.get_mut(from_id) {
                        slot.push(to_id.clone());
                    }
                }
                TieBreak::First => {
                    if let Some(slot) = mapping.get_mut(from_id) {
                        slot.push(to_id.clone());
                    }
                    used.insert(to_id);
                    break;
                }
                TieBreak::Largest => {
                    if overlap > biggest_overlap {
                        biggest_overlap = overlap;
                        let slot = mapping.get_mut(from_id);
                        if let Some(slot) = slot {
                            if slot.is_empty() {
                                slot.push(to_id.clone());
                            } else {
                                slot[0] = to_id.clone();
                            }
                        }
                        // a displaced candidate stays used; it has been
                        // considered and must not bind elsewhere
                        used.insert(to_id);
                    }
                }
            }
        }
    }
    mapping
}

/// Aligns a suggested annotation set against a reference set, in both
/// directions.
///
/// Returns `(suggestion_to_reference, reference_to_suggestion)`. Ids without
/// any aligned counterpart map to an empty list.
#[must_use]
pub fn find_annotation_mappings(
    suggestion: &BTreeMap<String, Vec<EntityLoc>>,
    reference: &BTreeMap<String, Vec<EntityLoc>>,
    tie: TieBreak,
    force_unique: bool,
) -> (Mapping, Mapping) {
    let sug_to_ref = map_one_direction(suggestion, reference, tie, force_unique);
    let ref_to_sug = map_one_direction(reference, suggestion, tie, force_unique);
    (sug_to_ref, ref_to_sug)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(sentence_id: usize, word_id: usize) -> EntityLoc {
        EntityLoc {
            sentence_id,
            word_id,
            expression: "x".to_string(),
            tag: "EVENT OCCURRENCE".to_string(),
        }
    }

    fn store(entries: &[(&str, &[(usize, usize)])]) -> BTreeMap<String, Vec<EntityLoc>> {
        entries
            .iter()
            .map(|(id, locs)| {
                (
                    (*id).to_string(),
                    locs.iter().map(|&(s, w)| loc(s, w)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_no_tiebreak_keeps_all_candidates() {
        let sug = store(&[("s1", &[(0, 1), (0, 2)])]);
        let reference = store(&[("r1", &[(0, 1)]), ("r2", &[(0, 2)])]);
        let (s2r, r2s) = find_annotation_mappings(&sug, &reference, TieBreak::None, false);
        assert_eq!(s2r["s1"], vec!["r1".to_string(), "r2".to_string()]);
        assert_eq!(r2s["r1"], vec!["s1".to_string()]);
        assert_eq!(r2s["r2"], vec!["s1".to_string()]);
    }

    #[test]
    fn test_first_takes_first_in_sorted_order() {
        let sug = store(&[("s1", &[(0, 1), (0, 2)])]);
        let reference = store(&[("r1", &[(0, 2)]), ("r2", &[(0, 1), (0, 2)])]);
        let (s2r, _) = find_annotation_mappings(&sug, &reference, TieBreak::First, false);
        assert_eq!(s2r["s1"], vec!["r1".to_string()]);
    }

    #[test]
    fn test_largest_prefers_bigger_overlap() {
        let sug = store(&[("s1", &[(0, 1), (0, 2), (0, 3)])]);
        let reference = store(&[("r1", &[(0, 1)]), ("r2", &[(0, 2), (0, 3)])]);
        let (s2r, _) = find_annotation_mappings(&sug, &reference, TieBreak::Largest, false);
        assert_eq!(s2r["s1"], vec!["r2".to_string()]);
    }

    #[test]
    fn test_largest_keeps_first_on_tie() {
        let sug = store(&[("s1", &[(0, 1), (0, 2)])]);
        let reference = store(&[("r1", &[(0, 1)]), ("r2", &[(0, 2)])]);
        let (s2r, _) = find_annotation_mappings(&sug, &reference, TieBreak::Largest, false);
        assert_eq!(s2r["s1"], vec!["r1".to_string()]);
    }

    #[test]
    fn test_force_unique_skips_used_targets() {
        let sug = store(&[("s1", &[(0, 1)]), ("s2", &[(0, 1)])]);
        let reference = store(&[("r1", &[(0, 1)])]);
        let (s2r, _) = find_annotation_mappings(&sug, &reference, TieBreak::First, true);
        assert_eq!(s2r["s1"], vec!["r1".to_string()]);
        assert!(s2r["s2"].is_empty());
    }

    #[test]
    fn test_no_shared_location_means_no_mapping() {
        let sug = store(&[("s1", &[(0, 1)])]);
        let reference = store(&[("r1", &[(1, 1)])]);
        let (s2r, r2s) = find_annotation_mappings(&sug, &reference, TieBreak::Largest, false);
        assert!(s2r["s1"].is_empty());
        assert!(r2s["r1"].is_empty());
    }
}
