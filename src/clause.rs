//! Clause boundary detection and clause-level predicate structure.
//!
//! Estonian CG annotation marks clause boundaries (`CLB`) and cleft
//! punctuation (`CLBC` on parentheses) directly in the morphosyntactic tags.
//! This module turns those markers into per-token [`ClauseLabel`]s and builds
//! the predicate structure (verb chains) of the clause around a given token.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::corpus::Token;
use crate::error::{Error, Result};
use crate::morph;

static FIN_VERB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(@FMV|@FCV)").unwrap());
static CLEFT_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""\("\sZ\sOpr\sCLBC\sCLB"#).unwrap());
static CLEFT_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""\)"\sZ\sCpr\sCLBC\sCLB"#).unwrap());
static CLB_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\sCLB\sCLO(\s|$)").unwrap());
static CLB_CLOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\sCLB\sCLC(\s|$)").unwrap());
static CRD_CLB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\scrd\sCLB(\s|$)").unwrap());
static CLB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\sCLB(\s|$)").unwrap());
static VERB_CHAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@(NEG|FMV|FCV|IMV|ICV)").unwrap());

/// Per-token clause label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseLabel {
    /// Regular token.
    None,
    /// Finite main verb (`@FMV`).
    Fmv,
    /// Finite verb of a catenative construction (`@FCV`).
    Fcv,
    /// Plain clause boundary.
    Clb,
    /// Cleft-clause opening boundary (`CLB CLO`).
    ClbOpen,
    /// Cleft-clause closing boundary (`CLB CLC`).
    ClbClose,
    /// Coordinating clause boundary (`crd CLB`).
    CrdClb,
    /// Coordinating boundary with a finite verb on both sides (`crd CLB+`).
    CrdClbPlus,
}

impl ClauseLabel {
    /// True for the finite-verb labels.
    #[must_use]
    pub fn is_finite_verb(&self) -> bool {
        matches!(self, ClauseLabel::Fmv | ClauseLabel::Fcv)
    }

    /// True for any label carrying a clause-boundary marker.
    #[must_use]
    pub fn is_boundary(&self) -> bool {
        matches!(
            self,
            ClauseLabel::Clb
                | ClauseLabel::ClbOpen
                | ClauseLabel::ClbClose
                | ClauseLabel::CrdClb
                | ClauseLabel::CrdClbPlus
        )
    }

    /// True for the labels that delimit the clause window when locating a
    /// predicate structure (plain `crd CLB` does not).
    #[must_use]
    pub fn bounds_clause(&self) -> bool {
        matches!(
            self,
            ClauseLabel::Clb | ClauseLabel::ClbOpen | ClauseLabel::ClbClose | ClauseLabel::CrdClbPlus
        )
    }
}

/// Labels each token of a sentence as a finite verb, a clause boundary, or
/// neither.
///
/// A finite-verb syntactic function wins over a boundary marker on the same
/// token. Cleft parentheses carrying `CLBC CLB` are rewritten to open/close
/// markers before the boundary patterns are tried. A trailing pass upgrades
/// `crd CLB` to `crd CLB+` when a finite verb occurs on both sides with only
/// unlabeled tokens in between.
#[must_use]
pub fn clause_labels(sentence: &[Token]) -> Vec<ClauseLabel> {
    let mut labels: Vec<ClauseLabel> = sentence
        .iter()
        .map(|token| {
            if let Some(func) = morph::syntactic_function(&token.morph) {
                if let Some(caps) = FIN_VERB_RE.captures(func) {
                    return match caps.get(1).map(|m| m.as_str()) {
                        Some("@FMV") => ClauseLabel::Fmv,
                        _ => ClauseLabel::Fcv,
                    };
                }
            }
            let rewritten = CLEFT_OPEN_RE.replace_all(&token.morph, r#""(" Z Opr CLBC CLO"#);
            let rewritten = CLEFT_CLOSE_RE.replace_all(&rewritten, r#"")" Z Cpr CLBC CLC"#);
            if CLB_OPEN_RE.is_match(&rewritten) {
                ClauseLabel::ClbOpen
            } else if CLB_CLOSE_RE.is_match(&rewritten) {
                ClauseLabel::ClbClose
            } else if CRD_CLB_RE.is_match(&rewritten) {
                ClauseLabel::CrdClb
            } else if CLB_RE.is_match(&rewritten) {
                ClauseLabel::Clb
            } else {
                ClauseLabel::None
            }
        })
        .collect();
    for i in 0..labels.len() {
        if labels[i] != ClauseLabel::CrdClb {
            continue;
        }
        let precedes = labels[..i]
            .iter()
            .rev()
            .find(|l| **l != ClauseLabel::None)
            .is_some_and(ClauseLabel::is_finite_verb);
        let follows = labels[i + 1..]
            .iter()
            .find(|l| **l != ClauseLabel::None)
            .is_some_and(ClauseLabel::is_finite_verb);
        if precedes && follows {
            labels[i] = ClauseLabel::CrdClbPlus;
        }
    }
    labels
}

/// Decides whether the tokens with syntactic ids `label1` and `label2` sit in
/// different clauses of the sentence.
///
/// Scans left to right; once the first of the two tokens is found, boundary
/// labels at cleft depth zero set the separation flag. Plain `crd CLB` never
/// separates; `crd CLB+` separates unless `only_subordination` is set (an
/// upgraded boundary still marks coordination, not subordination). Reaching
/// the second token inside an open cleft also counts as a separation.
#[must_use]
pub fn in_different_clauses(
    sentence: &[Token],
    label1: &str,
    label2: &str,
    labels: &[ClauseLabel],
    only_subordination: bool,
) -> bool {
    let mut second_label: Option<&str> = None;
    let mut clb_seen = false;
    let mut cleft_depth: i32 = 0;
    for (j, token) in sentence.iter().enumerate() {
        match second_label {
            None => {
                if token.synt_id == label1 {
                    second_label = Some(label2);
                } else if token.synt_id == label2 {
                    second_label = Some(label1);
                }
            }
            Some(target) => {
                match labels[j] {
                    ClauseLabel::ClbOpen => cleft_depth += 1,
                    ClauseLabel::ClbClose => cleft_depth -= 1,
                    label if label.is_boundary() && cleft_depth == 0 => {
                        if label != ClauseLabel::CrdClb
                            && !(only_subordination && label == ClauseLabel::CrdClbPlus)
                        {
                            clb_seen = true;
                        }
                    }
                    _ => {}
                }
                if token.synt_id == target {
                    if cleft_depth != 0 {
                        clb_seen = true;
                    }
                    return clb_seen;
                }
            }
        }
    }
    false
}

/// Predicate structure of the clause around a token: one or more verb
/// chains, each a list of token indices into the sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateStructure {
    /// Verb chains in canonical order.
    pub chains: Vec<Vec<usize>>,
    /// True when more than one finite verb forced the chain to be split.
    pub grouped: bool,
}

/// Finds the predicate structure (`@NEG`, `@FMV`, `@FCV`, `@IMV`, `@ICV`
/// tokens) of the clause containing the token with syntactic id
/// `label_to_find`.
///
/// The clause window is delimited by `CLB`, `CLB CLO`, `CLB CLC` and
/// `crd CLB+` labels. With more than one finite verb inside the window the
/// chain is split heuristically into per-clause groups.
pub fn predicate_structure(
    sentence: &[Token],
    label_to_find: &str,
    labels: &[ClauseLabel],
) -> Result<PredicateStructure> {
    let target: i64 = label_to_find
        .trim()
        .parse()
        .map_err(|_| Error::parse(format!("non-numeric syntactic id: {label_to_find:?}")))?;
    let mut bounds: Option<(usize, usize)> = None;
    for (j, token) in sentence.iter().enumerate() {
        if token.synt_id.trim().parse::<i64>() != Ok(target) {
            continue;
        }
        let left = labels[..=j]
            .iter()
            .rposition(ClauseLabel::bounds_clause)
            .unwrap_or(0);
        let right = labels[j + 1..]
            .iter()
            .position(ClauseLabel::bounds_clause)
            .map_or(labels.len() - 1, |p| j + 1 + p);
        bounds = Some((left, right));
    }
    let (left, right) = bounds.ok_or_else(|| {
        Error::invariant(format!(
            "clause window not found for syntactic id {label_to_find}"
        ))
    })?;
    let mut chain = Vec::new();
    let mut fin_verb_count = 0;
    for (j, token) in sentence.iter().enumerate().take(right + 1).skip(left) {
        let Some(func) = morph::syntactic_function(&token.morph) else {
            continue;
        };
        if VERB_CHAIN_RE.is_match(func) {
            if func.starts_with("@FMV") || func.starts_with("@FCV") {
                fin_verb_count += 1;
            }
            chain.push(j);
        }
    }
    if fin_verb_count > 1 {
        let groups = group_predicate_parts(sentence, &chain);
        let chains = groups
            .into_iter()
            .map(|group| sort_predicate_parts(sentence, &group))
            .collect();
        Ok(PredicateStructure { chains, grouped: true })
    } else {
        Ok(PredicateStructure {
            chains: vec![sort_predicate_parts(sentence, &chain)],
            grouped: false,
        })
    }
}

/// Reorders one verb chain into the canonical order `@NEG`, `@FCV`, `@FMV`,
/// `@ICV`, `@IMV`, with the remaining members keeping their original order.
fn sort_predicate_parts(sentence: &[Token], chain: &[usize]) -> Vec<usize> {
    let mut ordered = Vec::with_capacity(chain.len());
    for part in ["@NEG", "@FCV", "@FMV", "@ICV", "@IMV"] {
        for &idx in chain {
            if morph::syntactic_function(&sentence[idx].morph) == Some(part) {
                ordered.push(idx);
            }
        }
    }
    for &idx in chain {
        if !ordered.contains(&idx) {
            ordered.push(idx);
        }
    }
    ordered
}

/// Splits a chain with several finite verbs: a new group starts at each
/// finite-verb or negation token once the current group already holds a
/// finite verb.
fn group_predicate_parts(sentence: &[Token], chain: &[usize]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for &idx in chain {
        let Some(last) = groups.last_mut() else {
            groups.push(vec![idx]);
            continue;
        };
        let last_has_fin = last.iter().any(|&i| {
            matches!(
                morph::syntactic_function(&sentence[i].morph),
                Some("@FMV") | Some("@FCV")
            )
        });
        let this_func = morph::syntactic_function(&sentence[idx].morph);
        let starts_new = last_has_fin
            && matches!(this_func, Some("@FMV") | Some("@FCV") | Some("@NEG"));
        if starts_new {
            groups.push(vec![idx]);
        } else {
            last.push(idx);
        }
    }
    groups
}

/// Grammatical tense of a clause predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateTense {
    /// Present.
    Pres,
    /// Simple past.
    Impf,
    /// Perfect (`olema` present + past participle).
    Pf,
    /// Pluperfect (`olema` past + past participle).
    Pqpf,
    /// Past of the conditional mood.
    CondPast,
    /// Could not be determined.
    Unknown,
}

/// Derives the grammatical tense of each verb chain of a predicate
/// structure.
///
/// Single-token tense markers resolve directly; composite tenses need an
/// `olema` auxiliary (`ole` lemma) followed by past participles, and chains
/// with an untensed member fall back to looking at the token right after the
/// finite one.
#[must_use]
pub fn predicate_tenses(sentence: &[Token], structure: &PredicateStructure) -> Vec<PredicateTense> {
    structure
        .chains
        .iter()
        .map(|chain| chain_tense(sentence, chain))
        .collect()
}

fn chain_tense(sentence: &[Token], chain: &[usize]) -> PredicateTense {
    use crate::morph::VerbTense;
    let times: Vec<Option<VerbTense>> =
        chain.iter().map(|&i| morph::verb_tense(&sentence[i].morph)).collect();
    let lemmas: Vec<Option<&str>> =
        chain.iter().map(|&i| morph::lemma(&sentence[i].morph)).collect();
    let mut distinct: Vec<Option<VerbTense>> = Vec::new();
    for t in &times {
        if !distinct.contains(t) {
            distinct.push(*t);
        }
    }
    let has_gap = distinct.contains(&None);
    let named: Vec<VerbTense> = distinct.iter().filter_map(|t| *t).collect();
    // Single tense marker across the chain, possibly with untensed members.
    if named.len() == 1 && (distinct.len() == 1 || (distinct.len() == 2 && has_gap)) {
        match named[0] {
            VerbTense::Impf => return PredicateTense::Impf,
            VerbTense::Pres => return PredicateTense::Pres,
            VerbTense::CondPast => return PredicateTense::CondPast,
            _ => {}
        }
    }
    // Composite tenses led by the olema auxiliary.
    if times.len() > 1 {
        let rest_all_past_part = times[1..]
            .iter()
            .all(|t| *t == Some(VerbTense::ParticPast));
        if times[0] == Some(VerbTense::Impf) && lemmas[0] == Some("ole") && rest_all_past_part {
            return PredicateTense::Pqpf;
        }
        if times[0] == Some(VerbTense::Pres) && lemmas[0] == Some("ole") && rest_all_past_part {
            return PredicateTense::Pf;
        }
    }
    // Negated or otherwise interrupted composite tense: look at the token
    // right after the finite tense marker.
    if distinct.len() == 3 && has_gap {
        if let Some(pos) = times.iter().position(|t| *t == Some(VerbTense::Pres)) {
            if times.get(pos + 1) == Some(&Some(VerbTense::ParticPast)) {
                return PredicateTense::Pf;
            }
        }
        if let Some(pos) = times.iter().position(|t| *t == Some(VerbTense::Impf)) {
            if times.get(pos + 1) == Some(&Some(VerbTense::ParticPast)) {
                return PredicateTense::Pqpf;
            }
        }
    }
    PredicateTense::Unknown
}

/// Detects an `olema` that is not an auxiliary of a composite tense but a
/// standalone present-tense main verb (`@FMV` with nothing following it in
/// the chain).
#[must_use]
pub fn is_olema_single_pres_predicate(
    tense: PredicateTense,
    sentence: &[Token],
    chain: &[usize],
) -> bool {
    if tense != PredicateTense::Pres {
        return false;
    }
    let Some(pos) = chain
        .iter()
        .position(|&i| morph::lemma(&sentence[i].morph) == Some("ole"))
    else {
        return false;
    };
    let is_fmv = morph::syntactic_function(&sentence[chain[pos]].morph) == Some("@FMV");
    let has_companions = pos + 1 < chain.len();
    is_fmv && !has_companions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Sentence;

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

    // "Mees tuli , sest ta lahkus" with a subordinating boundary at the comma.
    fn subordinated_sentence() -> Sentence {
        vec![
            token(0, "Mees", r#""mees" L0 S com sg nom @SUBJ"#, "1", "2"),
            token(1, "tuli", r#""tule" Li V main indic impf ps3 sg ps af @FMV"#, "2", "0"),
            token(2, ",", r#""," Z Com CLB"#, "3", "2"),
            token(3, "sest", r#""sest" L0 J sub @ADVL"#, "4", "6"),
            token(4, "ta", r#""tema" L0 P pers ps3 sg nom @SUBJ"#, "5", "6"),
            token(5, "lahkus", r#""lahku" Ls V main indic impf ps3 sg ps af @FMV"#, "6", "2"),
        ]
    }

    // Coordination: "Mees tuli ja ta lahkus" with crd CLB at "ja".
    fn coordinated_sentence() -> Sentence {
        vec![
            token(0, "Mees", r#""mees" L0 S com sg nom @SUBJ"#, "1", "2"),
            token(1, "tuli", r#""tule" Li V main indic impf ps3 sg ps af @FMV"#, "2", "0"),
            token(2, "ja", r#""ja" L0 J crd CLB @J"#, "3", "2"),
            token(3, "ta", r#""tema" L0 P pers ps3 sg nom @SUBJ"#, "4", "5"),
            token(4, "lahkus", r#""lahku" Ls V main indic impf ps3 sg ps af @FMV"#, "5", "2"),
        ]
    }

    #[test]
    fn test_clause_labels_basic() {
        let labels = clause_labels(&subordinated_sentence());
        assert_eq!(
            labels,
            vec![
                ClauseLabel::None,
                ClauseLabel::Fmv,
                ClauseLabel::Clb,
                ClauseLabel::None,
                ClauseLabel::None,
                ClauseLabel::Fmv,
            ]
        );
    }

    #[test]
    fn test_crd_clb_upgrade_needs_fin_verbs_on_both_sides() {
        let labels = clause_labels(&coordinated_sentence());
        // finite verb before, but a bare @SUBJ token right after breaks
        // the scan before the second finite verb is reached
        assert_eq!(labels[2], ClauseLabel::CrdClb);

        // drop the subject so the finite verb directly follows
        let mut sentence = coordinated_sentence();
        sentence.remove(3);
        let labels = clause_labels(&sentence);
        assert_eq!(labels[2], ClauseLabel::CrdClbPlus);
    }

    #[test]
    fn test_in_different_clauses_subordination() {
        let sentence = subordinated_sentence();
        let labels = clause_labels(&sentence);
        assert!(in_different_clauses(&sentence, "2", "6", &labels, false));
        // subordinating boundaries also count in subordination-only mode
        assert!(in_different_clauses(&sentence, "2", "6", &labels, true));
        // same clause
        assert!(!in_different_clauses(&sentence, "1", "2", &labels, false));
    }

    #[test]
    fn test_in_different_clauses_coordination_modes() {
        let mut sentence = coordinated_sentence();
        sentence.remove(3); // upgrade the boundary to crd CLB+
        let labels = clause_labels(&sentence);
        assert_eq!(labels[2], ClauseLabel::CrdClbPlus);
        assert!(in_different_clauses(&sentence, "2", "5", &labels, false));
        // an upgraded coordination is skipped in subordination-only mode
        assert!(!in_different_clauses(&sentence, "2", "5", &labels, true));
    }

    #[test]
    fn test_cleft_counts_as_boundary_when_unclosed() {
        let mut sentence = subordinated_sentence();
        sentence[2] = token(2, "(", r#""(" Z Opr CLB CLO"#, "3", "2");
        let labels = clause_labels(&sentence);
        assert_eq!(labels[2], ClauseLabel::ClbOpen);
        // label 6 is reached at depth 1 (no closing paren in between)
        assert!(in_different_clauses(&sentence, "2", "6", &labels, false));
    }

    #[test]
    fn test_predicate_structure_single_chain() {
        let sentence = subordinated_sentence();
        let labels = clause_labels(&sentence);
        let structure = predicate_structure(&sentence, "2", &labels).unwrap();
        assert!(!structure.grouped);
        assert_eq!(structure.chains, vec![vec![1]]);
        // the second clause gets its own finite verb
        let structure = predicate_structure(&sentence, "6", &labels).unwrap();
        assert_eq!(structure.chains, vec![vec![5]]);
    }

    #[test]
    fn test_predicate_structure_unknown_label_is_error() {
        let sentence = subordinated_sentence();
        let labels = clause_labels(&sentence);
        assert!(predicate_structure(&sentence, "99", &labels).is_err());
    }

    #[test]
    fn test_predicate_canonical_order() {
        // "ei oleks läinud": @NEG + @FMV, given out of order
        let sentence = vec![
            token(0, "oleks", r#""ole" Lks V aux indic pres ps af @FMV"#, "1", "0"),
            token(1, "ei", r#""ei" L0 V aux neg @NEG"#, "2", "1"),
            token(2, "läinud", r#""mine" Lnud V main partic past ps @IMV"#, "3", "1"),
        ];
        let labels = clause_labels(&sentence);
        let structure = predicate_structure(&sentence, "1", &labels).unwrap();
        assert_eq!(structure.chains, vec![vec![1, 0, 2]]);
    }

    #[test]
    fn test_predicate_tense_simple_and_composite() {
        // simple past
        let impf = vec![token(
            0,
            "lahkus",
            r#""lahku" Ls V main indic impf ps3 sg ps af @FMV"#,
            "1",
            "0",
        )];
        let structure = PredicateStructure { chains: vec![vec![0]], grouped: false };
        assert_eq!(predicate_tenses(&impf, &structure), vec![PredicateTense::Impf]);

        // perfect: "on läinud"
        let pf = vec![
            token(0, "on", r#""ole" Lb V aux indic pres ps3 sg ps af @FMV"#, "1", "0"),
            token(1, "läinud", r#""mine" Lnud V main partic past ps @IMV"#, "2", "1"),
        ];
        let structure = PredicateStructure { chains: vec![vec![0, 1]], grouped: false };
        assert_eq!(predicate_tenses(&pf, &structure), vec![PredicateTense::Pf]);

        // pluperfect: "oli läinud"
        let pqpf = vec![
            token(0, "oli", r#""ole" Li V aux indic impf ps3 sg ps af @FMV"#, "1", "0"),
            token(1, "läinud", r#""mine" Lnud V main partic past ps @IMV"#, "2", "1"),
        ];
        let structure = PredicateStructure { chains: vec![vec![0, 1]], grouped: false };
        assert_eq!(predicate_tenses(&pqpf, &structure), vec![PredicateTense::Pqpf]);
    }

    #[test]
    fn test_olema_single_pres_detection() {
        let sentence = vec![token(
            0,
            "on",
            r#""ole" Lb V main indic pres ps3 sg ps af @FMV"#,
            "1",
            "0",
        )];
        assert!(is_olema_single_pres_predicate(PredicateTense::Pres, &sentence, &[0]));
        // with a companion it is an auxiliary, not a standalone predicate
        let composite = vec![
            sentence[0].clone(),
            token(1, "läinud", r#""mine" Lnud V main partic past ps @IMV"#, "2", "1"),
        ];
        assert!(!is_olema_single_pres_predicate(PredicateTense::Pres, &composite, &[0, 1]));
    }
}
