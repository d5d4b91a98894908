//! Chance-corrected inter-annotator agreement measures: Cohen's Kappa,
//! Siegel & Castellan's Kappa, Scott's Pi and Krippendorff's Alpha.
//!
//! All measures work on a contingency table reconstructed from the
//! `table:<responseA>___<responseB>` cells of an [`AggregateCounter`] task.
//! A degenerate table (e.g. perfect expected agreement) yields an explicit
//! [`Agreement`] variant instead of a score; `sentinel()` converts those
//! variants to the conventional out-of-range placeholder values for
//! plain-number output.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::agree::AggregateCounter;
use crate::error::{Error, Result};

/// A contingency table (confusion matrix) over response categories, plus
/// the set of categories seen; absent cells are zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContingencyTable {
    /// Cell counts, first annotator's response to second annotator's.
    pub cells: BTreeMap<String, BTreeMap<String, i64>>,
    /// All response categories, sorted.
    pub responses: Vec<String>,
}

static TABLE_CELL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^table:(.+)$").unwrap());

impl ContingencyTable {
    /// Reconstructs the table from the `table:` metrics of `(task, pair)`.
    /// Missing cells between the observed categories are zero-filled.
    #[must_use]
    pub fn reconstruct(counter: &AggregateCounter, task: &str, pair: &str) -> Self {
        let mut table = ContingencyTable::default();
        let Some(metrics) = counter.metrics(task, pair) else {
            return table;
        };
        for (metric, &count) in metrics {
            let Some(caps) = TABLE_CELL_RE.captures(metric) else {
                continue;
            };
            let Some((resp_a, resp_b)) = caps[1].split_once("___") else {
                continue;
            };
            for resp in [resp_a, resp_b] {
                if !table.responses.iter().any(|r| r == resp) {
                    table.responses.push(resp.to_string());
                }
            }
            *table
                .cells
                .entry(resp_a.to_string())
                .or_default()
                .entry(resp_b.to_string())
                .or_default() += count;
        }
        table.responses.sort();
        for resp_a in &table.responses {
            let row = table.cells.entry(resp_a.clone()).or_default();
            for resp_b in &table.responses {
                row.entry(resp_b.clone()).or_insert(0);
            }
        }
        table
    }

    /// True when the table holds no responses at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    fn cell(&self, resp_a: &str, resp_b: &str) -> i64 {
        self.cells
            .get(resp_a)
            .and_then(|row| row.get(resp_b))
            .copied()
            .unwrap_or(0)
    }

    /// How many times each category was used, counting both annotators.
    #[must_use]
    pub fn value_counts(&self) -> BTreeMap<String, i64> {
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for resp_a in &self.responses {
            for resp_b in &self.responses {
                let n = self.cell(resp_a, resp_b);
                *counts.entry(resp_a.clone()).or_default() += n;
                *counts.entry(resp_b.clone()).or_default() += n;
            }
        }
        counts
    }
}

/// Outcome of an agreement computation.
///
/// The measures cannot always produce a score: an empty table has no
/// observed data, and a degenerate marginal distribution makes the
/// chance-correction denominator vanish. Those outcomes are explicit
/// variants here rather than magic numbers; [`Agreement::sentinel`]
/// recovers the conventional placeholders for flat numeric output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Agreement {
    /// A regular score.
    Score(f64),
    /// The table held no responses.
    NoData,
    /// Expected agreement is exactly 1, so chance correction divides by
    /// zero.
    DegenerateExpected,
    /// The weighted-disagreement denominator is zero (all mass on one
    /// category under the distance metric).
    DegenerateDistance,
}

impl Agreement {
    /// The score, if one was produced.
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        match self {
            Agreement::Score(value) => Some(*value),
            _ => None,
        }
    }

    /// The conventional out-of-range placeholder: `-1.0` for missing data,
    /// `-10.0` for a degenerate expected agreement and `-100.0` for a
    /// degenerate distance denominator.
    #[must_use]
    pub fn sentinel(&self) -> f64 {
        match self {
            Agreement::Score(value) => *value,
            Agreement::NoData => -1.0,
            Agreement::DegenerateExpected => -10.0,
            Agreement::DegenerateDistance => -100.0,
        }
    }
}

/// A distance between two response categories, in `[0, 1]`.
pub type DistanceFn = fn(&str, &str) -> f64;

/// Nominal distance: zero on equality, one otherwise.
#[must_use]
pub fn nominal_distance(value_a: &str, value_b: &str) -> f64 {
    if value_a == value_b {
        0.0
    } else {
        1.0
    }
}

static OVERLAP_RELS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(SIMULTANEOUS|INCLUDES|IS_INCLUDED|IDENTITY)\s*$").unwrap()
});
static BEFORE_RELS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(BEFORE-OR-OVERLAP|BEFORE)\s*$").unwrap());
static AFTER_RELS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(OVERLAP-OR-AFTER|AFTER)\s*$").unwrap());
static BEF_OVR_RELS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(BEFORE-OR-OVERLAP|SIMULTANEOUS|INCLUDES|IS_INCLUDED|IDENTITY)\s*$").unwrap()
});
static AFT_OVR_RELS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(OVERLAP-OR-AFTER|SIMULTANEOUS|INCLUDES|IS_INCLUDED|IDENTITY)\s*$").unwrap()
});

/// TLINK-aware distance: semantically close relation types (within the
/// overlap family, or a disjunctive type next to one of its disjuncts) are
/// half a disagreement apart.
#[must_use]
pub fn tlink_distance(value_a: &str, value_b: &str) -> f64 {
    if value_a == value_b {
        return 0.0;
    }
    let families: [&Lazy<Regex>; 5] = [
        &OVERLAP_RELS_RE,
        &BEFORE_RELS_RE,
        &AFTER_RELS_RE,
        &BEF_OVR_RELS_RE,
        &AFT_OVR_RELS_RE,
    ];
    for family in families {
        if family.is_match(value_a) && family.is_match(value_b) {
            return 0.5;
        }
    }
    1.0
}

/// Observed agreement (accuracy) without chance correction.
#[must_use]
pub fn accuracy(table: &ContingencyTable) -> Agreement {
    let mut all = 0i64;
    let mut agreements = 0i64;
    for resp_a in &table.responses {
        for resp_b in &table.responses {
            let n = table.cell(resp_a, resp_b);
            if resp_a == resp_b {
                agreements += n;
            }
            all += n;
        }
    }
    if all > 0 {
        Agreement::Score(agreements as f64 / all as f64)
    } else {
        Agreement::NoData
    }
}

/// Observed agreement weighted by a distance metric: a cell contributes
/// `1 - distance` of an agreement.
#[must_use]
pub fn weighted_accuracy(table: &ContingencyTable, distance: DistanceFn) -> Agreement {
    let mut all = 0i64;
    let mut agreements = 0.0f64;
    for resp_a in &table.responses {
        for resp_b in &table.responses {
            let n = table.cell(resp_a, resp_b);
            agreements += n as f64 * (1.0 - distance(resp_a, resp_b));
            all += n;
        }
    }
    if all > 0 {
        Agreement::Score(agreements / all as f64)
    } else {
        Agreement::NoData
    }
}

fn diagonal_proportion(table: &ContingencyTable, total: i64) -> f64 {
    let observed: i64 = table
        .responses
        .iter()
        .map(|resp| table.cell(resp, resp))
        .sum();
    observed as f64 / total as f64
}

/// Cohen's Kappa over the contingency table.
///
/// Expected agreement comes from the product of the two annotators'
/// marginal proportions. Mismatched marginal sums are an invariant
/// violation (the table no longer describes one shared set of items).
pub fn cohens_kappa(table: &ContingencyTable) -> Result<Agreement> {
    if table.is_empty() {
        return Ok(Agreement::NoData);
    }
    let mut row_marginals = Vec::new();
    let mut col_marginals = Vec::new();
    for resp_a in &table.responses {
        row_marginals.push(
            table
                .responses
                .iter()
                .map(|resp_b| table.cell(resp_a, resp_b))
                .sum::<i64>(),
        );
    }
    for resp_b in &table.responses {
        col_marginals.push(
            table
                .responses
                .iter()
                .map(|resp_a| table.cell(resp_a, resp_b))
                .sum::<i64>(),
        );
    }
    let total: i64 = row_marginals.iter().sum();
    if total != col_marginals.iter().sum::<i64>() {
        return Err(Error::invariant(format!(
            "marginal sums differ: {row_marginals:?} vs {col_marginals:?}"
        )));
    }
    if total == 0 {
        return Ok(Agreement::NoData);
    }
    let expected: f64 = row_marginals
        .iter()
        .zip(&col_marginals)
        .map(|(&r, &c)| (r as f64 / total as f64) * (c as f64 / total as f64))
        .sum();
    let observed = diagonal_proportion(table, total);
    if (1.0 - expected).abs() < f64::EPSILON {
        return Ok(Agreement::DegenerateExpected);
    }
    Ok(Agreement::Score((observed - expected) / (1.0 - expected)))
}

/// Siegel & Castellan's Kappa: expected agreement comes from the pooled
/// category proportions of both annotators, which makes the measure
/// tolerant to annotator bias. Very close to Scott's Pi.
#[must_use]
pub fn siegel_castellan_kappa(table: &ContingencyTable) -> Agreement {
    if table.is_empty() {
        return Agreement::NoData;
    }
    let mut category_items: BTreeMap<&str, i64> = BTreeMap::new();
    let mut all_items = 0i64;
    let mut total = 0i64;
    for resp_a in &table.responses {
        for resp_b in &table.responses {
            let n = table.cell(resp_a, resp_b);
            if resp_a == resp_b {
                *category_items.entry(resp_a).or_default() += n * 2;
            } else {
                *category_items.entry(resp_a).or_default() += n;
                *category_items.entry(resp_b).or_default() += n;
            }
            all_items += n * 2;
            total += n;
        }
    }
    if total == 0 {
        return Agreement::NoData;
    }
    let expected: f64 = table
        .responses
        .iter()
        .map(|resp| {
            let proportion =
                category_items.get(resp.as_str()).copied().unwrap_or(0) as f64 / all_items as f64;
            proportion * proportion
        })
        .sum();
    let observed = diagonal_proportion(table, total);
    if (1.0 - expected).abs() < f64::EPSILON {
        return Agreement::DegenerateExpected;
    }
    Agreement::Score((observed - expected) / (1.0 - expected))
}

/// Scott's Pi, after Artstein & Poesio (2008). Category frequencies are
/// pooled over both annotators; only non-empty cells contribute.
#[must_use]
pub fn scotts_pi(table: &ContingencyTable) -> Agreement {
    if table.is_empty() {
        return Agreement::NoData;
    }
    let mut all_items = 0i64;
    let mut items_in_k: BTreeMap<&str, i64> = BTreeMap::new();
    for resp_b in &table.responses {
        for resp_a in &table.responses {
            let n = table.cell(resp_a, resp_b);
            all_items += n;
            items_in_k.entry(resp_a).or_default();
            items_in_k.entry(resp_b).or_default();
            if n > 0 {
                *items_in_k.entry(resp_a).or_default() += n;
                *items_in_k.entry(resp_b).or_default() += n;
            }
        }
    }
    if all_items == 0 {
        return Agreement::NoData;
    }
    let sum_of_proportions: f64 = table
        .responses
        .iter()
        .map(|resp| {
            let k = items_in_k.get(resp.as_str()).copied().unwrap_or(0) as f64;
            k * k
        })
        .sum();
    let expected = sum_of_proportions / (4.0 * (all_items as f64) * (all_items as f64));
    let observed = diagonal_proportion(table, all_items);
    if (1.0 - expected).abs() < f64::EPSILON {
        return Agreement::DegenerateExpected;
    }
    Agreement::Score((observed - expected) / (1.0 - expected))
}

/// Krippendorff's Alpha with an arbitrary distance metric, after
/// Krippendorff's computing guide.
///
/// The confusion matrix is first symmetrized into a coincidence matrix
/// (each unit entered twice), and the alpha compares the distance-weighted
/// observed coincidences against the distance-weighted expected ones.
#[must_use]
pub fn krippendorff_alpha(table: &ContingencyTable, distance: DistanceFn) -> Agreement {
    if table.is_empty() {
        return Agreement::NoData;
    }
    // 1) Coincidence matrix
    let mut coincidence: BTreeMap<(&str, &str), i64> = BTreeMap::new();
    for resp_a in &table.responses {
        for resp_b in &table.responses {
            let both = table.cell(resp_a, resp_b) + table.cell(resp_b, resp_a);
            coincidence.insert((resp_a, resp_b), both);
            coincidence.insert((resp_b, resp_a), both);
        }
    }
    // 2) Category frequencies and total frequency
    let mut category_items: BTreeMap<&str, i64> = BTreeMap::new();
    let mut total_freq = 0i64;
    for resp_a in &table.responses {
        for resp_b in &table.responses {
            let n = table.cell(resp_a, resp_b);
            category_items.entry(resp_a).or_default();
            category_items.entry(resp_b).or_default();
            if n > 0 {
                *category_items.entry(resp_a).or_default() += n;
                *category_items.entry(resp_b).or_default() += n;
                total_freq += 2 * n;
            }
        }
    }
    // 3) Alpha-reliability over the upper triangle
    let mut sum_o_ck = 0.0f64;
    let mut sum_n_ck = 0.0f64;
    for (i, c) in table.responses.iter().enumerate() {
        for k in table.responses.iter().skip(i + 1) {
            let d = distance(c, k);
            sum_o_ck +=
                coincidence.get(&(c.as_str(), k.as_str())).copied().unwrap_or(0) as f64 * d;
            let n_c = category_items.get(c.as_str()).copied().unwrap_or(0) as f64;
            let n_k = category_items.get(k.as_str()).copied().unwrap_or(0) as f64;
            sum_n_ck += n_c * n_k * d;
        }
    }
    if sum_n_ck == 0.0 {
        return Agreement::DegenerateDistance;
    }
    Agreement::Score(1.0 - ((total_freq as f64 - 1.0) * (sum_o_ck / sum_n_ck)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cells: &[(&str, &str, i64)]) -> ContingencyTable {
        let mut counter = AggregateCounter::new();
        for (a, b, n) in cells {
            counter.add("t", "p", &format!("table:{a}___{b}"), *n);
        }
        ContingencyTable::reconstruct(&counter, "t", "p")
    }

    #[test]
    fn test_reconstruct_zero_fills() {
        let t = table(&[("BEFORE", "AFTER", 2), ("BEFORE", "BEFORE", 3)]);
        assert_eq!(t.responses, vec!["AFTER", "BEFORE"]);
        assert_eq!(t.cell("AFTER", "AFTER"), 0);
        assert_eq!(t.cell("AFTER", "BEFORE"), 0);
        assert_eq!(t.cell("BEFORE", "AFTER"), 2);
        assert_eq!(t.cell("BEFORE", "BEFORE"), 3);
    }

    #[test]
    fn test_accuracy_and_no_data() {
        let t = table(&[("A", "A", 8), ("A", "B", 2)]);
        assert_eq!(accuracy(&t), Agreement::Score(0.8));
        assert_eq!(accuracy(&ContingencyTable::default()), Agreement::NoData);
        assert_eq!(Agreement::NoData.sentinel(), -1.0);
    }

    #[test]
    fn test_weighted_accuracy_tlink_distance() {
        // SIMULTANEOUS vs INCLUDES sit in the same family: half credit
        let t = table(&[("SIMULTANEOUS", "INCLUDES", 2), ("BEFORE", "BEFORE", 2)]);
        let acc = weighted_accuracy(&t, tlink_distance).score().unwrap();
        assert!((acc - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_tlink_distance_families() {
        assert_eq!(tlink_distance("BEFORE", "BEFORE"), 0.0);
        assert_eq!(tlink_distance("BEFORE", "BEFORE-OR-OVERLAP"), 0.5);
        assert_eq!(tlink_distance("AFTER", "OVERLAP-OR-AFTER"), 0.5);
        assert_eq!(tlink_distance("INCLUDES", "IDENTITY"), 0.5);
        assert_eq!(tlink_distance("BEFORE-OR-OVERLAP", "SIMULTANEOUS"), 0.5);
        assert_eq!(tlink_distance("BEFORE", "AFTER"), 1.0);
    }

    #[test]
    fn test_cohens_kappa_known_value() {
        // classic worked example: observed 0.7, expected 0.5 -> kappa 0.4
        let t = table(&[
            ("YES", "YES", 20),
            ("YES", "NO", 5),
            ("NO", "YES", 10),
            ("NO", "NO", 15),
        ]);
        let kappa = cohens_kappa(&t).unwrap().score().unwrap();
        let expected = 0.6 * 0.5 + 0.4 * 0.5;
        let observed = 0.7;
        assert!((kappa - (observed - expected) / (1.0 - expected)).abs() < 1e-9);
    }

    #[test]
    fn test_cohens_kappa_degenerate_expected() {
        // a single category: expected agreement is exactly 1
        let t = table(&[("A", "A", 5)]);
        assert_eq!(cohens_kappa(&t).unwrap(), Agreement::DegenerateExpected);
        assert_eq!(Agreement::DegenerateExpected.sentinel(), -10.0);
    }

    #[test]
    fn test_siegel_castellan_close_to_scott() {
        let t = table(&[
            ("YES", "YES", 20),
            ("YES", "NO", 5),
            ("NO", "YES", 10),
            ("NO", "NO", 15),
        ]);
        let sc = siegel_castellan_kappa(&t).score().unwrap();
        let pi = scotts_pi(&t).score().unwrap();
        assert!((sc - pi).abs() < 1e-9);
    }

    #[test]
    fn test_krippendorff_alpha_perfect_agreement() {
        let t = table(&[("A", "A", 5), ("B", "B", 5)]);
        let alpha = krippendorff_alpha(&t, nominal_distance).score().unwrap();
        assert!((alpha - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_krippendorff_alpha_degenerate_distance() {
        let t = table(&[("A", "A", 5)]);
        assert_eq!(
            krippendorff_alpha(&t, nominal_distance),
            Agreement::DegenerateDistance
        );
        assert_eq!(Agreement::DegenerateDistance.sentinel(), -100.0);
    }

    #[test]
    fn test_value_counts_count_both_sides() {
        let t = table(&[("BEFORE", "VAGUE", 3), ("BEFORE", "BEFORE", 2)]);
        let counts = t.value_counts();
        assert_eq!(counts["BEFORE"], 3 + 2 + 2);
        assert_eq!(counts["VAGUE"], 3);
    }
}
