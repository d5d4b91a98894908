//! Aggregation and rendering of agreement results.
//!
//! The raw counts of an [`AggregateCounter`] are folded into serializable
//! summary structures, which know how to render themselves as the plain-text
//! report. Entity runs produce an [`EntityReport`]; combined filtering runs
//! produce a [`FilteringSummary`] that also covers corpus-loss numbers and
//! the TLINK agreement tables.
//!
//! Scores are printed with three significant digits. A missing value (an
//! annotator pair without any surviving relation, or a degenerate
//! chance-corrected measure) renders as `N/A` and is excluded from averages;
//! every average built over a gap carries one `*` per excluded value.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::agree::{AggregateCounter, RelationMerging, TlinkLayer};
use crate::chance::{self, ContingencyTable};
use crate::corpus::Annotator;
use crate::error::{Error, Result};

const INDENT: &str = "       ";

/// Formats a value with the given number of significant digits,
/// e.g. `0.6667` becomes `0.667` and `85.714` becomes `85.7`.
fn sig(value: f64, digits: i32) -> String {
    if !value.is_finite() {
        return format!("{value}");
    }
    if value == 0.0 {
        return "0.0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (digits - 1 - magnitude).max(0) as usize;
    let mut formatted = format!("{value:.decimals$}");
    if formatted.contains('.') {
        while formatted.ends_with('0') {
            formatted.pop();
        }
        if formatted.ends_with('.') {
            formatted.push('0');
        }
    }
    formatted
}

fn sig_opt(value: Option<f64>, digits: i32) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| sig(v, digits))
}

/// Splits a slice of optional scores into the present values and a gap
/// marker carrying one `*` per missing value.
fn present_values(values: &[Option<f64>]) -> (Vec<f64>, String) {
    let mut numbers = Vec::new();
    let mut gaps = String::new();
    for value in values {
        match value {
            Some(v) => numbers.push(*v),
            None => gaps.push('*'),
        }
    }
    (numbers, gaps)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn mean_with_gaps(values: &[Option<f64>]) -> (Option<f64>, String) {
    let (numbers, gaps) = present_values(values);
    (mean(&numbers), gaps)
}

/// Precision / recall / F1 of one annotator pair on one task.
#[derive(Debug, Clone, Serialize)]
pub struct PairScores {
    /// Pair label, e.g. `c vs b`.
    pub pair: String,
    /// Matching annotations.
    pub correct: i64,
    /// Annotations of the reference side.
    pub all_in_ref: i64,
    /// Annotations of the suggestion side.
    pub all_in_sug: i64,
    /// correct / all_in_ref.
    pub recall: f64,
    /// correct / all_in_sug.
    pub precision: f64,
    /// Harmonic mean of precision and recall.
    pub fscore: f64,
    /// True when the pair involves the judge.
    pub is_judge: bool,
}

/// Scores of all annotator pairs on one task, judge pairs last.
#[derive(Debug, Clone, Serialize)]
pub struct TaskScores {
    /// Task name, e.g. `EVENT-extent`.
    pub task: String,
    /// Per-pair counted-file numbers (extent tasks only).
    pub counted_files: Vec<(String, i64)>,
    /// Per-pair scores.
    pub pairs: Vec<PairScores>,
}

impl TaskScores {
    fn fscore_avg(&self, judge_side: Option<bool>) -> Option<f64> {
        let scores: Vec<f64> = self
            .pairs
            .iter()
            .filter(|p| judge_side.map_or(true, |side| p.is_judge == side))
            .map(|p| p.fscore)
            .collect();
        mean(&scores)
    }

    /// Mean F1 over the non-judge pairs.
    #[must_use]
    pub fn annotator_avg(&self) -> Option<f64> {
        self.fscore_avg(Some(false))
    }

    /// Mean F1 over the judge pairs.
    #[must_use]
    pub fn judge_avg(&self) -> Option<f64> {
        self.fscore_avg(Some(true))
    }
}

/// Computes P/R/F of one pair with the given fallback for empty denominators.
fn score_pair(
    counter: &AggregateCounter,
    task: &str,
    pair: &str,
    judge: Option<Annotator>,
    fallback: f64,
) -> PairScores {
    let correct = counter.get(task, pair, "correct");
    let all_in_ref = counter.get(task, pair, "all_in_ref");
    let all_in_sug = counter.get(task, pair, "all_in_sug");
    let recall = if all_in_ref > 0 {
        correct as f64 / all_in_ref as f64
    } else {
        fallback
    };
    let precision = if all_in_sug > 0 {
        correct as f64 / all_in_sug as f64
    } else {
        fallback
    };
    let fscore = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        fallback
    };
    PairScores {
        pair: pair.to_string(),
        correct,
        all_in_ref,
        all_in_sug,
        recall,
        precision,
        fscore,
        is_judge: judge.is_some_and(|j| pair.contains(j.as_label())),
    }
}

// ------------------------------------------------------------
//    Entity annotation report
// ------------------------------------------------------------

/// Aggregated entity (EVENT, TIMEX) agreement results.
#[derive(Debug, Clone, Serialize)]
pub struct EntityReport {
    /// Per-task scores, extent tasks first.
    pub tasks: Vec<TaskScores>,
}

/// Aggregates entity agreement results from the counter. Empty denominators
/// fall back to zero scores.
#[must_use]
pub fn entity_report(counter: &AggregateCounter, judge: Option<Annotator>) -> EntityReport {
    let mut tasks = Vec::new();
    for task in counter.tasks() {
        let sorted = counter.sorted_pairs(task, judge);
        let counted_files = if task.ends_with("-extent") {
            sorted
                .iter()
                .map(|p| (p.clone(), counter.get(task, p, "counted_files")))
                .collect()
        } else {
            Vec::new()
        };
        let pairs = sorted
            .iter()
            .map(|p| score_pair(counter, task, p, judge, 0.0))
            .collect();
        tasks.push(TaskScores { task: task.to_string(), counted_files, pairs });
    }
    EntityReport { tasks }
}

impl EntityReport {
    /// Renders the report. With `details`, raw counts and counted-file
    /// numbers are listed first; with `group_avgs`, mean F1 lines separate
    /// the annotator pairs from the judge pairs.
    #[must_use]
    pub fn render(&self, details: bool, group_avgs: bool) -> String {
        let mut out = String::new();
        if details {
            let _ = writeln!(out, "--------------");
            let _ = writeln!(out, " Details");
            let _ = writeln!(out, "--------------");
            for task in &self.tasks {
                for (pair, files) in &task.counted_files {
                    let _ = writeln!(out, "{INDENT}{pair}  {} files: {files}", task.task);
                }
                if !task.counted_files.is_empty() {
                    let _ = writeln!(out);
                }
            }
            for task in &self.tasks {
                for scores in &task.pairs {
                    if scores.all_in_ref + scores.all_in_sug > 0 {
                        let _ = writeln!(
                            out,
                            "{INDENT}{}  {}    R: {}/{}   P: {}/{}",
                            scores.pair,
                            task.task,
                            scores.correct,
                            scores.all_in_ref,
                            scores.correct,
                            scores.all_in_sug
                        );
                    }
                }
                let _ = writeln!(out);
            }
            let _ = writeln!(out, "--------------");
        }
        // Extent tasks first, other attributes after.
        for extent_pass in [true, false] {
            for task in &self.tasks {
                if task.task.ends_with("-extent") != extent_pass {
                    continue;
                }
                let mut judge_avg_written = false;
                for scores in &task.pairs {
                    if group_avgs && scores.is_judge && !judge_avg_written {
                        let avg = sig_opt(task.annotator_avg(), 3);
                        let _ = writeln!(
                            out,
                            "{:20}  {} {:24}F1_avg: {avg}",
                            "", task.task, ""
                        );
                        judge_avg_written = true;
                    }
                    if scores.all_in_ref + scores.all_in_sug > 0 {
                        let _ = writeln!(
                            out,
                            "{INDENT}{}  {}    R: {}   P: {}   F1: {}",
                            scores.pair,
                            task.task,
                            sig(scores.recall, 3),
                            sig(scores.precision, 3),
                            sig(scores.fscore, 3)
                        );
                    }
                }
                if group_avgs {
                    let avg = if judge_avg_written {
                        task.judge_avg()
                    } else {
                        task.annotator_avg()
                    };
                    let _ = writeln!(
                        out,
                        "{:20}  {} {:24}F1_avg: {}",
                        "", task.task, "", sig_opt(avg, 3)
                    );
                }
                let _ = writeln!(out);
            }
        }
        out
    }
}

// ------------------------------------------------------------
//    Combined filtering-run report
// ------------------------------------------------------------

/// Relation-type agreement of one pair on one TLINK layer.
#[derive(Debug, Clone, Serialize)]
pub struct TlinkPairDetail {
    /// Pair label.
    pub pair: String,
    /// Task name, e.g. `tlink-event_dct-rel_match-base`.
    pub task: String,
    /// False when the pair had no surviving relations on this layer.
    pub available: bool,
    /// Matching relation types.
    pub correct: i64,
    /// Relations drawn by both annotators.
    pub total: i64,
    /// Observed agreement; `None` when not computable.
    pub accuracy: Option<f64>,
    /// Cohen's Kappa; `None` when not computable or degenerate.
    pub chance_corrected: Option<f64>,
}

/// Per-layer relation-type details, non-judge pairs only.
#[derive(Debug, Clone, Serialize)]
pub struct LayerDetails {
    /// Layer key, e.g. `event_dct`.
    pub layer: String,
    /// Per-pair details, in pair-sorted order.
    pub pairs: Vec<TlinkPairDetail>,
}

/// Aggregated results of one combined run under one filter policy.
///
/// The twelve-element score lists run over the four TLINK layers, three
/// non-judge pairs each, in layer-major order.
#[derive(Debug, Clone, Serialize)]
pub struct FilteringSummary {
    /// Filter policy code of the run.
    pub filter: String,
    /// EVENT extent and attribute scores.
    pub event_tasks: Vec<TaskScores>,
    /// Unique annotated events surviving the filter, over all annotators.
    pub events_remaining: i64,
    /// Unique annotated events before filtering.
    pub events_total: i64,
    /// `events_remaining` as a percentage of `events_total`.
    pub event_coverage_pct: f64,
    /// Non-judge relations surviving the cascade.
    pub links_remaining: i64,
    /// Non-judge relations before the cascade.
    pub links_total: i64,
    /// `links_remaining` as a percentage of `links_total`.
    pub link_coverage_pct: f64,
    /// VAGUE share of the surviving non-judge relations, in percent.
    pub vague_proportion_pct: f64,
    /// All pair labels, judge pairs last.
    pub pairs: Vec<String>,
    /// TLINK detection F-scores, one per layer and non-judge pair.
    pub find_fscores: Vec<Option<f64>>,
    /// Relation-type accuracies.
    pub accuracies: Vec<Option<f64>>,
    /// Relation-type accuracies weighted by relation distance.
    pub weighted_accuracies: Vec<Option<f64>>,
    /// Cohen's Kappas.
    pub kappas: Vec<Option<f64>>,
    /// Relations entering each comparison (both sides counted).
    pub counts: Vec<i64>,
    /// VAGUE responses in each comparison.
    pub vague_counts: Vec<i64>,
    /// Per-layer relation-type details.
    pub layer_details: Vec<LayerDetails>,
    /// Per-layer relation-type distributions, merged over the pairs.
    pub distributions: Vec<BTreeMap<String, i64>>,
}

fn diagonal_and_total(table: &ContingencyTable) -> (i64, i64) {
    let mut correct = 0i64;
    let mut total = 0i64;
    for (resp_a, row) in &table.cells {
        for (resp_b, &n) in row {
            if resp_a == resp_b {
                correct += n;
            }
            total += n;
        }
    }
    (correct, total)
}

fn expect_list_len(name: &str, len: usize) -> Result<()> {
    if len != 12 {
        return Err(Error::invariant(format!(
            "unexpected number of {name}: {len}"
        )));
    }
    Ok(())
}

/// Aggregates the results of a combined run from the counter.
///
/// Requires the EVENT tasks, all four TLINK layers and the total-count
/// tasks to be present; three non-judge pairs per layer are expected, and
/// a deviation is an invariant error.
pub fn filtering_summary(
    counter: &AggregateCounter,
    filter: &str,
    judge: Option<Annotator>,
) -> Result<FilteringSummary> {
    let mut event_tasks = Vec::new();
    for task in counter.tasks() {
        if !task.starts_with("EVENT-") {
            continue;
        }
        let pairs = counter
            .sorted_pairs(task, judge)
            .iter()
            .map(|p| score_pair(counter, task, p, judge, -1.0))
            .collect();
        event_tasks.push(TaskScores {
            task: task.to_string(),
            counted_files: Vec::new(),
            pairs,
        });
    }
    for required in ["EVENT-extent", "EVENT-class"] {
        if !event_tasks.iter().any(|t| t.task == required) {
            return Err(Error::invariant(format!("no counts recorded for task {required}")));
        }
    }

    let mut events_remaining = 0;
    let mut events_total = 0;
    let mut event_coverage_pct = -1.0;
    if counter.has_task("total-count-remaining-events") {
        events_remaining = counter.get("total-count-remaining-events", "_all_uniq_anns", "_");
        events_total = counter.get("total-count-events", "_all_uniq_anns", "_");
        if events_total > 0 {
            event_coverage_pct = events_remaining as f64 * 100.0 / events_total as f64;
        }
    }

    let mut links_remaining = 0;
    let mut vague_links = 0;
    let mut vague_proportion_pct = -1.0;
    if counter.has_task("total-count-remaining-tlinks") {
        for annotator in counter.sorted_pairs("total-count-remaining-tlinks", None) {
            if annotator == "_all" {
                continue;
            }
            if judge.is_some_and(|j| annotator != j.as_label()) {
                links_remaining += counter.get("total-count-remaining-tlinks", &annotator, "_");
                vague_links += counter.get("total-count-remaining-tlinks", &annotator, "_vague");
            }
        }
        if links_remaining > 0 {
            vague_proportion_pct = vague_links as f64 * 100.0 / links_remaining as f64;
        }
    }
    let mut links_total = 0;
    if counter.has_task("total-count-tlinks") {
        for annotator in counter.sorted_pairs("total-count-tlinks", None) {
            if annotator == "_all" {
                continue;
            }
            if judge.is_some_and(|j| annotator != j.as_label()) {
                links_total += counter.get("total-count-tlinks", &annotator, "_");
            }
        }
    }
    let link_coverage_pct = if links_total > 0 {
        links_remaining as f64 * 100.0 / links_total as f64
    } else {
        -1.0
    };

    let all_pairs = counter.sorted_pairs(
        &TlinkLayer::EventDct.rel_match_task(RelationMerging::Base),
        judge,
    );

    // Detection F-scores over choosing the entities of a relation.
    let mut find_fscores: Vec<Option<f64>> = Vec::new();
    for layer in TlinkLayer::ALL {
        let task = layer.find_task();
        if !counter.has_task(&task) {
            return Err(Error::invariant(format!("no counts recorded for task {task}")));
        }
        let task_pairs = counter.sorted_pairs(&task, judge);
        for pair in &all_pairs {
            if !task_pairs.contains(pair) {
                find_fscores.push(None);
                continue;
            }
            if judge.is_some_and(|j| pair.contains(j.as_label())) {
                continue;
            }
            let scores = score_pair(counter, &task, pair, judge, -1.0);
            if scores.precision + scores.recall > 0.0 {
                find_fscores.push(Some(scores.fscore));
            } else {
                find_fscores.push(None);
            }
        }
    }

    // Relation-type agreement, plain and chance-corrected.
    let mut accuracies: Vec<Option<f64>> = Vec::new();
    let mut weighted_accuracies: Vec<Option<f64>> = Vec::new();
    let mut kappas: Vec<Option<f64>> = Vec::new();
    let mut counts: Vec<i64> = Vec::new();
    let mut vague_counts: Vec<i64> = Vec::new();
    let mut value_counts: Vec<BTreeMap<String, i64>> = Vec::new();
    let mut layer_details: Vec<LayerDetails> = Vec::new();
    for layer in TlinkLayer::ALL {
        let task = layer.rel_match_task(RelationMerging::Base);
        if !counter.has_task(&task) {
            return Err(Error::invariant(format!("no counts recorded for task {task}")));
        }
        let task_pairs = counter.sorted_pairs(&task, judge);
        let mut details = Vec::new();
        for pair in &all_pairs {
            if !task_pairs.contains(pair) {
                // All relations of the pair were filtered out; keep the
                // slot with placeholders.
                accuracies.push(None);
                weighted_accuracies.push(None);
                kappas.push(None);
                counts.push(0);
                vague_counts.push(0);
                value_counts.push(BTreeMap::new());
                details.push(TlinkPairDetail {
                    pair: pair.clone(),
                    task: task.clone(),
                    available: false,
                    correct: 0,
                    total: 0,
                    accuracy: None,
                    chance_corrected: None,
                });
                log::warn!("'{}' results not available for pair '{pair}'", layer.as_key());
                continue;
            }
            if judge.is_some_and(|j| pair.contains(j.as_label())) {
                continue;
            }
            let table = ContingencyTable::reconstruct(counter, &task, pair);
            let accuracy = chance::accuracy(&table);
            let weighted = chance::weighted_accuracy(&table, chance::tlink_distance);
            let kappa = chance::cohens_kappa(&table)?;
            let (correct, total) = diagonal_and_total(&table);
            let table_counts = table.value_counts();
            details.push(TlinkPairDetail {
                pair: pair.clone(),
                task: task.clone(),
                available: true,
                correct,
                total,
                accuracy: accuracy.score(),
                chance_corrected: kappa.score(),
            });
            accuracies.push(accuracy.score());
            weighted_accuracies.push(weighted.score());
            kappas.push(kappa.score());
            counts.push(total * 2);
            vague_counts.push(table_counts.get("VAGUE").copied().unwrap_or(0));
            value_counts.push(table_counts);
        }
        details.sort_by(|a, b| a.pair.cmp(&b.pair));
        layer_details.push(LayerDetails { layer: layer.as_key().to_string(), pairs: details });
    }

    expect_list_len("F-scores", find_fscores.len())?;
    expect_list_len("agreements", accuracies.len())?;
    expect_list_len("weighted agreements", weighted_accuracies.len())?;
    expect_list_len("chance-corrected agreements", kappas.len())?;
    expect_list_len("relation counts", counts.len())?;
    expect_list_len("vague link counts", vague_counts.len())?;

    let distributions = (0..TlinkLayer::ALL.len())
        .map(|i| {
            let mut merged: BTreeMap<String, i64> = BTreeMap::new();
            for table_counts in &value_counts[i * 3..i * 3 + 3] {
                for (value, &n) in table_counts {
                    *merged.entry(value.clone()).or_default() += n;
                }
            }
            merged
        })
        .collect();

    Ok(FilteringSummary {
        filter: filter.to_string(),
        event_tasks,
        events_remaining,
        events_total,
        event_coverage_pct,
        links_remaining,
        links_total,
        link_coverage_pct,
        vague_proportion_pct,
        pairs: all_pairs,
        find_fscores,
        accuracies,
        weighted_accuracies,
        kappas,
        counts,
        vague_counts,
        layer_details,
        distributions,
    })
}

fn abbreviate(relation: &str) -> &str {
    match relation {
        "IDENTITY" => "ID",
        "BEFORE" => "BEF",
        "AFTER" => "AFT",
        "BEFORE-OR-OVERLAP" => "BEF-OVR",
        "OVERLAP-OR-AFTER" => "AFT-OVR",
        "SIMULTANEOUS" => "SIM",
        "IS_INCLUDED" | "INCLUDED" => "INCD",
        "INCLUDES" => "INCS",
        "VAGUE" => "VAG",
        other => other,
    }
}

/// Formats a relation-type distribution as abbreviated names with
/// percentages, most frequent first.
fn format_value_counts(counts: &BTreeMap<String, i64>) -> String {
    let total: i64 = counts.values().sum();
    let mut entries: Vec<(&String, &i64)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let mut out = String::new();
    for (value, &n) in entries {
        let pct = if total > 0 { n as f64 * 100.0 / total as f64 } else { 0.0 };
        let _ = write!(out, "{} {}%  ", abbreviate(value), sig(pct, 3));
    }
    out
}

impl FilteringSummary {
    fn event_task(&self, name: &str) -> Option<&TaskScores> {
        self.event_tasks.iter().find(|t| t.task == name)
    }

    fn layer_slice<'a, T>(&self, values: &'a [T], layer: usize) -> &'a [T] {
        &values[layer * 3..layer * 3 + 3]
    }

    /// Renders the full plain-text report of the run.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let bar35 = "=".repeat(35);
        let bar46 = "=".repeat(46);

        let _ = writeln!(out, "{bar35}");
        let _ = writeln!(out, "  Detailed results for EVENTs ({})", self.filter);
        let _ = writeln!(out, "{bar35}");
        for name in ["EVENT-extent", "EVENT-class"] {
            let Some(task) = self.event_task(name) else {
                continue;
            };
            for judge_side in [false, true] {
                for scores in &task.pairs {
                    if scores.is_judge != judge_side {
                        continue;
                    }
                    let _ = writeln!(
                        out,
                        "{INDENT}{}  {}    R: {}   P: {}   F1: {}",
                        scores.pair,
                        task.task,
                        sig(scores.recall, 3),
                        sig(scores.precision, 3),
                        sig(scores.fscore, 3)
                    );
                }
                let (avg, label) = if judge_side {
                    (task.judge_avg(), "F_avg")
                } else {
                    (task.annotator_avg(), "F1_avg")
                };
                let _ = writeln!(
                    out,
                    "{:20}  {} {:24}{label}: {}",
                    "", task.task, "", sig_opt(avg, 3)
                );
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "{bar35}");
        let _ = writeln!(out, "  Compact results for EVENTs ({})", self.filter);
        let _ = writeln!(out, "{bar35}");
        let extent_avg = self.event_task("EVENT-extent").and_then(TaskScores::annotator_avg);
        let class_avg = self.event_task("EVENT-class").and_then(TaskScores::annotator_avg);
        let _ = writeln!(
            out,
            "{INDENT}all-in-one-EVENT   {} ({}%) {} ({}%) | {}  {}",
            self.events_remaining,
            sig(self.event_coverage_pct, 4),
            self.links_remaining,
            sig(self.link_coverage_pct, 4),
            sig_opt(extent_avg, 3),
            sig_opt(class_avg, 3)
        );
        let _ = writeln!(out);

        let _ = writeln!(out, "{bar46}");
        let _ = writeln!(out, "   Detailed results for TLINKs ({})", self.filter);
        let _ = writeln!(out, "  (relType IAAs layer by layer, pair by pair)");
        let _ = writeln!(out, "{bar46}");
        for (i, layer) in self.layer_details.iter().enumerate() {
            let _ = writeln!(out, "{INDENT}--- {} ---", layer.layer);
            for detail in &layer.pairs {
                if detail.available {
                    let _ = writeln!(
                        out,
                        "{INDENT}{}  {}    Acc: {}    {} / {}   CC: {}",
                        detail.pair,
                        detail.task,
                        sig_opt(detail.accuracy, 3),
                        detail.correct,
                        detail.total,
                        sig_opt(detail.chance_corrected, 3)
                    );
                } else {
                    let _ = writeln!(
                        out,
                        "{INDENT}{}  {}    Acc: N/A    N/A / N/A   CC: N/A",
                        detail.pair, detail.task
                    );
                }
            }
            let task = TlinkLayer::ALL[i].rel_match_task(RelationMerging::Base);
            let (avg_acc, gaps_acc) = mean_with_gaps(self.layer_slice(&self.accuracies, i));
            let (avg_cc, gaps_cc) = mean_with_gaps(self.layer_slice(&self.kappas, i));
            let _ = writeln!(
                out,
                "{:20}  {task}   Avg_acc: {}{gaps_acc}  Avg_CC: {}{gaps_cc}",
                "",
                sig_opt(avg_acc, 3),
                sig_opt(avg_cc, 3)
            );
            let _ = writeln!(out);
        }

        let _ = write!(out, "{INDENT}find-TLINK-F1scores |");
        for i in 0..TlinkLayer::ALL.len() {
            let (avg, gaps) = mean_with_gaps(self.layer_slice(&self.find_fscores, i));
            let _ = write!(out, " {}{gaps} ", sig_opt(avg, 3));
        }
        let (avg_all, gaps_all) = mean_with_gaps(&self.find_fscores);
        let _ = writeln!(out, "| {}{gaps_all} ", sig_opt(avg_all, 3));

        let all_relations: i64 = self.counts.iter().sum();
        let _ = write!(out, "{INDENT}counts-for-TLINK-base | ");
        for i in 0..TlinkLayer::ALL.len() {
            let layer_sum: i64 = self.layer_slice(&self.counts, i).iter().sum();
            let _ = write!(out, "{layer_sum} ");
        }
        let _ = writeln!(out, "| {all_relations}");
        let _ = writeln!(out);

        let judge_label = "j";
        let _ = writeln!(out, "{INDENT}Details on distributions of vague relations: ");
        for (i, layer) in TlinkLayer::ALL.iter().enumerate() {
            let _ = writeln!(out, "{INDENT}--- {} ---", layer.as_key());
            for (p, pair) in self.pairs.iter().enumerate() {
                if pair.contains(judge_label) || p >= 3 {
                    continue;
                }
                let pair_total: i64 = (0..TlinkLayer::ALL.len())
                    .map(|l| self.counts[l * 3 + p])
                    .sum();
                let vague = self.vague_counts[i * 3 + p];
                let pct = if pair_total > 0 {
                    vague as f64 * 100.0 / pair_total as f64
                } else {
                    0.0
                };
                let _ = writeln!(
                    out,
                    "{INDENT}{pair}  tlink-{}-vague-dist    VAGUE: {vague}   {}% ",
                    layer.as_key(),
                    sig(pct, 3)
                );
            }
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "{bar46}");
        let _ = writeln!(out, "  Compact results for TLINKs ({})", self.filter);
        let _ = writeln!(out, "{bar46}");
        let mut accs_line = format!("{INDENT}short-accs-for-TLINK-base   {all_relations} |");
        let mut accs_w_line = format!("{INDENT}short-accs-w-for-TLINK-base {all_relations} |");
        let mut ccs_line = format!("{INDENT}short-CCs-for-TLINK-base    {all_relations} |");
        for i in 0..TlinkLayer::ALL.len() {
            let (avg_acc, gaps1) = mean_with_gaps(self.layer_slice(&self.accuracies, i));
            let (avg_accw, gaps3) = mean_with_gaps(self.layer_slice(&self.weighted_accuracies, i));
            let (avg_cc, gaps2) = mean_with_gaps(self.layer_slice(&self.kappas, i));
            let _ = write!(accs_line, " {}{gaps1}", sig_opt(avg_acc, 3));
            let _ = write!(accs_w_line, " {}{gaps3}", sig_opt(avg_accw, 3));
            let _ = write!(ccs_line, " {}{gaps2}", sig_opt(avg_cc, 3));
        }
        let (avg_acc, gaps1) = mean_with_gaps(&self.accuracies);
        let (avg_accw, gaps3) = mean_with_gaps(&self.weighted_accuracies);
        let (avg_cc, gaps2) = mean_with_gaps(&self.kappas);
        let _ = write!(accs_line, " | {}{gaps1}", sig_opt(avg_acc, 3));
        let _ = write!(accs_w_line, " | {}{gaps3}", sig_opt(avg_accw, 3));
        let _ = write!(ccs_line, " | {}{gaps2}", sig_opt(avg_cc, 3));
        let _ = writeln!(out, "{INDENT}Observed agreements (accuracies): ");
        let _ = writeln!(out, "{accs_line}");
        let _ = writeln!(out, "{accs_w_line}");
        let _ = writeln!(out);
        let _ = writeln!(out, "{INDENT}Chance-corrected agreements (kappas): ");
        let _ = writeln!(out, "{ccs_line}");

        let mut cc_by_pair: BTreeMap<&str, Vec<Option<f64>>> = BTreeMap::new();
        for layer in &self.layer_details {
            for detail in &layer.pairs {
                cc_by_pair
                    .entry(detail.pair.as_str())
                    .or_default()
                    .push(detail.chance_corrected);
            }
        }
        for (pair, values) in &cc_by_pair {
            let _ = write!(out, "{INDENT}short-pair-CCs-for-TLINK-{pair}-base ");
            for value in values {
                let _ = write!(out, " {}", sig_opt(*value, 3));
            }
            let (avg, gaps) = mean_with_gaps(values);
            let _ = writeln!(out, " | {}{gaps}", sig_opt(avg, 3));
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "{INDENT}Distributions of relTypes: ");
        for (i, layer) in TlinkLayer::ALL.iter().enumerate() {
            let _ = writeln!(
                out,
                "{INDENT}tlink-distr-{}  {}",
                layer.as_key(),
                format_value_counts(&self.distributions[i])
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "{INDENT}Distributions of vague relations: ");
        let _ = write!(out, "{INDENT}tlink-vague-relations  ");
        let mut total_vague = 0i64;
        for i in 0..TlinkLayer::ALL.len() {
            let layer_vague: i64 = self.layer_slice(&self.vague_counts, i).iter().sum();
            total_vague += layer_vague;
            let pct = if all_relations > 0 {
                layer_vague as f64 * 100.0 / all_relations as f64
            } else {
                0.0
            };
            let _ = write!(out, "{}% ", sig(pct, 3));
        }
        let total_pct = if all_relations > 0 {
            total_vague as f64 * 100.0 / all_relations as f64
        } else {
            0.0
        };
        let _ = writeln!(out, "|  #{total_vague}  {}% ", sig(total_pct, 3));
        let _ = writeln!(out);
        out
    }
}
