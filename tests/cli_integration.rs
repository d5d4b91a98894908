//! End-to-end tests for the concord CLI over a miniature corpus.
//!
//! The corpus has three files, each annotated by the judge and two of the
//! three annotators (doc1: a+b, doc2: b+c, doc3: a+c), so that every
//! annotator pair occurs. All annotators draw identical annotations, which
//! makes the expected agreement scores exact.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const DOCS: [&str; 3] = ["doc1", "doc2", "doc3"];

/// Which annotators (besides the judge) covered each document.
fn files_of(annotator: &str) -> Vec<&'static str> {
    match annotator {
        "a" => vec!["doc1", "doc3"],
        "b" => vec!["doc1", "doc2"],
        "c" => vec!["doc2", "doc3"],
        "j" => DOCS.to_vec(),
        other => panic!("unknown annotator {other}"),
    }
}

fn base_rows(doc: &str) -> String {
    // "Mees saabus eile. Ta ütles, et lahkus."
    format!(
        "{doc}\t0\t0\tMees\t\"mees\" L0 S com sg nom @SUBJ\t1\t2\n\
         {doc}\t0\t1\tsaabus\t\"saabu\" Ls V main indic impf ps3 sg ps af @FMV\t2\t0\n\
         {doc}\t0\t2\teile\t\"eile\" L0 D @ADVL\t3\t2\n\
         {doc}\t1\t0\tTa\t\"tema\" L0 P pers ps3 sg nom @SUBJ\t1\t2\n\
         {doc}\t1\t1\tütles\t\"ütle\" Ls V main indic impf ps3 sg ps af @FMV\t2\t0\n\
         {doc}\t1\t2\t,\t\",\" Z Com CLB\t3\t2\n\
         {doc}\t1\t3\tet\t\"et\" L0 J sub @J\t4\t5\n\
         {doc}\t1\t4\tlahkus\t\"lahku\" Ls V main indic impf ps3 sg ps af @FMV\t5\t2\n"
    )
}

fn event_rows(doc: &str) -> String {
    format!(
        "{doc}\t0\t1\tsaabus\tEVENT OCCURRENCE\te1\n\
         {doc}\t1\t1\tütles\tEVENT REPORTING\te2\n"
    )
}

fn timex_rows(doc: &str) -> String {
    format!("{doc}\t0\t2\teile\tTIMEX DATE 2009-12-01\tt1\n")
}

fn suffix(annotator: &str) -> String {
    if annotator == "j" {
        String::new()
    } else {
        format!(".ann-{annotator}")
    }
}

fn write_corpus(dir: &Path) {
    let mut base = String::new();
    for doc in DOCS {
        base.push_str(&base_rows(doc));
    }
    fs::write(dir.join("base-segmentation-morph-syntax"), base).unwrap();

    for annotator in ["a", "b", "c", "j"] {
        let suffix = suffix(annotator);
        let docs = files_of(annotator);
        let collect = |rows: fn(&str) -> String| -> String {
            docs.iter().map(|&d| rows(d)).collect()
        };
        fs::write(dir.join(format!("event-annotation{suffix}")), collect(event_rows)).unwrap();
        fs::write(dir.join(format!("timex-annotation{suffix}")), collect(timex_rows)).unwrap();
        fs::write(
            dir.join(format!("tlink-event-timex{suffix}")),
            collect(|d| format!("{d}\te1\tBEFORE\tt1\t\n")),
        )
        .unwrap();
        fs::write(
            dir.join(format!("tlink-event-dct{suffix}")),
            collect(|d| format!("{d}\te1\tBEFORE\t\n")),
        )
        .unwrap();
        fs::write(
            dir.join(format!("tlink-main-events{suffix}")),
            collect(|d| format!("{d}\te1\tAFTER\te2\t\n")),
        )
        .unwrap();
        fs::write(
            dir.join(format!("tlink-subordinate-events{suffix}")),
            collect(|d| format!("{d}\te2\tBEFORE\te1\t\n")),
        )
        .unwrap();
    }
}

fn corpus() -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp directory");
    write_corpus(dir.path());
    dir
}

#[test]
fn test_entity_run_reports_full_agreement() {
    let dir = corpus();
    let mut cmd = Command::cargo_bin("concord").unwrap();
    cmd.args(["entity", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("EVENT-extent"))
        .stdout(predicate::str::contains("TIMEX-extent"))
        .stdout(predicate::str::contains("R: 1.0   P: 1.0   F1: 1.0"))
        .stdout(predicate::str::contains("F1_avg: 1.0"));
}

#[test]
fn test_entity_run_emits_json() {
    let dir = corpus();
    let mut cmd = Command::cargo_bin("concord").unwrap();
    let output = cmd
        .args(["entity", dir.path().to_str().unwrap(), "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let tasks = parsed["tasks"].as_array().unwrap();
    assert!(tasks.iter().any(|t| t["task"] == "EVENT-class"));
    assert!(tasks.iter().any(|t| t["task"] == "TIMEX-value"));
}

#[test]
fn test_combined_run_without_filtering() {
    let dir = corpus();
    let mut cmd = Command::cargo_bin("concord").unwrap();
    cmd.args(["combined", dir.path().to_str().unwrap(), "--filter", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Results over all files (0)"))
        // two events per file remain, all 24 non-judge links survive
        .stdout(predicate::str::contains(
            "all-in-one-EVENT   6 (100.0%) 24 (100.0%) | 1.0  1.0",
        ))
        .stdout(predicate::str::contains(
            "find-TLINK-F1scores | 1.0  1.0  1.0  1.0 | 1.0",
        ))
        .stdout(predicate::str::contains("counts-for-TLINK-base | 6 6 6 6 | 24"))
        .stdout(predicate::str::contains("short-accs-for-TLINK-base   24 |"));
}

#[test]
fn test_combined_run_accepts_comm_correction_flag() {
    let dir = corpus();
    // every annotator agrees exactly, so the correction changes nothing
    let mut cmd = Command::cargo_bin("concord").unwrap();
    cmd.args([
        "combined",
        dir.path().to_str().unwrap(),
        "--filter",
        "0",
        "--comm-correction",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains(
        "find-TLINK-F1scores | 1.0  1.0  1.0  1.0 | 1.0",
    ))
    .stdout(predicate::str::contains("counts-for-TLINK-base | 6 6 6 6 | 24"));
}

#[test]
fn test_combined_run_with_predicate_filter() {
    let dir = corpus();
    // policy 2a keeps only events inside a predicate chain; both annotated
    // events are finite verbs, so nothing is deleted
    let mut cmd = Command::cargo_bin("concord").unwrap();
    cmd.args(["combined", dir.path().to_str().unwrap(), "--filter", "2a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Results over all files (2a)"))
        .stdout(predicate::str::contains("(100.0%)"));
}

#[test]
fn test_combined_run_emits_json() {
    let dir = corpus();
    let mut cmd = Command::cargo_bin("concord").unwrap();
    let output = cmd
        .args(["combined", dir.path().to_str().unwrap(), "--filter", "0", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(parsed["filter"], "0");
    assert_eq!(parsed["find_fscores"].as_array().unwrap().len(), 12);
    assert_eq!(parsed["events_remaining"], 6);
    assert_eq!(parsed["links_remaining"], 24);
}

#[test]
fn test_rejects_unknown_filter_code() {
    let dir = corpus();
    let mut cmd = Command::cargo_bin("concord").unwrap();
    cmd.args(["combined", dir.path().to_str().unwrap(), "--filter", "9z"])
        .assert()
        .failure();
}

#[test]
fn test_missing_corpus_directory_fails() {
    let mut cmd = Command::cargo_bin("concord").unwrap();
    cmd.args(["entity", "/nonexistent/corpus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}
