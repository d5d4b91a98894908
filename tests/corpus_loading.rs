//! Integration tests for loading the tab-separated corpus files.

use std::fs;
use std::path::Path;

use concord::corpus::{
    self, Annotator, EVENT_ANNOTATION_FILE, TIMEX_ANNOTATION_FILE, TIMEX_DCT_FILE,
};

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("failed to write corpus file");
}

const BASE_ROWS: &str = "\
# file\tsent\tword\ttoken\tmorph\tsynt_id\tsynt_head\n\
doc1\t0\t0\tMees\t\"mees\" L0 S com sg nom @SUBJ\t1\t2\n\
doc1\t0\t1\tsaabus\t\"saabu\" Ls V main indic impf ps3 sg ps af @FMV\t2\t0\n\
doc1\t0\t2\teile\t\"eile\" L0 D @ADVL\t3\t2\n\
doc1\t1\t0\tTa\t\"tema\" L0 P pers ps3 sg nom @SUBJ\t1\t2\n\
doc1\t1\t1\tlahkus\t\"lahku\" Ls V main indic impf ps3 sg ps af @FMV\t2\t0\n";

#[test]
fn test_base_segmentation_splits_sentences() {
    let dir = tempfile::tempdir().expect("failed to create temp directory");
    write(dir.path(), "base", BASE_ROWS);
    let base = corpus::load_base_segmentation(&dir.path().join("base")).unwrap();
    assert_eq!(base.len(), 1);
    let sentences = &base["doc1"];
    assert_eq!(sentences.len(), 2);
    assert_eq!(sentences[0].len(), 3);
    assert_eq!(sentences[1].len(), 2);
    let token = &sentences[0][1];
    assert_eq!(token.sentence_id, 0);
    assert_eq!(token.word_id, 1);
    assert_eq!(token.surface, "saabus");
    assert_eq!(token.synt_id, "2");
    assert_eq!(token.synt_head, "0");
}

#[test]
fn test_base_segmentation_rejects_short_rows() {
    let dir = tempfile::tempdir().expect("failed to create temp directory");
    write(dir.path(), "base", "doc1\t0\t0\tMees\n");
    let err = corpus::load_base_segmentation(&dir.path().join("base")).unwrap_err();
    assert!(err.to_string().contains("expected 7 columns"));
}

#[test]
fn test_entity_annotation_indexes_by_loc_and_id() {
    let dir = tempfile::tempdir().expect("failed to create temp directory");
    let rows = "\
doc1\t0\t1\tsaabus\tEVENT OCCURRENCE\te1\n\
doc1\t1\t1\tlahkus võitlusesse\tEVENT OCCURRENCE\te2\n\
doc1\t1\t2\tlahkus võitlusesse\t---\te2\n";
    write(dir.path(), "events", rows);
    let store = corpus::load_entity_annotation(&dir.path().join("events")).unwrap();
    let entities = &store["doc1"];
    assert_eq!(entities.by_loc[&(0, 1)].len(), 1);
    assert_eq!(entities.by_loc[&(0, 1)][0].entity_id, "e1");
    assert_eq!(entities.by_loc[&(0, 1)][0].tag, "EVENT OCCURRENCE");
    // a multi-token span keeps one location entry per token
    assert_eq!(entities.by_id["e2"].len(), 2);
    assert_eq!(entities.by_id["e2"][0].word_id, 1);
    assert_eq!(entities.by_id["e2"][1].tag, "---");
}

#[test]
fn test_relation_annotation_is_keyed_by_both_endpoints() {
    let dir = tempfile::tempdir().expect("failed to create temp directory");
    write(dir.path(), "tlinks", "doc1\te1\tBEFORE\tt1\tsome comment \n");
    let store = corpus::load_relation_annotation(&dir.path().join("tlinks")).unwrap();
    let by_entity = &store["doc1"];
    assert_eq!(by_entity["e1"].len(), 1);
    assert_eq!(by_entity["t1"].len(), 1);
    assert_eq!(by_entity["e1"][0].relation, "BEFORE");
    assert_eq!(by_entity["e1"][0].comment, "some comment");
    // the same relation under both keys collapses back to one entry
    assert_eq!(corpus::relations_as_list(&store).len(), 1);
}

#[test]
fn test_dct_annotation_maps_file_to_creation_time() {
    let dir = tempfile::tempdir().expect("failed to create temp directory");
    write(
        dir.path(),
        TIMEX_DCT_FILE,
        "doc1\t2009-12-02\ndoc2\t2010-01-15\n",
    );
    let dcts = corpus::load_dct_annotation(&dir.path().join(TIMEX_DCT_FILE)).unwrap();
    assert_eq!(dcts.len(), 2);
    assert_eq!(dcts["doc1"], "2009-12-02");
    assert_eq!(dcts["doc2"], "2010-01-15");
}

#[test]
fn test_dct_relation_gets_synthetic_endpoint() {
    let dir = tempfile::tempdir().expect("failed to create temp directory");
    write(dir.path(), "dct-links", "doc1\te1\tAFTER\t\n");
    let store =
        corpus::load_relation_to_dct_annotation(&dir.path().join("dct-links")).unwrap();
    assert_eq!(store["doc1"]["e1"][0].entity_b, "t0");
    assert_eq!(store["doc1"]["e1"][0].comment, "");
}

#[test]
fn test_load_all_entity_annotations_covers_the_roster() {
    let dir = tempfile::tempdir().expect("failed to create temp directory");
    for annotator in Annotator::ALL {
        let suffix = annotator.file_suffix();
        write(
            dir.path(),
            &format!("{EVENT_ANNOTATION_FILE}{suffix}"),
            "doc1\t0\t1\tsaabus\tEVENT OCCURRENCE\te1\n",
        );
        write(
            dir.path(),
            &format!("{TIMEX_ANNOTATION_FILE}{suffix}"),
            "doc1\t0\t2\teile\tTIMEX DATE 2009-12-01\tt1\n",
        );
    }
    let entities = corpus::load_all_entity_annotations(dir.path()).unwrap();
    assert_eq!(entities.events.len(), 4);
    assert_eq!(entities.timexes.len(), 4);
    let judge = &entities.events[&Annotator::Judge];
    assert!(judge.contains_key("doc1"));
    assert_eq!(judge["doc1"].by_id["e1"][0].expression, "saabus");
}

#[test]
fn test_missing_annotator_file_is_an_error() {
    let dir = tempfile::tempdir().expect("failed to create temp directory");
    // only the judge's files exist
    write(
        dir.path(),
        EVENT_ANNOTATION_FILE,
        "doc1\t0\t1\tsaabus\tEVENT OCCURRENCE\te1\n",
    );
    write(
        dir.path(),
        TIMEX_ANNOTATION_FILE,
        "doc1\t0\t2\teile\tTIMEX DATE 2009-12-01\tt1\n",
    );
    assert!(corpus::load_all_entity_annotations(dir.path()).is_err());
}
