//! concord - temporal annotation agreement CLI
//!
//! Computes inter-annotator agreements over a layered temporal annotation
//! corpus: entity (EVENT, TIMEX) extents and attributes, and TLINK relation
//! agreements combined with linguistically motivated event filtering.
//!
//! # Usage
//!
//! ```bash
//! # Entity annotation agreements over a corpus directory
//! concord entity corpus/
//!
//! # Combined EVENT and TLINK agreements, keeping only events whose
//! # annotated token is inside a predicate chain
//! concord combined corpus/ --filter 2a
//!
//! # Machine-readable output
//! concord combined corpus/ --filter 3g --json
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use concord::agree::{
    self, comp_annotation_attribs, comp_annotation_extents, record_tlinks_matches,
    AggregateCounter, RelationMerging, TlinkLayer,
};
use concord::corpus::{
    self, Annotator, EntityAnnotations, EntityLoc, Relation, RelationLayer, TlinkCollections,
    BASE_ANNOTATION_FILE,
};
use concord::filter::{self, FilterPolicy, FilterStatistics};
use concord::report::{entity_report, filtering_summary};
use concord::tree::{self, EntityKind};
use concord::{Error, Result};

/// Inter-annotator agreement for layered temporal annotations
#[derive(Parser)]
#[command(name = "concord")]
#[command(author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Emit results as JSON instead of the plain-text report
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Entity (EVENT, TIMEX) annotation agreements
    #[command(visible_alias = "e")]
    Entity(EntityArgs),

    /// Combined EVENT and TLINK agreements under an event filter
    #[command(visible_alias = "c")]
    Combined(CombinedArgs),
}

#[derive(Args)]
struct EntityArgs {
    /// Corpus directory with base segmentation and annotation files
    corpus_dir: PathBuf,
}

#[derive(Args)]
struct CombinedArgs {
    /// Corpus directory with base segmentation and annotation files
    corpus_dir: PathBuf,

    /// Event filtering policy code, e.g. 0, 1a, 2a, 3g or 6*i
    #[arg(long, default_value = "2a")]
    filter: FilterPolicy,

    /// Score relations over switched endpoints as agreement when the
    /// relation types are each other's inverses
    #[arg(long)]
    comm_correction: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Entity(args) => cmd_entity(args, cli.json),
        Commands::Combined(args) => cmd_combined(args, cli.json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Error::invalid_input(format!("cannot serialize results: {e}")))
}

/// Files of the judge, in sorted order. The judge annotated the whole
/// corpus, so this is the complete file roster.
fn judge_files(events: &EntityAnnotations) -> Result<Vec<String>> {
    let store = events.get(&Annotator::Judge).ok_or_else(|| {
        Error::corpus("no event annotations found for the judge".to_string())
    })?;
    Ok(store.keys().cloned().collect())
}

fn annotators_of_file(events: &EntityAnnotations, file: &str) -> Vec<Annotator> {
    Annotator::ALL
        .iter()
        .copied()
        .filter(|ann| events.get(ann).is_some_and(|s| s.contains_key(file)))
        .collect()
}

/// Expands a per-file roster into comparison pairs, each ordered with the
/// judge (or else the alphabetically later annotator) as the suggestion
/// side.
fn pairs_for_roster(annotators: &[Annotator]) -> Result<Vec<(Annotator, Annotator)>> {
    match annotators {
        [x, y] => Ok(vec![agree::ordered_pair(*x, *y)]),
        [x, y, z] => Ok(vec![
            agree::ordered_pair(*x, *y),
            agree::ordered_pair(*y, *z),
            agree::ordered_pair(*x, *z),
        ]),
        other => Err(Error::invariant(format!(
            "unexpected number of annotators: {}",
            other.len()
        ))),
    }
}

fn file_by_id<'a>(
    annotations: &'a EntityAnnotations,
    annotator: Annotator,
    file: &str,
    empty: &'a BTreeMap<String, Vec<EntityLoc>>,
) -> &'a BTreeMap<String, Vec<EntityLoc>> {
    annotations
        .get(&annotator)
        .and_then(|s| s.get(file))
        .map_or(empty, |e| &e.by_id)
}

// ------------------------------------------------------------
//    Corpus-wide counts
// ------------------------------------------------------------

/// Records how many distinct entity ids each annotator drew in one file,
/// plus the number of distinct non-judge annotation locations under the
/// `_all_uniq_anns` key.
fn record_event_counts(
    events: &EntityAnnotations,
    phase: &str,
    counter: &mut AggregateCounter,
    file: &str,
    judge: Annotator,
) {
    let mut uniq_locs: BTreeSet<(usize, usize)> = BTreeSet::new();
    for (annotator, store) in events {
        let mut counted: BTreeSet<&str> = BTreeSet::new();
        let Some(entities) = store.get(file) else {
            continue;
        };
        for (&loc, spans) in &entities.by_loc {
            for span in spans {
                if counted.insert(span.entity_id.as_str()) {
                    counter.add(phase, annotator.as_label(), "_", 1);
                    counter.add(phase, "_all", "_", 1);
                    if *annotator != judge {
                        uniq_locs.insert(loc);
                    }
                }
            }
        }
    }
    counter.add(phase, "_all_uniq_anns", "_", uniq_locs.len() as i64);
}

enum TlinkCountPhase {
    /// All loaded relations.
    All,
    /// Relations remaining after the deletion cascade.
    Remaining,
}

fn layer_lists(
    tlinks: &TlinkCollections,
    annotator: Annotator,
) -> Vec<Vec<(String, Relation)>> {
    [
        &tlinks.event_timex,
        &tlinks.event_dct,
        &tlinks.main_events,
        &tlinks.sub_events,
    ]
    .iter()
    .map(|layer: &&RelationLayer| {
        layer
            .get(&annotator)
            .map(corpus::relations_as_list)
            .unwrap_or_default()
    })
    .collect()
}

/// Records relation totals over all four layers, either the initial counts
/// or the counts remaining after filtering.
fn record_tlink_counts(
    tlinks: &TlinkCollections,
    phase: &TlinkCountPhase,
    counter: &mut AggregateCounter,
    judge: Annotator,
) {
    const REMAIN_LAYER_KEYS: [&str; 4] =
        ["1-event_timex", "2-event_dct", "3-main_events", "4-event_event"];
    for annotator in Annotator::ALL {
        let lists = layer_lists(tlinks, annotator);
        match phase {
            TlinkCountPhase::All => {
                for (i, list) in lists.iter().enumerate() {
                    let n = list.len() as i64;
                    counter.add("total-count-tlinks", annotator.as_label(), "_", n);
                    if annotator != judge {
                        counter.add("total-count-tlinks", "_all", "_", n);
                    } else {
                        let metric = format!("tlink_layer_{}", i + 1);
                        counter.add("total-count-tlinks", judge.as_label(), &metric, n);
                    }
                }
            }
            TlinkCountPhase::Remaining => {
                for (i, list) in lists.iter().enumerate() {
                    for (_file, relation) in list {
                        counter.add(
                            "total-count-remaining-tlinks",
                            annotator.as_label(),
                            "_",
                            1,
                        );
                        counter.add(
                            "total-count-remaining-tlinks",
                            "_all",
                            REMAIN_LAYER_KEYS[i],
                            1,
                        );
                        counter.add("total-count-remaining-tlinks", "_all", "_all", 1);
                        if relation.relation == "VAGUE" {
                            counter.add("total-count-remaining-tlinks", "_all", "_vague", 1);
                            counter.add(
                                "total-count-remaining-tlinks",
                                annotator.as_label(),
                                "_vague",
                                1,
                            );
                        }
                    }
                }
            }
        }
    }
}

// ------------------------------------------------------------
//    Entity agreement run
// ------------------------------------------------------------

fn cmd_entity(args: EntityArgs, json: bool) -> Result<()> {
    let entities = corpus::load_all_entity_annotations(&args.corpus_dir)?;
    let judge = Annotator::Judge;
    let mut counter = AggregateCounter::new();
    let empty = BTreeMap::new();
    for file in judge_files(&entities.events)? {
        let annotators = annotators_of_file(&entities.events, &file);
        if annotators.len() < 2 {
            return Err(Error::corpus(format!(
                "too few annotators ({}) for the file {file}",
                annotators.len()
            )));
        }
        log::info!("processing {file} ({} annotators)", annotators.len());
        let pairs = pairs_for_roster(&annotators)?;
        for &(sug, reference) in &pairs {
            for kind in [EntityKind::Event, EntityKind::Timex] {
                let annotations = match kind {
                    EntityKind::Event => &entities.events,
                    EntityKind::Timex => &entities.timexes,
                };
                comp_annotation_extents(
                    kind,
                    sug,
                    reference,
                    file_by_id(annotations, sug, &file, &empty),
                    file_by_id(annotations, reference, &file, &empty),
                    &mut counter,
                );
            }
        }
        for &(sug, reference) in &pairs {
            for kind in [EntityKind::Event, EntityKind::Timex] {
                let annotations = match kind {
                    EntityKind::Event => &entities.events,
                    EntityKind::Timex => &entities.timexes,
                };
                comp_annotation_attribs(
                    kind,
                    sug,
                    reference,
                    file_by_id(annotations, sug, &file, &empty),
                    file_by_id(annotations, reference, &file, &empty),
                    &mut counter,
                    true,
                )?;
            }
        }
    }
    let report = entity_report(&counter, Some(judge));
    if json {
        println!("{}", to_json(&report)?);
    } else {
        print!("{}", report.render(true, true));
    }
    Ok(())
}

// ------------------------------------------------------------
//    Combined filtering run
// ------------------------------------------------------------

fn cmd_combined(args: CombinedArgs, json: bool) -> Result<()> {
    log::info!("using the filtering method: {}", args.filter);
    let base =
        corpus::load_base_segmentation(&args.corpus_dir.join(BASE_ANNOTATION_FILE))?;
    let mut entities = corpus::load_all_entity_annotations(&args.corpus_dir)?;
    let mut tlinks = corpus::load_all_tlink_annotations(&args.corpus_dir)?;
    let judge = Annotator::Judge;

    let mut counter = AggregateCounter::new();
    let mut stats = FilterStatistics::new();
    let mut file_to_annotators: BTreeMap<String, Vec<Annotator>> = BTreeMap::new();
    let empty = BTreeMap::new();
    for file in judge_files(&entities.events)? {
        log::info!("processing {file}");
        let annotators = annotators_of_file(&entities.events, &file);
        if annotators.len() < 3 {
            return Err(Error::corpus(format!(
                "too few annotators ({}) for the file {file}",
                annotators.len()
            )));
        }
        file_to_annotators.insert(file.clone(), annotators.clone());

        let sentences = base.get(&file).ok_or_else(|| {
            Error::corpus(format!("no base segmentation for the file {file}"))
        })?;
        let forests = tree::build_annotated_forests(sentences)?;

        record_event_counts(&entities.events, "total-count-events", &mut counter, &file, judge);
        filter::filter_annotations(
            &file,
            &annotators,
            judge,
            sentences,
            &forests,
            &mut entities.events,
            &entities.timexes,
            &args.filter,
            &mut stats,
        )?;
        record_event_counts(
            &entities.events,
            "total-count-remaining-events",
            &mut counter,
            &file,
            judge,
        );

        // Agreements on the surviving events
        let pairs = pairs_for_roster(&annotators)?;
        for &(sug, reference) in &pairs {
            comp_annotation_extents(
                EntityKind::Event,
                sug,
                reference,
                file_by_id(&entities.events, sug, &file, &empty),
                file_by_id(&entities.events, reference, &file, &empty),
                &mut counter,
            );
        }
        for &(sug, reference) in &pairs {
            comp_annotation_attribs(
                EntityKind::Event,
                sug,
                reference,
                file_by_id(&entities.events, sug, &file, &empty),
                file_by_id(&entities.events, reference, &file, &empty),
                &mut counter,
                true,
            )?;
        }
    }

    let all_deleted: i64 = stats.values().map(|s| s.del_ids).sum();
    let all_ids: i64 = stats.values().map(|s| s.all_ids).sum();
    log::info!("events deleted (counting ids): {all_deleted} / {all_ids}");
    if let Some(judge_stats) = stats.get(&judge) {
        log::info!(
            "judge events deleted (counting ids): {} / {}",
            judge_stats.del_ids,
            judge_stats.all_ids
        );
    }

    record_tlink_counts(&tlinks, &TlinkCountPhase::All, &mut counter, judge);
    filter::filter_out_deleted_relations(&mut tlinks, &entities.events, judge)?;
    record_tlink_counts(&tlinks, &TlinkCountPhase::Remaining, &mut counter, judge);

    log::info!("recording relation annotation agreements");
    for layer in TlinkLayer::ALL {
        let relation_layer = match layer {
            TlinkLayer::EventTimex => &tlinks.event_timex,
            TlinkLayer::EventDct => &tlinks.event_dct,
            TlinkLayer::MainEvents => &tlinks.main_events,
            TlinkLayer::EventEvent => &tlinks.sub_events,
        };
        let all_relations: BTreeMap<Annotator, Vec<(String, Relation)>> = Annotator::ALL
            .iter()
            .map(|&ann| {
                (
                    ann,
                    relation_layer
                        .get(&ann)
                        .map(corpus::relations_as_list)
                        .unwrap_or_default(),
                )
            })
            .collect();
        for merging in RelationMerging::RECORDED {
            record_tlinks_matches(
                &all_relations,
                layer,
                merging,
                &mut counter,
                &file_to_annotators,
                args.comm_correction,
            );
        }
    }

    let summary = filtering_summary(&counter, &args.filter.to_string(), Some(judge))?;
    if json {
        println!("{}", to_json(&summary)?);
    } else {
        println!("{}", "=".repeat(30));
        println!(" Results over all files ({})", args.filter);
        println!("{}", "=".repeat(30));
        print!("{}", summary.render());
    }
    Ok(())
}
