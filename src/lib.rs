//! # concord
//!
//! Inter-annotator agreement for a layered temporal corpus.
//!
//! The corpus pairs every text with annotation files from three annotators
//! and a judge: morphological/syntactic base segmentation, EVENT and TIMEX
//! entity markup, and four layers of TLINK temporal relations (event to
//! same-sentence timex, event to document creation time, main events of
//! consecutive sentences, subordinated event pairs).
//!
//! - **Entity agreement**: extent and attribute P/R/F between annotator pairs
//! - **Relation agreement**: accuracy and chance-corrected measures (Cohen's
//!   Kappa, Scott's Pi, Krippendorff's Alpha) over contingency tables
//! - **Filtering**: linguistically motivated event-selection policies with
//!   cascading deletion of orphaned relations
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use concord::agree::AggregateCounter;
//! use concord::corpus::{self, Annotator};
//! use concord::report::entity_report;
//!
//! let entities = corpus::load_all_entity_annotations(Path::new("corpus/"))?;
//! let mut counter = AggregateCounter::new();
//! // ... compare annotation extents file by file ...
//! let report = entity_report(&counter, Some(Annotator::Judge));
//! println!("{}", report.render(true, true));
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`corpus`] | Corpus files, entity and relation stores |
//! | [`morph`] | Morphological analysis strings |
//! | [`clause`] | Clause boundaries, predicate chains and tenses |
//! | [`tree`] | Syntactic dependency forests |
//! | [`argstruct`] | Event argument structures |
//! | [`align`] | Annotation alignment between annotators |
//! | [`agree`] | Pairwise agreement counting |
//! | [`chance`] | Chance-corrected agreement coefficients |
//! | [`filter`] | Event filtering policies |
//! | [`report`] | Result aggregation and rendering |

#![warn(missing_docs)]

pub mod agree;
pub mod align;
pub mod argstruct;
pub mod chance;
pub mod clause;
pub mod corpus;
mod error;
pub mod filter;
pub mod morph;
pub mod report;
pub mod tree;

// Re-exports
pub use agree::AggregateCounter;
pub use chance::Agreement;
pub use corpus::Annotator;
pub use error::{Error, Result};
pub use filter::FilterPolicy;
