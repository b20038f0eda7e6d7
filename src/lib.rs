//! splice_events
//!
//! Infer alternative splicing events from splice junctions and annotated exons.
//! Junctions and their flanking exons form a symmetric relation graph; skipped
//! exon and mutually exclusive exon events are found by walking that graph,
//! annotated with the transcripts supporting each isoform, and duplicates are
//! consolidated by transcript annotation tags.

pub mod annotation;
pub mod consolidate;
pub mod error;
pub mod events;
pub mod graph;
pub mod index;
pub mod junctions;
pub mod model;
pub mod types;

pub use error::{Error, Result};

pub use annotation::AnnotationBuilder;
pub use index::{AnnotationIndex, AnnotationKeys};

pub use graph::{ItemId, ItemIndex, RelationGraph, Triple};
pub use events::{annotate_isoforms, EventKind, EventRow, EventTable, JunctionAggregator};
pub use consolidate::{
    consolidate_table, ConsolidateOptions, ConsolidatedEvent, Consolidator, Reason, TranscriptLookup,
};

pub use types::{Direction, Region, Strand};
pub use model::exon::Exon;
pub use model::transcript::Transcript;
