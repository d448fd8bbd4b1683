//! Evaluation of human-object interaction detectors.
//!
//! The evaluator pulls batches from an ordered prefetching stream, runs a
//! model on them, restores pixel coordinates, maps compact verb scores to
//! the full interaction vocabulary and buckets every candidate by its
//! object class into a scoring-ready [ResultArtifact](artifact::ResultArtifact).

mod common;
pub mod accumulator;
pub mod artifact;
pub mod batch;
pub mod dataset;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod obj_range;
pub mod prefetch;
pub mod spatial;
pub mod timer;
pub mod utils;
pub mod verb_mapping;

pub use accumulator::BucketAccumulator;
pub use artifact::{ExperimentDir, ResultArtifact};
pub use batch::{Batch, SampleRecord};
pub use error::EvalError;
pub use evaluator::{Evaluator, EvaluatorInit};
pub use model::{HoiModel, ModelKind, ModelOutput, OutputFields, ScoreKind, ScoreSet};
pub use obj_range::{ObjectRange, NUM_OBJECT_CLASSES};
pub use verb_mapping::VerbMapping;
