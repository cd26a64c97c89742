//! ecfr-vector
//!
//! Exact flat L2 index, artifact codecs and store, the build pipeline and the
//! query service over the latest committed run.

pub mod codec;
pub mod index;
pub mod pipeline;
pub mod search;
pub mod store;

pub use index::FlatL2Index;
pub use pipeline::{BuildOutcome, BuildPipeline};
pub use search::{query_latest, QueryService};
pub use store::ArtifactStore;
