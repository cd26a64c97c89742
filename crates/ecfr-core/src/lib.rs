#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! ecfr-core
//!
//! Domain records, configuration and the text side of the pipeline: loading
//! collected regulation sections from disk and cutting them into overlapping
//! chunks ready for embedding.

pub mod chunker;
pub mod config;
pub mod corpus;
pub mod error;
pub mod traits;
pub mod types;

pub use chunker::Chunker;
pub use config::{Config, PipelineConfig};
pub use corpus::{CorpusLoader, CorpusStats};
pub use error::{Error, Result};
