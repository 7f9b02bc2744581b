pub mod archive;
pub mod config;
pub mod entropy_coding;
pub mod error;
pub mod helpers;
pub mod history;
pub mod macros;
pub mod models;
pub mod pipeline;
pub mod search;

pub use archive::Archive;
pub use config::Config;
pub use error::{Error, ModelingError, Result};
pub use models::{ContextModel, ProbabilitySource};
pub use pipeline::{compress, decompress, CompressionFailure};
