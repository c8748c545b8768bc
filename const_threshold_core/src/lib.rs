//! Runtime side of `const_threshold`: datatypes, threshold tables, folding,
//! configuration documents and the reference [`ThresholdingEngine`].
//!
//! The generated implementations produced by `const_threshold_macro` are
//! checked against this engine, bit for bit.

pub mod config;
pub mod datatype;
pub mod engine;
pub mod error;
pub mod folding;
pub mod stream;
pub mod table;
pub mod tensor;

pub use config::ThresholdingConfig;
pub use datatype::DataType;
pub use engine::{MemMode, OperatorKind, ThresholdingEngine};
pub use error::{Result, ThresholdingError};
pub use folding::{FoldingConfig, ThresholdMemory};
pub use stream::PackedStream;
pub use table::ThresholdTable;
pub use tensor::Tensor;
