//! Data layer: the wide time-series table, frequency tags, and reshaping.

pub mod frequency;
pub mod table;
pub mod transform;

pub use frequency::{Frequency, UnknownFrequency, UnknownValueKind, ValueKind};
pub use table::{Series, TableError, TimeSeriesTable};
pub use transform::{transform, FrequencyPanel, TransformError};
