pub mod normalize;
pub mod table;

pub use normalize::{normalize_table, NormalizationOutput, NormalizationReport};
pub use table::{Cell, StatRow, StatTable};
