pub mod export_use_case;
pub mod normalize_use_case;
pub mod ports;
pub mod wait;

pub use export_use_case::{run_export_session, ExportSummary, ExportTimings, ExportUseCase};
pub use normalize_use_case::{NormalizeOutputs, NormalizeUseCase};
