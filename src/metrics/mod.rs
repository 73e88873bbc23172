pub mod engine;
pub mod report;
pub mod runner;
pub mod window;

pub use report::{write_report, MetricRow};
pub use runner::BatchRunner;
pub use window::AnalysisWindow;
