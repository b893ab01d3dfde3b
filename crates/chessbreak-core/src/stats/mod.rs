//! Statistics over the stored game history.

mod performance;

pub use performance::{HourPerformance, PerformanceAnalyzer, PerformanceReport};
