//! Logging setup and report emission for the toxic flow detector.

pub mod logging;
pub mod report;

pub use logging::init_logging;
pub use report::write_report;
