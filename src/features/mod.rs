//! # Features
//!
//! Process-level features that sit outside command dispatch.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Crash reporting

pub mod crash_report;
