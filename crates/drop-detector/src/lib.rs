//! Drop Detector
//!
//! Finds a calm stability window immediately followed by a large compounded decline.

pub mod detector;
pub mod windows;

pub use detector::{DetectorParams, DropDetector, DropOutcome};
pub use windows::{missing_weekdays, weekly_bucket_returns, ScanWindows};
