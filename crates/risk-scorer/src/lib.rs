//! Risk Scorer
//!
//! Turns a fundamentals snapshot and a drop event into a 0-10 bankruptcy risk score.

pub mod scale;
pub mod scorer;

pub use scale::PiecewiseScale;
pub use scorer::{RiskScales, RiskScorer, RiskWeights};
