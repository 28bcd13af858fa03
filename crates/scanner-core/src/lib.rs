pub mod config;
pub mod error;
pub mod market;
pub mod report;
pub mod stats;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use market::*;
pub use report::*;
pub use traits::*;
pub use types::*;
