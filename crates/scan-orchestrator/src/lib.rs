//! Scan orchestration: bounded concurrent per-ticker evaluation, error aggregation and
//! ranking into a [`ScanReport`](scanner_core::ScanReport).

pub mod providers;
pub mod scanner;

#[cfg(test)]
mod fixtures;

pub use providers::{InMemoryProvider, JsonDirectoryProvider, TickerFile};
pub use scanner::{FallenAngelScanner, TickerOutcome};
