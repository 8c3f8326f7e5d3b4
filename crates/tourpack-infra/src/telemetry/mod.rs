//! Tracing initialisation
//!
//! Structured logs go to stdout, either human-readable or one JSON object per line
//! for log shippers. Filtering follows `RUST_LOG`, defaulting to `tourpack=info`.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry};
