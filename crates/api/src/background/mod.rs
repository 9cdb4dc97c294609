//! Background tasks.
//!
//! Each submodule spawns a long-running task via `tokio::spawn` and returns
//! its `JoinHandle`; `main.rs` aborts the handles after graceful shutdown.

pub mod editor_sweep;
