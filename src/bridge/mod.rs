//! Cross-process bridge between the pipeline host and the Discord worker.
//!
//! ## Module Structure
//!
//! - `channels`: The five bounded channels and their non-blocking operations
//! - `host`: Pipeline-facing bridge cycle (`Bridge`)
//! - `pipeline`: JSON-lines framing used by the host driver
//! - `supervisor`: Worker startup

pub mod channels;
pub mod host;
pub mod pipeline;
pub mod supervisor;

pub use host::Bridge;
pub use pipeline::{cycle_period, render_output, PendingRecords};
pub use supervisor::spawn_worker;
