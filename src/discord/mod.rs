//! Discord side of the bridge.
//!
//! Everything in here runs on the worker thread.
//!
//! ## Module Structure
//!
//! - `gateway`: Platform seam (`Gateway`) and event snapshots
//! - `client`: serenity implementation, event handler and connection loop
//! - `handler`: Event to record translation
//! - `resolver`: Cached user and channel lookup
//! - `commands`: Runtime command registry and built-in commands
//! - `worker`: Worker event loop and queue servicing

pub mod client;
pub mod commands;
pub mod gateway;
pub mod handler;
pub mod resolver;
pub mod worker;

#[cfg(test)]
pub mod testing;
