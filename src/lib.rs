//! Attach short text notes to arbitrary file paths.
//!
//! One background instance owns the note database and a fixed loopback
//! port; every later launch forwards its request to it and exits. The
//! binary in `main.rs` wires these modules together.

pub mod config;
pub mod dispatch;
pub mod frontend;
pub mod logger;
pub mod protocol;
pub mod server;
pub mod store;
pub mod view;
