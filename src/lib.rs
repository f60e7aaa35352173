//! autonet: build Rust source units into dynamic libraries, load the types
//! they export, and inspect or mutate a live instance by property name.

pub mod coerce;
pub mod command;
pub mod compiler;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod loader;
pub mod logging;
pub mod reflect;
pub mod registry;
pub mod repl;
pub mod session;
pub mod source;

pub use autonet_abi as abi;
