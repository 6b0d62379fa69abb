//! # Cairn Core
//!
//! Core types and error definitions shared by the Cairn crates.
//! The cache layer, its configuration and its logging setup all report
//! failures through [`CairnError`].

pub mod error;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use result::*;

// Re-export shaku for dependency injection
pub use shaku::{module, HasComponent, Interface};
