//! Gems Types - Pure type definitions
//!
//! This crate contains only pure data types with no async runtime
//! dependencies, shared between the core, the adapters, and the server.

pub mod identity;
pub mod message;
pub mod preferences;
pub mod transaction;

pub use identity::*;
pub use message::*;
pub use preferences::*;
pub use transaction::*;
