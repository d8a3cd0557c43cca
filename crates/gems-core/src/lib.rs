//! GemLedger - Core Library
//!
//! Domain logic for the Gems virtual-currency ledger: the blob-backed
//! ledger store, the transfer engine, the polled-request dispatcher, and
//! the ports its adapters implement.

pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod ports;
pub mod transfer;

pub use dispatch::*;
pub use error::*;
pub use ledger::*;
pub use memory::*;
pub use ports::*;
pub use transfer::*;
