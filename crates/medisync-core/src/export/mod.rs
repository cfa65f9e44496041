//! Export functionality for stored inventory.

mod inventory;

pub use inventory::*;
