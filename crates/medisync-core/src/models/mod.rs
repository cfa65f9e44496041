//! Domain models for the inventory import pipeline.

mod cell;
mod record;
mod upload;

pub use cell::*;
pub use record::*;
pub use upload::*;
