//! Core traits for the FRAME fantasy console.
//!
//! The machine, the host window, and the debug analyser all meet at these
//! seams. Nothing here knows about the FRAME memory map or instruction set.

mod bus;
mod observable;
mod surface;
mod tickable;

pub use bus::Bus;
pub use observable::{Observable, Value};
pub use surface::Surface;
pub use tickable::Tickable;
