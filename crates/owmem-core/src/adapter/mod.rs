//! Bus adapter traits and abstractions
//!
//! This module defines the transport collaborator every bank talks through.
//! Adapters own device selection, raw byte exchange, speed switching and
//! power delivery; the banks only sequence them.

mod traits;

pub use traits::*;
