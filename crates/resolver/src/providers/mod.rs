//! Value providers for built-in macros.
//!
//! Each provider takes the full set of ids a call needs and answers from one
//! batched round trip (the interface provider adds one bounded nested
//! resolution for macros inside addresses and ports).

pub mod host;
pub mod interface;
pub mod item;
pub mod regsub;
