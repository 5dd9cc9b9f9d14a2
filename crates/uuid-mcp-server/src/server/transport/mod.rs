//! Frame transport.
//!
//! - [`stdio`] - newline-delimited frames over a reader/writer pair, normally
//!   the process's stdin/stdout.

pub mod stdio;

pub use stdio::{StdioTransport, TransportError};
