//! A small RESP3 server built around a streaming frame decoder.
//!
//! The core is [`Handler`]: a buffered reader over any byte stream that
//! decodes RESP3 frames incrementally, one chunk-sized pull at a time, and
//! classifies every failure into a [`FrameError`]. [`Frame`] is the decoded
//! value and knows how to serialize itself back to the wire. The session
//! loop echoes well-formed frames and reports malformed ones; command
//! handling sits above this crate.

pub mod config;
pub mod error;
pub mod frame;
pub mod handler;
pub mod server;

pub use error::FrameError;
pub use frame::{Frame, FrameKind};
pub use handler::Handler;
