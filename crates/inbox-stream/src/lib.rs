//! inbox-stream: Streaming client plumbing for generative text backends
//!
//! This crate submits prompts to a backend and decodes the line-oriented
//! streaming response into text fragments, completion markers and errors.

pub mod backends;
pub mod error;
pub mod stream;
pub mod types;
pub mod wire;

pub use backends::{ByteStream, StreamBackend, http::HttpBackend};
pub use error::{Error, Result};
pub use stream::{StreamEvent, TextAccumulator};
pub use types::*;
pub use wire::{LineBuffer, WireDecoder};
