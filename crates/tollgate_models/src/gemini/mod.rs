//! Google Gemini REST backend.
//!
//! Calls `models/{model}:generateContent` with the contents, the fixed system
//! instruction and the generation options of a request, and joins the text
//! parts of the first candidate.

mod client;
mod wire;

pub use client::{DEFAULT_BASE_URL, GeminiRestBackend};
