pub mod client;
pub mod parse;

pub use client::{LlmClient, LlmError};
pub use parse::ModelJson;
