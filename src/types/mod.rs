//! Shared types: error taxonomy and response status codes

mod error;
mod respcode;

pub use error::{QuillError, Result};
pub use respcode::RespCode;
