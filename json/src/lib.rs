pub mod error;
pub mod json;
pub use error::{JsonError, Result};
pub use json::{dumps, parse_or_text, summarize, truncate};
