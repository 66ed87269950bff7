//! Document codecs
//!
//! Collection documents are pretty-printed JSON; journal entries use the
//! frontmatter format in [`frontmatter`]. Both report decode failures as
//! `Malformed` with the offending path.

use crate::error::{KbError, Result};
use crate::store::DocumentPath;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod frontmatter;

pub use frontmatter::{FrontmatterDocument, MetaValue, Metadata};

/// Decode a JSON document into `T`
pub fn decode_json<T: DeserializeOwned>(path: &DocumentPath, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| KbError::malformed(path.as_str(), e.to_string()))
}

/// Encode `value` as pretty-printed JSON with a trailing newline
pub fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode UTF-8 text, reporting invalid bytes as `Malformed`
pub fn decode_text(path: &DocumentPath, bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| KbError::malformed(path.as_str(), format!("not valid UTF-8: {e}")))
}
