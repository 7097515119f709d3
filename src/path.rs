//! Path navigation inside a document.
//!
//! A path is a sequence of segments. Against an object a segment is a key;
//! against an array it is a non-negative decimal index.

use crate::error::{KeycloakError, Result};
use serde_json::Value;

/// Split a dotted path such as `secrets.dev` into segments. The empty
/// string is the empty path (the document root).
pub fn split_path(path: &str) -> Vec<&str> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('.').collect()
}

/// Resolve `path` to a shared reference.
pub fn resolve<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Result<&'a Value> {
    let mut current = root;
    for segment in path {
        let segment = segment.as_ref();
        current = match current {
            Value::Object(map) => map
                .get(segment)
                .ok_or_else(|| KeycloakError::PathNotFound(segment.to_string()))?,
            Value::Array(items) => {
                let index = parse_index(segment, items.len())?;
                &items[index]
            }
            _ => return Err(KeycloakError::PathNotFound(segment.to_string())),
        };
    }
    Ok(current)
}

/// Resolve `path` to a mutable reference so the subtree can be rewritten in
/// place.
pub fn resolve_mut<'a, S: AsRef<str>>(root: &'a mut Value, path: &[S]) -> Result<&'a mut Value> {
    let mut current = root;
    for segment in path {
        let segment = segment.as_ref();
        current = match current {
            Value::Object(map) => map
                .get_mut(segment)
                .ok_or_else(|| KeycloakError::PathNotFound(segment.to_string()))?,
            Value::Array(items) => {
                let index = parse_index(segment, items.len())?;
                &mut items[index]
            }
            _ => return Err(KeycloakError::PathNotFound(segment.to_string())),
        };
    }
    Ok(current)
}

fn parse_index(segment: &str, len: usize) -> Result<usize> {
    let index: usize = segment
        .parse()
        .map_err(|_| KeycloakError::InvalidIndex(format!("'{segment}' is not an array index")))?;
    if index >= len {
        return Err(KeycloakError::InvalidIndex(format!(
            "{index} is out of range for array of length {len}"
        )));
    }
    Ok(index)
}
