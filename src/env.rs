//! Projection of a decrypted subtree into child-process environment
//! variables.

use crate::error::{KeycloakError, Result};

use serde_json::{Map, Value};
use std::process::{Command, Stdio};

/// Convert a key to SCREAMING_SNAKE_CASE.
///
/// Word boundaries are inserted between lower and upper case letters,
/// between letters and digits, and before the last capital of an acronym
/// that is followed by a lower case letter (`JSONData` -> `JSON_DATA`).
/// Spaces, dashes, dots and underscores all become `_`.
pub fn to_screaming_snake(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, ' ' | '-' | '.' | '_') {
            out.push('_');
            continue;
        }

        if i > 0 && !out.ends_with('_') && is_boundary(chars[i - 1], c, chars.get(i + 1).copied()) {
            out.push('_');
        }
        out.extend(c.to_uppercase());
    }

    out
}

fn is_boundary(prev: char, current: char, next: Option<char>) -> bool {
    let lower_to_upper = prev.is_ascii_lowercase() && current.is_ascii_uppercase();
    let letter_digit = (prev.is_ascii_alphabetic() && current.is_ascii_digit())
        || (prev.is_ascii_digit() && current.is_ascii_alphabetic());
    let acronym_end = prev.is_ascii_uppercase()
        && current.is_ascii_uppercase()
        && next.is_some_and(|n| n.is_ascii_lowercase());
    lower_to_upper || letter_digit || acronym_end
}

/// Turn a flat subtree into `(NAME, value)` pairs, sorted by name.
///
/// Only strings and numbers can become environment values; anything else
/// fails with [`KeycloakError::UnsupportedType`].
pub fn secrets_to_env(subtree: &Map<String, Value>) -> Result<Vec<(String, String)>> {
    let mut vars = subtree
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                _ => {
                    return Err(KeycloakError::UnsupportedType(format!(
                        "'{key}' is not a string or number"
                    )))
                }
            };
            Ok((to_screaming_snake(key), value))
        })
        .collect::<Result<Vec<_>>>()?;
    vars.sort();
    Ok(vars)
}

/// Build `/bin/sh -c "<command>"` with the current environment plus
/// `secrets`, inheriting stdio. Secrets override existing variables.
pub fn prepare_command(command: &[String], secrets: &[(String, String)]) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c")
        .arg(command.join(" "))
        .envs(secrets.iter().map(|(name, value)| (name, value)))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    cmd
}
