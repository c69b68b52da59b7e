//! Expression substitution against a read-only context
//!
//! Rendering is pure and file-local: a function of the content, the detected
//! syntax and the context value. Dotted names index into the nested context;
//! a name that does not resolve to a scalar fails the whole render, so
//! partial output never exists.

use std::path::Path;

use regex::Regex;
use serde_json::Value;

use crate::error::{StagehandError, StagehandResult};
use crate::template::syntax::{current_regex, legacy_regex, SyntaxKind};

/// Substitute every expression of `syntax` in `content` using `context`.
///
/// `file` only labels errors. Callers must pass `Legacy` or `Current`;
/// detection has already excluded the other kinds.
pub fn render(
    content: &str,
    syntax: SyntaxKind,
    context: &Value,
    file: &Path,
) -> StagehandResult<String> {
    let regex: &Regex = match syntax {
        SyntaxKind::Legacy => legacy_regex(),
        SyntaxKind::Current => current_regex(),
        SyntaxKind::None | SyntaxKind::Conflicting => {
            return Ok(content.to_string());
        }
    };

    let mut rendered = String::with_capacity(content.len());
    let mut last = 0;
    for captures in regex.captures_iter(content) {
        let whole = captures.get(0).expect("capture 0 always exists");
        let name = captures
            .get(1)
            .expect("expression regexes have one group")
            .as_str();
        let value = lookup_scalar(context, name).ok_or_else(|| {
            StagehandError::UndefinedVariable {
                name: name.to_string(),
                file: file.to_path_buf(),
            }
        })?;
        rendered.push_str(&content[last..whole.start()]);
        rendered.push_str(&value);
        last = whole.end();
    }
    rendered.push_str(&content[last..]);
    Ok(rendered)
}

/// Resolve a dotted name to a scalar rendering, if the path exists and the
/// leaf is a string, number or boolean.
fn lookup_scalar(context: &Value, dotted: &str) -> Option<String> {
    let mut current = context;
    for segment in dotted.split('.') {
        current = current.get(segment)?;
    }
    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
