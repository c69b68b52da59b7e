//! Template expression syntaxes
//!
//! Two mutually exclusive surface syntaxes are recognized: the current
//! `<% name %>` form and the legacy `&{ name }` form. Detection runs two
//! independent scans; a file matching both is conflicting and is never
//! substituted.

use std::sync::OnceLock;

use regex::Regex;

/// Which expression syntax a file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    /// No recognized expression; the file is left untouched.
    None,
    /// Legacy `&{ name }` expressions.
    Legacy,
    /// Current `<% name %>` expressions.
    Current,
    /// Both syntaxes present; substitution is refused.
    Conflicting,
}

const NAME_PATTERN: &str = r"[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*";

pub(crate) fn current_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"<%\s*({NAME_PATTERN})\s*%>")).expect("current syntax regex")
    })
}

pub(crate) fn legacy_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"&\{{\s*({NAME_PATTERN})\s*\}}")).expect("legacy syntax regex")
    })
}

/// Classify the content by scanning for both syntaxes independently.
pub fn detect(content: &str) -> SyntaxKind {
    let current = current_regex().is_match(content);
    let legacy = legacy_regex().is_match(content);
    match (current, legacy) {
        (true, true) => SyntaxKind::Conflicting,
        (true, false) => SyntaxKind::Current,
        (false, true) => SyntaxKind::Legacy,
        (false, false) => SyntaxKind::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_none() {
        assert_eq!(detect("select 1 from t"), SyntaxKind::None);
    }

    #[test]
    fn current_syntax_detected() {
        assert_eq!(detect("select <% ctx.env.X %>"), SyntaxKind::Current);
    }

    #[test]
    fn legacy_syntax_detected() {
        assert_eq!(detect("select &{ ctx.env.X }"), SyntaxKind::Legacy);
    }

    #[test]
    fn both_syntaxes_conflict() {
        assert_eq!(
            detect("select <% x %> from &{ y }"),
            SyntaxKind::Conflicting
        );
    }

    #[test]
    fn whitespace_inside_delimiters_is_tolerated() {
        assert_eq!(detect("<%x%>"), SyntaxKind::Current);
        assert_eq!(detect("<%   a.b   %>"), SyntaxKind::Current);
        assert_eq!(detect("&{x}"), SyntaxKind::Legacy);
    }

    #[test]
    fn malformed_expressions_do_not_count() {
        // An opener without a valid name or closer is not an expression.
        assert_eq!(detect("a <% b"), SyntaxKind::None);
        assert_eq!(detect("& { spaced }"), SyntaxKind::None);
        assert_eq!(detect("<% 9bad %>"), SyntaxKind::None);
    }

    #[test]
    fn ampersand_in_sql_is_not_legacy_syntax() {
        assert_eq!(detect("where a & b = 3"), SyntaxKind::None);
    }
}
