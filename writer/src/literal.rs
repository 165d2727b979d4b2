//! Datatype-aware literal encoding.
//!
//! Two call sites quote strings differently when the value contains a double
//! quote: block serialization substitutes an apostrophe, argument extraction
//! wraps the value in triple quotes. Both are kept; callers choose through
//! [`QuotePath`].

use ctm_model::iris::{XSD_ANY_URI, XSD_INTEGER, XSD_STRING};

use crate::prefix::PrefixTable;

/// The call site a literal is encoded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotePath {
    /// Names, occurrences and variants written inside topic blocks.
    Block,
    /// Template invocation arguments.
    Argument,
}

/// Returns true if `value` is a template variable reference (`$name`, no
/// whitespace).
#[must_use]
pub fn is_variable(value: &str) -> bool {
    value.len() > 1 && value.starts_with('$') && !value.chars().any(char::is_whitespace)
}

/// Encodes `value` of type `datatype` for CTM output.
///
/// - `xsd:string`: quoted, or raw if it is a variable.
/// - `xsd:anyURI`: spaces percent-encoded, wrapped in `<…>`.
/// - `xsd:integer`: unchanged.
/// - anything else: quoted, followed by `^^` and the compressed datatype IRI.
///
/// Variables are emitted raw whatever the datatype.
#[must_use]
pub fn encode_literal(value: &str, datatype: &str, path: QuotePath, prefixes: &PrefixTable) -> String {
    if is_variable(value) {
        return value.to_owned();
    }
    match datatype {
        XSD_STRING => quote(value, path),
        XSD_ANY_URI => format!("<{}>", value.replace(' ', "%20")),
        XSD_INTEGER => value.to_owned(),
        _ => format!("{}^^{}", quote(value, path), prefixes.compress(datatype)),
    }
}

/// Quotes a string value for the given call site.
#[must_use]
pub fn quote(value: &str, path: QuotePath) -> String {
    let escaped = value.replace('\\', "\\\\");
    if !escaped.contains('"') {
        return format!("\"{escaped}\"");
    }
    match path {
        QuotePath::Block => format!("\"{}\"", escaped.replace('"', "'")),
        QuotePath::Argument => format!("\"\"\"{}\"\"\"", escape_triple_quoted(&escaped)),
    }
}

/// Escapes the quotes that would close a triple-quoted string early: every
/// third quote of a run, and every quote of a trailing run.
fn escape_triple_quoted(value: &str) -> String {
    let body = value.trim_end_matches('"');
    let trailing = value.len() - body.len();
    let mut out = String::with_capacity(value.len() + trailing + 2);
    let mut run = 0;
    for c in body.chars() {
        if c == '"' {
            run += 1;
            if run == 3 {
                out.push('\\');
                run = 0;
            }
        } else {
            run = 0;
        }
        out.push(c);
    }
    for _ in 0..trailing {
        out.push_str("\\\"");
    }
    out
}
