//! Token scanners.
//!
//! Every scanner is a pure function `try_match(text, pos, ..) -> Option<Match>`
//! that looks at `text` starting exactly at byte `pos`. Scanners never move a
//! cursor of their own: the [locator](crate::locator) owns the cursor and
//! skips `Match::len` bytes on success.
//!
//! | Scanner | Grammar |
//! |---------|---------|
//! | [`user_macro`] | `{$NAME}`, `{$NAME:context}`, `{$NAME:"quoted context"}` |
//! | [`macro_name`] | `{HOST.HOST}`, `{HOST.HOST2}` from an allow list |
//! | [`replacement`] | `{{HOST.HOST}.regsub("(.*)","\1")}` |
//! | [`macro_function`] | `{host:key[params].func(params)}` |
//! | [`reference`] | `$1` .. `$9` |
//! | [`lld_macro`] | `{#NAME}` |
//! | [`function_id`] | `{12345}` |
//!
//! All offsets are byte offsets. Every grammar starts with an ASCII byte, so
//! a `pos` inside a multi-byte character simply fails to match.
//!
//! Quoted strings, parameter lists and user macros are chumsky grammars run
//! from `pos` with the rest of the text left unread.

use crate::grammar::{parse_prefix, quoted, spaces, to_range, Extra};
use crate::token::Captures;
use chumsky::prelude::*;
use std::ops::Range;

pub mod function_id;
pub mod lld_macro;
pub mod macro_function;
pub mod macro_name;
pub mod reference;
pub mod replacement;
pub mod user_macro;

/// A successful scan: the matched length and what was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub len: usize,
    pub captures: Captures,
}

/// Name characters shared by user and LLD macros.
pub(crate) fn is_macro_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

/// Item key id characters.
pub(crate) fn is_key_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'-'
}

/// Find the end of a double-quoted string starting at `pos` (which must be
/// the opening quote). Returns the offset just past the closing quote.
pub(crate) fn quoted_end(text: &str, pos: usize) -> Option<usize> {
    parse_prefix(quoted(), text, pos).map(|(_, end)| end)
}

/// Strip the quotes of a quoted parameter and unescape `\"`.
///
/// Other backslashes are kept as written, which is what re-quoting expects.
pub fn unquote_param(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('"') => {
                    out.push('"');
                    chars.next();
                }
                Some('\\') => {
                    out.push_str("\\\\");
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Unescape the content of a double-quoted string where both `\"` and `\\`
/// are escapes (user macro contexts, expression strings).
pub(crate) fn unescape_string(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('"' | '\\')) => out.push(next),
                Some(next) => {
                    out.push(c);
                    out.push(next);
                }
                None => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// One parameter of a function-call style argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallParam {
    /// Absolute span of the raw parameter text (quotes included).
    pub span: Range<usize>,
    pub quoted: bool,
    /// Parameter value: the raw text for unquoted parameters, the unescaped
    /// content for quoted ones.
    pub value: String,
}

/// `(param, "quoted, param")`. Spans are offset by `base`.
///
/// A parameter starting with `"` must be a complete quoted string; anything
/// else runs to the next `,` or `)`, trailing spaces included.
pub(crate) fn call_param_list<'src>(
    base: usize,
) -> impl Parser<'src, &'src str, Vec<CallParam>, Extra<'src>> + Clone {
    let quoted_param = quoted()
        .map_with(move |raw: &str, e| CallParam {
            span: to_range(e.span(), base),
            quoted: true,
            value: unquote_param(raw),
        })
        .then_ignore(spaces());
    let unquoted = none_of("\",)")
        .then(none_of(",)").repeated())
        .or_not()
        .to_slice()
        .map_with(move |raw: &str, e| CallParam {
            span: to_range(e.span(), base),
            quoted: false,
            value: raw.to_string(),
        });
    spaces()
        .ignore_then(quoted_param.or(unquoted))
        .separated_by(just(','))
        .collect::<Vec<_>>()
        .delimited_by(just('('), just(')'))
        .labelled("parameter list")
}

/// Scan a comma-separated argument list. `open` is the offset of `(`.
///
/// Returns the offset just past `)` and the parameters. `()` yields a single
/// empty unquoted parameter.
pub(crate) fn call_params(text: &str, open: usize) -> Option<(usize, Vec<CallParam>)> {
    parse_prefix(call_param_list(open), text, open).map(|(params, end)| (end, params))
}
