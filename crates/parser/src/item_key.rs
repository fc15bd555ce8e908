//! Item keys: `key_id[param,"quoted, param",[nested,array]]`.
//!
//! [`ItemKey::parse`] produces an explicit parameter tree whose leaves keep
//! their absolute spans in the source key. [`ItemKey::substitute`] rewrites
//! leaf values in place, right to left, re-quoting each rewritten leaf:
//!
//! - a leaf that was quoted stays quoted (forced quoting), so an empty value
//!   becomes `""`;
//! - an unquoted leaf is quoted only when its new value would otherwise change
//!   the parse (see [`quote_param`]).
//!
//! Leaves the callback leaves alone keep their exact bytes, so a key without
//! macros round-trips unchanged.
//!
//! ```rust
//! use hostmacro_parser::item_key::ItemKey;
//!
//! let key = ItemKey::parse(r#"key[a,"b,c",[d,e]]"#).unwrap();
//! assert_eq!(key.key_id(), "key");
//! assert_eq!(key.flat_params(), vec!["a", "b,c", "d", "e"]);
//!
//! let rewritten = key.substitute(|value| (value == "a").then(|| "x,y".to_string()));
//! assert_eq!(rewritten, r#"key["x,y","b,c",[d,e]]"#);
//! ```

use crate::error::ParseFailure;
use crate::grammar::{failure, parse_prefix, quoted, spaces, to_range, Extra};
use crate::scan::{is_key_char, unquote_param};
use chumsky::prelude::*;
use serde::Serialize;
use std::borrow::Cow;
use std::ops::Range;

/// One parameter of an item key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyParam {
    Unquoted {
        span: Range<usize>,
        raw: String,
    },
    Quoted {
        span: Range<usize>,
        raw: String,
        value: String,
    },
    Array {
        span: Range<usize>,
        raw: String,
        params: Vec<KeyParam>,
    },
}

impl KeyParam {
    pub fn span(&self) -> &Range<usize> {
        match self {
            KeyParam::Unquoted { span, .. }
            | KeyParam::Quoted { span, .. }
            | KeyParam::Array { span, .. } => span,
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            KeyParam::Unquoted { raw, .. }
            | KeyParam::Quoted { raw, .. }
            | KeyParam::Array { raw, .. } => raw,
        }
    }

    /// The leaf value, `None` for arrays.
    pub fn value(&self) -> Option<&str> {
        match self {
            KeyParam::Unquoted { raw, .. } => Some(raw),
            KeyParam::Quoted { value, .. } => Some(value),
            KeyParam::Array { .. } => None,
        }
    }
}

/// A parsed item key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemKey {
    source: String,
    key_id: String,
    params: Vec<KeyParam>,
}

impl ItemKey {
    /// Parse a complete item key. Nothing may follow the closing bracket.
    pub fn parse(key: &str) -> Result<Self, ParseFailure> {
        let key_id = any()
            .filter(|c: &char| u8::try_from(*c).is_ok_and(is_key_char))
            .repeated()
            .at_least(1)
            .to_slice()
            .labelled("item key id");
        let (key_id, params) = key_id
            .then(param_list(0).or_not())
            .then_ignore(end())
            .parse(key)
            .into_result()
            .map_err(failure)?;

        Ok(ItemKey {
            source: key.to_string(),
            key_id: key_id.to_string(),
            params: params.unwrap_or_default(),
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn params(&self) -> &[KeyParam] {
        &self.params
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Leaf values in document order, arrays expanded.
    pub fn flat_params(&self) -> Vec<&str> {
        let mut out = Vec::new();
        flatten(&self.params, &mut out);
        out
    }

    /// The `n`th leaf value (0-based) in [`flat_params`](Self::flat_params) order.
    pub fn param(&self, n: usize) -> Option<&str> {
        self.flat_params().get(n).copied()
    }

    /// Rewrite leaf values. `rewrite` returns `Some(new_value)` for leaves it
    /// changes and `None` for leaves to keep byte-for-byte.
    pub fn substitute<F>(&self, mut rewrite: F) -> String
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = self.source.clone();
        substitute_params(&mut out, &self.params, &mut rewrite);
        out
    }
}

fn flatten<'a>(params: &'a [KeyParam], out: &mut Vec<&'a str>) {
    for param in params {
        match param {
            KeyParam::Array { params, .. } => flatten(params, out),
            leaf => out.extend(leaf.value()),
        }
    }
}

/// Spans are absolute and leaves never overlap, so walking every level in
/// reverse keeps the remaining spans valid.
fn substitute_params<F>(out: &mut String, params: &[KeyParam], rewrite: &mut F)
where
    F: FnMut(&str) -> Option<String>,
{
    for param in params.iter().rev() {
        match param {
            KeyParam::Array { params, .. } => substitute_params(out, params, rewrite),
            KeyParam::Quoted { span, value, .. } => {
                if let Some(new_value) = rewrite(value) {
                    out.replace_range(span.clone(), &quote_param(&new_value, true));
                }
            }
            KeyParam::Unquoted { span, raw } => {
                if let Some(new_value) = rewrite(raw) {
                    out.replace_range(span.clone(), &quote_param(&new_value, false));
                }
            }
        }
    }
}

/// Quote an item key parameter value.
///
/// Without `forced`, the value is returned as-is unless it would change the
/// parse: it starts with `"` or a space, ends with a space, or contains `,`,
/// `[` or `]`. Quoting escapes embedded `"` as `\"`.
pub fn quote_param(value: &str, forced: bool) -> Cow<'_, str> {
    if !forced && !needs_quoting(value, &[',', '[', ']']) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(format!("\"{}\"", value.replace('"', "\\\"")))
}

pub(crate) fn needs_quoting(value: &str, specials: &[char]) -> bool {
    value.starts_with('"')
        || value.starts_with(' ')
        || value.ends_with(' ')
        || value.contains(specials)
}

/// A bracketed parameter list with nested arrays. Spans are offset by `base`.
///
/// A parameter starting with `"` must be a complete quoted string and one
/// starting with `[` a complete array; spaces around either are skipped. Any
/// other parameter runs to the next `,` or `]` and may not contain `[`.
fn param_list<'src>(
    base: usize,
) -> impl Parser<'src, &'src str, Vec<KeyParam>, Extra<'src>> + Clone {
    recursive(move |list| {
        let quoted_param = quoted().map_with(move |raw: &str, e| KeyParam::Quoted {
            span: to_range(e.span(), base),
            raw: raw.to_string(),
            value: unquote_param(raw),
        });
        let array = list.map_with(move |params: Vec<KeyParam>, e: &mut chumsky::input::MapExtra<'src, '_, &'src str, Extra<'src>>| KeyParam::Array {
            span: to_range(e.span(), base),
            raw: e.slice().to_string(),
            params,
        });
        let unquoted = none_of("\",[]")
            .then(none_of(",[]").repeated())
            .or_not()
            .to_slice()
            .map_with(move |raw: &str, e| KeyParam::Unquoted {
                span: to_range(e.span(), base),
                raw: raw.to_string(),
            });

        spaces()
            .ignore_then(choice((
                quoted_param.then_ignore(spaces()),
                array.then_ignore(spaces()),
                unquoted,
            )))
            .separated_by(just(','))
            .collect::<Vec<_>>()
            .delimited_by(just('['), just(']'))
            .labelled("parameter list")
    })
}

/// The offset just past the bracketed parameter list opening at `open`.
pub(crate) fn param_list_end(text: &str, open: usize) -> Option<usize> {
    parse_prefix(param_list(open), text, open).map(|(_, end)| end)
}
