//! User macros: `{$NAME}`, `{$NAME:context}`, `{$NAME:"quoted context"}`.
//!
//! Stored macro definitions use the same grammar plus a regex context form,
//! `{$NAME:regex:"^eth"}`, parsed by [`MacroDefinition::parse`].

use super::{is_macro_name_char, unescape_string, Match};
use crate::grammar::{parse_prefix, quoted, spaces, Extra};
use crate::token::Captures;
use chumsky::prelude::*;

/// Context of a user macro as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    None,
    Exact(String),
    Regex(String),
}

impl Context {
    fn into_exact(self) -> Option<Option<String>> {
        match self {
            Context::None => Some(None),
            Context::Exact(value) => Some(Some(value)),
            Context::Regex(_) => None,
        }
    }
}

pub fn try_match(text: &str, pos: usize) -> Option<Match> {
    if !text.as_bytes().get(pos..)?.starts_with(b"{$") {
        return None;
    }
    let ((name, context), end) = parse_prefix(user_macro(false), text, pos)?;
    Some(Match {
        len: end - pos,
        captures: Captures::UserMacro {
            name,
            context: context.into_exact()?,
        },
    })
}

/// A stored user macro definition: name plus exact or regex context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    pub name: String,
    pub context: Context,
}

impl MacroDefinition {
    /// Parse a stored macro name, braced (`{$A:ctx}`) or bare (`A:ctx`).
    pub fn parse(stored: &str) -> Option<Self> {
        let braced;
        let text = if stored.starts_with("{$") {
            stored
        } else {
            braced = format!("{{${}}}", stored);
            &braced
        };
        let (name, context) = user_macro(true)
            .then_ignore(end())
            .parse(text)
            .into_result()
            .ok()?;
        Some(MacroDefinition { name, context })
    }
}

/// `{$NAME}`, `{$NAME:context}` or `{$NAME:"quoted context"}`.
///
/// Spaces after `:` are skipped. A context starting with `"` must be a
/// complete quoted string followed only by spaces. The `regex:` prefix is
/// recognised only with `allow_regex`.
fn user_macro<'src>(
    allow_regex: bool,
) -> impl Parser<'src, &'src str, (String, Context), Extra<'src>> + Clone {
    let name = any()
        .filter(|c: &char| u8::try_from(*c).is_ok_and(is_macro_name_char))
        .repeated()
        .at_least(1)
        .to_slice()
        .labelled("macro name");
    let quoted_context = quoted()
        .map(|raw: &str| unescape_string(&raw[1..raw.len() - 1]))
        .then_ignore(spaces());
    let plain_context = none_of("\"}")
        .then(none_of('}').repeated())
        .or_not()
        .to_slice()
        .map(str::to_string);
    let regex = just("regex:")
        .filter(move |_| allow_regex)
        .then(spaces())
        .or_not()
        .map(|prefix| prefix.is_some());
    let context = just(':')
        .ignore_then(spaces())
        .ignore_then(regex)
        .then(quoted_context.or(plain_context))
        .map(|(regex, value)| {
            if regex {
                Context::Regex(value)
            } else {
                Context::Exact(value)
            }
        });

    just("{$")
        .ignore_then(name)
        .then(context.or_not())
        .then_ignore(just('}'))
        .map(|(name, context): (&str, _)| (name.to_string(), context.unwrap_or(Context::None)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(text: &str) -> Option<(usize, String, Option<String>)> {
        try_match(text, 0).map(|m| match m.captures {
            Captures::UserMacro { name, context } => (m.len, name, context),
            other => panic!("unexpected captures {other:?}"),
        })
    }

    #[test]
    fn test_plain_user_macro() {
        assert_eq!(captured("{$MY.MACRO} tail"), Some((11, "MY.MACRO".into(), None)));
    }

    #[test]
    fn test_context_forms() {
        assert_eq!(
            captured("{$A:eth0}"),
            Some((9, "A".into(), Some("eth0".into())))
        );
        assert_eq!(captured("{$A:}"), Some((5, "A".into(), Some("".into()))));
        assert_eq!(
            captured(r#"{$A:  "x}y" }"#),
            Some((13, "A".into(), Some("x}y".into())))
        );
        assert_eq!(
            captured(r#"{$A:"q\"t\\"}"#),
            Some((13, "A".into(), Some("q\"t\\".into())))
        );
    }

    #[test]
    fn test_match_inside_text() {
        let text = r#"ping {$A: "b\"c" } now"#;
        let m = try_match(text, 5).unwrap();
        assert_eq!(&text[5..5 + m.len], r#"{$A: "b\"c" }"#);
        assert_eq!(
            m.captures,
            Captures::UserMacro {
                name: "A".into(),
                context: Some("b\"c".into())
            }
        );
        assert!(try_match(text, 4).is_none());
    }

    #[test]
    fn test_malformed_is_no_match() {
        assert_eq!(captured("{$}"), None);
        assert_eq!(captured("{$A"), None);
        assert_eq!(captured("{$A:\"open}"), None);
        assert_eq!(captured("{$A:\"x\" y}"), None);
        assert_eq!(captured("{$A-B}"), None);
        assert_eq!(captured("{A}"), None);
    }

    #[test]
    fn test_regex_context_only_in_definitions() {
        assert_eq!(
            captured("{$A:regex:^eth}"),
            Some((15, "A".into(), Some("regex:^eth".into())))
        );
        let def = MacroDefinition::parse(r#"{$A:regex:"^eth[0-9]"}"#).unwrap();
        assert_eq!(def.context, Context::Regex("^eth[0-9]".into()));
    }

    #[test]
    fn test_bare_definitions() {
        let def = MacroDefinition::parse("TIMEOUT:db").unwrap();
        assert_eq!(def.name, "TIMEOUT");
        assert_eq!(def.context, Context::Exact("db".into()));
        assert_eq!(MacroDefinition::parse("{$A} extra"), None);
    }
}
