//! Macros wrapped in a value function: `{{ITEM.VALUE}.regsub("(.*)","\1")}`.

use super::{call_params, macro_name, user_macro, Match};
use crate::token::Captures;

/// Which macros may be wrapped.
#[derive(Debug, Clone, Copy)]
pub struct Inner<'a> {
    pub names: &'a [&'a str],
    pub positional: bool,
    pub user: bool,
}

pub fn try_match(text: &str, pos: usize, inner: Inner<'_>) -> Option<Match> {
    let bytes = text.as_bytes();
    if bytes.get(pos) != Some(&b'{') {
        return None;
    }
    let inner_pos = pos + 1;
    let m = inner_match(text, inner_pos, inner)?;
    let inner_end = inner_pos + m.len;

    if bytes.get(inner_end) != Some(&b'.') {
        return None;
    }
    let fn_start = inner_end + 1;
    let fn_end = fn_start
        + bytes[fn_start..]
            .iter()
            .take_while(|b| b.is_ascii_lowercase())
            .count();
    if fn_end == fn_start {
        return None;
    }

    let (end, params) = call_params(text, fn_end)?;
    if bytes.get(end) != Some(&b'}') {
        return None;
    }

    Some(Match {
        len: end + 1 - pos,
        captures: Captures::Replacement {
            inner: Box::new(m.captures),
            inner_raw: text[inner_pos..inner_end].to_string(),
            function: text[fn_start..fn_end].to_string(),
            params: params.into_iter().map(|p| p.value).collect(),
        },
    })
}

fn inner_match(text: &str, pos: usize, inner: Inner<'_>) -> Option<Match> {
    if inner.user {
        if let Some(m) = user_macro::try_match(text, pos) {
            return Some(m);
        }
    }
    macro_name::try_match(text, pos, inner.names, inner.positional)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INNER: Inner<'static> = Inner {
        names: &["ITEM.VALUE"],
        positional: true,
        user: true,
    };

    #[test]
    fn test_regsub_over_builtin() {
        let text = r#"{{ITEM.VALUE2}.regsub("(\d+)", "\1")} rest"#;
        let m = try_match(text, 0, INNER).unwrap();
        assert_eq!(&text[..m.len], r#"{{ITEM.VALUE2}.regsub("(\d+)", "\1")}"#);
        assert_eq!(
            m.captures,
            Captures::Replacement {
                inner: Box::new(Captures::Macro {
                    name: "ITEM.VALUE".into(),
                    index: Some(2)
                }),
                inner_raw: "{ITEM.VALUE2}".into(),
                function: "regsub".into(),
                params: vec![r"(\d+)".into(), r"\1".into()],
            }
        );
    }

    #[test]
    fn test_user_macro_inner() {
        let m = try_match(r#"{{$A:"x"}.iregsub("a","b")}"#, 0, INNER).unwrap();
        assert!(matches!(m.captures.base(), Captures::UserMacro { .. }));
    }

    #[test]
    fn test_not_a_replacement() {
        assert!(try_match("{{ITEM.VALUE}}", 0, INNER).is_none());
        assert!(try_match("{{ITEM.VALUE}.regsub(1,2)", 0, INNER).is_none());
        assert!(try_match("{{HOST.HOST}.regsub(1,2)}", 0, INNER).is_none());
    }
}
