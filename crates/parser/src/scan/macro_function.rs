//! Macro functions: `{host:key.func(params)}`.
//!
//! The host part is a literal host name or a braced macro (`{HOST.HOST2}`,
//! `{$HOST}`). The key is either a bare key id, in which case the *last* `.`
//! before `(` separates key from function, or a key with a bracketed
//! parameter list followed by `.func`.

use super::{call_params, is_key_char, macro_name, user_macro, Match};
use crate::item_key::param_list_end;
use crate::token::{Captures, HostRef};

/// Which inner macros may stand in for the host name.
#[derive(Debug, Clone, Copy)]
pub struct HostMacros<'a> {
    pub names: &'a [&'a str],
    pub positional: bool,
    pub user: bool,
}

fn is_host_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b' ' | b'-')
}

pub fn try_match(text: &str, pos: usize, hosts: HostMacros<'_>) -> Option<Match> {
    let bytes = text.as_bytes();
    if bytes.get(pos) != Some(&b'{') {
        return None;
    }

    let (host, mut p) = host_part(text, pos + 1, hosts)?;
    if bytes.get(p) != Some(&b':') {
        return None;
    }
    p += 1;

    let key_start = p;
    while p < bytes.len() && is_key_char(bytes[p]) {
        p += 1;
    }
    let (key, function, open) = match bytes.get(p) {
        Some(b'[') if p > key_start => {
            let end = param_list_end(text, p)?;
            if bytes.get(end) != Some(&b'.') {
                return None;
            }
            let fn_start = end + 1;
            let fn_end = fn_start
                + bytes[fn_start..]
                    .iter()
                    .take_while(|b| b.is_ascii_lowercase())
                    .count();
            if fn_end == fn_start {
                return None;
            }
            (&text[key_start..end], &text[fn_start..fn_end], fn_end)
        }
        Some(b'(') => {
            let run = &text[key_start..p];
            let dot = run.rfind('.')?;
            let (key, function) = (&run[..dot], &run[dot + 1..]);
            if key.is_empty()
                || function.is_empty()
                || !function.bytes().all(|b| b.is_ascii_lowercase())
            {
                return None;
            }
            (key, function, p)
        }
        _ => return None,
    };

    let (end, params) = call_params(text, open)?;
    if bytes.get(end) != Some(&b'}') {
        return None;
    }

    Some(Match {
        len: end + 1 - pos,
        captures: Captures::MacroFunction {
            host,
            key: key.to_string(),
            function: function.to_string(),
            params: params.into_iter().map(|p| p.value).collect(),
        },
    })
}

fn host_part(text: &str, pos: usize, hosts: HostMacros<'_>) -> Option<(HostRef, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(pos) == Some(&b'{') {
        if hosts.user {
            if let Some(m) = user_macro::try_match(text, pos) {
                if let Captures::UserMacro { name, context } = m.captures {
                    return Some((HostRef::User { name, context }, pos + m.len));
                }
            }
        }
        let m = macro_name::try_match(text, pos, hosts.names, hosts.positional)?;
        return match m.captures {
            Captures::Macro { name, index } => Some((HostRef::Macro { name, index }, pos + m.len)),
            _ => None,
        };
    }

    let end = pos + bytes[pos..].iter().take_while(|b| is_host_char(**b)).count();
    if end == pos {
        return None;
    }
    Some((
        HostRef::Literal {
            host: text[pos..end].to_string(),
        },
        end,
    ))
}
