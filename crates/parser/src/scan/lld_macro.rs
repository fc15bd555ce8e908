//! Low-level discovery macros, `{#NAME}`.

use super::{is_macro_name_char, Match};
use crate::token::Captures;

pub fn try_match(text: &str, pos: usize) -> Option<Match> {
    let bytes = text.as_bytes();
    if !bytes[pos..].starts_with(b"{#") {
        return None;
    }
    let start = pos + 2;
    let end = start
        + bytes[start..]
            .iter()
            .take_while(|b| is_macro_name_char(**b))
            .count();
    if end == start || bytes.get(end) != Some(&b'}') {
        return None;
    }
    Some(Match {
        len: end + 1 - pos,
        captures: Captures::LldMacro {
            name: text[start..end].to_string(),
        },
    })
}
