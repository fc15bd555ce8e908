//! Allow-listed built-in macros, `{HOST.HOST}`, optionally positional
//! (`{HOST.HOST2}` refers to the second function of a trigger expression).

use super::Match;
use crate::token::Captures;

pub fn try_match(text: &str, pos: usize, names: &[&str], positional: bool) -> Option<Match> {
    let bytes = text.as_bytes();
    if bytes.get(pos) != Some(&b'{') {
        return None;
    }
    let rest = &bytes[pos + 1..];
    names.iter().find_map(|name| {
        let after = rest.strip_prefix(name.as_bytes())?;
        let (index, tail) = match after.first() {
            Some(d @ b'1'..=b'9') if positional => (Some(d - b'0'), &after[1..]),
            _ => (None, after),
        };
        if tail.first() != Some(&b'}') {
            return None;
        }
        let len = 1 + name.len() + usize::from(index.is_some()) + 1;
        Some(Match {
            len,
            captures: Captures::Macro {
                name: (*name).to_string(),
                index,
            },
        })
    })
}
