//! Function references inside stored trigger expressions, `{12345}`.

use super::Match;
use crate::token::Captures;

pub fn try_match(text: &str, pos: usize) -> Option<Match> {
    let bytes = text.as_bytes();
    if bytes.get(pos) != Some(&b'{') {
        return None;
    }
    let start = pos + 1;
    let end = start + bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count();
    if end == start || bytes.get(end) != Some(&b'}') {
        return None;
    }
    let id = text[start..end].parse().ok()?;
    Some(Match {
        len: end + 1 - pos,
        captures: Captures::FunctionId { id },
    })
}
