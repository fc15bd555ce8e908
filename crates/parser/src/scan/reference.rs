//! Positional references, `$1` .. `$9`.

use super::Match;
use crate::token::Captures;

pub fn try_match(text: &str, pos: usize) -> Option<Match> {
    match text.as_bytes().get(pos..pos + 2)? {
        [b'$', d @ b'1'..=b'9'] => Some(Match {
            len: 2,
            captures: Captures::Reference { index: d - b'0' },
        }),
        _ => None,
    }
}
