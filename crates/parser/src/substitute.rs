//! Right-to-left substitution of located tokens.

use crate::token::MacroToken;

/// Replace tokens in `text` with the values `value_of` returns.
///
/// Tokens must come from one [`find_all`](crate::locator::find_all) pass over
/// `text`. They are applied from the last to the first so that every earlier
/// offset stays valid; a token for which `value_of` returns `None` stays
/// literal.
pub fn splice_tokens<F>(text: &str, tokens: &[MacroToken], mut value_of: F) -> String
where
    F: FnMut(&MacroToken) -> Option<String>,
{
    let mut out = text.to_string();
    let mut limit = text.len();
    for token in tokens.iter().rev() {
        debug_assert!(
            token.end() <= limit,
            "tokens must be non-overlapping and in ascending order"
        );
        limit = token.offset;
        if let Some(value) = value_of(token) {
            out.replace_range(token.span(), &value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::{find_all, ScanSet};
    use crate::token::{Captures, MacroKind};

    #[test]
    fn test_splice_longer_and_shorter_values() {
        let text = "{$A}-{$LONGER}-{$B}";
        let set = ScanSet::new().with(MacroKind::UserMacro);
        let tokens = find_all(text, &set);
        let out = splice_tokens(text, &tokens, |token| match &token.captures {
            Captures::UserMacro { name, .. } if name == "A" => Some("aaaaaa".into()),
            Captures::UserMacro { name, .. } if name == "LONGER" => Some("x".into()),
            _ => None,
        });
        assert_eq!(out, "aaaaaa-x-{$B}");
    }
}
