//! Stored trigger expressions: `{12}>{$LIMIT} or {13}="down"`.
//!
//! Two things are read out of an expression. Function ids `{N}` give
//! positional macros their meaning (`{HOST.HOST2}` is the host of the second
//! function). Constants give reference macros theirs: `$1` is the first
//! number, user macro or string constant of the expression.

use crate::locator::{find_all, ScanSet};
use crate::scan::{quoted_end, unescape_string, user_macro};
use crate::token::{Captures, MacroKind};

/// Function ids in order of appearance.
pub fn function_ids(expression: &str) -> Vec<u64> {
    let set = ScanSet::new()
        .with(MacroKind::UserMacro)
        .with(MacroKind::LldMacro)
        .with(MacroKind::FunctionId);
    find_all(expression, &set)
        .into_iter()
        .filter_map(|token| match token.captures {
            Captures::FunctionId { id } => Some(id),
            _ => None,
        })
        .collect()
}

/// The function id a positional index refers to. Index `None` and `0` both
/// mean the first function.
pub fn function_id(ids: &[u64], index: Option<u8>) -> Option<u64> {
    let n = usize::from(index.unwrap_or(1).max(1));
    ids.get(n - 1).copied()
}

/// Constants of an expression in order of appearance: numbers (with their
/// suffix), user macros (as written) and strings (unquoted).
pub fn reference_values(expression: &str) -> Vec<String> {
    let bytes = expression.as_bytes();
    let mut values = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        if b == b'{' {
            if let Some(m) = user_macro::try_match(expression, pos) {
                values.push(expression[pos..pos + m.len].to_string());
                pos += m.len;
                continue;
            }
            // Function ids, LLD and built-in macros are not constants.
            match expression[pos..].find('}') {
                Some(close) => pos += close + 1,
                None => break,
            }
        } else if b == b'"' {
            let Some(end) = quoted_end(expression, pos) else {
                break;
            };
            values.push(unescape_string(&expression[pos + 1..end - 1]));
            pos = end;
        } else if b.is_ascii_digit() {
            let end = number_end(bytes, pos);
            values.push(expression[pos..end].to_string());
            pos = end;
        } else if b.is_ascii_alphabetic() || b == b'_' {
            // Operators such as `and`; digits inside them are not numbers.
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
        } else {
            pos += 1;
        }
    }
    values
}

fn number_end(bytes: &[u8], mut pos: usize) -> usize {
    let digits = |bytes: &[u8], mut p: usize| {
        while p < bytes.len() && bytes[p].is_ascii_digit() {
            p += 1;
        }
        p
    };
    pos = digits(bytes, pos);
    if bytes.get(pos) == Some(&b'.') && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) {
        pos = digits(bytes, pos + 1);
    }
    let suffix = matches!(
        bytes.get(pos),
        Some(b'K' | b'M' | b'G' | b'T' | b's' | b'm' | b'h' | b'd' | b'w')
    );
    if suffix && !bytes.get(pos + 1).is_some_and(u8::is_ascii_alphanumeric) {
        pos += 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_function_ids() {
        let ids = function_ids("{12}>{$A:\"{99}\"} or {#X}<{13}");
        assert_eq!(ids, vec![12, 13]);
    }

    #[test]
    fn test_function_id_index() {
        let ids = [7, 8];
        assert_eq!(function_id(&ids, None), Some(7));
        assert_eq!(function_id(&ids, Some(0)), Some(7));
        assert_eq!(function_id(&ids, Some(2)), Some(8));
        assert_eq!(function_id(&ids, Some(3)), None);
    }

    #[test]
    fn test_reference_values() {
        let values = reference_values(r#"{12}>5m and {13}<>{$LIMIT} or {14}="a\"b" or {15}>1.5K"#);
        assert_eq!(values, vec!["5m", "{$LIMIT}", "a\"b", "1.5K"]);
    }

    #[test]
    fn test_operator_words_are_skipped() {
        assert_eq!(reference_values("{1}=0 and2 {2}=3"), vec!["0", "3"]);
    }
}
