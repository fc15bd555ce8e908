//! Shared chumsky building blocks for the structured grammars.
//!
//! Scanners run a grammar at an arbitrary byte offset and ignore whatever
//! follows the match, which is what [`parse_prefix`] does. Spans inside a
//! grammar are relative to its input, so grammars that record spans take a
//! `base` offset and report absolute positions.

use crate::error::ParseFailure;
use chumsky::prelude::*;
use std::ops::Range;

/// Span type for `&str` input.
pub(crate) type Span = SimpleSpan<usize>;

/// Parser extras shared by every grammar.
pub(crate) type Extra<'src> = extra::Err<Rich<'src, char, Span>>;

/// Shift a relative span by `base`.
pub(crate) fn to_range(span: Span, base: usize) -> Range<usize> {
    base + span.start..base + span.end
}

/// Zero or more spaces. Tabs and newlines are not padding here.
pub(crate) fn spaces<'src>() -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    just(' ').repeated()
}

/// A double-quoted string, quotes included.
///
/// `\"` and `\\` are two-character escapes, so a quote after an odd run of
/// backslashes does not close the string.
pub(crate) fn quoted<'src>() -> impl Parser<'src, &'src str, &'src str, Extra<'src>> + Clone {
    let escape = just('\\').then(one_of("\"\\")).ignored();
    let plain = none_of('"').ignored();
    just('"')
        .then(escape.or(plain).repeated())
        .then(just('"'))
        .to_slice()
        .labelled("quoted string")
}

/// Run `parser` on `text` from byte `pos`, leaving trailing input alone.
///
/// Returns the output and the absolute offset just past the match.
pub(crate) fn parse_prefix<'src, O, P>(
    parser: P,
    text: &'src str,
    pos: usize,
) -> Option<(O, usize)>
where
    P: Parser<'src, &'src str, O, Extra<'src>>,
{
    let rest = text.get(pos..)?;
    parser
        .map_with(|out, e| (out, e.span()))
        .lazy()
        .parse(rest)
        .into_result()
        .ok()
        .map(|(out, span)| (out, pos + span.end))
}

/// The first error of a failed full parse.
pub(crate) fn failure(errors: Vec<Rich<'_, char, Span>>) -> ParseFailure {
    match errors.into_iter().next() {
        Some(error) => ParseFailure::new(error.reason().to_string(), error.span().start),
        None => ParseFailure::new("malformed input", 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quoted_slices() {
        let parsed = quoted().parse(r#""a\"b""#).into_result().ok();
        assert_eq!(parsed, Some(r#""a\"b""#));
        assert!(quoted().parse(r#""a\""#).into_result().is_err());
    }

    #[test]
    fn test_parse_prefix_stops_after_match() {
        let text = r#"x "ab" tail"#;
        assert_eq!(parse_prefix(quoted(), text, 2), Some((r#""ab""#, 6)));
        assert_eq!(parse_prefix(quoted(), text, 0), None);
        assert_eq!(parse_prefix(quoted(), text, 99), None);
    }

    #[test]
    fn test_failure_points_at_the_error() {
        let errors = quoted().parse("\"open").into_result().unwrap_err();
        assert_eq!(failure(errors).position, 5);
    }
}
