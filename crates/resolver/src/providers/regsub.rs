//! `regsub` and `iregsub`: rewrite a macro value through a regular expression.
//!
//! `{{ITEM.VALUE}.regsub("^(\w+)", "\1")}` matches the pattern against the
//! value and expands the template from the first match. In the template,
//! `\0` is the whole match, `\1`..`\9` are groups (empty when a group did not
//! take part) and `\\` is a backslash.

use regex::{Captures, RegexBuilder};
use tracing::warn;

/// Apply a value function. `None` means the result is unresolved: unknown
/// function, wrong parameter count, invalid pattern or no match.
pub fn apply(function: &str, params: &[String], value: &str) -> Option<String> {
    let case_insensitive = match function {
        "regsub" => false,
        "iregsub" => true,
        _ => return None,
    };
    let [pattern, template] = params else {
        return None;
    };
    let regex = match RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
    {
        Ok(regex) => regex,
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "invalid {function} pattern");
            return None;
        }
    };
    regex.captures(value).map(|caps| expand(template, &caps))
}

fn expand(template: &str, caps: &Captures<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some(d @ '0'..='9') => {
                chars.next();
                let group = d as usize - '0' as usize;
                out.push_str(caps.get(group).map_or("", |m| m.as_str()));
            }
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            _ => out.push('\\'),
        }
    }
    out
}
