//! The macro locator: one left-to-right pass over host text.
//!
//! At every byte offset the enabled scanners are tried in a fixed order and
//! the first success wins; the cursor then jumps past the match. Nothing is
//! retried at the same offset and nothing ever fails: text that no scanner
//! accepts is literal.
//!
//! Scanner order: user macro, plain/positional macro, replacement, macro
//! function, reference, LLD macro, function id.
//!
//! ```rust
//! use hostmacro_parser::locator::{find_all, ScanSet};
//! use hostmacro_parser::token::MacroKind;
//!
//! let set = ScanSet::new()
//!     .with(MacroKind::UserMacro)
//!     .with(MacroKind::PlainMacro)
//!     .with_names(["HOST.NAME"]);
//! let tokens = find_all("{HOST.NAME} ping {$TIMEOUT}", &set);
//! assert_eq!(tokens.len(), 2);
//! assert_eq!(tokens[1].offset, 17);
//! assert_eq!(tokens[1].kind, MacroKind::UserMacro);
//! ```

use crate::scan::{
    function_id, lld_macro, macro_function, macro_name, reference, replacement, user_macro, Match,
};
use crate::token::{MacroKind, MacroToken};

type Scanner = fn(&str, usize) -> Option<Match>;

/// The grammars enabled for one scan, plus the built-in macro allow list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSet<'a> {
    kinds: Vec<MacroKind>,
    names: Vec<&'a str>,
}

impl<'a> ScanSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: MacroKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    pub fn with_kinds(self, kinds: &[MacroKind]) -> Self {
        kinds.iter().fold(self, |set, kind| set.with(*kind))
    }

    /// Add built-in macro names (without braces) to the allow list.
    pub fn with_names<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in names {
            if !self.names.contains(&name) {
                self.names.push(name);
            }
        }
        self
    }

    pub fn enables(&self, kind: MacroKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn names(&self) -> &[&'a str] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    fn positional(&self) -> bool {
        self.enables(MacroKind::PositionalMacro)
    }

    /// Try every enabled scanner at `pos`, in priority order.
    pub fn try_at(&self, text: &str, pos: usize) -> Option<(MacroKind, Match)> {
        let user = self.enables(MacroKind::UserMacro);
        if user {
            if let Some(m) = user_macro::try_match(text, pos) {
                return Some((MacroKind::UserMacro, m));
            }
        }

        if !self.names.is_empty() {
            let kind = if self.positional() {
                Some(MacroKind::PositionalMacro)
            } else if self.enables(MacroKind::PlainMacro) {
                Some(MacroKind::PlainMacro)
            } else {
                None
            };
            if let Some(kind) = kind {
                if let Some(m) = macro_name::try_match(text, pos, &self.names, self.positional()) {
                    return Some((kind, m));
                }
            }
        }

        if self.enables(MacroKind::Replacement) {
            let inner = replacement::Inner {
                names: &self.names,
                positional: self.positional(),
                user,
            };
            if let Some(m) = replacement::try_match(text, pos, inner) {
                return Some((MacroKind::Replacement, m));
            }
        }

        if self.enables(MacroKind::MacroFunction) {
            let hosts = macro_function::HostMacros {
                names: &self.names,
                positional: self.positional(),
                user,
            };
            if let Some(m) = macro_function::try_match(text, pos, hosts) {
                return Some((MacroKind::MacroFunction, m));
            }
        }

        let tail: [(MacroKind, Scanner); 3] = [
            (MacroKind::Reference, reference::try_match),
            (MacroKind::LldMacro, lld_macro::try_match),
            (MacroKind::FunctionId, function_id::try_match),
        ];
        tail.into_iter()
            .filter(|(kind, _)| self.enables(*kind))
            .find_map(|(kind, scan)| scan(text, pos).map(|m| (kind, m)))
    }
}

/// All macro tokens in `text`, by ascending offset.
pub fn find_all(text: &str, set: &ScanSet<'_>) -> Vec<MacroToken> {
    let mut tokens = Vec::new();
    if set.is_empty() {
        return tokens;
    }
    let mut pos = 0;
    while pos < text.len() {
        match set.try_at(text, pos) {
            Some((kind, m)) => {
                tokens.push(MacroToken {
                    offset: pos,
                    raw: text[pos..pos + m.len].to_string(),
                    kind,
                    captures: m.captures,
                });
                pos += m.len;
            }
            None => pos += 1,
        }
    }
    tokens
}

/// Whether any of `texts` contains at least one token. Stops at the first hit.
pub fn has_macros<I, S>(texts: I, set: &ScanSet<'_>) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if set.is_empty() {
        return false;
    }
    texts.into_iter().any(|text| {
        let text = text.as_ref();
        (0..text.len()).any(|pos| set.try_at(text, pos).is_some())
    })
}
