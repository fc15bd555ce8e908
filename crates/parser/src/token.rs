//! Macro tokens produced by the locator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Grammar that produced a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroKind {
    /// `{$NAME}` / `{$NAME:context}`
    UserMacro,
    /// `{HOST.HOST}`
    PlainMacro,
    /// `{HOST.HOST}` / `{HOST.HOST2}`
    PositionalMacro,
    /// `{host:key.func(params)}`
    MacroFunction,
    /// `$1` .. `$9`
    Reference,
    /// `{#NAME}`
    LldMacro,
    /// `{12345}`
    FunctionId,
    /// `{{ITEM.VALUE}.regsub("pattern","\1")}`
    Replacement,
}

/// The host part of a macro function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostRef {
    Literal { host: String },
    Macro { name: String, index: Option<u8> },
    User { name: String, context: Option<String> },
}

/// Typed captures of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Captures {
    UserMacro {
        name: String,
        context: Option<String>,
    },
    Macro {
        name: String,
        index: Option<u8>,
    },
    MacroFunction {
        host: HostRef,
        key: String,
        function: String,
        params: Vec<String>,
    },
    Reference {
        index: u8,
    },
    LldMacro {
        name: String,
    },
    FunctionId {
        id: u64,
    },
    Replacement {
        inner: Box<Captures>,
        inner_raw: String,
        function: String,
        params: Vec<String>,
    },
}

impl Captures {
    /// The captures of the macro a replacement wraps, or `self`.
    pub fn base(&self) -> &Captures {
        match self {
            Captures::Replacement { inner, .. } => inner,
            other => other,
        }
    }

    /// The user macro these captures describe, if any.
    pub fn user_macro(&self) -> Option<UserMacroSpec> {
        match self.base() {
            Captures::UserMacro { name, context } => Some(UserMacroSpec {
                name: name.clone(),
                context: context.clone(),
            }),
            _ => None,
        }
    }
}

/// One occurrence of a macro in host text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroToken {
    /// Byte offset of the first character.
    pub offset: usize,
    /// The exact matched text.
    pub raw: String,
    pub kind: MacroKind,
    pub captures: Captures,
}

impl MacroToken {
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn end(&self) -> usize {
        self.offset + self.raw.len()
    }

    pub fn span(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

/// A requested user macro. `context: None` and `Some("")` are different macros.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserMacroSpec {
    pub name: String,
    pub context: Option<String>,
}

impl UserMacroSpec {
    pub fn new(name: impl Into<String>, context: Option<&str>) -> Self {
        Self {
            name: name.into(),
            context: context.map(str::to_string),
        }
    }
}

impl fmt::Display for UserMacroSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            None => write!(f, "{{${}}}", self.name),
            Some(context) => {
                let escaped = context.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "{{${}:\"{}\"}}", self.name, escaped)
            }
        }
    }
}
