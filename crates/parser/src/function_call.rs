//! Trigger function calls: `name(param, "quoted, param")`.
//!
//! Same rewriting contract as [`ItemKey`](crate::item_key::ItemKey) with `)`
//! in place of `]` and no nested arrays.

use crate::error::ParseFailure;
use crate::grammar::failure;
use crate::item_key::needs_quoting;
use crate::scan::{call_param_list, CallParam};
use chumsky::prelude::*;
use std::borrow::Cow;

/// A parsed function call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    source: String,
    name: String,
    params: Vec<CallParam>,
}

impl FunctionCall {
    pub fn parse(call: &str) -> Result<Self, ParseFailure> {
        let name = any()
            .filter(char::is_ascii_lowercase)
            .repeated()
            .at_least(1)
            .to_slice()
            .labelled("function name");
        let (name, params) = name
            .then(call_param_list(0))
            .then_ignore(end())
            .parse(call)
            .into_result()
            .map_err(failure)?;
        Ok(FunctionCall {
            source: call.to_string(),
            name: name.to_string(),
            params,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[CallParam] {
        &self.params
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Rewrite parameter values, right to left. Quoted parameters stay quoted.
    pub fn substitute<F>(&self, mut rewrite: F) -> String
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = self.source.clone();
        for param in self.params.iter().rev() {
            if let Some(new_value) = rewrite(&param.value) {
                out.replace_range(param.span.clone(), &quote_param(&new_value, param.quoted));
            }
        }
        out
    }
}

/// Quote a function parameter value. Without `forced` the value is kept
/// unless it starts with `"` or a space, ends with a space, or contains `,`
/// or `)`.
pub fn quote_param(value: &str, forced: bool) -> Cow<'_, str> {
    if !forced && !needs_quoting(value, &[',', ')']) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(format!("\"{}\"", value.replace('"', "\\\"")))
}
