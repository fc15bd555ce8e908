//! Trigger names, descriptions, URLs and expressions.
//!
//! Positional macros in trigger text refer to the functions of the trigger
//! expression: `{HOST.HOST2}` is the host of the item behind the second
//! `{function_id}`. References `$1`..`$9` are the constants of the expression.

use crate::config::{Dispatch, MacroGroup, ResolutionConfig, SourceField};
use crate::error::{ResolveError, StoreError};
use crate::providers::host::{fetch_hosts, host_value};
use crate::providers::interface::resolve_for_items;
use crate::providers::item::{last_values, values_at};
use crate::resolver::MacroResolver;
use crate::store::{
    FunctionId, FunctionRow, HostId, InterfaceId, ItemId, ItemRow, MacroStore, TriggerId,
    ValueAtRequest,
};
use crate::usermacro::{resolve_user_macros, ResolvedUserMacros, UserMacroRequest};
use hostmacro_parser::expression::{function_id, function_ids, reference_values};
use hostmacro_parser::{find_all, splice_tokens, Captures, MacroKind, MacroToken, ScanSet, UserMacroSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trigger {
    pub trigger_id: TriggerId,
    /// Stored form, with `{function_id}` placeholders
    pub expression: String,
    pub description: String,
    pub comments: String,
    pub url: String,
    /// Event time, used for `{ITEM.VALUE}` when resolving for events
    pub clock: i64,
    pub ns: i64,
}

impl Trigger {
    fn field(&self, source: SourceField) -> Option<&str> {
        match source {
            SourceField::Description => Some(&self.description),
            SourceField::Comments => Some(&self.comments),
            SourceField::Url => Some(&self.url),
            SourceField::Expression => Some(&self.expression),
            _ => None,
        }
    }

    fn field_mut(&mut self, source: SourceField) -> Option<&mut String> {
        match source {
            SourceField::Description => Some(&mut self.description),
            SourceField::Comments => Some(&mut self.comments),
            SourceField::Url => Some(&mut self.url),
            SourceField::Expression => Some(&mut self.expression),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerOptions {
    /// Resolve `$1`..`$9` only and leave every other macro alone.
    pub references_only: bool,
    /// `{ITEM.VALUE}` is the value at the trigger's clock, not the last value.
    pub events: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpressionOptions {
    pub resolve_user_macros: bool,
    pub resolve_function_ids: bool,
}

impl Default for ExpressionOptions {
    fn default() -> Self {
        Self {
            resolve_user_macros: false,
            resolve_function_ids: true,
        }
    }
}

/// Functions and items behind a batch of trigger expressions.
#[derive(Debug, Default)]
struct FunctionIndex {
    functions: HashMap<FunctionId, FunctionRow>,
    items: HashMap<ItemId, ItemRow>,
}

impl FunctionIndex {
    fn load<S>(store: &S, function_ids: &BTreeSet<FunctionId>) -> Result<Self, StoreError>
    where
        S: MacroStore + ?Sized,
    {
        if function_ids.is_empty() {
            return Ok(Self::default());
        }
        let ids: Vec<FunctionId> = function_ids.iter().copied().collect();
        let functions: HashMap<FunctionId, FunctionRow> = store
            .fetch_functions(&ids)?
            .into_iter()
            .map(|row| (row.function_id, row))
            .collect();

        let item_ids: Vec<ItemId> = functions
            .values()
            .map(|f| f.item_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let items = if item_ids.is_empty() {
            HashMap::new()
        } else {
            store
                .fetch_items(&item_ids)?
                .into_iter()
                .map(|row| (row.item_id, row))
                .collect()
        };
        Ok(Self { functions, items })
    }

    fn item(&self, function_id: FunctionId) -> Option<&ItemRow> {
        self.functions
            .get(&function_id)
            .and_then(|f| self.items.get(&f.item_id))
    }

    /// Hosts of the given functions, ascending and unique.
    fn host_ids(&self, function_ids: &[FunctionId]) -> Vec<HostId> {
        function_ids
            .iter()
            .filter_map(|id| self.item(*id))
            .map(|item| item.host_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// A user macro standing alone, such as a reference constant `{$LIMIT}`.
fn standalone_user_macro(text: &str) -> Option<UserMacroSpec> {
    let set = ScanSet::new().with(MacroKind::UserMacro);
    match find_all(text, &set).as_slice() {
        [token] if token.offset == 0 && token.len() == text.len() => token.captures.user_macro(),
        _ => None,
    }
}

/// The value of reference `$index` among `values`; a missing constant is empty.
fn reference_value(values: &[String], index: u8, user: Option<&ResolvedUserMacros>) -> String {
    let Some(value) = usize::from(index)
        .checked_sub(1)
        .and_then(|n| values.get(n))
    else {
        return String::new();
    };
    standalone_user_macro(value)
        .and_then(|spec| user.and_then(|values| values.get(&spec)).cloned())
        .unwrap_or_else(|| value.clone())
}

/// Replace `$1`..`$9` in `text` with the constants of `expression`.
///
/// User macro constants are substituted as written.
///
/// ```rust
/// use hostmacro_resolver::triggers::resolve_trigger_expression_references;
///
/// let text = resolve_trigger_expression_references(r#"{12}>80 and {13}="eth0""#, "$2 load over $1%");
/// assert_eq!(text, "eth0 load over 80%");
/// ```
pub fn resolve_trigger_expression_references(expression: &str, text: &str) -> String {
    let set = ScanSet::new().with(MacroKind::Reference);
    let tokens = find_all(text, &set);
    if tokens.is_empty() {
        return text.to_string();
    }
    let values = reference_values(expression);
    splice_tokens(text, &tokens, |token| match token.captures {
        Captures::Reference { index } => Some(reference_value(&values, index, None)),
        _ => None,
    })
}

struct Scanned {
    tokens: Vec<MacroToken>,
    function_ids: Vec<FunctionId>,
    references: Vec<String>,
}

impl<'s, S: MacroStore + ?Sized> MacroResolver<'s, S> {
    /// Resolve the field of each trigger that `config_id` names.
    pub fn resolve_triggers(
        &self,
        config_id: &str,
        mut triggers: Vec<Trigger>,
        options: TriggerOptions,
    ) -> Result<Vec<Trigger>, ResolveError> {
        let config = ResolutionConfig::lookup(config_id)?;
        config.expect_dispatch(Dispatch::Triggers)?;
        let set = config.scan_set();

        let scanned: Vec<Scanned> = triggers
            .iter()
            .map(|trigger| {
                let text = trigger.field(config.source).unwrap_or_default();
                let mut tokens = find_all(text, &set);
                if options.references_only {
                    tokens.retain(|token| token.kind == MacroKind::Reference);
                }
                let has_references = tokens.iter().any(|t| t.kind == MacroKind::Reference);
                Scanned {
                    function_ids: if tokens.is_empty() {
                        Vec::new()
                    } else {
                        function_ids(&trigger.expression)
                    },
                    references: if has_references {
                        reference_values(&trigger.expression)
                    } else {
                        Vec::new()
                    },
                    tokens,
                }
            })
            .collect();
        if scanned.iter().all(|s| s.tokens.is_empty()) {
            return Ok(triggers);
        }

        let all_ids: BTreeSet<FunctionId> = scanned
            .iter()
            .flat_map(|s| s.function_ids.iter().copied())
            .collect();
        let lookup = FunctionIndex::load(self.store(), &all_ids)?;

        let mut requests = Vec::new();
        let mut host_ids = BTreeSet::new();
        let mut interface_items: Vec<(ItemId, HostId, Option<InterfaceId>)> = Vec::new();
        let mut last_ids = BTreeSet::new();
        let mut at_requests = HashSet::new();

        for (i, (trigger, s)) in triggers.iter().zip(&scanned).enumerate() {
            let mut macros: BTreeSet<UserMacroSpec> = s
                .tokens
                .iter()
                .filter_map(|token| token.captures.user_macro())
                .collect();
            macros.extend(s.tokens.iter().filter_map(|token| match token.captures {
                Captures::Reference { index } => usize::from(index)
                    .checked_sub(1)
                    .and_then(|n| s.references.get(n))
                    .and_then(|value| standalone_user_macro(value)),
                _ => None,
            }));
            if !macros.is_empty() {
                requests.push(UserMacroRequest {
                    key: i,
                    host_ids: lookup.host_ids(&s.function_ids),
                    macros,
                });
            }

            for token in &s.tokens {
                let Captures::Macro { name, index: n } = token.captures.base() else {
                    continue;
                };
                let Some(item) = function_id(&s.function_ids, *n).and_then(|id| lookup.item(id))
                else {
                    continue;
                };
                match config.group_of(name) {
                    Some(MacroGroup::Host) => {
                        host_ids.insert(item.host_id);
                    }
                    Some(group) if group.is_interface() => {
                        interface_items.push((item.item_id, item.host_id, item.interface_id));
                    }
                    Some(MacroGroup::Item) if name == "ITEM.VALUE" && options.events => {
                        at_requests.insert(ValueAtRequest {
                            item_id: item.item_id,
                            clock: trigger.clock,
                            ns: trigger.ns,
                        });
                    }
                    Some(MacroGroup::Item) => {
                        last_ids.insert(item.item_id);
                    }
                    _ => {}
                }
            }
        }

        let user = resolve_user_macros(self.store(), requests)?;
        let hosts = fetch_hosts(self.store(), &host_ids)?;
        let interfaces = if interface_items.is_empty() {
            HashMap::new()
        } else {
            resolve_for_items(self, &interface_items)?
        };
        let last = last_values(self.store(), &last_ids, self.since())?;
        let at = values_at(self.store(), &at_requests)?;

        debug!(
            config = config.id,
            triggers = triggers.len(),
            functions = lookup.functions.len(),
            "resolving triggers"
        );

        for (i, (trigger, s)) in triggers.iter_mut().zip(&scanned).enumerate() {
            if s.tokens.is_empty() {
                continue;
            }
            let (trigger_id, clock, ns) = (trigger.trigger_id, trigger.clock, trigger.ns);
            let user = user.get(&i);
            let builtin = |captures: &Captures| -> Option<String> {
                match captures {
                    Captures::Reference { index } => Some(reference_value(&s.references, *index, user)),
                    Captures::Macro { name, index: n } => {
                        let group = config.group_of(name)?;
                        if group == MacroGroup::Trigger {
                            return Some(trigger_id.to_string());
                        }
                        let item = function_id(&s.function_ids, *n).and_then(|id| lookup.item(id))?;
                        match group {
                            MacroGroup::Host => hosts.get(&item.host_id).and_then(|h| host_value(h, name)),
                            MacroGroup::HostId => Some(item.host_id.to_string()),
                            MacroGroup::Item if name == "ITEM.VALUE" && options.events => at
                                .get(&ValueAtRequest {
                                    item_id: item.item_id,
                                    clock,
                                    ns,
                                })
                                .cloned(),
                            MacroGroup::Item => last.get(&item.item_id).cloned(),
                            _ => interfaces.get(&item.item_id).and_then(|iface| iface.value(name)),
                        }
                    }
                    _ => None,
                }
            };
            let Some(field) = trigger.field_mut(config.source) else {
                continue;
            };
            *field = splice_tokens(field, &s.tokens, |token| self.token_value(token, user, &builtin));
        }
        Ok(triggers)
    }

    /// Expand stored expressions: `{function_id}` becomes
    /// `{host:key.function(parameter)}`, unknown ids become the error string.
    pub fn resolve_trigger_expressions(
        &self,
        mut triggers: Vec<Trigger>,
        options: ExpressionOptions,
    ) -> Result<Vec<Trigger>, ResolveError> {
        let mut set = ScanSet::new();
        if options.resolve_user_macros {
            set = set.with(MacroKind::UserMacro);
        }
        if options.resolve_function_ids {
            set = set.with(MacroKind::FunctionId);
        }
        let tokens: Vec<Vec<MacroToken>> = triggers
            .iter()
            .map(|trigger| find_all(&trigger.expression, &set))
            .collect();
        if tokens.iter().all(Vec::is_empty) {
            return Ok(triggers);
        }

        let per_trigger_ids: Vec<Vec<FunctionId>> = triggers
            .iter()
            .zip(&tokens)
            .map(|(trigger, tokens)| {
                if tokens.is_empty() {
                    Vec::new()
                } else {
                    function_ids(&trigger.expression)
                }
            })
            .collect();
        let all_ids: BTreeSet<FunctionId> = per_trigger_ids.iter().flatten().copied().collect();
        let index = FunctionIndex::load(self.store(), &all_ids)?;

        let requests: Vec<UserMacroRequest<usize>> = tokens
            .iter()
            .zip(&per_trigger_ids)
            .enumerate()
            .filter_map(|(i, (tokens, ids))| {
                let macros: BTreeSet<UserMacroSpec> = tokens
                    .iter()
                    .filter_map(|token| token.captures.user_macro())
                    .collect();
                (!macros.is_empty()).then(|| UserMacroRequest {
                    key: i,
                    host_ids: index.host_ids(ids),
                    macros,
                })
            })
            .collect();
        let user = resolve_user_macros(self.store(), requests)?;

        let host_ids: BTreeSet<HostId> = index.items.values().map(|item| item.host_id).collect();
        let hosts = if options.resolve_function_ids {
            fetch_hosts(self.store(), &host_ids)?
        } else {
            HashMap::new()
        };

        let error = &self.settings().error_string;
        for (i, (trigger, tokens)) in triggers.iter_mut().zip(&tokens).enumerate() {
            if tokens.is_empty() {
                continue;
            }
            let user = user.get(&i);
            trigger.expression = splice_tokens(&trigger.expression, tokens, |token| {
                match &token.captures {
                    Captures::FunctionId { id } => {
                        let expanded = index.functions.get(id).and_then(|function| {
                            let item = index.items.get(&function.item_id)?;
                            let host = hosts.get(&item.host_id)?;
                            Some(format!(
                                "{{{}:{}.{}({})}}",
                                host.host, item.key, function.function, function.parameter
                            ))
                        });
                        Some(expanded.unwrap_or_else(|| error.clone()))
                    }
                    _ => token
                        .captures
                        .user_macro()
                        .and_then(|spec| user.and_then(|values| values.get(&spec)).cloned()),
                }
            });
        }
        Ok(triggers)
    }
}
