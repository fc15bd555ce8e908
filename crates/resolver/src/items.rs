//! Item keys, item names and trigger function parameters.
//!
//! Keys are resolved parameter by parameter so that quoting survives the
//! substitution; a key that does not parse is returned unchanged. Item names
//! may refer to key parameters with `$1`..`$9`, counted over the expanded key
//! with arrays flattened.

use crate::config::{MacroGroup, ResolutionConfig, FUNCTION_PARAMETER, ITEM_KEY, ITEM_NAME};
use crate::error::ResolveError;
use crate::providers::host::{fetch_hosts, host_value};
use crate::providers::interface::resolve_for_items;
use crate::resolver::MacroResolver;
use crate::store::{HostId, InterfaceId, ItemId, MacroStore};
use crate::usermacro::{resolve_user_macros, UserMacroRequest};
use hostmacro_parser::{
    find_all, splice_tokens, Captures, FunctionCall, ItemKey, MacroKind, UserMacroSpec,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub item_id: ItemId,
    pub host_id: HostId,
    pub name: String,
    pub key: String,
    pub interface_id: Option<InterfaceId>,
    pub name_expanded: String,
    pub key_expanded: String,
}

/// A trigger function parameter in the scope of a host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionParameter {
    pub host_id: HostId,
    pub function: String,
    pub parameter: String,
    pub parameter_expanded: String,
}

fn user_request<K>(key: K, host_id: HostId, macros: BTreeSet<UserMacroSpec>) -> Option<UserMacroRequest<K>> {
    (!macros.is_empty()).then(|| UserMacroRequest {
        key,
        host_ids: vec![host_id],
        macros,
    })
}

impl<'s, S: MacroStore + ?Sized> MacroResolver<'s, S> {
    /// Fill `key_expanded` for every item.
    pub fn resolve_item_keys(&self, mut items: Vec<Item>) -> Result<Vec<Item>, ResolveError> {
        let config = ResolutionConfig::lookup(ITEM_KEY)?;
        let set = config.scan_set();

        let keys: Vec<Option<ItemKey>> = items
            .iter()
            .map(|item| match ItemKey::parse(&item.key) {
                Ok(key) => Some(key),
                Err(e) => {
                    debug!(item_id = item.item_id, error = %e, "keeping unparsable item key");
                    None
                }
            })
            .collect();

        let mut requests = Vec::new();
        let mut host_ids = BTreeSet::new();
        let mut interface_items = Vec::new();
        for (i, (item, key)) in items.iter().zip(&keys).enumerate() {
            let Some(key) = key else { continue };
            let tokens: Vec<_> = key
                .flat_params()
                .into_iter()
                .flat_map(|param| find_all(param, &set))
                .collect();
            let macros = tokens.iter().filter_map(|t| t.captures.user_macro()).collect();
            requests.extend(user_request(i, item.host_id, macros));
            for token in &tokens {
                let Captures::Macro { name, .. } = token.captures.base() else {
                    continue;
                };
                match config.group_of(name) {
                    Some(MacroGroup::Host) => {
                        host_ids.insert(item.host_id);
                    }
                    Some(group) if group.is_interface() => {
                        interface_items.push((item.item_id, item.host_id, item.interface_id));
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

        for (i, (item, key)) in items.iter_mut().zip(&keys).enumerate() {
            let Some(key) = key else {
                item.key_expanded = item.key.clone();
                continue;
            };
            let (item_id, host_id) = (item.item_id, item.host_id);
            let builtin = |captures: &Captures| -> Option<String> {
                let Captures::Macro { name, .. } = captures else {
                    return None;
                };
                match config.group_of(name)? {
                    MacroGroup::Host => hosts.get(&host_id).and_then(|row| host_value(row, name)),
                    group if group.is_interface() => {
                        interfaces.get(&item_id).and_then(|iface| iface.value(name))
                    }
                    _ => None,
                }
            };
            item.key_expanded = key.substitute(|param| {
                let tokens = find_all(param, &set);
                if tokens.is_empty() {
                    return None;
                }
                let value = splice_tokens(param, &tokens, |token| {
                    self.token_value(token, user.get(&i), &builtin)
                });
                (value != param).then_some(value)
            });
        }
        Ok(items)
    }

    /// Fill `name_expanded` for every item. Keys are expanded first when a
    /// name refers to key parameters and `key_expanded` is still empty.
    pub fn resolve_item_names(&self, mut items: Vec<Item>) -> Result<Vec<Item>, ResolveError> {
        let config = ResolutionConfig::lookup(ITEM_NAME)?;
        let set = config.scan_set();
        let tokens: Vec<_> = items.iter().map(|item| find_all(&item.name, &set)).collect();

        let to_expand: Vec<usize> = (0..items.len())
            .filter(|&i| {
                items[i].key_expanded.is_empty()
                    && tokens[i].iter().any(|t| t.kind == MacroKind::Reference)
            })
            .collect();
        if !to_expand.is_empty() {
            let batch = to_expand.iter().map(|&i| items[i].clone()).collect();
            for (&i, item) in to_expand.iter().zip(self.resolve_item_keys(batch)?) {
                items[i] = item;
            }
        }

        let requests: Vec<_> = items
            .iter()
            .zip(&tokens)
            .enumerate()
            .filter_map(|(i, (item, tokens))| {
                let macros = tokens.iter().filter_map(|t| t.captures.user_macro()).collect();
                user_request(i, item.host_id, macros)
            })
            .collect();
        let user = resolve_user_macros(self.store(), requests)?;

        for (i, (item, tokens)) in items.iter_mut().zip(&tokens).enumerate() {
            if tokens.is_empty() {
                item.name_expanded = item.name.clone();
                continue;
            }
            let key = if item.key_expanded.is_empty() {
                None
            } else {
                ItemKey::parse(&item.key_expanded).ok()
            };
            item.name_expanded = splice_tokens(&item.name, tokens, |token| match token.captures {
                Captures::Reference { index } => key
                    .as_ref()
                    .and_then(|key| key.param(usize::from(index).checked_sub(1)?))
                    .map(str::to_string),
                _ => self.token_value(token, user.get(&i), |_: &Captures| None),
            });
        }
        Ok(items)
    }

    /// Fill `parameter_expanded`, resolving user macros inside each
    /// parameter of `function(parameter)` with the usual quoting rules.
    pub fn resolve_function_parameters(
        &self,
        mut functions: Vec<FunctionParameter>,
    ) -> Result<Vec<FunctionParameter>, ResolveError> {
        let config = ResolutionConfig::lookup(FUNCTION_PARAMETER)?;
        let set = config.scan_set();

        let calls: Vec<Option<FunctionCall>> = functions
            .iter()
            .map(|f| FunctionCall::parse(&format!("{}({})", f.function, f.parameter)).ok())
            .collect();

        let requests: Vec<_> = functions
            .iter()
            .zip(&calls)
            .enumerate()
            .filter_map(|(i, (f, call))| {
                let macros = call
                    .iter()
                    .flat_map(|call| call.params())
                    .flat_map(|param| find_all(&param.value, &set))
                    .filter_map(|token| token.captures.user_macro())
                    .collect();
                user_request(i, f.host_id, macros)
            })
            .collect();
        let user = resolve_user_macros(self.store(), requests)?;

        for (i, (f, call)) in functions.iter_mut().zip(&calls).enumerate() {
            let expanded = call.as_ref().and_then(|call| {
                let rewritten = call.substitute(|param| {
                    let tokens = find_all(param, &set);
                    if tokens.is_empty() {
                        return None;
                    }
                    Some(splice_tokens(param, &tokens, |token| {
                        self.token_value(token, user.get(&i), |_: &Captures| None)
                    }))
                    .filter(|value| value != param)
                });
                rewritten
                    .strip_prefix(call.name())
                    .and_then(|rest| rest.strip_prefix('('))
                    .and_then(|rest| rest.strip_suffix(')'))
                    .map(str::to_string)
            });
            f.parameter_expanded = expanded.unwrap_or_else(|| f.parameter.clone());
        }
        Ok(functions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use pretty_assertions::assert_eq;

    fn store() -> MemoryStore {
        MemoryStore::from_json(
            r#"{
                "hosts": [{"host_id": 1, "host": "srv-a", "name": "Server A"}],
                "interfaces": [
                    {"interface_id": 10, "host_id": 1, "type": "agent", "ip": "10.0.0.1",
                     "use_ip": true, "main": true, "port": "10050"},
                    {"interface_id": 11, "host_id": 1, "type": "jmx", "ip": "10.0.0.9",
                     "use_ip": true, "main": false, "port": "12345"}
                ],
                "host_macros": [
                    {"host_id": 1, "macro": "{$IF}", "value": "eth0"},
                    {"host_id": 1, "macro": "{$LIST}", "value": "a,b"},
                    {"host_id": 1, "macro": "{$EMPTY}", "value": ""},
                    {"host_id": 1, "macro": "{$PERIOD}", "value": "5m"}
                ]
            }"#,
        )
        .unwrap()
    }

    fn item(key: &str, name: &str) -> Item {
        Item {
            item_id: 100,
            host_id: 1,
            key: key.to_string(),
            name: name.to_string(),
            ..Item::default()
        }
    }

    fn keys(store: &MemoryStore, items: Vec<Item>) -> Vec<String> {
        MacroResolver::new(store)
            .resolve_item_keys(items)
            .unwrap()
            .into_iter()
            .map(|item| item.key_expanded)
            .collect()
    }

    #[test]
    fn test_key_quoting() {
        let store = store();
        let out = keys(
            &store,
            vec![
                item("net.if.in[{$IF},bytes]", ""),
                item("log[{$LIST}]", ""),
                item(r#"log["{$EMPTY}",x]"#, ""),
                item("log[{$EMPTY},x]", ""),
                item(r#"key[a,"b,c",[d,e]]"#, ""),
            ],
        );
        assert_eq!(
            out,
            vec![
                "net.if.in[eth0,bytes]",
                r#"log["a,b"]"#,
                r#"log["",x]"#,
                "log[,x]",
                r#"key[a,"b,c",[d,e]]"#,
            ]
        );
    }

    #[test]
    fn test_key_host_and_pinned_interface() {
        let store = store();
        let mut pinned = item("jmx[{HOST.CONN}]", "");
        pinned.item_id = 101;
        pinned.interface_id = Some(11);
        let out = keys(
            &store,
            vec![item("agent.ping[{HOST.HOST},{HOST.IP}]", ""), pinned],
        );
        assert_eq!(out, vec!["agent.ping[srv-a,10.0.0.1]", "jmx[10.0.0.9]"]);
    }

    #[test]
    fn test_unparsable_key_unchanged() {
        let store = store();
        assert_eq!(keys(&store, vec![item("bad[{$IF}", "")]), vec!["bad[{$IF}"]);
        assert_eq!(store.round_trips(), 0);
    }

    #[test]
    fn test_names_refer_to_expanded_key() {
        let store = store();
        let out = MacroResolver::new(&store)
            .resolve_item_names(vec![
                item("net.if.in[{$IF},[x,y]]", "Traffic on $1 ($3) $5 {$IF}"),
                item("agent.ping", "Ping"),
            ])
            .unwrap();
        assert_eq!(out[0].name_expanded, "Traffic on eth0 (y) $5 eth0");
        assert_eq!(out[0].key_expanded, "net.if.in[eth0,[x,y]]");
        assert_eq!(out[1].name_expanded, "Ping");
    }

    #[test]
    fn test_function_parameters() {
        let store = store();
        let out = MacroResolver::new(&store)
            .resolve_function_parameters(vec![
                FunctionParameter {
                    host_id: 1,
                    function: "avg".to_string(),
                    parameter: r#"{$PERIOD},"{$EMPTY}",{$NOPE}"#.to_string(),
                    ..FunctionParameter::default()
                },
                FunctionParameter {
                    host_id: 1,
                    function: "last".to_string(),
                    parameter: "{$LIST}".to_string(),
                    ..FunctionParameter::default()
                },
                FunctionParameter {
                    host_id: 1,
                    function: "last".to_string(),
                    parameter: "\"unterminated".to_string(),
                    ..FunctionParameter::default()
                },
            ])
            .unwrap();
        let expanded: Vec<_> = out.iter().map(|f| f.parameter_expanded.as_str()).collect();
        assert_eq!(expanded, vec![r#"5m,"",{$NOPE}"#, r#""a,b""#, "\"unterminated"]);
    }
}
