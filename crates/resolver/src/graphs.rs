//! Graph names.
//!
//! Graph names take two kinds of macros. Positional host macros refer to the
//! graph's items in order: `{HOST.HOST2}` is the host of the second item.
//! Macro functions read item history:
//!
//! | Function | Value |
//! |----------|-------|
//! | `last()` | newest value |
//! | `min(period)`, `max(period)`, `avg(period)` | aggregate over `[now - period, now]` |
//!
//! A period is a number of seconds with an optional `s`, `m`, `h`, `d` or
//! `w` suffix. Macro functions this module cannot evaluate (another function,
//! a malformed period, a host macro other than `{HOST.HOST}`/`{HOSTNAME}`)
//! stay as written.

use crate::config::{Dispatch, ResolutionConfig};
use crate::error::ResolveError;
use crate::providers::item::{aggregated, last_values};
use crate::resolver::MacroResolver;
use crate::store::{AggregateFunction, AggregateRequest, HostId, ItemId, MacroStore};
use hostmacro_parser::{find_all, splice_tokens, Captures, HostRef, MacroToken};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphItem {
    pub item_id: ItemId,
    pub host_id: HostId,
    /// Technical host name
    pub host: String,
    /// Visible host name
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Graph {
    pub graph_id: u64,
    pub name: String,
    /// In display order
    pub items: Vec<GraphItem>,
}

fn nth_item(items: &[GraphItem], index: Option<u8>) -> Option<&GraphItem> {
    let n = usize::from(index.unwrap_or(1).max(1));
    items.get(n - 1)
}

/// `Some(None)` for an empty period, `None` for a malformed one.
fn period_seconds(param: &str) -> Option<Option<i64>> {
    if param.is_empty() {
        return Some(None);
    }
    let digits = param.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let unit = match &param[digits..] {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        "w" => 604_800,
        _ => return None,
    };
    let count: i64 = param[..digits].parse().ok()?;
    count.checked_mul(unit).map(Some)
}

/// What to do with one macro function.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Plan {
    Literal,
    Unresolved,
    Last { host: String, key: String },
    Aggregate {
        host: String,
        key: String,
        function: AggregateFunction,
        seconds: i64,
    },
}

impl Plan {
    fn host_key(&self) -> Option<(String, String)> {
        match self {
            Plan::Last { host, key } | Plan::Aggregate { host, key, .. } => {
                Some((host.clone(), key.clone()))
            }
            Plan::Literal | Plan::Unresolved => None,
        }
    }
}

fn plan(graph: &Graph, captures: &Captures) -> Plan {
    let Captures::MacroFunction {
        host,
        key,
        function,
        params,
    } = captures
    else {
        return Plan::Literal;
    };
    let aggregate = match function.as_str() {
        "last" => None,
        name => match AggregateFunction::from_name(name) {
            Some(function) => Some(function),
            None => return Plan::Literal,
        },
    };
    let period = match params.as_slice() {
        [] => Some(None),
        [param] => period_seconds(param),
        _ => None,
    };
    let Some(period) = period else {
        return Plan::Literal;
    };
    let host = match host {
        HostRef::Literal { host } => host.clone(),
        HostRef::Macro { name, index } if name == "HOST.HOST" || name == "HOSTNAME" => {
            match nth_item(&graph.items, *index) {
                Some(item) => item.host.clone(),
                None => return Plan::Unresolved,
            }
        }
        _ => return Plan::Literal,
    };
    let key = key.clone();
    match (aggregate, period) {
        (None, _) => Plan::Last { host, key },
        (Some(function), Some(seconds)) => Plan::Aggregate {
            host,
            key,
            function,
            seconds,
        },
        (Some(_), None) => Plan::Unresolved,
    }
}

impl<'s, S: MacroStore + ?Sized> MacroResolver<'s, S> {
    /// Resolve graph names.
    pub fn resolve_graphs(
        &self,
        config_id: &str,
        mut graphs: Vec<Graph>,
    ) -> Result<Vec<Graph>, ResolveError> {
        let config = ResolutionConfig::lookup(config_id)?;
        config.expect_dispatch(Dispatch::Graphs)?;
        let set = config.scan_set();

        let tokens: Vec<Vec<MacroToken>> =
            graphs.iter().map(|g| find_all(&g.name, &set)).collect();
        if tokens.iter().all(Vec::is_empty) {
            return Ok(graphs);
        }
        let plans: Vec<Vec<Plan>> = graphs
            .iter()
            .zip(&tokens)
            .map(|(graph, tokens)| tokens.iter().map(|t| plan(graph, &t.captures)).collect())
            .collect();

        let pairs: Vec<(String, String)> = plans
            .iter()
            .flatten()
            .filter_map(Plan::host_key)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let item_ids: HashMap<(String, String), ItemId> = if pairs.is_empty() {
            HashMap::new()
        } else {
            self.store()
                .fetch_items_by_host_key(&pairs)?
                .into_iter()
                .map(|row| ((row.host, row.key), row.item_id))
                .collect()
        };
        let item_of = |host: &str, key: &str| {
            item_ids
                .get(&(host.to_string(), key.to_string()))
                .copied()
        };

        let now = self.now();
        let mut last_ids = BTreeSet::new();
        let mut requests = HashSet::new();
        for plan in plans.iter().flatten() {
            match plan {
                Plan::Last { host, key } => last_ids.extend(item_of(host, key)),
                Plan::Aggregate {
                    host,
                    key,
                    function,
                    seconds,
                } => requests.extend(item_of(host, key).map(|item_id| AggregateRequest {
                    item_id,
                    function: *function,
                    from: now - seconds,
                    to: now,
                })),
                Plan::Literal | Plan::Unresolved => {}
            }
        }
        let last = last_values(self.store(), &last_ids, self.since())?;
        let aggregates = aggregated(self.store(), &requests)?;

        debug!(
            config = config.id,
            graphs = graphs.len(),
            items = item_ids.len(),
            "resolving graph names"
        );

        let unresolved = self.unresolved();
        for ((graph, tokens), plans) in graphs.iter_mut().zip(&tokens).zip(&plans) {
            if tokens.is_empty() {
                continue;
            }
            let values: HashMap<usize, Option<String>> = tokens
                .iter()
                .zip(plans)
                .map(|(token, plan)| {
                    let value = match (&token.captures, plan) {
                        (Captures::Macro { name, index }, _) => {
                            nth_item(&graph.items, *index).and_then(|item| match name.as_str() {
                                "HOSTNAME" | "HOST.HOST" => Some(item.host.clone()),
                                "HOST.NAME" => Some(item.name.clone()),
                                _ => None,
                            })
                        }
                        (_, Plan::Literal) => return (token.offset, None),
                        (_, Plan::Unresolved) => None,
                        (_, Plan::Last { host, key }) => {
                            item_of(host, key).and_then(|id| last.get(&id).cloned())
                        }
                        (
                            _,
                            Plan::Aggregate {
                                host,
                                key,
                                function,
                                seconds,
                            },
                        ) => item_of(host, key).and_then(|item_id| {
                            aggregates
                                .get(&AggregateRequest {
                                    item_id,
                                    function: *function,
                                    from: now - seconds,
                                    to: now,
                                })
                                .cloned()
                        }),
                    };
                    (token.offset, Some(value.unwrap_or_else(|| unresolved.clone())))
                })
                .collect();
            graph.name = splice_tokens(&graph.name, tokens, |token| {
                values.get(&token.offset).cloned().flatten()
            });
        }
        Ok(graphs)
    }
}
