//! User macro resolution with template inheritance.
//!
//! Every request names a host scope and the user macros it needs. The scope
//! is walked breadth-first from the hosts themselves up through their
//! templates, one level at a time, with all requests sharing each round trip.
//!
//! For one macro, the first hit wins in this order:
//!
//! 1. an exact context value on the nearest level, then a regex context on
//!    that level (a context-less macro takes the base value instead);
//! 2. a global exact context value, then a global regex context;
//! 3. the first base value met on any level while looking for a context;
//! 4. the global base value.
//!
//! Within a level hosts are visited in ascending id order. A macro found
//! nowhere stays unresolved and callers keep its text as written.

use crate::error::StoreError;
use crate::store::{HostId, MacroStore};
use crate::templates::TemplateGraph;
use hostmacro_parser::{Context, MacroDefinition, UserMacroSpec};
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use tracing::{debug, warn};

/// Resolved values of one request, by macro. Unresolved macros are absent.
pub type ResolvedUserMacros = HashMap<UserMacroSpec, String>;

/// The user macros one entity needs, and the hosts whose scope applies.
#[derive(Debug, Clone)]
pub struct UserMacroRequest<K> {
    pub key: K,
    pub host_ids: Vec<HostId>,
    pub macros: BTreeSet<UserMacroSpec>,
}

/// All definitions of one macro name on one host (or globally).
#[derive(Debug, Default)]
struct Definitions {
    base: Option<String>,
    exact: HashMap<String, String>,
    regex: Vec<(Regex, String)>,
}

impl Definitions {
    fn add(&mut self, context: Context, value: String) {
        match context {
            Context::None => self.base = Some(value),
            Context::Exact(context) => {
                self.exact.insert(context, value);
            }
            Context::Regex(pattern) => match Regex::new(&pattern) {
                Ok(regex) => {
                    self.regex.push((regex, value));
                    self.regex.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
                }
                Err(e) => warn!(pattern = %pattern, error = %e, "skipping invalid regex context"),
            },
        }
    }

    fn context_value(&self, context: &str) -> Option<&str> {
        self.exact.get(context).map(String::as_str).or_else(|| {
            self.regex
                .iter()
                .find(|(regex, _)| regex.is_match(context))
                .map(|(_, value)| value.as_str())
        })
    }
}

type MacroTable = HashMap<String, Definitions>;

fn add_definition(table: &mut MacroTable, stored: &str, value: String) {
    match MacroDefinition::parse(stored) {
        Some(def) => table.entry(def.name).or_default().add(def.context, value),
        None => warn!(name = %stored, "skipping unparsable user macro definition"),
    }
}

#[derive(Debug)]
struct SpecState {
    spec: UserMacroSpec,
    value: Option<String>,
    host_default: Option<String>,
}

impl SpecState {
    /// Look at one host's definitions; true once the macro is resolved.
    fn visit(&mut self, defs: &Definitions) -> bool {
        match &self.spec.context {
            Some(context) => {
                if let Some(value) = defs.context_value(context) {
                    self.value = Some(value.to_string());
                    return true;
                }
                if self.host_default.is_none() {
                    self.host_default = defs.base.clone();
                }
                false
            }
            None => {
                self.value = defs.base.clone();
                self.value.is_some()
            }
        }
    }

    fn finish(&mut self, globals: &MacroTable) {
        if self.value.is_some() {
            return;
        }
        let global = globals.get(&self.spec.name);
        if let (Some(context), Some(defs)) = (&self.spec.context, global) {
            self.value = defs.context_value(context).map(str::to_string);
        }
        if self.value.is_none() {
            self.value = self.host_default.take();
        }
        if self.value.is_none() {
            self.value = global.and_then(|defs| defs.base.clone());
        }
    }
}

#[derive(Debug)]
struct Walk<K> {
    key: K,
    level: Vec<HostId>,
    visited: HashSet<HostId>,
    specs: Vec<SpecState>,
}

impl<K> Walk<K> {
    fn pending(&self) -> bool {
        !self.level.is_empty() && self.unresolved()
    }

    fn unresolved(&self) -> bool {
        self.specs.iter().any(|s| s.value.is_none())
    }
}

/// Resolve every request against host, template and global macros.
pub fn resolve_user_macros<S, K>(
    store: &S,
    requests: Vec<UserMacroRequest<K>>,
) -> Result<HashMap<K, ResolvedUserMacros>, StoreError>
where
    S: MacroStore + ?Sized,
    K: Eq + Hash,
{
    let mut walks: Vec<Walk<K>> = requests
        .into_iter()
        .filter(|r| !r.macros.is_empty())
        .map(|r| {
            let mut level = r.host_ids;
            level.sort_unstable();
            level.dedup();
            Walk {
                key: r.key,
                visited: level.iter().copied().collect(),
                level,
                specs: r
                    .macros
                    .into_iter()
                    .map(|spec| SpecState {
                        spec,
                        value: None,
                        host_default: None,
                    })
                    .collect(),
            }
        })
        .collect();

    if walks.is_empty() {
        return Ok(HashMap::new());
    }

    let mut tables: HashMap<HostId, MacroTable> = HashMap::new();
    let mut loaded: HashSet<HostId> = HashSet::new();
    let mut graph = TemplateGraph::new();
    let mut levels = 0;
    let mut revisited = false;

    while walks.iter().any(Walk::pending) {
        let needed: Vec<HostId> = walks
            .iter()
            .filter(|w| w.pending())
            .flat_map(|w| w.level.iter().copied())
            .filter(|id| !loaded.contains(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if !needed.is_empty() {
            for row in store.fetch_host_macros(&needed)? {
                add_definition(
                    tables.entry(row.host_id).or_default(),
                    &row.macro_name,
                    row.value,
                );
            }
            graph.add_links(&store.fetch_template_parents(&needed)?);
            loaded.extend(needed);
            levels += 1;
        }

        for walk in walks.iter_mut().filter(|w| w.pending()) {
            for state in walk.specs.iter_mut().filter(|s| s.value.is_none()) {
                for host_id in &walk.level {
                    let defs = tables.get(host_id).and_then(|t| t.get(&state.spec.name));
                    if let Some(defs) = defs {
                        if state.visit(defs) {
                            break;
                        }
                    }
                }
            }
            let (next, skipped) = graph.next_level(&walk.level, &mut walk.visited);
            walk.level = next;
            revisited |= skipped;
        }
    }

    if revisited {
        for cycle in graph.cycles() {
            warn!(hosts = ?cycle, "cyclic template linkage");
        }
    }

    let mut globals = MacroTable::new();
    if walks.iter().any(Walk::unresolved) {
        for row in store.fetch_global_macros()? {
            add_definition(&mut globals, &row.macro_name, row.value);
        }
    }

    debug!(
        requests = walks.len(),
        levels,
        hosts = loaded.len(),
        "resolved user macros"
    );

    Ok(walks
        .into_iter()
        .map(|walk| {
            let values = walk
                .specs
                .into_iter()
                .filter_map(|mut state| {
                    state.finish(&globals);
                    state.value.map(|value| (state.spec, value))
                })
                .collect();
            (walk.key, values)
        })
        .collect())
}
