//! The resolver facade.
//!
//! A call moves through three phases:
//!
//! 1. **Scanning**: every input text is scanned once with the grammars of
//!    the selected config.
//! 2. **Batch fetching**: the macros found are grouped by provider and each
//!    provider answers the whole batch from one round trip.
//! 3. **Substituting**: tokens are replaced right to left.
//!
//! A storage failure in phase 2 aborts the call; nothing partial is returned.
//!
//! ```rust
//! use hostmacro_resolver::memory::MemoryStore;
//! use hostmacro_resolver::MacroResolver;
//! use indexmap::IndexMap;
//!
//! let store = MemoryStore::from_json(r#"{
//!     "hosts": [{"host_id": 1, "host": "srv-a", "name": "Server A"}],
//!     "global_macros": [{"macro": "{$TIMEOUT}", "value": "30"}]
//! }"#).unwrap();
//!
//! let mut data = IndexMap::new();
//! data.insert(1, vec!["{HOST.NAME} ping {$TIMEOUT}".to_string()]);
//!
//! let resolved = MacroResolver::new(&store).resolve("scriptConfirmation", data).unwrap();
//! assert_eq!(resolved[&1], vec!["Server A ping 30"]);
//! ```

use crate::config::{Dispatch, MacroGroup, ResolutionConfig, ResolverSettings};
use crate::error::ResolveError;
use crate::providers::host::{fetch_hosts, host_value};
use crate::providers::interface::{resolve_main, InterfaceMode};
use crate::providers::regsub;
use crate::store::{HostId, MacroStore};
use crate::usermacro::{resolve_user_macros, ResolvedUserMacros, UserMacroRequest};
use hostmacro_parser::{find_all, splice_tokens, Captures, MacroToken, UserMacroSpec};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Resolves macros in configuration text against a [`MacroStore`].
///
/// Holds nothing but the store and immutable settings, so one resolver can
/// serve any number of calls.
#[derive(Debug)]
pub struct MacroResolver<'s, S: MacroStore + ?Sized> {
    store: &'s S,
    settings: ResolverSettings,
}

impl<'s, S: MacroStore + ?Sized> MacroResolver<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self::with_settings(store, ResolverSettings::default())
    }

    pub fn with_settings(store: &'s S, settings: ResolverSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Evaluation time in unix seconds.
    pub fn now(&self) -> i64 {
        self.settings.now.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs() as i64)
        })
    }

    /// Lower clock bound for last values, if history is limited.
    pub fn since(&self) -> Option<i64> {
        match self.settings.history_period {
            0 => None,
            period => Some(self.now() - period as i64),
        }
    }

    pub(crate) fn unresolved(&self) -> String {
        self.settings.unresolved_string.clone()
    }

    /// Resolve host-scoped texts with a text config.
    ///
    /// The output has the same hosts in the same order with the same number
    /// of texts each.
    pub fn resolve(
        &self,
        config_id: &str,
        data: IndexMap<HostId, Vec<String>>,
    ) -> Result<IndexMap<HostId, Vec<String>>, ResolveError> {
        let config = ResolutionConfig::lookup(config_id)?;
        config.expect_dispatch(Dispatch::Texts)?;
        self.resolve_texts(config, data)
    }

    pub(crate) fn resolve_texts(
        &self,
        config: &'static ResolutionConfig,
        data: IndexMap<HostId, Vec<String>>,
    ) -> Result<IndexMap<HostId, Vec<String>>, ResolveError> {
        let set = config.scan_set();
        let tokens: Vec<Vec<Vec<MacroToken>>> = data
            .values()
            .map(|texts| texts.iter().map(|text| find_all(text, &set)).collect())
            .collect();
        let found = tokens.iter().flatten().map(Vec::len).sum::<usize>();
        if found == 0 {
            return Ok(data);
        }

        let mut requests = Vec::new();
        let mut host_ids = BTreeSet::new();
        let mut interface_host_ids = BTreeSet::new();
        for (&host_id, per_text) in data.keys().zip(&tokens) {
            let macros: BTreeSet<UserMacroSpec> = per_text
                .iter()
                .flatten()
                .filter_map(|token| token.captures.user_macro())
                .collect();
            if !macros.is_empty() {
                requests.push(UserMacroRequest {
                    key: host_id,
                    host_ids: vec![host_id],
                    macros,
                });
            }
            for token in per_text.iter().flatten() {
                if let Captures::Macro { name, .. } = token.captures.base() {
                    match config.group_of(name) {
                        Some(MacroGroup::Host) => {
                            host_ids.insert(host_id);
                        }
                        Some(group) if group.is_interface() => {
                            interface_host_ids.insert(host_id);
                        }
                        _ => {}
                    }
                }
            }
        }

        let user = resolve_user_macros(self.store, requests)?;
        let hosts = fetch_hosts(self.store, &host_ids)?;
        let mode = if config.has_group(MacroGroup::AgentInterface) {
            InterfaceMode::AgentOnly
        } else {
            InterfaceMode::Priority
        };
        let interfaces = if interface_host_ids.is_empty() {
            HashMap::new()
        } else {
            resolve_main(self, &interface_host_ids, mode)?
        };

        debug!(
            config = config.id,
            hosts = data.len(),
            tokens = found,
            "resolving texts"
        );

        Ok(data
            .into_iter()
            .zip(tokens)
            .map(|((host_id, texts), per_text)| {
                let builtin = |captures: &Captures| -> Option<String> {
                    let Captures::Macro { name, .. } = captures else {
                        return None;
                    };
                    match config.group_of(name)? {
                        MacroGroup::Host => hosts.get(&host_id).and_then(|row| host_value(row, name)),
                        MacroGroup::HostId => Some(host_id.to_string()),
                        group if group.is_interface() => {
                            interfaces.get(&host_id).and_then(|iface| iface.value(name))
                        }
                        _ => None,
                    }
                };
                let resolved = texts
                    .iter()
                    .zip(&per_text)
                    .map(|(text, tokens)| {
                        splice_tokens(text, tokens, |token| {
                            self.token_value(token, user.get(&host_id), &builtin)
                        })
                    })
                    .collect();
                (host_id, resolved)
            })
            .collect())
    }

    /// The replacement for one token, or `None` to keep it literal.
    ///
    /// User macros come from `user`; a user macro that did not resolve stays
    /// as written, and so does a replacement wrapping one. Everything else
    /// comes from `builtin`, with the unresolved sentinel when it has nothing.
    pub(crate) fn token_value<F>(
        &self,
        token: &MacroToken,
        user: Option<&ResolvedUserMacros>,
        builtin: F,
    ) -> Option<String>
    where
        F: Fn(&Captures) -> Option<String>,
    {
        let user_value = |spec: UserMacroSpec| user.and_then(|values| values.get(&spec)).cloned();
        match &token.captures {
            Captures::UserMacro { .. } => token.captures.user_macro().and_then(user_value),
            Captures::Replacement {
                inner,
                function,
                params,
                ..
            } => {
                let value = match inner.user_macro() {
                    Some(spec) => user_value(spec)?,
                    None => match builtin(&**inner) {
                        Some(value) => value,
                        None => return Some(self.unresolved()),
                    },
                };
                Some(regsub::apply(function, params, &value).unwrap_or_else(|| self.unresolved()))
            }
            captures => Some(builtin(captures).unwrap_or_else(|| self.unresolved())),
        }
    }
}
