//! Resolution configs and resolver settings.
//!
//! A [`ResolutionConfig`] names which grammars are scanned, which built-in
//! macros are recognised and which entry point a text belongs to. The table is
//! static: configs are looked up by id and never change at runtime.
//!
//! | Id | Kinds | Macro groups | Dispatch |
//! |----|-------|--------------|----------|
//! | `scriptConfirmation` | user, plain, replacement | host, interface | texts |
//! | `httpTestName` | user, plain, replacement | host, interface | texts |
//! | `hostInterfaceIpDns` | user, plain | host, agent interface | texts |
//! | `hostInterfaceIpDnsAgentPrimary` | user, plain | host | texts |
//! | `hostInterfacePort` | user | | texts |
//! | `screenElementURL` | user, plain | host, host id, interface | texts |
//! | `screenElementURLUser` | user | | texts |
//! | `graphName` | macro function, positional | host | graphs |
//! | `triggerName` | user, positional, reference, replacement | host, interface, port, item | triggers |
//! | `triggerDescription` | user, positional, replacement | host, interface, port, item | triggers |
//! | `triggerUrl` | user, positional | trigger, host, host id, interface, port | triggers |
//! | `triggerExpressionUser` | user | | triggers |
//! | `itemName` | user, reference | | items |
//! | `itemKey` | user, plain | host, interface | items |
//! | `functionParameter` | user | | items |
//!
//! [`ResolverSettings`] holds the tunables that are configuration rather than
//! code, loaded from JSON.

use crate::error::{ResolveError, SettingsError};
use hostmacro_parser::{MacroKind, ScanSet};
use serde::{Deserialize, Serialize};

pub const SCRIPT_CONFIRMATION: &str = "scriptConfirmation";
pub const HTTP_TEST_NAME: &str = "httpTestName";
pub const HOST_INTERFACE_IP_DNS: &str = "hostInterfaceIpDns";
pub const HOST_INTERFACE_IP_DNS_AGENT_PRIMARY: &str = "hostInterfaceIpDnsAgentPrimary";
pub const HOST_INTERFACE_PORT: &str = "hostInterfacePort";
pub const SCREEN_ELEMENT_URL: &str = "screenElementURL";
pub const SCREEN_ELEMENT_URL_USER: &str = "screenElementURLUser";
pub const GRAPH_NAME: &str = "graphName";
pub const TRIGGER_NAME: &str = "triggerName";
pub const TRIGGER_DESCRIPTION: &str = "triggerDescription";
pub const TRIGGER_URL: &str = "triggerUrl";
pub const TRIGGER_EXPRESSION_USER: &str = "triggerExpressionUser";
pub const ITEM_NAME: &str = "itemName";
pub const ITEM_KEY: &str = "itemKey";
pub const FUNCTION_PARAMETER: &str = "functionParameter";

/// A family of built-in macros served by one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroGroup {
    /// `{HOSTNAME}`, `{HOST.HOST}`, `{HOST.NAME}`
    Host,
    /// `{HOST.ID}`
    HostId,
    /// Address macros from the main Agent interface only
    AgentInterface,
    /// Address macros from the highest-priority main interface
    Interface,
    /// `{HOST.PORT}`
    InterfacePort,
    /// `{ITEM.VALUE}`, `{ITEM.LASTVALUE}`
    Item,
    /// `{TRIGGER.ID}`
    Trigger,
}

impl MacroGroup {
    pub fn names(self) -> &'static [&'static str] {
        match self {
            MacroGroup::Host => &["HOSTNAME", "HOST.HOST", "HOST.NAME"],
            MacroGroup::HostId => &["HOST.ID"],
            MacroGroup::AgentInterface | MacroGroup::Interface => {
                &["IPADDRESS", "HOST.IP", "HOST.DNS", "HOST.CONN"]
            }
            MacroGroup::InterfacePort => &["HOST.PORT"],
            MacroGroup::Item => &["ITEM.VALUE", "ITEM.LASTVALUE"],
            MacroGroup::Trigger => &["TRIGGER.ID"],
        }
    }

    pub fn is_interface(self) -> bool {
        matches!(
            self,
            MacroGroup::AgentInterface | MacroGroup::Interface | MacroGroup::InterfacePort
        )
    }
}

/// Which field of the input entity a config resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceField {
    Text,
    Name,
    Key,
    Parameter,
    Description,
    Comments,
    Url,
    Expression,
}

/// Which facade entry point a config belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Texts,
    Graphs,
    Triggers,
    Items,
}

/// One entry of the static config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionConfig {
    pub id: &'static str,
    pub kinds: &'static [MacroKind],
    pub groups: &'static [MacroGroup],
    pub source: SourceField,
    pub dispatch: Dispatch,
}

use MacroKind::{
    MacroFunction, PlainMacro, PositionalMacro, Reference, Replacement, UserMacro,
};

const HOST_AND_INTERFACE: &[MacroGroup] = &[MacroGroup::Host, MacroGroup::Interface];
const TRIGGER_TEXT_GROUPS: &[MacroGroup] = &[
    MacroGroup::Host,
    MacroGroup::Interface,
    MacroGroup::InterfacePort,
    MacroGroup::Item,
];

static CONFIGS: &[ResolutionConfig] = &[
    ResolutionConfig {
        id: SCRIPT_CONFIRMATION,
        kinds: &[UserMacro, PlainMacro, Replacement],
        groups: HOST_AND_INTERFACE,
        source: SourceField::Text,
        dispatch: Dispatch::Texts,
    },
    ResolutionConfig {
        id: HTTP_TEST_NAME,
        kinds: &[UserMacro, PlainMacro, Replacement],
        groups: HOST_AND_INTERFACE,
        source: SourceField::Name,
        dispatch: Dispatch::Texts,
    },
    ResolutionConfig {
        id: HOST_INTERFACE_IP_DNS,
        kinds: &[UserMacro, PlainMacro],
        groups: &[MacroGroup::Host, MacroGroup::AgentInterface],
        source: SourceField::Text,
        dispatch: Dispatch::Texts,
    },
    ResolutionConfig {
        id: HOST_INTERFACE_IP_DNS_AGENT_PRIMARY,
        kinds: &[UserMacro, PlainMacro],
        groups: &[MacroGroup::Host],
        source: SourceField::Text,
        dispatch: Dispatch::Texts,
    },
    ResolutionConfig {
        id: HOST_INTERFACE_PORT,
        kinds: &[UserMacro],
        groups: &[],
        source: SourceField::Text,
        dispatch: Dispatch::Texts,
    },
    ResolutionConfig {
        id: SCREEN_ELEMENT_URL,
        kinds: &[UserMacro, PlainMacro],
        groups: &[MacroGroup::Host, MacroGroup::HostId, MacroGroup::Interface],
        source: SourceField::Url,
        dispatch: Dispatch::Texts,
    },
    ResolutionConfig {
        id: SCREEN_ELEMENT_URL_USER,
        kinds: &[UserMacro],
        groups: &[],
        source: SourceField::Url,
        dispatch: Dispatch::Texts,
    },
    ResolutionConfig {
        id: GRAPH_NAME,
        kinds: &[MacroFunction, PositionalMacro],
        groups: &[MacroGroup::Host],
        source: SourceField::Name,
        dispatch: Dispatch::Graphs,
    },
    ResolutionConfig {
        id: TRIGGER_NAME,
        kinds: &[UserMacro, PositionalMacro, Reference, Replacement],
        groups: TRIGGER_TEXT_GROUPS,
        source: SourceField::Description,
        dispatch: Dispatch::Triggers,
    },
    ResolutionConfig {
        id: TRIGGER_DESCRIPTION,
        kinds: &[UserMacro, PositionalMacro, Replacement],
        groups: TRIGGER_TEXT_GROUPS,
        source: SourceField::Comments,
        dispatch: Dispatch::Triggers,
    },
    ResolutionConfig {
        id: TRIGGER_URL,
        kinds: &[UserMacro, PositionalMacro],
        groups: &[
            MacroGroup::Trigger,
            MacroGroup::Host,
            MacroGroup::HostId,
            MacroGroup::Interface,
            MacroGroup::InterfacePort,
        ],
        source: SourceField::Url,
        dispatch: Dispatch::Triggers,
    },
    ResolutionConfig {
        id: TRIGGER_EXPRESSION_USER,
        kinds: &[UserMacro],
        groups: &[],
        source: SourceField::Expression,
        dispatch: Dispatch::Triggers,
    },
    ResolutionConfig {
        id: ITEM_NAME,
        kinds: &[UserMacro, Reference],
        groups: &[],
        source: SourceField::Name,
        dispatch: Dispatch::Items,
    },
    ResolutionConfig {
        id: ITEM_KEY,
        kinds: &[UserMacro, PlainMacro],
        groups: HOST_AND_INTERFACE,
        source: SourceField::Key,
        dispatch: Dispatch::Items,
    },
    ResolutionConfig {
        id: FUNCTION_PARAMETER,
        kinds: &[UserMacro],
        groups: &[],
        source: SourceField::Parameter,
        dispatch: Dispatch::Items,
    },
];

impl ResolutionConfig {
    /// Find a config by id.
    pub fn lookup(id: &str) -> Result<&'static ResolutionConfig, ResolveError> {
        CONFIGS
            .iter()
            .find(|config| config.id == id)
            .ok_or_else(|| ResolveError::UnknownConfig(id.to_string()))
    }

    /// Every config in the table.
    pub fn all() -> &'static [ResolutionConfig] {
        CONFIGS
    }

    /// Fail unless this config belongs to the `expected` entry point.
    pub fn expect_dispatch(&self, expected: Dispatch) -> Result<(), ResolveError> {
        if self.dispatch == expected {
            Ok(())
        } else {
            Err(ResolveError::WrongDispatch {
                id: self.id,
                expected,
                actual: self.dispatch,
            })
        }
    }

    pub fn enables(&self, kind: MacroKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn has_group(&self, group: MacroGroup) -> bool {
        self.groups.contains(&group)
    }

    pub fn has_interface_groups(&self) -> bool {
        self.groups.iter().any(|g| g.is_interface())
    }

    /// The group serving a built-in macro name under this config.
    pub fn group_of(&self, name: &str) -> Option<MacroGroup> {
        self.groups
            .iter()
            .copied()
            .find(|group| group.names().contains(&name))
    }

    /// The scan set for this config's grammars and macro groups.
    pub fn scan_set(&self) -> ScanSet<'static> {
        ScanSet::new()
            .with_kinds(self.kinds)
            .with_names(self.groups.iter().flat_map(|group| group.names().iter().copied()))
    }
}

/// Tunables loaded from JSON. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Substituted for built-in macros whose data is missing.
    pub unresolved_string: String,
    /// Substituted for function ids that do not exist.
    pub error_string: String,
    /// Only history newer than this many seconds counts as a last value.
    /// `0` means no limit.
    pub history_period: u64,
    /// Evaluation time in unix seconds; the system clock when unset.
    pub now: Option<i64>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            unresolved_string: "*UNKNOWN*".to_string(),
            error_string: "*ERROR*".to_string(),
            history_period: 0,
            now: None,
        }
    }
}

impl ResolverSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }
}
