//! The storage boundary.
//!
//! The resolver never queries storage one entity at a time: every method of
//! [`MacroStore`] takes the full batch of ids a call needs, and the resolver
//! calls each method at most once per call (host macros and template links
//! once per template level). The store is expected to return only rows the
//! caller may see.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};

pub type HostId = u64;
pub type ItemId = u64;
pub type FunctionId = u64;
pub type TriggerId = u64;
pub type InterfaceId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRow {
    pub host_id: HostId,
    /// Technical host name
    pub host: String,
    /// Visible name
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceType {
    Agent,
    Snmp,
    Ipmi,
    Jmx,
}

impl InterfaceType {
    /// Higher wins when picking the interface for address macros.
    pub fn priority(self) -> u8 {
        match self {
            InterfaceType::Agent => 4,
            InterfaceType::Snmp => 3,
            InterfaceType::Jmx => 2,
            InterfaceType::Ipmi => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRow {
    pub interface_id: InterfaceId,
    pub host_id: HostId,
    #[serde(rename = "type")]
    pub kind: InterfaceType,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub dns: String,
    pub use_ip: bool,
    pub main: bool,
    #[serde(default)]
    pub port: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMacroRow {
    pub host_id: HostId,
    /// `{$NAME}`, `{$NAME:context}`, `{$NAME:regex:"..."}` or the bare forms
    #[serde(rename = "macro")]
    pub macro_name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLinkRow {
    pub host_id: HostId,
    pub template_id: HostId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalMacroRow {
    #[serde(rename = "macro")]
    pub macro_name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub item_id: ItemId,
    pub value: String,
    pub clock: i64,
    #[serde(default)]
    pub ns: i64,
}

/// The value of an item as of a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueAtRequest {
    pub item_id: ItemId,
    pub clock: i64,
    pub ns: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Min,
    Max,
    Avg,
}

impl AggregateFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "avg" => Some(AggregateFunction::Avg),
            _ => None,
        }
    }
}

/// An aggregate of an item's history over `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateRequest {
    pub item_id: ItemId,
    pub function: AggregateFunction,
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub item_id: ItemId,
    pub function: AggregateFunction,
    pub from: i64,
    pub to: i64,
    pub value: String,
}

impl AggregateRow {
    pub fn request(&self) -> AggregateRequest {
        AggregateRequest {
            item_id: self.item_id,
            function: self.function,
            from: self.from,
            to: self.to,
        }
    }
}

/// A function of a trigger expression, `{function_id}` in stored form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRow {
    pub function_id: FunctionId,
    pub trigger_id: TriggerId,
    pub item_id: ItemId,
    pub function: String,
    #[serde(default)]
    pub parameter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRow {
    pub item_id: ItemId,
    pub host_id: HostId,
    pub key: String,
    #[serde(default)]
    pub name: String,
    /// The interface the item is monitored through, if pinned
    #[serde(default)]
    pub interface_id: Option<InterfaceId>,
}

/// An item found by technical host name and key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostItemRow {
    pub host: String,
    pub key: String,
    pub item_id: ItemId,
}

/// Batched, read-only access to the configuration model.
pub trait MacroStore {
    fn fetch_hosts(&self, host_ids: &[HostId]) -> Result<Vec<HostRow>, StoreError>;

    /// All interfaces of the hosts; callers filter main interfaces.
    fn fetch_interfaces(&self, host_ids: &[HostId]) -> Result<Vec<InterfaceRow>, StoreError>;

    fn fetch_host_macros(&self, host_ids: &[HostId]) -> Result<Vec<HostMacroRow>, StoreError>;

    /// Direct parent templates of the hosts or templates.
    fn fetch_template_parents(
        &self,
        host_ids: &[HostId],
    ) -> Result<Vec<TemplateLinkRow>, StoreError>;

    fn fetch_global_macros(&self) -> Result<Vec<GlobalMacroRow>, StoreError>;

    /// The newest value of each item, ignoring values older than `since`.
    fn fetch_last_values(
        &self,
        item_ids: &[ItemId],
        since: Option<i64>,
    ) -> Result<Vec<HistoryRow>, StoreError>;

    /// For each request, the newest value not newer than its clock/ns.
    /// Returned rows carry the request's clock/ns so they can be matched.
    fn fetch_values_at(&self, requests: &[ValueAtRequest]) -> Result<Vec<HistoryRow>, StoreError>;

    fn fetch_aggregated_values(
        &self,
        requests: &[AggregateRequest],
    ) -> Result<Vec<AggregateRow>, StoreError>;

    fn fetch_functions(&self, function_ids: &[FunctionId]) -> Result<Vec<FunctionRow>, StoreError>;

    fn fetch_items(&self, item_ids: &[ItemId]) -> Result<Vec<ItemRow>, StoreError>;

    /// Items by `(technical host name, key)`.
    fn fetch_items_by_host_key(
        &self,
        pairs: &[(String, String)],
    ) -> Result<Vec<HostItemRow>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_priority() {
        let mut kinds = vec![
            InterfaceType::Ipmi,
            InterfaceType::Agent,
            InterfaceType::Jmx,
            InterfaceType::Snmp,
        ];
        kinds.sort_by_key(|k| std::cmp::Reverse(k.priority()));
        assert_eq!(
            kinds,
            vec![
                InterfaceType::Agent,
                InterfaceType::Snmp,
                InterfaceType::Jmx,
                InterfaceType::Ipmi
            ]
        );
    }

    #[test]
    fn test_interface_row_from_json() {
        let row: InterfaceRow = serde_json::from_str(
            r#"{"interface_id": 1, "host_id": 2, "type": "snmp", "ip": "10.0.0.1",
                "use_ip": true, "main": true, "port": "161"}"#,
        )
        .unwrap();
        assert_eq!(row.kind, InterfaceType::Snmp);
        assert_eq!(row.dns, "");
    }
}
