//! An in-memory [`MacroStore`], loadable from a JSON fixture.
//!
//! Every trait call is one round trip; the store records the query names so
//! tests can assert how often, and whether, storage was touched. A failure
//! can be injected for any query name.
//!
//! ```rust
//! use hostmacro_resolver::memory::MemoryStore;
//!
//! let store = MemoryStore::from_json(r#"{
//!     "hosts": [{"host_id": 1, "host": "srv-a", "name": "Server A"}],
//!     "global_macros": [{"macro": "{$TIMEOUT}", "value": "30"}]
//! }"#).unwrap();
//! assert_eq!(store.round_trips(), 0);
//! ```

use crate::error::StoreError;
use crate::store::{
    AggregateFunction, AggregateRequest, AggregateRow, FunctionId, FunctionRow, GlobalMacroRow,
    HistoryRow, HostId, HostItemRow, HostMacroRow, HostRow, InterfaceRow, ItemId, ItemRow,
    MacroStore, TemplateLinkRow, ValueAtRequest,
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MemoryStore {
    pub hosts: Vec<HostRow>,
    pub interfaces: Vec<InterfaceRow>,
    pub host_macros: Vec<HostMacroRow>,
    pub template_links: Vec<TemplateLinkRow>,
    pub global_macros: Vec<GlobalMacroRow>,
    pub history: Vec<HistoryRow>,
    pub functions: Vec<FunctionRow>,
    pub items: Vec<ItemRow>,
    #[serde(skip)]
    queries: Mutex<Vec<&'static str>>,
    #[serde(skip)]
    fail_on: Option<&'static str>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Make every call of the named query fail.
    pub fn fail_on(mut self, query: &'static str) -> Self {
        self.fail_on = Some(query);
        self
    }

    pub fn round_trips(&self) -> usize {
        self.queries.lock().len()
    }

    /// Names of the queries issued so far, in order.
    pub fn queries(&self) -> Vec<&'static str> {
        self.queries.lock().clone()
    }

    pub fn reset_queries(&self) {
        self.queries.lock().clear();
    }

    fn begin(&self, query: &'static str) -> Result<(), StoreError> {
        self.queries.lock().push(query);
        if self.fail_on == Some(query) {
            return Err(StoreError::Query {
                query,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn newest<'a, I>(rows: I) -> Option<&'a HistoryRow>
where
    I: Iterator<Item = &'a HistoryRow>,
{
    rows.max_by_key(|row| (row.clock, row.ns))
}

fn aggregate(function: AggregateFunction, values: &[f64]) -> Option<f64> {
    let first = *values.first()?;
    Some(match function {
        AggregateFunction::Min => values.iter().copied().fold(first, f64::min),
        AggregateFunction::Max => values.iter().copied().fold(first, f64::max),
        AggregateFunction::Avg => values.iter().sum::<f64>() / values.len() as f64,
    })
}

impl MacroStore for MemoryStore {
    fn fetch_hosts(&self, host_ids: &[HostId]) -> Result<Vec<HostRow>, StoreError> {
        self.begin("fetch_hosts")?;
        Ok(self
            .hosts
            .iter()
            .filter(|h| host_ids.contains(&h.host_id))
            .cloned()
            .collect())
    }

    fn fetch_interfaces(&self, host_ids: &[HostId]) -> Result<Vec<InterfaceRow>, StoreError> {
        self.begin("fetch_interfaces")?;
        Ok(self
            .interfaces
            .iter()
            .filter(|i| host_ids.contains(&i.host_id))
            .cloned()
            .collect())
    }

    fn fetch_host_macros(&self, host_ids: &[HostId]) -> Result<Vec<HostMacroRow>, StoreError> {
        self.begin("fetch_host_macros")?;
        Ok(self
            .host_macros
            .iter()
            .filter(|m| host_ids.contains(&m.host_id))
            .cloned()
            .collect())
    }

    fn fetch_template_parents(
        &self,
        host_ids: &[HostId],
    ) -> Result<Vec<TemplateLinkRow>, StoreError> {
        self.begin("fetch_template_parents")?;
        Ok(self
            .template_links
            .iter()
            .filter(|l| host_ids.contains(&l.host_id))
            .cloned()
            .collect())
    }

    fn fetch_global_macros(&self) -> Result<Vec<GlobalMacroRow>, StoreError> {
        self.begin("fetch_global_macros")?;
        Ok(self.global_macros.clone())
    }

    fn fetch_last_values(
        &self,
        item_ids: &[ItemId],
        since: Option<i64>,
    ) -> Result<Vec<HistoryRow>, StoreError> {
        self.begin("fetch_last_values")?;
        Ok(item_ids
            .iter()
            .filter_map(|&item_id| {
                newest(self.history.iter().filter(|row| {
                    row.item_id == item_id && since.map_or(true, |since| row.clock >= since)
                }))
            })
            .cloned()
            .collect())
    }

    fn fetch_values_at(&self, requests: &[ValueAtRequest]) -> Result<Vec<HistoryRow>, StoreError> {
        self.begin("fetch_values_at")?;
        Ok(requests
            .iter()
            .filter_map(|req| {
                newest(self.history.iter().filter(|row| {
                    row.item_id == req.item_id && (row.clock, row.ns) <= (req.clock, req.ns)
                }))
                .map(|row| HistoryRow {
                    item_id: req.item_id,
                    value: row.value.clone(),
                    clock: req.clock,
                    ns: req.ns,
                })
            })
            .collect())
    }

    fn fetch_aggregated_values(
        &self,
        requests: &[AggregateRequest],
    ) -> Result<Vec<AggregateRow>, StoreError> {
        self.begin("fetch_aggregated_values")?;
        Ok(requests
            .iter()
            .filter_map(|req| {
                let values: Vec<f64> = self
                    .history
                    .iter()
                    .filter(|row| {
                        row.item_id == req.item_id && row.clock >= req.from && row.clock <= req.to
                    })
                    .filter_map(|row| row.value.trim().parse().ok())
                    .collect();
                aggregate(req.function, &values).map(|value| AggregateRow {
                    item_id: req.item_id,
                    function: req.function,
                    from: req.from,
                    to: req.to,
                    value: value.to_string(),
                })
            })
            .collect())
    }

    fn fetch_functions(&self, function_ids: &[FunctionId]) -> Result<Vec<FunctionRow>, StoreError> {
        self.begin("fetch_functions")?;
        Ok(self
            .functions
            .iter()
            .filter(|f| function_ids.contains(&f.function_id))
            .cloned()
            .collect())
    }

    fn fetch_items(&self, item_ids: &[ItemId]) -> Result<Vec<ItemRow>, StoreError> {
        self.begin("fetch_items")?;
        Ok(self
            .items
            .iter()
            .filter(|i| item_ids.contains(&i.item_id))
            .cloned()
            .collect())
    }

    fn fetch_items_by_host_key(
        &self,
        pairs: &[(String, String)],
    ) -> Result<Vec<HostItemRow>, StoreError> {
        self.begin("fetch_items_by_host_key")?;
        let host_names: HashMap<HostId, &str> = self
            .hosts
            .iter()
            .map(|h| (h.host_id, h.host.as_str()))
            .collect();
        Ok(self
            .items
            .iter()
            .filter_map(|item| {
                let host = *host_names.get(&item.host_id)?;
                pairs
                    .iter()
                    .any(|(h, k)| h == host && k == &item.key)
                    .then(|| HostItemRow {
                        host: host.to_string(),
                        key: item.key.clone(),
                        item_id: item.item_id,
                    })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::from_json(
            r#"{
                "history": [
                    {"item_id": 1, "value": "1", "clock": 100},
                    {"item_id": 1, "value": "4", "clock": 200},
                    {"item_id": 1, "value": "7", "clock": 300, "ns": 5}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_last_values_respect_since() {
        let store = store();
        let rows = store.fetch_last_values(&[1, 2], None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "7");
        assert!(store.fetch_last_values(&[1], Some(400)).unwrap().is_empty());
    }

    #[test]
    fn test_values_at() {
        let store = store();
        let rows = store
            .fetch_values_at(&[ValueAtRequest {
                item_id: 1,
                clock: 300,
                ns: 0,
            }])
            .unwrap();
        assert_eq!(rows[0].value, "4");
        assert_eq!(rows[0].clock, 300);
    }

    #[test]
    fn test_aggregates() {
        let store = store();
        let request = |function| AggregateRequest {
            item_id: 1,
            function,
            from: 150,
            to: 300,
        };
        let rows = store
            .fetch_aggregated_values(&[
                request(AggregateFunction::Min),
                request(AggregateFunction::Max),
                request(AggregateFunction::Avg),
            ])
            .unwrap();
        let values: Vec<_> = rows.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["4", "7", "5.5"]);
    }

    #[test]
    fn test_round_trips_and_failure_injection() {
        let store = store().fail_on("fetch_hosts");
        assert!(store.fetch_items(&[1]).is_ok());
        assert!(matches!(
            store.fetch_hosts(&[1]),
            Err(StoreError::Query { query: "fetch_hosts", .. })
        ));
        assert_eq!(store.queries(), vec!["fetch_items", "fetch_hosts"]);
        assert_eq!(store.round_trips(), 2);
    }
}
