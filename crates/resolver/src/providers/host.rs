//! `{HOSTNAME}`, `{HOST.HOST}` and `{HOST.NAME}`.

use crate::error::StoreError;
use crate::store::{HostId, HostRow, MacroStore};
use std::collections::{BTreeSet, HashMap};

pub fn fetch_hosts<S>(store: &S, host_ids: &BTreeSet<HostId>) -> Result<HashMap<HostId, HostRow>, StoreError>
where
    S: MacroStore + ?Sized,
{
    if host_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let ids: Vec<HostId> = host_ids.iter().copied().collect();
    Ok(store
        .fetch_hosts(&ids)?
        .into_iter()
        .map(|row| (row.host_id, row))
        .collect())
}

/// The value of a host macro, by name without braces.
pub fn host_value(row: &HostRow, name: &str) -> Option<String> {
    match name {
        "HOSTNAME" | "HOST.HOST" => Some(row.host.clone()),
        "HOST.NAME" => Some(row.name.clone()),
        "HOST.ID" => Some(row.host_id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_host_value() {
        let row = HostRow {
            host_id: 7,
            host: "srv-a".to_string(),
            name: "Server A".to_string(),
        };
        assert_eq!(host_value(&row, "HOSTNAME").as_deref(), Some("srv-a"));
        assert_eq!(host_value(&row, "HOST.HOST").as_deref(), Some("srv-a"));
        assert_eq!(host_value(&row, "HOST.NAME").as_deref(), Some("Server A"));
        assert_eq!(host_value(&row, "HOST.IP"), None);
    }

    #[test]
    fn test_no_ids_no_round_trip() {
        let store = MemoryStore::new();
        assert!(fetch_hosts(&store, &BTreeSet::new()).unwrap().is_empty());
        assert_eq!(store.round_trips(), 0);
    }
}
