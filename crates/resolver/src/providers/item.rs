//! Item values: last values, values as of an event and history aggregates.

use crate::error::StoreError;
use crate::store::{AggregateRequest, ItemId, MacroStore, ValueAtRequest};
use std::collections::{BTreeSet, HashMap, HashSet};

/// The newest value of each item, ignoring history older than `since`.
/// Values with a zero clock were never collected and are left out.
pub fn last_values<S>(
    store: &S,
    item_ids: &BTreeSet<ItemId>,
    since: Option<i64>,
) -> Result<HashMap<ItemId, String>, StoreError>
where
    S: MacroStore + ?Sized,
{
    if item_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let ids: Vec<ItemId> = item_ids.iter().copied().collect();
    Ok(store
        .fetch_last_values(&ids, since)?
        .into_iter()
        .filter(|row| row.clock > 0)
        .map(|row| (row.item_id, row.value))
        .collect())
}

pub fn values_at<S>(
    store: &S,
    requests: &HashSet<ValueAtRequest>,
) -> Result<HashMap<ValueAtRequest, String>, StoreError>
where
    S: MacroStore + ?Sized,
{
    if requests.is_empty() {
        return Ok(HashMap::new());
    }
    let batch: Vec<ValueAtRequest> = requests.iter().copied().collect();
    Ok(store
        .fetch_values_at(&batch)?
        .into_iter()
        .map(|row| {
            let request = ValueAtRequest {
                item_id: row.item_id,
                clock: row.clock,
                ns: row.ns,
            };
            (request, row.value)
        })
        .collect())
}

pub fn aggregated<S>(
    store: &S,
    requests: &HashSet<AggregateRequest>,
) -> Result<HashMap<AggregateRequest, String>, StoreError>
where
    S: MacroStore + ?Sized,
{
    if requests.is_empty() {
        return Ok(HashMap::new());
    }
    let batch: Vec<AggregateRequest> = requests.iter().copied().collect();
    Ok(store
        .fetch_aggregated_values(&batch)?
        .into_iter()
        .map(|row| (row.request(), row.value))
        .collect())
}
