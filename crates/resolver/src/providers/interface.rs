//! Address macros: `{IPADDRESS}`, `{HOST.IP}`, `{HOST.DNS}`, `{HOST.CONN}`
//! and `{HOST.PORT}`.
//!
//! Only main interfaces take part unless an item is pinned to an interface.
//! Stored addresses and ports may themselves contain macros; those are
//! expanded once, through `hostInterfaceIpDnsAgentPrimary` (addresses) and
//! `hostInterfacePort` (ports). Neither config has interface macro groups, so
//! the nested resolution never comes back here.

use crate::config::{ResolutionConfig, HOST_INTERFACE_IP_DNS_AGENT_PRIMARY, HOST_INTERFACE_PORT};
use crate::error::ResolveError;
use crate::resolver::MacroResolver;
use crate::store::{HostId, InterfaceId, InterfaceRow, InterfaceType, ItemId, MacroStore};
use hostmacro_parser::has_macros;
use indexmap::IndexMap;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

/// How the interface for a host is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceMode {
    /// The main Agent interface or nothing.
    AgentOnly,
    /// The main interface of the highest-priority type.
    Priority,
}

/// An interface whose address and port are ready for substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInterface {
    pub interface_id: InterfaceId,
    pub host_id: HostId,
    pub ip: String,
    pub dns: String,
    pub use_ip: bool,
    pub port: String,
}

impl From<&InterfaceRow> for ResolvedInterface {
    fn from(row: &InterfaceRow) -> Self {
        Self {
            interface_id: row.interface_id,
            host_id: row.host_id,
            ip: row.ip.clone(),
            dns: row.dns.clone(),
            use_ip: row.use_ip,
            port: row.port.clone(),
        }
    }
}

impl ResolvedInterface {
    pub fn value(&self, name: &str) -> Option<String> {
        match name {
            "IPADDRESS" | "HOST.IP" => Some(self.ip.clone()),
            "HOST.DNS" => Some(self.dns.clone()),
            "HOST.CONN" if self.use_ip => Some(self.ip.clone()),
            "HOST.CONN" => Some(self.dns.clone()),
            "HOST.PORT" => Some(self.port.clone()),
            _ => None,
        }
    }
}

/// Pick the main interface among one host's interfaces.
///
/// Ties within a type go to the lowest interface id.
pub fn select_main(rows: &[InterfaceRow], mode: InterfaceMode) -> Option<&InterfaceRow> {
    let main = rows.iter().filter(|row| row.main);
    match mode {
        InterfaceMode::AgentOnly => main
            .filter(|row| row.kind == InterfaceType::Agent)
            .min_by_key(|row| row.interface_id),
        InterfaceMode::Priority => {
            main.min_by_key(|row| (Reverse(row.kind.priority()), row.interface_id))
        }
    }
}

/// The interface an item is monitored through: its pinned interface when
/// that exists, otherwise the host's main interface by priority.
pub fn select_for_item(rows: &[InterfaceRow], pinned: Option<InterfaceId>) -> Option<&InterfaceRow> {
    pinned
        .and_then(|id| rows.iter().find(|row| row.interface_id == id))
        .or_else(|| select_main(rows, InterfaceMode::Priority))
}

fn group_by_host(rows: Vec<InterfaceRow>) -> HashMap<HostId, Vec<InterfaceRow>> {
    let mut by_host: HashMap<HostId, Vec<InterfaceRow>> = HashMap::new();
    for row in rows {
        by_host.entry(row.host_id).or_default().push(row);
    }
    by_host
}

fn fetch_by_host<S>(
    resolver: &MacroResolver<'_, S>,
    host_ids: &BTreeSet<HostId>,
) -> Result<HashMap<HostId, Vec<InterfaceRow>>, ResolveError>
where
    S: MacroStore + ?Sized,
{
    if host_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let ids: Vec<HostId> = host_ids.iter().copied().collect();
    Ok(group_by_host(resolver.store().fetch_interfaces(&ids)?))
}

/// The main interface of each host, with nested macros expanded.
pub fn resolve_main<S>(
    resolver: &MacroResolver<'_, S>,
    host_ids: &BTreeSet<HostId>,
    mode: InterfaceMode,
) -> Result<HashMap<HostId, ResolvedInterface>, ResolveError>
where
    S: MacroStore + ?Sized,
{
    let by_host = fetch_by_host(resolver, host_ids)?;
    let mut interfaces: Vec<ResolvedInterface> = host_ids
        .iter()
        .filter_map(|host_id| by_host.get(host_id))
        .filter_map(|rows| select_main(rows, mode))
        .map(ResolvedInterface::from)
        .collect();
    expand_macros(resolver, &mut interfaces)?;
    Ok(interfaces
        .into_iter()
        .map(|iface| (iface.host_id, iface))
        .collect())
}

/// The interface of each `(item, host, pinned interface)`, by item.
pub fn resolve_for_items<S>(
    resolver: &MacroResolver<'_, S>,
    items: &[(ItemId, HostId, Option<InterfaceId>)],
) -> Result<HashMap<ItemId, ResolvedInterface>, ResolveError>
where
    S: MacroStore + ?Sized,
{
    let host_ids: BTreeSet<HostId> = items.iter().map(|(_, host_id, _)| *host_id).collect();
    let by_host = fetch_by_host(resolver, &host_ids)?;

    let mut interfaces: Vec<ResolvedInterface> = Vec::new();
    let mut slot_of: HashMap<InterfaceId, usize> = HashMap::new();
    let mut item_slots: Vec<(ItemId, usize)> = Vec::new();
    for &(item_id, host_id, pinned) in items {
        let Some(row) = by_host
            .get(&host_id)
            .and_then(|rows| select_for_item(rows, pinned))
        else {
            continue;
        };
        let slot = *slot_of.entry(row.interface_id).or_insert_with(|| {
            interfaces.push(ResolvedInterface::from(row));
            interfaces.len() - 1
        });
        item_slots.push((item_id, slot));
    }

    expand_macros(resolver, &mut interfaces)?;
    Ok(item_slots
        .into_iter()
        .map(|(item_id, slot)| (item_id, interfaces[slot].clone()))
        .collect())
}

type Field = fn(&mut ResolvedInterface) -> &mut String;

fn ip(iface: &mut ResolvedInterface) -> &mut String {
    &mut iface.ip
}

fn dns(iface: &mut ResolvedInterface) -> &mut String {
    &mut iface.dns
}

fn port(iface: &mut ResolvedInterface) -> &mut String {
    &mut iface.port
}

const ADDRESS_FIELDS: [Field; 2] = [ip, dns];
const PORT_FIELDS: [Field; 1] = [port];

/// Expand macros in the stored address and port of every interface.
pub fn expand_macros<S>(
    resolver: &MacroResolver<'_, S>,
    interfaces: &mut [ResolvedInterface],
) -> Result<(), ResolveError>
where
    S: MacroStore + ?Sized,
{
    if interfaces.is_empty() {
        return Ok(());
    }
    let addresses = ResolutionConfig::lookup(HOST_INTERFACE_IP_DNS_AGENT_PRIMARY)?;
    expand_fields(resolver, addresses, interfaces, &ADDRESS_FIELDS)?;
    let ports = ResolutionConfig::lookup(HOST_INTERFACE_PORT)?;
    expand_fields(resolver, ports, interfaces, &PORT_FIELDS)
}

fn expand_fields<S>(
    resolver: &MacroResolver<'_, S>,
    config: &'static ResolutionConfig,
    interfaces: &mut [ResolvedInterface],
    fields: &[Field],
) -> Result<(), ResolveError>
where
    S: MacroStore + ?Sized,
{
    let set = config.scan_set();
    let mut data: IndexMap<HostId, Vec<String>> = IndexMap::new();
    // (interface, field, host, position in the host's texts)
    let mut slots: Vec<(usize, usize, HostId, usize)> = Vec::new();

    for (i, iface) in interfaces.iter_mut().enumerate() {
        let host_id = iface.host_id;
        for (f, field) in fields.iter().enumerate() {
            let text = field(iface);
            if !has_macros([text.as_str()], &set) {
                continue;
            }
            let texts = data.entry(host_id).or_default();
            slots.push((i, f, host_id, texts.len()));
            texts.push(text.clone());
        }
    }
    if data.is_empty() {
        return Ok(());
    }

    let resolved = resolver.resolve_texts(config, data)?;
    for (i, f, host_id, position) in slots {
        if let Some(value) = resolved.get(&host_id).and_then(|texts| texts.get(position)) {
            *fields[f](&mut interfaces[i]) = value.clone();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn row(interface_id: InterfaceId, kind: InterfaceType, main: bool) -> InterfaceRow {
        InterfaceRow {
            interface_id,
            host_id: 1,
            kind,
            ip: format!("10.0.0.{interface_id}"),
            dns: format!("if{interface_id}.local"),
            use_ip: false,
            main,
            port: "10050".to_string(),
        }
    }

    #[test]
    fn test_priority_prefers_snmp_over_jmx() {
        let rows = vec![
            row(1, InterfaceType::Jmx, true),
            row(2, InterfaceType::Snmp, true),
            row(3, InterfaceType::Agent, false),
        ];
        assert_eq!(select_main(&rows, InterfaceMode::Priority).map(|r| r.interface_id), Some(2));
        assert!(select_main(&rows, InterfaceMode::AgentOnly).is_none());
    }

    #[test]
    fn test_pinned_interface_wins() {
        let rows = vec![row(1, InterfaceType::Agent, true), row(2, InterfaceType::Snmp, false)];
        assert_eq!(select_for_item(&rows, Some(2)).map(|r| r.interface_id), Some(2));
        assert_eq!(select_for_item(&rows, Some(9)).map(|r| r.interface_id), Some(1));
        assert_eq!(select_for_item(&rows, None).map(|r| r.interface_id), Some(1));
    }

    #[test]
    fn test_conn_follows_use_ip() {
        let mut iface = ResolvedInterface::from(&row(4, InterfaceType::Agent, true));
        assert_eq!(iface.value("HOST.CONN").as_deref(), Some("if4.local"));
        iface.use_ip = true;
        assert_eq!(iface.value("HOST.CONN").as_deref(), Some("10.0.0.4"));
        assert_eq!(iface.value("HOST.PORT").as_deref(), Some("10050"));
    }

    #[test]
    fn test_nested_macros_expanded() {
        let store = MemoryStore::from_json(
            r#"{
                "hosts": [{"host_id": 1, "host": "srv-a", "name": "Server A"}],
                "interfaces": [{"interface_id": 5, "host_id": 1, "type": "agent",
                    "ip": "{$SUBNET}.7", "dns": "{HOST.HOST}.example.com",
                    "use_ip": true, "main": true, "port": "{$PORT}"}],
                "host_macros": [
                    {"host_id": 1, "macro": "{$SUBNET}", "value": "192.168.1"},
                    {"host_id": 1, "macro": "{$PORT}", "value": "10055"}
                ]
            }"#,
        )
        .unwrap();
        let resolver = MacroResolver::new(&store);
        let hosts: BTreeSet<HostId> = [1].into_iter().collect();
        let resolved = resolve_main(&resolver, &hosts, InterfaceMode::AgentOnly).unwrap();
        let iface = &resolved[&1];
        assert_eq!(iface.ip, "192.168.1.7");
        assert_eq!(iface.dns, "srv-a.example.com");
        assert_eq!(iface.port, "10055");
    }
}
