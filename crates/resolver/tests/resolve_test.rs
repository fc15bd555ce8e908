//! End-to-end resolution over the fixture in `tests/fixtures`.
//!
//! Host 1 is linked to template 50, which is linked to template 60. Host 3 is
//! linked to template 70, and templates 70 and 71 list each other as parents.
//! The graph tests use `graphs.json`: three hosts with one item each and
//! history around clock 10000.

use hostmacro_resolver::config::{GRAPH_NAME, HOST_INTERFACE_IP_DNS, SCRIPT_CONFIRMATION};
use hostmacro_resolver::{
    Graph, GraphItem, Item, MacroResolver, MemoryStore, ResolveError, ResolverSettings, StoreError,
};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;

fn store() -> MemoryStore {
    MemoryStore::from_json(include_str!("fixtures/inheritance.json")).unwrap()
}

fn resolve_on(store: &MemoryStore, host_id: u64, text: &str) -> String {
    let mut data = IndexMap::new();
    data.insert(host_id, vec![text.to_string()]);
    let mut resolved = MacroResolver::new(store)
        .resolve(SCRIPT_CONFIRMATION, data)
        .unwrap();
    resolved.swap_remove(&host_id).unwrap().remove(0)
}

fn count(store: &MemoryStore, query: &str) -> usize {
    store.queries().iter().filter(|q| **q == query).count()
}

#[test]
fn test_server_a_ping_30() {
    let store = MemoryStore::from_json(
        r#"{
            "hosts": [{"host_id": 1, "host": "srv-a", "name": "Server A"}],
            "global_macros": [{"macro": "{$TIMEOUT}", "value": "30"}]
        }"#,
    )
    .unwrap();
    assert_eq!(resolve_on(&store, 1, "{HOST.NAME} ping {$TIMEOUT}"), "Server A ping 30");
}

#[test]
fn test_host_context_beats_global_context() {
    assert_eq!(resolve_on(&store(), 1, r#"{$HCTX:"db"}"#), "host-ctx");
}

#[test]
fn test_template_context_beats_host_base() {
    assert_eq!(resolve_on(&store(), 1, r#"{$TCTX:"db"}"#), "template-ctx");
}

#[test]
fn test_global_context_beats_host_base() {
    assert_eq!(resolve_on(&store(), 1, r#"{$GCTX:"db"}"#), "global-ctx");
}

#[test]
fn test_host_base_beats_global_base() {
    assert_eq!(resolve_on(&store(), 1, r#"{$HBASE:"db"}"#), "host-base");
}

#[test]
fn test_global_base_is_last_resort() {
    assert_eq!(resolve_on(&store(), 1, r#"{$GBASE:"db"}"#), "global-base");
    assert_eq!(resolve_on(&store(), 1, "{$MISSING}"), "{$MISSING}");
}

#[test]
fn test_regex_context() {
    let store = store();
    assert_eq!(resolve_on(&store, 1, "{$PATH:/var/log}"), "var-path");
    assert_eq!(resolve_on(&store, 1, "{$PATH:/tmp}"), "root-path");
}

#[test]
fn test_nearest_template_level_wins() {
    let store = store();
    assert_eq!(resolve_on(&store, 1, "{$DEEP}"), "near");
    assert_eq!(resolve_on(&store, 2, "{$DEEP}"), "far");
}

#[test]
fn test_template_cycle_terminates() {
    let store = store();
    assert_eq!(resolve_on(&store, 3, "{$LOOP} {$NOWHERE}"), "seventy {$NOWHERE}");
    // host 3, template 70 and template 71, each loaded once
    assert!(count(&store, "fetch_host_macros") <= 3);
    assert_eq!(count(&store, "fetch_global_macros"), 1);
}

#[test]
fn test_batch_shares_round_trips() {
    let store = store();
    let mut data = IndexMap::new();
    data.insert(1, vec!["{HOST.HOST} {$DEEP}".to_string(), "{$TIMEOUT}".to_string()]);
    data.insert(2, vec!["{HOST.HOST} {$DEEP}".to_string()]);
    let resolved = MacroResolver::new(&store)
        .resolve(SCRIPT_CONFIRMATION, data)
        .unwrap();
    assert_eq!(resolved[&1], vec!["srv-a near", "30"]);
    assert_eq!(resolved[&2], vec!["srv-b far"]);
    assert_eq!(count(&store, "fetch_hosts"), 1);
    assert_eq!(count(&store, "fetch_global_macros"), 1);
}

#[test]
fn test_interface_priority() {
    let store = store();
    // SNMP outranks JMX; IPMI is not a main interface. No port macros here.
    assert_eq!(
        resolve_on(&store, 2, "{HOST.CONN}:{HOST.PORT} {HOST.IP}"),
        "snmp.local:{HOST.PORT} 10.0.0.22"
    );
    assert_eq!(resolve_on(&store, 1, "{HOST.CONN}"), "10.0.0.1");
}

#[test]
fn test_agent_only_config() {
    let store = store();
    let mut data = IndexMap::new();
    data.insert(1, vec!["{HOST.DNS}".to_string()]);
    data.insert(2, vec!["{HOST.DNS}".to_string()]);
    let resolved = MacroResolver::new(&store)
        .resolve(HOST_INTERFACE_IP_DNS, data)
        .unwrap();
    assert_eq!(resolved[&1], vec!["srv-a.local"]);
    assert_eq!(resolved[&2], vec!["*UNKNOWN*"]);
}

#[test]
fn test_regsub_replacement() {
    let store = store();
    assert_eq!(
        resolve_on(&store, 2, r#"{{HOST.HOST}.regsub("srv-(.*)","node \1")}"#),
        "node b"
    );
    assert_eq!(
        resolve_on(&store, 2, r#"{{HOST.HOST}.regsub("^x","y")}"#),
        "*UNKNOWN*"
    );
}

#[test]
fn test_text_without_macros_is_untouched() {
    let store = store();
    let text = "plain {text} with $1 and {#LLD}";
    assert_eq!(resolve_on(&store, 1, text), text);
    assert_eq!(store.round_trips(), 0);
}

#[test]
fn test_empty_input_touches_nothing() {
    let store = store();
    let resolver = MacroResolver::new(&store);
    assert!(resolver.resolve(SCRIPT_CONFIRMATION, IndexMap::new()).unwrap().is_empty());

    let mut data = IndexMap::new();
    data.insert(1, vec![String::new()]);
    assert_eq!(resolver.resolve(SCRIPT_CONFIRMATION, data).unwrap()[&1], vec![""]);
    assert_eq!(store.round_trips(), 0);
}

#[test]
fn test_storage_failure_aborts_the_call() {
    let store = store().fail_on("fetch_interfaces");
    let mut data = IndexMap::new();
    data.insert(1, vec!["{$TIMEOUT} {HOST.CONN}".to_string()]);
    let err = MacroResolver::new(&store)
        .resolve(SCRIPT_CONFIRMATION, data)
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Storage(StoreError::Query {
            query: "fetch_interfaces",
            ..
        })
    ));
}

#[test]
fn test_item_key_forced_quoting() {
    let store = store();
    let items = vec![Item {
        item_id: 1,
        host_id: 1,
        key: "log[{$FILES},{HOST.HOST}]".to_string(),
        ..Item::default()
    }];
    let items = MacroResolver::new(&store).resolve_item_keys(items).unwrap();
    assert_eq!(items[0].key_expanded, r#"log["a.log,b.log",srv-a]"#);
}

fn graph_store() -> MemoryStore {
    MemoryStore::from_json(include_str!("fixtures/graphs.json")).unwrap()
}

fn graph(graph_id: u64, name: &str, item_ids: &[u64]) -> Graph {
    let hosts = [
        (11, 1, "web-1", "Web One"),
        (21, 2, "web-2", "Web Two"),
        (31, 3, "db-1", "Database"),
    ];
    let items = item_ids
        .iter()
        .filter_map(|id| hosts.iter().find(|(item_id, ..)| item_id == id))
        .map(|&(item_id, host_id, host, name)| GraphItem {
            item_id,
            host_id,
            host: host.to_string(),
            name: name.to_string(),
        })
        .collect();
    Graph {
        graph_id,
        name: name.to_string(),
        items,
    }
}

fn resolve_graphs(store: &MemoryStore, graphs: Vec<Graph>) -> Vec<String> {
    let settings = ResolverSettings {
        now: Some(10_000),
        ..ResolverSettings::default()
    };
    MacroResolver::with_settings(store, settings)
        .resolve_graphs(GRAPH_NAME, graphs)
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect()
}

#[test]
fn test_graph_names_with_positional_hosts_and_functions() {
    let store = graph_store();
    let name = "{HOST.NAME} / {HOST.NAME2} / {HOST.NAME3}: \
                {{HOST.HOST}:system.cpu.load[all,avg1].last()} \
                {{HOST.HOST2}:system.cpu.load[all,avg1].max(1h)} \
                {{HOST.HOST2}:system.cpu.load[all,avg1].avg(1h)} \
                {{HOST.HOST2}:system.cpu.load[all,avg1].avg(2h)} \
                {{HOST.HOST3}:mysql.qps.last()}";
    assert_eq!(
        resolve_graphs(&store, vec![graph(1, name, &[11, 21, 31])]),
        vec!["Web One / Web Two / Database: 0.75 6 5 4 120"]
    );
}

#[test]
fn test_graph_batch_shares_round_trips() {
    let store = graph_store();
    let graphs = vec![
        graph(1, "CPU {HOST.HOST}: {{HOST.HOST}:system.cpu.load[all,avg1].min(1h)}", &[11]),
        graph(2, "Static title", &[21]),
        graph(3, "{{HOST.HOST}:mysql.qps.last()} qps on {db-1:mysql.qps.max(1d)}", &[31]),
        graph(4, "{HOST.HOST2} vs {HOST.HOST}", &[11, 21]),
    ];
    assert_eq!(
        resolve_graphs(&store, graphs),
        vec![
            "CPU web-1: 0.75",
            "Static title",
            "120 qps on 120",
            "web-2 vs web-1",
        ]
    );
    assert_eq!(
        store.queries(),
        vec!["fetch_items_by_host_key", "fetch_last_values", "fetch_aggregated_values"]
    );
}

#[test]
fn test_graph_positions_past_the_item_list() {
    let store = graph_store();
    let settings = ResolverSettings {
        unresolved_string: "n/a".to_string(),
        now: Some(10_000),
        ..ResolverSettings::default()
    };
    let resolved = MacroResolver::with_settings(&store, settings)
        .resolve_graphs(
            GRAPH_NAME,
            vec![graph(
                1,
                "{HOST.HOST} {HOST.NAME2} {{HOST.HOST2}:mysql.qps.last()} {{HOST.HOST}:mysql.qps.last()}",
                &[31],
            )],
        )
        .unwrap();
    assert_eq!(resolved[0].name, "db-1 n/a n/a 120");
}

#[test]
fn test_graph_names_need_graph_config() {
    let store = graph_store();
    let err = MacroResolver::new(&store)
        .resolve_graphs(SCRIPT_CONFIRMATION, vec![graph(1, "{HOST.HOST}", &[11])])
        .unwrap_err();
    assert!(matches!(err, ResolveError::WrongDispatch { .. }));
    assert_eq!(store.round_trips(), 0);
}

#[test]
fn test_graph_storage_failure_returns_no_partial_output() {
    let store = graph_store().fail_on("fetch_aggregated_values");
    let err = MacroResolver::new(&store)
        .resolve_graphs(
            GRAPH_NAME,
            vec![graph(1, "{HOST.HOST} {{HOST.HOST}:mysql.qps.avg(1h)}", &[31])],
        )
        .unwrap_err();
    assert!(matches!(err, ResolveError::Storage(_)));
}
