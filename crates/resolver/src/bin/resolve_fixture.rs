//! CLI tool to resolve texts against a JSON fixture store
//!
//! Usage: cargo run --bin resolve_fixture <fixture.json> <config_id> <host_id> <text>... [--settings <file>]
//!
//! The texts are resolved in the scope of one host with a text config such as
//! `scriptConfirmation` and printed as a JSON array. Set `RUST_LOG=debug` to
//! see batching decisions.

use hostmacro_resolver::{MacroResolver, MemoryStore, ResolverSettings};
use indexmap::IndexMap;
use std::env;
use std::fs;
use std::process;

fn read(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().collect();

    let mut settings = ResolverSettings::default();
    if let Some(pos) = args.iter().position(|a| a == "--settings") {
        let Some(path) = args.get(pos + 1).cloned() else {
            eprintln!("--settings needs a file");
            process::exit(1);
        };
        settings = match ResolverSettings::from_json(&read(&path)) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Error loading settings '{}': {}", path, e);
                process::exit(1);
            }
        };
        args.drain(pos..pos + 2);
    }

    if args.len() < 5 {
        eprintln!(
            "Usage: {} <fixture.json> <config_id> <host_id> <text>... [--settings <file>]",
            args[0]
        );
        eprintln!("  Resolves the texts for one host and outputs JSON to stdout");
        process::exit(1);
    }

    let store = match MemoryStore::from_json(&read(&args[1])) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error parsing fixture '{}': {}", args[1], e);
            process::exit(1);
        }
    };
    let host_id: u64 = match args[3].parse() {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Invalid host id '{}': {}", args[3], e);
            process::exit(1);
        }
    };

    let mut data = IndexMap::new();
    data.insert(host_id, args[4..].to_vec());

    let resolver = MacroResolver::with_settings(&store, settings);
    match resolver.resolve(&args[2], data) {
        Ok(resolved) => {
            let texts = resolved.get(&host_id).cloned().unwrap_or_default();
            match serde_json::to_string_pretty(&texts) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error serializing result to JSON: {}", e);
                    process::exit(1);
                }
            }
            eprintln!("{} storage round trips", store.round_trips());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
