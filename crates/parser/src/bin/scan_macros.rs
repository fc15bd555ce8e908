//! CLI tool to scan a file for macros and output the tokens as JSON
//!
//! Usage: cargo run --bin scan_macros <file> [--keys]
//!
//! Every line is scanned with all grammars enabled. With `--keys`, every line
//! is parsed as an item key instead and parse failures are reported.

use hostmacro_parser::{find_all, ErrorReporter, ItemKey, MacroKind, ScanSet};
use std::env;
use std::fs;
use std::process;

const BUILTIN_NAMES: &[&str] = &[
    "HOSTNAME",
    "HOST.HOST",
    "HOST.NAME",
    "HOST.ID",
    "IPADDRESS",
    "HOST.IP",
    "HOST.DNS",
    "HOST.CONN",
    "HOST.PORT",
    "ITEM.VALUE",
    "ITEM.LASTVALUE",
    "TRIGGER.ID",
];

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <file> [--keys]", args[0]);
        eprintln!("  Scans every line for macros and outputs JSON to stdout");
        process::exit(1);
    }

    let filename = &args[1];
    let keys = args.iter().skip(2).any(|a| a == "--keys");

    let source = match fs::read_to_string(filename) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", filename, e);
            process::exit(1);
        }
    };

    if keys {
        let mut failed = false;
        for (n, line) in source.lines().enumerate() {
            match ItemKey::parse(line) {
                Ok(key) => match serde_json::to_string(&key) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("Error serializing key to JSON: {}", e),
                },
                Err(failure) => {
                    failed = true;
                    let reporter = ErrorReporter::new(format!("{}:{}", filename, n + 1), line);
                    if let Err(e) = reporter.report_parse_failure(&failure) {
                        eprintln!("{}: {}", failure, e);
                    }
                }
            }
        }
        if failed {
            process::exit(1);
        }
        return;
    }

    let set = ScanSet::new()
        .with_kinds(&[
            MacroKind::UserMacro,
            MacroKind::PositionalMacro,
            MacroKind::Replacement,
            MacroKind::MacroFunction,
            MacroKind::Reference,
            MacroKind::LldMacro,
            MacroKind::FunctionId,
        ])
        .with_names(BUILTIN_NAMES.iter().copied());

    for line in source.lines() {
        let tokens = find_all(line, &set);
        match serde_json::to_string(&tokens) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing tokens to JSON: {}", e);
                process::exit(1);
            }
        }
    }
}
