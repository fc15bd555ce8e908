//! # hostmacro-parser
//!
//! Scanners for the macro micro-grammars found in monitoring configuration
//! text: trigger names and expressions, item keys, notification text and
//! graph titles.
//!
//! This crate provides:
//!
//! - **Pure scanners**, one per grammar, each answering "does a match start at
//!   this byte offset, and how long is it?"
//! - **A locator** that runs the enabled scanners over a string in one
//!   left-to-right pass and returns typed [`MacroToken`]s
//! - **Item key and function call parsers** with span-preserving rewriting and
//!   quoting rules
//! - **Right-to-left substitution** of located tokens
//!
//! Nothing here touches storage; value lookup lives in `hostmacro-resolver`.
//!
//! ## Quick Start
//!
//! ```rust
//! use hostmacro_parser::{find_all, splice_tokens, Captures, MacroKind, ScanSet};
//!
//! let text = "{HOST.NAME} ping {$TIMEOUT}";
//! let set = ScanSet::new()
//!     .with(MacroKind::UserMacro)
//!     .with(MacroKind::PlainMacro)
//!     .with_names(["HOST.NAME"]);
//!
//! let tokens = find_all(text, &set);
//! let resolved = splice_tokens(text, &tokens, |token| match &token.captures {
//!     Captures::Macro { name, .. } if name == "HOST.NAME" => Some("Server A".to_string()),
//!     Captures::UserMacro { name, .. } if name == "TIMEOUT" => Some("30".to_string()),
//!     _ => None,
//! });
//! assert_eq!(resolved, "Server A ping 30");
//! ```
//!
//! ## Grammars
//!
//! | Kind | Example |
//! |------|---------|
//! | User macro | `{$TIMEOUT}`, `{$TIMEOUT:"db"}` |
//! | Plain macro | `{HOST.HOST}` |
//! | Positional macro | `{HOST.HOST2}` |
//! | Replacement | `{{ITEM.VALUE}.regsub("(\d+)","\1")}` |
//! | Macro function | `{{HOST.HOST}:system.cpu.load.avg(1h)}` |
//! | Reference | `$1` |
//! | LLD macro | `{#IFNAME}` |
//! | Function id | `{12345}` |
//!
//! ## Module Overview
//!
//! - [`scan`] - One pure scanner per grammar, sharing chumsky grammars for
//!   quoted strings and parameter lists
//! - [`locator`] - Scanner priority and the single scanning cursor
//! - [`item_key`] - Item key parameter trees and re-quoting
//! - [`function_call`] - Trigger function parameter lists
//! - [`expression`] - Function ids and reference constants of trigger expressions
//! - [`substitute`] - Right-to-left token replacement
//! - [`error`] - Parse failures with pretty printing via ariadne

pub mod error;
pub mod expression;
pub mod function_call;
mod grammar;
pub mod item_key;
pub mod locator;
pub mod scan;
pub mod substitute;
pub mod token;

// Re-export commonly used types
pub use error::{ErrorReporter, ParseFailure};
pub use function_call::FunctionCall;
pub use item_key::{ItemKey, KeyParam};
pub use locator::{find_all, has_macros, ScanSet};
pub use scan::user_macro::{Context, MacroDefinition};
pub use substitute::splice_tokens;
pub use token::{Captures, HostRef, MacroKind, MacroToken, UserMacroSpec};
