//! # hostmacro
//!
//! Macro scanning and batched macro resolution for monitoring configuration
//! text.
//!
//! ## Features
//!
//! | Feature | Crate | Description |
//! |---------|-------|-------------|
//! | `parser`   | [`hostmacro-parser`]   | Scanners, locator, item keys, substitution |
//! | `resolver` | [`hostmacro-resolver`] | User macro inheritance, providers, resolver facade |
//!
//! `default = ["full"]` enables all of the above.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! hostmacro = "0.0.1-beta.3"
//! ```
//!
//! ```rust
//! # #[cfg(feature = "resolver")]
//! # {
//! use hostmacro::{MacroResolver, MemoryStore};
//! use indexmap::IndexMap;
//!
//! let store = MemoryStore::from_json(r#"{
//!     "hosts": [{"host_id": 1, "host": "srv-a", "name": "Server A"}],
//!     "global_macros": [{"macro": "{$TIMEOUT}", "value": "30"}]
//! }"#).unwrap();
//!
//! let mut data = IndexMap::new();
//! data.insert(1, vec!["{HOST.NAME} ping {$TIMEOUT}".to_string()]);
//! let resolved = MacroResolver::new(&store).resolve("scriptConfirmation", data).unwrap();
//! assert_eq!(resolved[&1], vec!["Server A ping 30"]);
//! # }
//! ```

#[cfg(feature = "parser")]
pub use hostmacro_parser as parser;

#[cfg(feature = "parser")]
pub use hostmacro_parser::{find_all, splice_tokens, ItemKey, MacroKind, MacroToken, ScanSet};

#[cfg(feature = "resolver")]
pub use hostmacro_resolver as resolver;

#[cfg(feature = "resolver")]
pub use hostmacro_resolver::{MacroResolver, MacroStore, MemoryStore, ResolveError};
