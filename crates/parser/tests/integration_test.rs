//! Integration tests over the scanning corpus in `benches/corpus`.
//!
//! Each corpus file has its own test. Substituting every token with its own
//! raw text must reproduce the input, and every corpus item key must parse
//! and round-trip byte-for-byte.

use hostmacro_parser::{
    find_all, splice_tokens, Captures, ItemKey, MacroKind, ScanSet, UserMacroSpec,
};
use pretty_assertions::assert_eq;

fn all_kinds() -> ScanSet<'static> {
    ScanSet::new()
        .with_kinds(&[
            MacroKind::UserMacro,
            MacroKind::PositionalMacro,
            MacroKind::Replacement,
            MacroKind::MacroFunction,
            MacroKind::Reference,
            MacroKind::LldMacro,
            MacroKind::FunctionId,
        ])
        .with_names([
            "HOSTNAME",
            "HOST.HOST",
            "HOST.NAME",
            "HOST.CONN",
            "HOST.PORT",
            "ITEM.VALUE",
            "ITEM.LASTVALUE",
        ])
}

/// Generate an identity-substitution test for a corpus file.
macro_rules! corpus_test {
    ($test_name:ident, $path:expr) => {
        #[test]
        fn $test_name() {
            let set = all_kinds();
            let source = include_str!($path);
            let mut found = 0;
            for line in source.lines() {
                let tokens = find_all(line, &set);
                found += tokens.len();
                let same = splice_tokens(line, &tokens, |t| Some(t.raw.clone()));
                assert_eq!(same, line);
            }
            assert!(found > 0, "no macros found in {}", $path);
        }
    };
}

corpus_test!(corpus_trigger_names, "../benches/corpus/trigger_names.txt");
corpus_test!(corpus_graph_names, "../benches/corpus/graph_names.txt");
corpus_test!(corpus_item_keys, "../benches/corpus/item_keys.txt");

#[test]
fn item_key_corpus_round_trips() {
    for line in include_str!("../benches/corpus/item_keys.txt").lines() {
        let key = ItemKey::parse(line).unwrap_or_else(|e| panic!("{line}: {e}"));
        assert_eq!(key.substitute(|_| None), line);
    }
}

#[test]
fn user_macro_scan_round_trip() {
    let set = ScanSet::new().with(MacroKind::UserMacro);
    let specs = [
        UserMacroSpec::new("A", None),
        UserMacroSpec::new("A", Some("")),
        UserMacroSpec::new("NET.IF", Some("eth0")),
        UserMacroSpec::new("PATH", Some(r#"C:\ "quoted" }"#)),
    ];
    for spec in specs {
        let text = format!("before {} after", spec);
        let tokens = find_all(&text, &set);
        assert_eq!(tokens.len(), 1, "{text}");
        assert_eq!(tokens[0].captures.user_macro(), Some(spec));
    }
}

#[test]
fn scanning_is_idempotent_without_values() {
    let set = all_kinds();
    let text = "{HOST.NAME} {$A:\"x\"} $1 {#LLD} {12} {unknown} {$";
    let tokens = find_all(text, &set);
    let once = splice_tokens(text, &tokens, |_| None);
    let twice = splice_tokens(&once, &find_all(&once, &set), |_| None);
    assert_eq!(once, text);
    assert_eq!(twice, text);
}

#[test]
fn forced_quoting_item_key_and_function_params() {
    use hostmacro_parser::FunctionCall;

    // Quoted parameters stay quoted when emptied, in both grammars.
    let key = ItemKey::parse(r#"k["{$E}",{$E}]"#).unwrap();
    assert_eq!(key.substitute(|_| Some(String::new())), r#"k["",]"#);
    let call = FunctionCall::parse(r#"f("{$E}",{$E})"#).unwrap();
    assert_eq!(call.substitute(|_| Some(String::new())), r#"f("",)"#);

    // A comma forces quoting of an unquoted parameter.
    let key = ItemKey::parse("k[{$E}]").unwrap();
    assert_eq!(key.substitute(|_| Some("a,b".into())), r#"k["a,b"]"#);
}

#[test]
fn replacement_captures_inner_macro() {
    let set = all_kinds();
    let tokens = find_all(r#"{{ITEM.VALUE1}.regsub("^(\w+)", "\1")}"#, &set);
    assert_eq!(tokens.len(), 1);
    match &tokens[0].captures {
        Captures::Replacement { inner_raw, function, params, .. } => {
            assert_eq!(inner_raw, "{ITEM.VALUE1}");
            assert_eq!(function, "regsub");
            assert_eq!(params, &vec![r"^(\w+)".to_string(), r"\1".to_string()]);
        }
        other => panic!("unexpected captures {other:?}"),
    }
}
