// Author: Lukas Bower

//! Tree matching and validation behaviour across a realistic registration
//! set: literal precedence, range boundaries, enum case rules, optionals.

use std::sync::Arc;

use telsh::tree::{CommandTree, MatchError, ValidationError};
use telsh::{CommandHandler, CommandStatus};

fn noop() -> CommandHandler {
    Arc::new(|_args, _out| Ok(CommandStatus::Continue))
}

fn zebra_tree() -> CommandTree {
    let mut tree = CommandTree::new();
    for template in [
        "show running-config",
        "show config",
        "ping IP",
        "clear test1",
        "clear test2",
        "debug",
        "set debug <1-10>",
        "set debug2 <1-10> (on|off)",
        "set debug info STRING",
        "set name STRING",
        "set filter-switch (on|off)",
        "set test [STRING]",
    ] {
        tree.register(template, "test command", noop(), None)
            .expect("register");
    }
    tree
}

#[test]
fn shared_literal_prefixes_stay_disambiguated() {
    let tree = zebra_tree();
    let m = tree.match_tokens(&["show", "config"]).expect("show config");
    assert!(m.captured.is_empty());
    let m = tree
        .match_tokens(&["set", "debug", "info", "verbose"])
        .expect("set debug info");
    assert_eq!(m.captured, vec!["verbose"]);
    let m = tree.match_tokens(&["set", "debug", "7"]).expect("set debug N");
    assert_eq!(m.captured, vec!["7"]);
}

#[test]
fn range_accepts_exact_bounds_and_rejects_neighbours() {
    let tree = zebra_tree();
    for (value, ok) in [("1", true), ("10", true), ("0", false), ("11", false)] {
        let m = tree.match_tokens(&["set", "debug", value]).expect("match");
        assert_eq!(tree.validate(&m).is_ok(), ok, "value {value}");
    }
}

#[test]
fn enum_execution_is_case_insensitive_but_exact() {
    let tree = zebra_tree();
    for value in ["on", "ON", "On", "off", "OFF"] {
        let m = tree
            .match_tokens(&["set", "filter-switch", value])
            .expect("match");
        tree.validate(&m).unwrap_or_else(|err| panic!("{value}: {err}"));
    }
    let m = tree.match_tokens(&["set", "filter-switch", "o"]).expect("match");
    assert!(matches!(
        tree.validate(&m).unwrap_err(),
        ValidationError::InvalidEnum { .. }
    ));
}

#[test]
fn optional_string_may_be_present_or_absent() {
    let tree = zebra_tree();
    let with = tree.match_tokens(&["set", "test", "payload"]).expect("with");
    assert_eq!(with.captured, vec!["payload"]);
    tree.validate(&with).expect("with validates");

    let without = tree.match_tokens(&["set", "test"]).expect("without");
    assert!(without.captured.is_empty());
    tree.validate(&without).expect("without validates");
}

#[test]
fn missing_required_parameter_is_incomplete() {
    let tree = zebra_tree();
    assert_eq!(
        tree.match_tokens(&["ping"]).unwrap_err(),
        MatchError::Incomplete
    );
    assert_eq!(
        tree.match_tokens(&["set", "debug2", "5"]).unwrap_err(),
        MatchError::Incomplete
    );
}

#[test]
fn unknown_subcommand_names_the_offending_token() {
    let tree = zebra_tree();
    assert_eq!(
        tree.match_tokens(&["show", "version"]).unwrap_err(),
        MatchError::Unknown("version".to_owned())
    );
    assert_eq!(
        tree.match_tokens(&["reload"]).unwrap_err(),
        MatchError::Unknown("reload".to_owned())
    );
}

#[test]
fn surplus_arguments_are_rejected_by_arity() {
    let tree = zebra_tree();
    let m = tree
        .match_tokens(&["debug", "everything", "now"])
        .expect("fallback to terminal");
    assert!(matches!(
        tree.validate(&m).unwrap_err(),
        ValidationError::TooMany { .. }
    ));
}

#[test]
fn string_parameter_accepts_arbitrary_tokens() {
    let tree = zebra_tree();
    for value in ["eth0", "192.168.1.1", "UPPER", "x"] {
        let m = tree.match_tokens(&["set", "name", value]).expect("match");
        tree.validate(&m).expect("any non-empty token");
        assert_eq!(m.captured, vec![value]);
    }
}
