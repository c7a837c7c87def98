// Author: Lukas Bower

//! Template grammar properties: round-trip rendering and placeholder
//! substitution matching.

use std::sync::Arc;

use telsh::grammar::{parse_template, NodeKind, TokenSpec};
use telsh::tree::CommandTree;
use telsh::{CommandHandler, CommandStatus};

fn noop() -> CommandHandler {
    Arc::new(|_args, _out| Ok(CommandStatus::Continue))
}

const TEMPLATES: &[&str] = &[
    "show running-config",
    "show config",
    "ping IP",
    "set debug <1-10>",
    "set debug2 <1-10> (on|off)",
    "set debug info STRING",
    "set filter-switch (on|off)",
    "set test [STRING]",
    "clear [<1-5>]",
];

#[test]
fn every_template_round_trips_through_display_keys() {
    for template in TEMPLATES {
        let specs = parse_template(template).expect("template parses");
        let rendered: Vec<String> = specs.iter().map(TokenSpec::display).collect();
        assert_eq!(&rendered.join(" "), template, "template {template}");
    }
}

/// Enumerate one valid substitution per parameter placeholder, first without
/// any optional tokens, then including them.
fn substitutions(specs: &[TokenSpec]) -> Vec<Vec<String>> {
    let fill = |spec: &TokenSpec| -> String {
        match &spec.kind {
            NodeKind::Literal | NodeKind::ModeSwitch => spec.text.clone(),
            NodeKind::String => "sample".to_owned(),
            NodeKind::Range { min, .. } => min.to_string(),
            NodeKind::Enum { values } => values[0].clone(),
        }
    };
    let without: Vec<String> = specs
        .iter()
        .filter(|spec| !spec.optional)
        .map(fill)
        .collect();
    let with: Vec<String> = specs.iter().map(fill).collect();
    if with == without {
        vec![without]
    } else {
        vec![without, with]
    }
}

#[test]
fn enumerated_substitutions_match_their_own_template() {
    for template in TEMPLATES {
        let specs = parse_template(template).expect("template parses");
        let mut tree = CommandTree::new();
        tree.register(template, "test", noop(), None).expect("register");

        for tokens in substitutions(&specs) {
            let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
            let matched = tree
                .match_tokens(&refs)
                .unwrap_or_else(|err| panic!("{template}: {refs:?} failed: {err}"));
            assert!(
                tree.node(matched.terminal).is_terminal(),
                "{template}: {refs:?} did not reach the terminal"
            );
            tree.validate(&matched)
                .unwrap_or_else(|err| panic!("{template}: {refs:?} invalid: {err}"));

            // Captured arguments are the parameter substitutions, in order.
            let expected: Vec<&String> = tokens
                .iter()
                .zip(specs.iter().filter(|s| {
                    tokens.len() == specs.len() || !s.optional
                }))
                .filter(|(_, spec)| spec.kind.is_parameter())
                .map(|(token, _)| token)
                .collect();
            let got: Vec<&String> = matched.captured.iter().collect();
            assert_eq!(got, expected, "{template}: {refs:?}");
        }
    }
}

#[test]
fn whitespace_normalisation_does_not_change_the_parse() {
    let compact = parse_template("set debug2 <1-10> (on|off)").expect("compact");
    let spaced = parse_template("  set   debug2  <1-10>   (on|off) ").expect("spaced");
    assert_eq!(compact, spaced);
}
