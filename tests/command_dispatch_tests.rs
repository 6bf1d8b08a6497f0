use std::sync::Arc;

use kshell::command::registry::Registry;
use kshell::command::tokenizer::tokenize;
use kshell::commands::core::CoreModule;
use kshell::error::Error;

fn registry() -> Registry {
    Registry::build(vec![Arc::new(CoreModule)]).unwrap()
}

#[test]
fn every_cli_surface_command_resolves_with_its_declared_schema() {
    let registry = registry();

    let (spec, args) = registry.resolve(&tokenize("zget /a/b -t json").unwrap()).unwrap();
    assert_eq!(spec.name, "zget");
    assert_eq!(args.positional, vec!["/a/b".to_string()]);
    assert_eq!(args.flag("t"), Some("json"));

    let (spec, args) = registry.resolve(&tokenize("zrm /a/b -r").unwrap()).unwrap();
    assert_eq!(spec.name, "zrm");
    assert!(args.has_bare("r"));
}

#[test]
fn missing_required_positional_surfaces_command_name_for_syntax_suggestion() {
    let registry = registry();
    let err = registry.resolve(&tokenize("zcd").unwrap()).unwrap_err();
    assert_eq!(err.offending_command(), Some("zcd"));
    assert!(matches!(err, Error::InvalidArgs(_, _)));
}

#[test]
fn unknown_command_is_invalid_args() {
    let registry = registry();
    assert!(matches!(registry.resolve(&tokenize("bogus").unwrap()), Err(Error::InvalidArgs(_, _))));
}

#[test]
fn help_and_syntax_are_registered_for_every_command() {
    let registry = registry();
    for name in registry.command_names() {
        assert!(registry.help(name).is_ok(), "missing help text for {name}");
    }
}
