//! Module/Command registry (C7, §4.7): collects commands from pluggable
//! modules, validates arguments, resolves the active module, and supports
//! prompt-aware auto-switching.
//!
//! Handlers are plain function pointers returning a boxed future rather
//! than closures capturing the runtime context. This sidesteps a
//! context/registry/module reference cycle: since no `Module` holds a
//! `Context`, there is nothing to break with a two-phase init. The context
//! is threaded through as an explicit, reference-counted argument at call
//! time instead.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::context::Context;
use crate::display::DisplayValue;
use crate::error::{Error, Result};

use super::args::{assemble, ParamSchema, ParsedArgs};
use super::tokenizer::Token;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<DisplayValue>> + Send>>;
pub type Handler = fn(Arc<Context>, ParsedArgs) -> HandlerFuture;

#[derive(Clone)]
pub struct CommandSpec {
    pub name: &'static str,
    pub schema: ParamSchema,
    pub help: &'static str,
    /// Whether successful execution should switch the active module to
    /// this command's owner, even if the owner is `core` (§4.7).
    pub prompt_aware: bool,
    pub handler: Handler,
}

/// A pluggable module contributing commands, a prompt, and session
/// variables (§4.7). Exactly one module is installed here (`core`).
pub trait Module: Send + Sync {
    fn name(&self) -> &'static str;
    fn label(&self) -> &'static str;
    fn prompt(&self) -> &'static str;
    fn commands(&self) -> Vec<CommandSpec>;
    fn shutdown(&self) {}
}

struct Entry {
    module_idx: usize,
    spec: CommandSpec,
}

pub struct Registry {
    modules: Vec<Arc<dyn Module>>,
    commands: HashMap<&'static str, Entry>,
    active_module: Mutex<usize>,
}

impl Registry {
    /// Merge commands across `modules`. Duplicate command names across
    /// modules are a configuration error at boot.
    pub fn build(modules: Vec<Arc<dyn Module>>) -> Result<Registry> {
        let mut commands = HashMap::new();
        for (idx, module) in modules.iter().enumerate() {
            for spec in module.commands() {
                if commands.contains_key(spec.name) {
                    return Err(Error::Internal(format!(
                        "duplicate command '{}' registered by module '{}'",
                        spec.name,
                        module.name()
                    )));
                }
                commands.insert(spec.name, Entry { module_idx: idx, spec });
            }
        }
        Ok(Registry { modules, commands, active_module: Mutex::new(0) })
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name).map(|e| &e.spec)
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn help(&self, name: &str) -> Result<&'static str> {
        self.lookup(name)
            .map(|spec| spec.help)
            .ok_or_else(|| Error::Internal(format!("no such command: {name}")))
    }

    pub fn active_module(&self) -> Arc<dyn Module> {
        let idx = *self.active_module.lock().expect("active module lock poisoned");
        Arc::clone(&self.modules[idx])
    }

    pub fn set_active_module_by_name(&self, name: &str) -> Result<()> {
        let idx = self
            .modules
            .iter()
            .position(|m| m.name() == name)
            .ok_or_else(|| Error::Internal(format!("no such module: {name}")))?;
        *self.active_module.lock().expect("active module lock poisoned") = idx;
        Ok(())
    }

    fn set_active_module_idx(&self, idx: usize) {
        *self.active_module.lock().expect("active module lock poisoned") = idx;
    }

    pub fn shutdown(&self) {
        for module in &self.modules {
            module.shutdown();
        }
    }

    /// Tokenize-and-assemble `tokens[1..]` against the command named by
    /// `tokens[0]`, returning the resolved spec and parsed arguments.
    pub fn resolve(&self, tokens: &[Token]) -> Result<(CommandSpec, ParsedArgs)> {
        let Some(first) = tokens.first() else {
            return Err(Error::InvalidArgs(String::new(), "empty command line".to_string()));
        };
        let name = first.text().to_string();
        let spec = self
            .lookup(&name)
            .cloned()
            .ok_or_else(|| Error::InvalidArgs(name.clone(), "unknown command".to_string()))?;
        let args = assemble(&name, &tokens[1..], &spec.schema)?;
        Ok((spec, args))
    }

    /// Run `spec` with `args`, then apply the auto-switch rule: a
    /// `promptAware` command, or any command not owned by `core`, switches
    /// the active module to its owner on success (§4.7).
    pub async fn run(&self, context: Arc<Context>, spec: &CommandSpec, args: ParsedArgs) -> Result<DisplayValue> {
        let entry = self.commands.get(spec.name).expect("resolved spec must be registered");
        let owner_idx = entry.module_idx;
        let owner = &self.modules[owner_idx];
        let result = (spec.handler)(context, args).await;
        if result.is_ok() && (spec.prompt_aware || owner.name() != "core") {
            self.set_active_module_idx(owner_idx);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tokenizer::tokenize;

    fn noop_handler(_ctx: Arc<Context>, _args: ParsedArgs) -> HandlerFuture {
        Box::pin(async { Ok(DisplayValue::Unit) })
    }

    struct CoreModule;
    impl Module for CoreModule {
        fn name(&self) -> &'static str {
            "core"
        }
        fn label(&self) -> &'static str {
            "Core"
        }
        fn prompt(&self) -> &'static str {
            "kshell"
        }
        fn commands(&self) -> Vec<CommandSpec> {
            vec![
                CommandSpec {
                    name: "zsess",
                    schema: ParamSchema::none(),
                    help: "zsess",
                    prompt_aware: false,
                    handler: noop_handler,
                },
                CommandSpec {
                    name: "promptcmd",
                    schema: ParamSchema::none(),
                    help: "promptcmd",
                    prompt_aware: true,
                    handler: noop_handler,
                },
            ]
        }
    }

    struct OtherModule;
    impl Module for OtherModule {
        fn name(&self) -> &'static str {
            "other"
        }
        fn label(&self) -> &'static str {
            "Other"
        }
        fn prompt(&self) -> &'static str {
            "other"
        }
        fn commands(&self) -> Vec<CommandSpec> {
            vec![CommandSpec {
                name: "othercmd",
                schema: ParamSchema::none(),
                help: "othercmd",
                prompt_aware: false,
                handler: noop_handler,
            }]
        }
    }

    fn build() -> Registry {
        Registry::build(vec![Arc::new(CoreModule), Arc::new(OtherModule)]).unwrap()
    }

    #[test]
    fn duplicate_command_name_is_configuration_error() {
        struct Dup;
        impl Module for Dup {
            fn name(&self) -> &'static str {
                "dup"
            }
            fn label(&self) -> &'static str {
                "Dup"
            }
            fn prompt(&self) -> &'static str {
                "dup"
            }
            fn commands(&self) -> Vec<CommandSpec> {
                vec![CommandSpec {
                    name: "zsess",
                    schema: ParamSchema::none(),
                    help: "",
                    prompt_aware: false,
                    handler: noop_handler,
                }]
            }
        }
        let err = Registry::build(vec![Arc::new(CoreModule), Arc::new(Dup)]);
        assert!(matches!(err, Err(Error::Internal(_))));
    }

    #[test]
    fn resolve_unknown_command_is_invalid_args() {
        let registry = build();
        let tokens = tokenize("bogus").unwrap();
        assert!(matches!(registry.resolve(&tokens), Err(Error::InvalidArgs(_, _))));
    }

    #[tokio::test]
    async fn non_prompt_aware_core_command_leaves_module_unchanged() {
        let registry = build();
        assert_eq!(registry.active_module().name(), "core");
        let ctx = crate::context::test_support::fresh_context();
        let (spec, args) = registry.resolve(&tokenize("zsess").unwrap()).unwrap();
        registry.run(ctx, &spec, args).await.unwrap();
        assert_eq!(registry.active_module().name(), "core");
    }

    #[tokio::test]
    async fn prompt_aware_core_command_switches_module_to_itself() {
        let registry = build();
        let ctx = crate::context::test_support::fresh_context();
        let (spec, args) = registry.resolve(&tokenize("promptcmd").unwrap()).unwrap();
        registry.run(ctx, &spec, args).await.unwrap();
        assert_eq!(registry.active_module().name(), "core");
    }

    #[tokio::test]
    async fn non_core_command_switches_active_module() {
        let registry = build();
        let ctx = crate::context::test_support::fresh_context();
        let (spec, args) = registry.resolve(&tokenize("othercmd").unwrap()).unwrap();
        registry.run(ctx, &spec, args).await.unwrap();
        assert_eq!(registry.active_module().name(), "other");
    }
}
