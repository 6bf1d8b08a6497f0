//! The `core` module (§4.7, §6 CLI surface): ZK browsing/mutation
//! commands, `count`, the job manager commands, and registry housekeeping
//! (`use`, `help`, `syntax`). `select` is dispatched directly by the REPL
//! driver (§4.9), not routed through this registry.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::codec::{self, ValueType};
use crate::command::args::{ParamSchema, ParsedArgs};
use crate::command::registry::{CommandSpec, HandlerFuture, Module};
use crate::context::Context;
use crate::display::DisplayValue;
use crate::error::{Error, Result};
use crate::job::JobId;
use crate::query::{parser, planner};
use crate::scan::engine;
use crate::scan::new_cancel_flag;

pub struct CoreModule;

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
                name: "zcd",
                schema: ParamSchema { required_positional: vec!["key"], ..ParamSchema::none() },
                help: "zcd <key> — set the ZK working directory",
                prompt_aware: false,
                handler: zcd,
            },
            CommandSpec {
                name: "zls",
                schema: ParamSchema { optional_positional: vec!["path"], ..ParamSchema::none() },
                help: "zls [path] — list children of path or the cwd",
                prompt_aware: false,
                handler: zls,
            },
            CommandSpec {
                name: "zget",
                schema: ParamSchema {
                    required_positional: vec!["key"],
                    value_flags: &["t"],
                    ..ParamSchema::none()
                },
                help: "zget <key> [-t type] — read and decode a value",
                prompt_aware: false,
                handler: zget,
            },
            CommandSpec {
                name: "zput",
                schema: ParamSchema {
                    required_positional: vec!["key", "value"],
                    value_flags: &["t"],
                    ..ParamSchema::none()
                },
                help: "zput <key> <value> [-t type] — encode and write a value",
                prompt_aware: false,
                handler: zput,
            },
            CommandSpec {
                name: "zmk",
                schema: ParamSchema { required_positional: vec!["key"], ..ParamSchema::none() },
                help: "zmk <key> — create an empty node, with parents",
                prompt_aware: false,
                handler: zmk,
            },
            CommandSpec {
                name: "zrm",
                schema: ParamSchema {
                    required_positional: vec!["key"],
                    bare_flags: &["r"],
                    ..ParamSchema::none()
                },
                help: "zrm <key> [-r] — delete a node, recursively with -r",
                prompt_aware: false,
                handler: zrm,
            },
            CommandSpec {
                name: "zexists",
                schema: ParamSchema { required_positional: vec!["key"], ..ParamSchema::none() },
                help: "zexists <key> — report stat fields",
                prompt_aware: false,
                handler: zexists,
            },
            CommandSpec {
                name: "ztree",
                schema: ParamSchema { optional_positional: vec!["path"], ..ParamSchema::none() },
                help: "ztree [path] — pre-order dump of path and descendants",
                prompt_aware: false,
                handler: ztree,
            },
            CommandSpec {
                name: "zsess",
                schema: ParamSchema::none(),
                help: "zsess — print the current ZK session id",
                prompt_aware: false,
                handler: zsess,
            },
            CommandSpec {
                name: "zstat",
                schema: ParamSchema::none(),
                help: "zstat — the ZK 'stat' four-letter word",
                prompt_aware: false,
                handler: zstat,
            },
            CommandSpec {
                name: "zruok",
                schema: ParamSchema::none(),
                help: "zruok — the ZK 'ruok' four-letter word",
                prompt_aware: false,
                handler: zruok,
            },
            CommandSpec {
                name: "zreconnect",
                schema: ParamSchema::none(),
                help: "zreconnect — drop and re-establish the ZK session",
                prompt_aware: false,
                handler: zreconnect,
            },
            CommandSpec {
                name: "count",
                schema: ParamSchema {
                    required_positional: vec!["topic"],
                    allow_trailing_raw: true,
                    ..ParamSchema::none()
                },
                help: "count <topic> [where …] — scan-engine count, optionally filtered by a where-clause predicate",
                prompt_aware: false,
                handler: count,
            },
            CommandSpec {
                name: "jobs",
                schema: ParamSchema::none(),
                help: "jobs — list asynchronous jobs and their status",
                prompt_aware: false,
                handler: jobs,
            },
            CommandSpec {
                name: "kill",
                schema: ParamSchema { required_positional: vec!["id"], ..ParamSchema::none() },
                help: "kill <id> — request cooperative cancellation of a job",
                prompt_aware: false,
                handler: kill,
            },
            CommandSpec {
                name: "use",
                schema: ParamSchema { required_positional: vec!["module"], ..ParamSchema::none() },
                help: "use <module> — explicitly switch the active module",
                prompt_aware: false,
                handler: use_module,
            },
            CommandSpec {
                name: "help",
                schema: ParamSchema { optional_positional: vec!["cmd"], ..ParamSchema::none() },
                help: "help [cmd] — list commands, or show one command's usage",
                prompt_aware: false,
                handler: help,
            },
            CommandSpec {
                name: "syntax",
                schema: ParamSchema { required_positional: vec!["cmd"], ..ParamSchema::none() },
                help: "syntax <cmd> — show one command's usage",
                prompt_aware: false,
                handler: syntax,
            },
        ]
    }
}

fn zcd(ctx: Arc<Context>, args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        let key = args.positional(0).expect("required positional validated");
        let resolved = ctx.resolve_zk_key(key);
        if !ctx.zk()?.exists(&resolved)? {
            return Err(Error::ZkNotFound(resolved));
        }
        ctx.set_zk_cwd(resolved.clone());
        Ok(DisplayValue::Text(resolved))
    })
}

fn zls(ctx: Arc<Context>, args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        let path = match args.positional(0) {
            Some(p) => ctx.resolve_zk_key(p),
            None => ctx.zk_cwd(),
        };
        let mut children = ctx.zk()?.get_children(&path)?;
        children.sort();
        Ok(DisplayValue::Listing(children))
    })
}

fn zget(ctx: Arc<Context>, args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        let key = args.positional(0).expect("required positional validated");
        let resolved = ctx.resolve_zk_key(key);
        let ty = match args.flag("t") {
            Some(t) => ValueType::parse(t)?,
            None => ValueType::String,
        };
        let bytes = ctx.zk()?.read(&resolved)?;
        Ok(DisplayValue::Text(codec::decode(&bytes, ty)?))
    })
}

fn zput(ctx: Arc<Context>, args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        let key = args.positional(0).expect("required positional validated");
        let value = args.positional(1).expect("required positional validated");
        let resolved = ctx.resolve_zk_key(key);
        let ty = match args.flag("t") {
            Some(t) => ValueType::parse(t)?,
            None => codec::guess_type(value),
        };
        let bytes = codec::encode(value, ty)?;
        let zk = ctx.zk()?;
        if zk.exists(&resolved)? {
            zk.delete(&resolved)?;
        }
        zk.ensure_parents(&resolved)?;
        zk.create(&resolved, bytes)?;
        Ok(DisplayValue::Text(format!("wrote {resolved} as {}", ty.name())))
    })
}

fn zmk(ctx: Arc<Context>, args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        let key = args.positional(0).expect("required positional validated");
        let resolved = ctx.resolve_zk_key(key);
        ctx.zk()?.ensure_path(&resolved)?;
        Ok(DisplayValue::Text(resolved))
    })
}

fn zrm(ctx: Arc<Context>, args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        let key = args.positional(0).expect("required positional validated");
        let resolved = ctx.resolve_zk_key(key);
        let zk = ctx.zk()?;
        if args.has_bare("r") {
            zk.delete_recursively(&resolved)?;
        } else {
            zk.delete(&resolved)?;
        }
        Ok(DisplayValue::Text(resolved))
    })
}

fn zexists(ctx: Arc<Context>, args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        let key = args.positional(0).expect("required positional validated");
        let resolved = ctx.resolve_zk_key(key);
        Ok(DisplayValue::Stat(ctx.zk()?.stat(&resolved)?))
    })
}

fn ztree(ctx: Arc<Context>, args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        let path = match args.positional(0) {
            Some(p) => ctx.resolve_zk_key(p),
            None => ctx.zk_cwd(),
        };
        Ok(DisplayValue::Listing(ctx.zk()?.tree(&path)?))
    })
}

fn zsess(ctx: Arc<Context>, _args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move { Ok(DisplayValue::Text(ctx.zk()?.session_id().to_string())) })
}

fn zstat(ctx: Arc<Context>, _args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move { Ok(DisplayValue::Text(four_letter_word(&ctx.config.zk_connect(), "stat")?)) })
}

fn zruok(ctx: Arc<Context>, _args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move { Ok(DisplayValue::Text(four_letter_word(&ctx.config.zk_connect(), "ruok")?)) })
}

fn zreconnect(ctx: Arc<Context>, _args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        ctx.zk()?.reconnect()?;
        Ok(DisplayValue::Text("reconnected".to_string()))
    })
}

fn count(ctx: Arc<Context>, args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        let topic = args.positional(0).expect("required positional validated").to_string();
        let clauses = parser::parse_where_clauses("count", &args.raw_tail)?;
        let predicates = Arc::new(planner::compile_where(&clauses, None)?);
        let n = engine::count(ctx.zk()?, &topic, ctx.seed_brokers.clone(), predicates, new_cancel_flag()).await?;
        Ok(DisplayValue::Count(n))
    })
}

fn jobs(ctx: Arc<Context>, _args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        let lines = ctx
            .jobs
            .list()
            .iter()
            .map(|j| format!("{} {} {:?} {}ms", j.id, j.label, j.status(), j.started.elapsed().as_millis()))
            .collect();
        Ok(DisplayValue::Listing(lines))
    })
}

fn kill(ctx: Arc<Context>, args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        let id_str = args.positional(0).expect("required positional validated");
        let id: JobId = id_str
            .parse()
            .map_err(|_| Error::InvalidArgs("kill".to_string(), format!("bad job id: {id_str}")))?;
        ctx.jobs.cancel(id)?;
        Ok(DisplayValue::Text(format!("cancelled job {id}")))
    })
}

fn use_module(ctx: Arc<Context>, args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        let name = args.positional(0).expect("required positional validated");
        ctx.registry().set_active_module_by_name(name)?;
        Ok(DisplayValue::Text(format!("switched to module {name}")))
    })
}

fn help(ctx: Arc<Context>, args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        match args.positional(0) {
            Some(cmd) => Ok(DisplayValue::Text(ctx.registry().help(cmd)?.to_string())),
            None => Ok(DisplayValue::Listing(
                ctx.registry().command_names().into_iter().map(|s| s.to_string()).collect(),
            )),
        }
    })
}

fn syntax(ctx: Arc<Context>, args: ParsedArgs) -> HandlerFuture {
    Box::pin(async move {
        let cmd = args.positional(0).expect("required positional validated");
        Ok(DisplayValue::Text(ctx.registry().help(cmd)?.to_string()))
    })
}

/// A ZK four-letter word (`stat`, `ruok`) sent over raw TCP to the first
/// host in the connect string. These predate the session protocol and
/// bypass it entirely.
fn four_letter_word(connect_string: &str, word: &str) -> Result<String> {
    let addr = connect_string.split(',').next().unwrap_or(connect_string).trim();
    let mut stream = TcpStream::connect(addr).map_err(|e| Error::Transport(e.to_string()))?;
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();
    stream.write_all(word.as_bytes()).map_err(|e| Error::Transport(e.to_string()))?;
    let mut buf = String::new();
    stream.read_to_string(&mut buf).map_err(|e| Error::Transport(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_cli_surface_command_once() {
        let names: Vec<&str> = CoreModule.commands().iter().map(|c| c.name).collect();
        let expected = [
            "zcd", "zls", "zget", "zput", "zmk", "zrm", "zexists", "ztree", "zsess", "zstat", "zruok",
            "zreconnect", "count", "jobs", "kill", "use", "help", "syntax",
        ];
        for name in expected {
            assert!(names.contains(&name), "missing command {name}");
        }
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len(), "duplicate command registered");
    }

    #[test]
    fn count_schema_keeps_where_clause_as_raw_tail() {
        let spec = CoreModule.commands().into_iter().find(|c| c.name == "count").unwrap();
        let tokens = crate::command::tokenizer::tokenize("count orders where value = 'b'").unwrap();
        let args = crate::command::args::assemble("count", &tokens[1..], &spec.schema).unwrap();
        assert_eq!(args.positional, vec!["orders".to_string()]);
        let clauses = parser::parse_where_clauses("count", &args.raw_tail).unwrap();
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].field, "value");
        assert_eq!(clauses[0].literal, "b");
    }

    #[test]
    fn count_without_where_clause_matches_everything() {
        let spec = CoreModule.commands().into_iter().find(|c| c.name == "count").unwrap();
        let tokens = crate::command::tokenizer::tokenize("count orders").unwrap();
        let args = crate::command::args::assemble("count", &tokens[1..], &spec.schema).unwrap();
        let clauses = parser::parse_where_clauses("count", &args.raw_tail).unwrap();
        assert!(clauses.is_empty());
        let predicates = planner::compile_where(&clauses, None).unwrap();
        assert!(predicates.matches(b"anything", b"anykey"));
    }
}
