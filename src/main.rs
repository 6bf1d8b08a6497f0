//! CLI front door (§1.1 ambient stack, §6): parses process arguments for an
//! optional one-shot command, a config-file override, a ZK connect-string
//! override, and `--debug`; otherwise drives the interactive REPL (C9).
//! This is additive to, not a replacement for, the interactive shell.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;

use kshell::command::registry::Registry;
use kshell::commands::core::CoreModule;
use kshell::config::{self, Config};
use kshell::context::Context;
use kshell::kafka::types::Broker;
use kshell::repl;
use kshell::zk::ZkView;

/// Operator shell and query engine for Kafka clusters and their
/// coordinating ZooKeeper ensemble.
#[derive(Parser, Debug)]
#[command(name = "kshell", version, about)]
struct Cli {
    /// Run a single command line non-interactively and exit.
    #[arg(short = 'e', long = "execute", value_name = "COMMAND")]
    command: Option<String>,

    /// Override the default `$HOME/.trifecta/config.properties`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the ZooKeeper connect string from config.
    #[arg(long = "zk", value_name = "HOST:PORT,...")]
    zk_connect: Option<String>,

    /// Mirror the REPL's `debugOn` session variable: print full error
    /// detail alongside the classified message.
    #[arg(long)]
    debug: bool,
}

fn parse_broker(addr: &str) -> anyhow::Result<Broker> {
    let (host, port) = addr
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("malformed broker address (want host:port): {addr}"))?;
    let port: u16 = port.parse().with_context(|| format!("bad broker port in {addr}"))?;
    Ok(Broker::seed(host, port))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(config::expand_home(&path.to_string_lossy())),
        None => Config::load_default(),
    };
    let zk_connect = cli.zk_connect.clone().unwrap_or_else(|| config.zk_connect());
    let seed_brokers: Vec<Broker> =
        config.seed_brokers().iter().map(|addr| parse_broker(addr)).collect::<anyhow::Result<_>>()?;
    let session_timeout = Duration::from_millis(config.zk_session_timeout_ms());

    let zk = ZkView::connect(&zk_connect, session_timeout)
        .with_context(|| format!("failed to connect to zookeeper ensemble at {zk_connect}"))?;

    let ctx = Context::new(config, Arc::new(zk), seed_brokers);
    ctx.set_debug_on(cli.debug);

    let registry = Registry::build(vec![Arc::new(CoreModule)]).context("failed to build command registry")?;
    ctx.install_registry(registry);

    let exit_code = match cli.command {
        Some(line) => repl::run_one_shot(ctx, &line).await,
        None => repl::run_repl(ctx).await,
    };
    std::process::exit(exit_code);
}
