//! REPL driver (C9, §4.9). The terminal line editor, history file, and
//! ANSI/tabular rendering are out-of-scope external collaborators (§1);
//! this driver reads a line, dispatches it, and prints a `DisplayValue`
//! rendered through the minimal fallback in `display::render`.

use std::io::Write;
use std::process::Command;
use std::sync::Arc;

use log::error;

use crate::command::tokenizer::{is_whole_line_shell, tokenize};
use crate::context::Context;
use crate::display::DisplayValue;
use crate::error::{Error, Result};
use crate::query;
use crate::scan::new_cancel_flag;

/// Read one line from stdin off the blocking thread pool, so the async
/// runtime's worker threads stay free for spawned scan tasks.
async fn read_line(prompt: &str) -> Option<String> {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || {
        print!("{prompt}> ");
        std::io::stdout().flush().ok();
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) => None, // EOF
            Ok(_) => Some(line),
            Err(_) => None,
        }
    })
    .await
    .unwrap_or(None)
}

/// Run `inner` as an OS command synchronously, capturing stdout (§4.9).
async fn run_os_command(inner: String) -> Result<DisplayValue> {
    tokio::task::spawn_blocking(move || {
        let output = Command::new("/bin/sh")
            .arg("-c")
            .arg(&inner)
            .output()
            .map_err(|e| Error::Internal(format!("failed to spawn shell command: {e}")))?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
            return Err(Error::Internal(format!("command exited with {}: {stderr}", output.status)));
        }
        Ok(DisplayValue::Text(stdout))
    })
    .await
    .map_err(|e| Error::Internal(format!("shell task panicked: {e}")))?
}

/// Dispatch one already-read line: `select` goes to the query
/// parser/planner (C5); `exit`/`quit` are handled by the caller before
/// reaching here; everything else tokenizes and runs through the command
/// registry (C6/C7).
pub async fn interpret_command_line(ctx: &Arc<Context>, line: &str) -> Result<DisplayValue> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(DisplayValue::Unit);
    }
    if trimmed.get(0..6).map(|s| s.eq_ignore_ascii_case("select")).unwrap_or(false) {
        let statement = query::parse(trimmed)?;
        let result = query::run_select(ctx.zk()?, ctx.seed_brokers.clone(), &statement, new_cancel_flag()).await?;
        return Ok(DisplayValue::Rows(result.rows));
    }
    let tokens = tokenize(trimmed)?;
    let (spec, args) = ctx.registry().resolve(&tokens)?;
    ctx.registry().run(Arc::clone(ctx), &spec, args).await
}

/// Classify an error for display per §4.9/§7: `ZkConnectionLost` hints at
/// `zreconnect`; `InvalidArgs` prints as a syntax error naming the command
/// so the user can run `syntax <cmd>`; anything else is a runtime error.
/// With `debugOn`, the full `Debug` rendering is appended as a
/// stand-in for a stack trace.
pub fn classify_error_message(err: &Error, debug_on: bool) -> String {
    let mut message = match err {
        Error::ZkConnectionLost => "Lost connection to ZooKeeper — try `zreconnect`.".to_string(),
        Error::InvalidArgs(cmd, reason) => {
            if cmd.is_empty() {
                format!("Syntax error: {reason}")
            } else {
                format!("Syntax error in '{cmd}': {reason} (try `syntax {cmd}`)")
            }
        }
        other => format!("Runtime error: {other}"),
    };
    if debug_on {
        message.push_str(&format!("\n{err:?}"));
    }
    message
}

fn is_exit_command(trimmed: &str) -> bool {
    trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit")
}

/// Main read-dispatch-print loop. Returns the process exit code: `0` on
/// clean shutdown.
pub async fn run_repl(ctx: Arc<Context>) -> i32 {
    loop {
        let prompt = ctx.registry().active_module().prompt().to_string();
        let Some(line) = read_line(&prompt).await else {
            println!();
            break;
        };
        let trimmed = line.trim().to_string();
        if trimmed.is_empty() {
            continue;
        }
        if is_exit_command(&trimmed) {
            break;
        }

        let outcome = if is_whole_line_shell(&trimmed) {
            let inner = trimmed[1..trimmed.len() - 1].to_string();
            run_os_command(inner).await
        } else {
            interpret_command_line(&ctx, &trimmed).await
        };

        match outcome {
            Ok(value) => {
                let rendered = value.render();
                if !rendered.is_empty() {
                    println!("{rendered}");
                }
            }
            Err(e) => {
                error!("command failed: {e}");
                eprintln!("{}", classify_error_message(&e, ctx.debug_on()));
            }
        }
    }
    ctx.registry().shutdown();
    0
}

/// Run exactly one command line and return its process exit code, for the
/// `-e "<command>"` one-shot invocation (§1.1 ambient CLI front door).
pub async fn run_one_shot(ctx: Arc<Context>, line: &str) -> i32 {
    let trimmed = line.trim();
    if is_exit_command(trimmed) || trimmed.is_empty() {
        return 0;
    }
    let outcome = if is_whole_line_shell(trimmed) {
        run_os_command(trimmed[1..trimmed.len() - 1].to_string()).await
    } else {
        interpret_command_line(&ctx, trimmed).await
    };
    match outcome {
        Ok(value) => {
            let rendered = value.render();
            if !rendered.is_empty() {
                println!("{rendered}");
            }
            0
        }
        Err(e) => {
            eprintln!("{}", classify_error_message(&e, ctx.debug_on()));
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_loss_hints_at_reconnect() {
        let msg = classify_error_message(&Error::ZkConnectionLost, false);
        assert!(msg.contains("zreconnect"));
    }

    #[test]
    fn invalid_args_is_syntax_error() {
        let msg = classify_error_message(&Error::InvalidArgs("zget".to_string(), "oops".to_string()), false);
        assert!(msg.starts_with("Syntax error"));
        assert!(msg.contains("zget"));
    }

    #[test]
    fn other_errors_are_runtime_errors() {
        let msg = classify_error_message(&Error::Internal("boom".to_string()), false);
        assert!(msg.starts_with("Runtime error"));
    }

    #[test]
    fn debug_on_appends_debug_rendering() {
        let msg = classify_error_message(&Error::Internal("boom".to_string()), true);
        assert!(msg.contains("Internal"));
    }

    #[test]
    fn exit_and_quit_are_recognized_case_insensitively() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("QUIT"));
        assert!(!is_exit_command("exiting"));
    }
}
