//! Running the external tools the planner depends on

use std::process::{Command, Output};

use tracing::debug;

use crate::{Result, SysError};

/// What happened to one command of an apply run
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Command line as shown to the user
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// `false` for dry runs
    pub executed: bool,
}

/// Shell-like rendering of `program` and its arguments
pub fn render(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a mutating command; with `dry_run` only render it
pub fn run(program: &str, args: &[String], dry_run: bool) -> Result<CommandOutcome> {
    let command = render(program, args);
    if dry_run {
        return Ok(CommandOutcome {
            command,
            stdout: String::new(),
            stderr: String::new(),
            executed: false,
        });
    }

    debug!("running {command}");
    let output = Command::new(program).args(args).output();
    let output = match output {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            return Err(SysError::CommandFailed {
                command,
                stderr: lossy(&output.stderr).trim_end().to_string(),
            });
        }
        Err(error) => {
            return Err(SysError::CommandFailed {
                command,
                stderr: error.to_string(),
            });
        }
    };

    let Output { stdout, stderr, .. } = output;
    Ok(CommandOutcome {
        command,
        stdout: lossy(&stdout),
        stderr: lossy(&stderr),
        executed: true,
    })
}

/// Run a read-only query tool and return its stdout
pub fn run_capture(program: &str, args: &[&str]) -> Result<String> {
    if which::which(program).is_err() {
        return Err(SysError::OperationFailed(format!("{program} not found in PATH")));
    }

    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(SysError::OperationFailed(format!(
            "{program} {} exited with {}: {}",
            args.join(" "),
            output.status,
            lossy(&output.stderr).trim_end()
        )));
    }
    Ok(lossy(&output.stdout))
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Whether the current process runs with root privileges
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}
