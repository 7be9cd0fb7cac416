use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

#[cfg(test)]
use mockall::automock;

use crate::core::error::DispatchError;

/// Everything needed to open one session and start one benchmark run in it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaunchRequest {
    /// Session to create
    pub session_name: String,
    /// Interpreter, e.g. `python`
    pub program: String,
    /// Script path followed by its arguments
    pub args: Vec<String>,
    /// Seconds to sleep inside the session before running
    pub start_delay_secs: u64,
    /// Line typed into the session
    pub shell_line: String,
}

impl LaunchRequest {
    pub fn new(
        session_name: &str,
        program: &str,
        args: Vec<String>,
        start_delay_secs: u64,
        hold_open: bool,
    ) -> Self {
        let shell_line = compose_shell_line(program, &args, start_delay_secs, hold_open);
        Self {
            session_name: session_name.to_string(),
            program: program.to_string(),
            args,
            start_delay_secs,
            shell_line,
        }
    }
}

/// `[sleep N; ]program args...[; read]`
fn compose_shell_line(program: &str, args: &[String], start_delay_secs: u64, hold_open: bool) -> String {
    let mut command = Vec::with_capacity(args.len() + 1);
    command.push(shell_quote(program));
    command.extend(args.iter().map(|arg| shell_quote(arg)));

    let mut line = String::new();
    if start_delay_secs > 0 {
        line.push_str(&format!("sleep {}; ", start_delay_secs));
    }
    line.push_str(&command.join(" "));
    if hold_open {
        line.push_str("; read");
    }
    line
}

/// Single-quote a word for a POSIX shell unless it is made only of safe characters
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_./=:,+-".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Opens detached terminal sessions and types a command into them
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Create the session and start the request's command in it.
    /// Returns once the command has been handed to the session.
    async fn launch(&self, request: &LaunchRequest) -> Result<(), DispatchError>;

    /// Whether a session with this name is currently open
    async fn session_exists(&self, session_name: &str) -> Result<bool, DispatchError>;
}

/// tmux-backed launcher
#[derive(Debug, Clone)]
pub struct TmuxLauncher {
    binary: String,
}

impl TmuxLauncher {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output, DispatchError> {
        debug!("Running {} {:?}", self.binary, args);
        let output = Command::new(&self.binary).args(args).output().await?;
        Ok(output)
    }

    fn failure(&self, action: &str, session_name: &str, output: &std::process::Output) -> DispatchError {
        let stderr = String::from_utf8_lossy(&output.stderr);
        DispatchError::LaunchError(format!(
            "{} {} for session '{}' failed ({}): {}",
            self.binary,
            action,
            session_name,
            output.status,
            stderr.trim()
        ))
    }
}

/// Exact-match session target; a bare name is a prefix match in tmux
fn session_target(session_name: &str) -> String {
    format!("={}", session_name)
}

/// Active pane of the exactly-named session
fn pane_target(session_name: &str) -> String {
    format!("={}:", session_name)
}

impl Default for TmuxLauncher {
    fn default() -> Self {
        Self::new("tmux")
    }
}

#[async_trait]
impl SessionLauncher for TmuxLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<(), DispatchError> {
        let name = request.session_name.as_str();

        let output = self.run(&["new-session", "-d", "-s", name]).await?;
        if !output.status.success() {
            return Err(self.failure("new-session", name, &output));
        }

        let pane = pane_target(name);
        let output = self
            .run(&["send-keys", "-t", pane.as_str(), request.shell_line.as_str(), "C-m"])
            .await?;
        if !output.status.success() {
            // Leave no empty session behind
            let target = session_target(name);
            if let Err(e) = self.run(&["kill-session", "-t", target.as_str()]).await {
                warn!("Could not remove session {} after failed send-keys: {}", name, e);
            }
            return Err(self.failure("send-keys", name, &output));
        }

        Ok(())
    }

    async fn session_exists(&self, session_name: &str) -> Result<bool, DispatchError> {
        let target = session_target(session_name);
        let output = self.run(&["has-session", "-t", target.as_str()]).await?;
        Ok(output.status.success())
    }
}
