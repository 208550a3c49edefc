//! External tool invocation.
//!
//! Every external program the deployer touches (`ldconfig`, `patchelf`,
//! `getconf`, `curl`, `appimagetool`) goes through [`Cmd`], so failures carry
//! the program name, exit code and captured stderr.

use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use crate::error::Error;

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or -1 if terminated by signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }
}

/// Builder for one external command.
pub struct Cmd {
    program: PathBuf,
    args: Vec<OsString>,
    error_prefix: Option<String>,
}

impl Cmd {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            error_prefix: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(OsString::from(arg.as_ref()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| OsString::from(a.as_ref())));
        self
    }

    /// Add a path argument without lossy conversion.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.as_os_str().to_os_string());
        self
    }

    /// Prefix used in the error message when the command fails.
    pub fn error_msg(mut self, msg: impl AsRef<str>) -> Self {
        self.error_prefix = Some(msg.as_ref().to_string());
        self
    }

    fn display_name(&self) -> String {
        self.program.display().to_string()
    }

    fn failure_prefix(&self) -> String {
        self.error_prefix
            .clone()
            .unwrap_or_else(|| format!("'{}' failed", self.display_name()))
    }

    /// Run and capture stdout/stderr.
    pub fn run(self) -> Result<CommandResult> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| format!("Failed to execute '{}'. Is it installed?", self.display_name()))?;

        let result = CommandResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            let prefix = self.failure_prefix();
            let stderr = result.stderr_trimmed();
            if stderr.is_empty() {
                bail!("{} (exit code {})", prefix, result.code());
            }
            bail!("{} (exit code {}):\n{}", prefix, result.code(), stderr);
        }

        Ok(result)
    }

    /// Run with inherited stdio so the tool's own progress output is visible.
    pub fn run_interactive(self) -> Result<ExitStatus> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("Failed to execute '{}'. Is it installed?", self.display_name()))?;

        if !status.success() {
            bail!(
                "{} (exit code {})",
                self.failure_prefix(),
                status.code().unwrap_or(-1)
            );
        }

        Ok(status)
    }
}

/// Locate an external tool.
///
/// An explicit override wins; otherwise `PATH` is searched, then each of
/// `fallbacks` (absolute locations outside a regular user's `PATH`, such as
/// `/sbin`).
pub fn find_tool(
    name: &str,
    override_path: Option<&Path>,
    fallbacks: &[&str],
) -> std::result::Result<PathBuf, Error> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return which::which(path).map_err(|_| Error::ExternalToolUnavailable {
            tool: path.display().to_string(),
        });
    }

    if let Ok(path) = which::which(name) {
        return Ok(path);
    }

    fallbacks
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .ok_or_else(|| Error::ExternalToolUnavailable {
            tool: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_success() {
        let result = Cmd::new("echo").arg("hello").run().unwrap();
        assert!(result.success());
        assert_eq!(result.stdout_trimmed(), "hello");
    }

    #[test]
    fn test_run_failure_includes_stderr() {
        let err = Cmd::new("ls")
            .arg("/nonexistent_path_12345")
            .run()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("No such file") || msg.contains("cannot access"));
    }

    #[test]
    fn test_custom_error_message() {
        let err = Cmd::new("false")
            .error_msg("patchelf step failed")
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("patchelf step failed"));
    }

    #[test]
    fn test_arg_path_and_args() {
        let result = Cmd::new("echo")
            .args(["one", "two"])
            .arg_path(Path::new("/tmp/three"))
            .run()
            .unwrap();
        assert_eq!(result.stdout_trimmed(), "one two /tmp/three");
    }

    #[test]
    fn test_missing_program() {
        let err = Cmd::new("nonexistent_program_12345").run().unwrap_err();
        assert!(err.to_string().contains("Is it installed?"));
    }

    #[test]
    fn test_find_tool_in_path() {
        assert!(find_tool("sh", None, &[]).is_ok());
    }

    #[test]
    fn test_find_tool_fallback() {
        let found = find_tool("nonexistent_program_12345", None, &["/bin/sh"]).unwrap();
        assert_eq!(found, PathBuf::from("/bin/sh"));
    }

    #[test]
    fn test_find_tool_unavailable() {
        let err = find_tool("nonexistent_program_12345", None, &["/nonexistent/x"]).unwrap_err();
        assert!(matches!(err, Error::ExternalToolUnavailable { .. }));
    }

    #[test]
    fn test_find_tool_bad_override() {
        let err = find_tool("sh", Some(Path::new("/nonexistent/ldconfig")), &[]).unwrap_err();
        assert!(matches!(err, Error::ExternalToolUnavailable { .. }));
    }
}
