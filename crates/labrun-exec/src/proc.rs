use std::fs::File;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::trace;

use crate::ExecError;

/// Configuration for a single child process.
#[derive(Clone, Debug, Default)]
pub struct ProcSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl ProcSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Human-readable command line for logs.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(char::is_whitespace) {
                line.push('\'');
                line.push_str(arg);
                line.push('\'');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

fn build_command(spec: &ProcSpec) -> Command {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);
    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::null());
    detach(&mut cmd);
    cmd
}

/// Put the child in its own session so it is not signaled when the agent's
/// process group terminates.
#[cfg(unix)]
fn detach(cmd: &mut Command) {
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn detach(_cmd: &mut Command) {}

/// Run the command to completion with both output channels redirected to the
/// given files.
///
/// Returns the exit code, or `None` when the child was killed by a signal.
/// Failure to start at all is the distinct [`ExecError::Spawn`] outcome. No
/// retries and no timeout: a hung child blocks the caller until an external
/// supervisor intervenes.
pub async fn run_to_exit(
    spec: &ProcSpec,
    stdout: File,
    stderr: File,
) -> Result<Option<i32>, ExecError> {
    let mut cmd = build_command(spec);
    cmd.stdout(Stdio::from(stdout));
    cmd.stderr(Stdio::from(stderr));

    trace!(program = %spec.program, args = ?spec.args, "spawn");
    let mut child = cmd.spawn().map_err(|e| ExecError::Spawn(e.to_string()))?;
    let status = child.wait().await.map_err(|e| ExecError::Wait(e.to_string()))?;
    Ok(status.code())
}

/// Spawn the command without waiting, both channels going to `log`.
///
/// Returns the child's pid. The handle is dropped immediately; the detached
/// child keeps running after the agent exits.
pub fn spawn_detached(spec: &ProcSpec, log: File) -> Result<u32, ExecError> {
    let err_log = log.try_clone()?;

    let mut cmd = build_command(spec);
    cmd.stdout(Stdio::from(log));
    cmd.stderr(Stdio::from(err_log));

    trace!(program = %spec.program, args = ?spec.args, "spawn detached");
    let child = cmd.spawn().map_err(|e| ExecError::Spawn(e.to_string()))?;
    child
        .id()
        .ok_or_else(|| ExecError::Spawn("child exited before its pid could be read".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> ProcSpec {
        ProcSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let dir = TempDir::new().unwrap();
        let out_path = dir.path().join("stdout.log");
        let err_path = dir.path().join("stderr.log");
        let out = File::create(&out_path).unwrap();
        let err = File::create(&err_path).unwrap();

        let code = run_to_exit(&sh("echo hi; echo oops 1>&2; exit 3"), out, err)
            .await
            .unwrap();

        assert_eq!(code, Some(3));
        assert_eq!(std::fs::read_to_string(&out_path).unwrap(), "hi\n");
        assert_eq!(std::fs::read_to_string(&err_path).unwrap(), "oops\n");
    }

    #[tokio::test]
    async fn runs_in_the_given_working_directory() {
        let dir = TempDir::new().unwrap();
        let out_path = dir.path().join("stdout.log");
        let out = File::create(&out_path).unwrap();
        let err = File::create(dir.path().join("stderr.log")).unwrap();

        let mut spec = sh("pwd");
        spec.cwd = Some(dir.path().to_path_buf());
        let code = run_to_exit(&spec, out, err).await.unwrap();

        assert_eq!(code, Some(0));
        let printed = std::fs::read_to_string(&out_path).unwrap();
        assert_eq!(
            printed.trim(),
            dir.path().canonicalize().unwrap().to_string_lossy()
        );
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let out = File::create(dir.path().join("stdout.log")).unwrap();
        let err = File::create(dir.path().join("stderr.log")).unwrap();

        let result = run_to_exit(&ProcSpec::new("labrun-no-such-binary"), out, err).await;
        assert!(matches!(result, Err(ExecError::Spawn(_))));
    }

    #[tokio::test]
    async fn detached_spawn_returns_pid() {
        let dir = TempDir::new().unwrap();
        let log = File::create(dir.path().join("session.log")).unwrap();

        let pid = spawn_detached(&sh("exit 0"), log).unwrap();
        assert!(pid > 0);
    }

    #[test]
    fn command_line_quotes_spaced_args() {
        let spec = ProcSpec {
            program: "python".to_string(),
            args: vec!["run.py".to_string(), "two words".to_string()],
            ..Default::default()
        };
        assert_eq!(spec.command_line(), "python run.py 'two words'");
    }
}
