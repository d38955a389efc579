//! Child-process function runtime.
//!
//! # Protocol
//! ```text
//! spawn `<handler>` (or `<runtime> <handler>`) with a cleared environment
//!     → event JSON written to stdin, stdin closed
//!     → result JSON read from stdout (last non-empty line if stdout has logs)
//!     → stderr lines forwarded to tracing under the function name
//! ```
//!
//! # Design Decisions
//! - One process per invocation; handler edits are picked up without restart
//! - The environment holds only declared variables plus the reserved
//!   `AWS_LAMBDA_*` set, so leaks from the developer's shell show up locally
//! - `kill_on_drop` makes the engine's timeout a hard cancellation
//! - Stdout is read up to `MAX_OUTPUT_BYTES`; a handler writing more is
//!   killed and fails the invocation

use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;

use futures_util::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::config::FunctionRoute;
use crate::invoke::engine::{FunctionRuntime, HandlerError};
use crate::invoke::event::{InvocationEvent, InvocationResult};

/// Stderr lines kept for the error message of a failed handler.
const STDERR_TAIL_LINES: usize = 20;

/// Largest handler stdout accepted, matching the gateway's response limit.
const MAX_OUTPUT_BYTES: u64 = 6 * 1024 * 1024;

/// Runs each invocation as a child process.
#[derive(Debug, Clone)]
pub struct ProcessRuntime {
    region: String,
}

impl Default for ProcessRuntime {
    fn default() -> Self {
        Self {
            region: "local".to_string(),
        }
    }
}

impl ProcessRuntime {
    fn command(&self, function: &FunctionRoute) -> Command {
        let mut cmd = match &function.runtime {
            Some(runtime) => {
                let mut cmd = Command::new(runtime);
                cmd.arg(&function.handler);
                cmd
            }
            None => Command::new(&function.handler),
        };

        let task_root = function.handler.parent().unwrap_or_else(|| Path::new("/"));

        cmd.env_clear()
            .envs(&function.environment)
            .env("AWS_LAMBDA_FUNCTION_NAME", &function.name)
            .env("AWS_LAMBDA_FUNCTION_MEMORY_SIZE", function.memory_mb.to_string())
            .env("AWS_LAMBDA_FUNCTION_TIMEOUT", function.timeout().as_secs().to_string())
            .env("AWS_REGION", &self.region)
            .env("LAMBDA_TASK_ROOT", task_root)
            .current_dir(task_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(
        &self,
        function: &FunctionRoute,
        event: &InvocationEvent,
    ) -> Result<InvocationResult, HandlerError> {
        let payload = serde_json::to_vec(event).map_err(HandlerError::Encode)?;

        let mut child = self.command(function).spawn().map_err(HandlerError::Spawn)?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let name = function.name.clone();
        let stderr_task = tokio::spawn(async move {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::info!(function = %name, "{}", line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
            Vec::from(tail).join("\n")
        });

        let write = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&payload).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };

        let read = async move {
            let mut buf = Vec::new();
            if let Some(stdout) = stdout {
                stdout.take(MAX_OUTPUT_BYTES + 1).read_to_end(&mut buf).await?;
            }
            Ok::<Vec<u8>, std::io::Error>(buf)
        };

        let (written, output) = tokio::join!(write, read);
        let output = output.map_err(HandlerError::Io)?;
        if output.len() as u64 > MAX_OUTPUT_BYTES {
            // Dropping the child kills it.
            return Err(HandlerError::OutputTooLarge(MAX_OUTPUT_BYTES));
        }
        match written {
            Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(HandlerError::Io(e)),
            _ => {}
        }

        let status = child.wait().await.map_err(HandlerError::Io)?;
        let stderr_tail = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(HandlerError::Exited {
                code: status.code(),
                stderr: stderr_tail,
            });
        }

        parse_result(&function.name, &String::from_utf8_lossy(&output))
    }
}

impl FunctionRuntime for ProcessRuntime {
    fn invoke<'a>(
        &'a self,
        function: &'a FunctionRoute,
        event: &'a InvocationEvent,
    ) -> BoxFuture<'a, Result<InvocationResult, HandlerError>> {
        Box::pin(self.run(function, event))
    }
}

/// Decode handler stdout. Lines before the result are treated as logs.
fn parse_result(function: &str, stdout: &str) -> Result<InvocationResult, HandlerError> {
    let trimmed = stdout.trim();
    if let Ok(result) = serde_json::from_str::<InvocationResult>(trimmed) {
        return Ok(result);
    }

    let mut lines: Vec<&str> = trimmed.lines().filter(|l| !l.trim().is_empty()).collect();
    let last = lines.pop().unwrap_or_default();
    for line in lines {
        tracing::info!(function = %function, "{}", line);
    }
    serde_json::from_str(last).map_err(HandlerError::MalformedResult)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::invoke::engine::tests::function;
    use crate::invoke::engine::{InvocationEngine, InvocationError};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Arc;

    fn script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_parse_result_skips_log_lines() {
        let out = "starting\nstill going\n{\"statusCode\":204}\n";
        let result = parse_result("fn", out).unwrap();
        assert_eq!(result.status_code, 204);
        assert!(parse_result("fn", "not json").is_err());
    }

    #[tokio::test]
    async fn test_environment_is_exclusive() {
        std::env::set_var("GATEWAY_EMULATOR_LEAK_CHECK", "leaked");
        let dir = tempfile::tempdir().unwrap();
        let mut f = function(5);
        f.handler = script(
            dir.path(),
            "env.sh",
            r#"printf '{"statusCode":200,"body":"%s|%s|%s"}\n' "$GREETING" "$GATEWAY_EMULATOR_LEAK_CHECK" "$AWS_LAMBDA_FUNCTION_NAME""#,
        );
        f.environment.insert("GREETING".into(), "hi".into());

        let result = ProcessRuntime::default()
            .invoke(&f, &InvocationEvent::default())
            .await
            .unwrap();
        assert_eq!(result.body, "hi||fn");
    }

    #[tokio::test]
    async fn test_event_on_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = function(5);
        f.handler = script(
            dir.path(),
            "echo.sh",
            r#"read -r line; case "$line" in *'"httpMethod":"PUT"'*) printf '{"statusCode":200}\n';; *) printf '{"statusCode":400}\n';; esac"#,
        );
        let event = InvocationEvent {
            http_method: "PUT".into(),
            ..Default::default()
        };

        let result = ProcessRuntime::default().invoke(&f, &event).await.unwrap();
        assert_eq!(result.status_code, 200);
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = function(5);
        f.handler = script(dir.path(), "fail.sh", "echo 'kaboom' >&2\nexit 3");

        let err = ProcessRuntime::default()
            .invoke(&f, &InvocationEvent::default())
            .await
            .unwrap_err();
        match err {
            HandlerError::Exited { code, stderr } => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("kaboom"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_handler() {
        let mut f = function(5);
        f.handler = "/definitely/not/a/handler".into();
        let err = ProcessRuntime::default()
            .invoke(&f, &InvocationEvent::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Spawn(_)));
    }

    #[tokio::test]
    async fn test_oversized_output_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = function(10);
        f.handler = script(
            dir.path(),
            "flood.sh",
            "dd if=/dev/zero bs=1048576 count=8 2>/dev/null\nprintf '{\"statusCode\":200}\\n'",
        );
        f.environment.insert("PATH".into(), "/usr/bin:/bin".into());

        let err = ProcessRuntime::default()
            .invoke(&f, &InvocationEvent::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::OutputTooLarge(MAX_OUTPUT_BYTES)));
    }

    #[tokio::test]
    async fn test_slow_handler_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = function(1);
        f.handler = script(dir.path(), "slow.sh", "sleep 10\nprintf '{\"statusCode\":200}\\n'");
        f.environment.insert("PATH".into(), "/usr/bin:/bin".into());

        let engine = InvocationEngine::new(Arc::new(ProcessRuntime::default()));
        let started = std::time::Instant::now();
        let err = engine.invoke(&f, &InvocationEvent::default()).await.unwrap_err();
        assert!(matches!(err, InvocationError::Timeout(_)));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }
}
