//! Child process execution with timeouts and bounded capture.
//!
//! The planner backend is an external command fed a prompt on stdin. Its
//! output is drained concurrently so a chatty child can never deadlock on a
//! full pipe, and capture is capped so it can never exhaust memory either.

use std::io::{Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// What a finished (or killed) child left behind.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Bytes discarded beyond the capture limit, per stream.
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

/// Run `cmd`, optionally feeding `stdin`, killing it after `timeout`.
///
/// Both output streams are read on their own threads while the child runs.
/// Bytes past `output_limit_bytes` are counted and dropped, but the pipe
/// keeps draining so the child never blocks on us.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    stdin: Option<&[u8]>,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    // Readers must be running before stdin is written, or a child that
    // floods its output before draining its input deadlocks against us.
    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    if let Some(input) = stdin {
        let mut child_stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        // A child that exits without draining its input is not our error;
        // anything else is. Dropping the handle closes the pipe so the
        // child sees EOF.
        if let Err(err) = child_stdin.write_all(input) {
            if err.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(err).context("write stdin");
            }
        }
    }

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_stdout_and_stderr() {
        let output = run_command_with_timeout(
            sh("echo out; echo err >&2"),
            None,
            Duration::from_secs(5),
            1000,
        )
        .expect("run");

        assert!(output.status.success());
        assert!(!output.timed_out);
        assert_eq!(String::from_utf8_lossy(&output.stdout), "out\n");
        assert_eq!(String::from_utf8_lossy(&output.stderr), "err\n");
    }

    #[test]
    fn pipes_stdin_through_to_the_child() {
        let output = run_command_with_timeout(
            sh("cat"),
            Some(b"hello planner"),
            Duration::from_secs(5),
            1000,
        )
        .expect("run");

        assert_eq!(String::from_utf8_lossy(&output.stdout), "hello planner");
    }

    /// A child that never reads its stdin must not fail the run.
    #[test]
    fn tolerates_a_child_that_ignores_stdin() {
        let big = vec![b'x'; 1 << 20];
        let output =
            run_command_with_timeout(sh("echo done"), Some(&big), Duration::from_secs(5), 1000)
                .expect("run");

        assert_eq!(String::from_utf8_lossy(&output.stdout), "done\n");
    }

    #[test]
    fn kills_the_child_on_timeout() {
        let output = run_command_with_timeout(
            sh("sleep 5"),
            None,
            Duration::from_millis(50),
            1000,
        )
        .expect("run");

        assert!(output.timed_out);
        assert!(!output.status.success());
    }

    #[test]
    fn counts_bytes_past_the_capture_limit() {
        let output = run_command_with_timeout(
            sh("printf 'aaaaaaaaaaaaaaaaaaaa'"),
            None,
            Duration::from_secs(5),
            10,
        )
        .expect("run");

        assert_eq!(output.stdout.len(), 10);
        assert_eq!(output.stdout_truncated, 10);
    }
}
