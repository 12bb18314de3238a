//! Child-process execution with an optional wall-clock limit.
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
    pub duration_ms: u128,
}

/// Locate the program for `argv[0]`. Paths are taken relative to `cwd`;
/// bare names are looked up on `PATH`.
pub fn resolve_program(program: &str, cwd: &Path) -> PathBuf {
    let path = Path::new(program);
    if path.components().count() > 1 || path.is_absolute() {
        return crate::util::resolve_relative(cwd, path);
    }
    which::which(program).unwrap_or_else(|_| path.to_path_buf())
}

/// Run `argv` in `cwd`, killing the child once `timeout` elapses.
pub fn run_command(argv: &[String], cwd: &Path, timeout: Option<Duration>) -> Result<CommandOutput> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("command is empty"))?;
    let resolved = resolve_program(program, cwd);
    let mut cmd = Command::new(&resolved);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let start = Instant::now();
    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawn {}", resolved.display()))?;
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let (status, timed_out) = wait_with_timeout(&mut child, start, timeout)?;
    let duration_ms = start.elapsed().as_millis();
    if timed_out {
        // Grandchildren may still hold the pipes open; leave the readers detached.
        return Ok(CommandOutput {
            status,
            stdout: Vec::new(),
            stderr: Vec::new(),
            timed_out,
            duration_ms,
        });
    }
    let stdout = stdout_reader
        .join()
        .map_err(|_| anyhow!("stdout reader panicked"))?;
    let stderr = stderr_reader
        .join()
        .map_err(|_| anyhow!("stderr reader panicked"))?;

    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        timed_out,
        duration_ms,
    })
}

pub fn exit_status_string(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        format!("status {code}")
    } else {
        "termination by signal".to_string()
    }
}

fn wait_with_timeout(
    child: &mut Child,
    start: Instant,
    timeout: Option<Duration>,
) -> Result<(ExitStatus, bool)> {
    loop {
        if let Some(status) = child.try_wait().context("check child status")? {
            return Ok((status, false));
        }
        if timeout.is_some_and(|limit| start.elapsed() > limit) {
            let _ = child.kill();
            let status = child.wait().context("reap timed out child")?;
            return Ok((status, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        buf
    })
}
