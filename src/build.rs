//! Optional build step run before any test.
use crate::config::BuildConfig;
use crate::error::HarnessError;
use crate::exec::{exit_status_string, run_command};
use crate::paths::TestDirPaths;
use crate::util::truncate_bytes;
use anyhow::{Context, Result};

const MAX_BUILD_LOG_BYTES: usize = 64 * 1024;

pub fn run_build(config: &BuildConfig, paths: &TestDirPaths) -> Result<()> {
    let argv = config.command.argv().context("resolve build command")?;
    let cwd = paths.resolve(&config.cwd);
    tracing::info!(command = %argv.join(" "), cwd = %cwd.display(), "running build");

    let output = run_command(&argv, &cwd, None).context("run build command")?;
    tracing::debug!(
        stdout = %truncate_bytes(&output.stdout, MAX_BUILD_LOG_BYTES),
        stderr = %truncate_bytes(&output.stderr, MAX_BUILD_LOG_BYTES),
        duration_ms = output.duration_ms,
        "build output"
    );
    if !output.status.success() {
        let stderr = truncate_bytes(&output.stderr, MAX_BUILD_LOG_BYTES);
        tracing::error!(stderr = %stderr.trim(), "build failed, aborting");
        return Err(HarnessError::BuildFailed {
            status: exit_status_string(&output.status),
        }
        .into());
    }
    Ok(())
}
