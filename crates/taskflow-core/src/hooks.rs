use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::notify::Change;

const ON_CHANGE: &str = "on-change";

/// Runs executable `on-change.*` scripts from `<data_dir>/hooks`, one
/// JSON change per line on stdin.
#[derive(Debug, Clone)]
pub struct HookRunner {
    enabled: bool,
    hooks_dir: PathBuf,
}

impl HookRunner {
    pub fn new(cfg: &Config, data_dir: &Path) -> Self {
        let enabled = cfg.hooks;
        let hooks_dir = data_dir.join("hooks");
        debug!(
            enabled,
            hooks_dir = %hooks_dir.display(),
            "initialized hook runner"
        );
        Self { enabled, hooks_dir }
    }

    /// Feeds `changes` to every on-change hook. Hook failures are logged
    /// and never propagate.
    #[instrument(skip(self, changes), fields(count = changes.len()))]
    pub fn run_on_change(&self, changes: &[Change]) {
        if !self.enabled || changes.is_empty() {
            return;
        }

        let lines: Vec<String> = changes
            .iter()
            .filter_map(|change| match serde_json::to_string(change) {
                Ok(line) => Some(line),
                Err(err) => {
                    warn!(error = %err, "failed to serialize change for hook");
                    None
                }
            })
            .collect();

        let scripts = match self.list_scripts(ON_CHANGE) {
            Ok(scripts) => scripts,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to list hooks");
                return;
            }
        };
        debug!(count = scripts.len(), "running on-change hooks");
        for script in scripts {
            if let Err(err) = run_hook_with_lines(&script, &lines) {
                warn!(hook = %script.display(), error = %format!("{err:#}"), "hook failed");
            }
        }
    }

    #[instrument(skip(self))]
    fn list_scripts(&self, event: &str) -> anyhow::Result<Vec<PathBuf>> {
        if !self.hooks_dir.exists() {
            return Ok(Vec::new());
        }

        let mut scripts = Vec::new();
        for entry in fs::read_dir(&self.hooks_dir)
            .with_context(|| format!("failed to read hooks dir {}", self.hooks_dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !name.starts_with(&format!("{event}.")) {
                continue;
            }

            if !is_executable(&path)? {
                debug!(path = %path.display(), "skipping non-executable hook");
                continue;
            }

            debug!(event, path = %path.display(), "selected hook script");
            scripts.push(path);
        }

        scripts.sort();
        Ok(scripts)
    }
}

fn run_hook_with_lines(path: &Path, input_lines: &[String]) -> anyhow::Result<()> {
    info!(hook = %path.display(), "running hook");
    let mut child = Command::new(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to run hook {}", path.display()))?;

    // The child is always waited on, even when it stops reading early.
    let fed = match child.stdin.take() {
        Some(mut stdin) => input_lines
            .iter()
            .try_for_each(|line| writeln!(stdin, "{line}")),
        None => Ok(()),
    };

    let output = child
        .wait_with_output()
        .with_context(|| format!("failed to wait for hook {}", path.display()))?;

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() {
        return Err(anyhow!(
            "hook {} exited with status {}{}",
            path.display(),
            output
                .status
                .code()
                .map(|code| code.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            if stderr.is_empty() {
                String::new()
            } else {
                format!(": {stderr}")
            }
        ));
    }

    if !stderr.is_empty() {
        warn!(hook = %path.display(), stderr = %stderr, "hook wrote stderr");
    }

    match fed {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
            debug!(hook = %path.display(), "hook exited without reading all changes");
            Ok(())
        }
        Err(err) => Err(err).with_context(|| format!("failed to feed hook {}", path.display())),
        Ok(()) => Ok(()),
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> anyhow::Result<bool> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(path)?.permissions().mode();
    Ok(mode & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> anyhow::Result<bool> {
    Ok(path.is_file())
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use tempfile::tempdir;

    use super::{HookRunner, run_hook_with_lines};
    use crate::config::Config;
    use crate::notify::Change;

    fn write_script(path: &std::path::Path, body: &str, mode: u32) {
        fs::write(path, body).expect("write hook");
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).expect("chmod hook");
    }

    #[test]
    fn on_change_hook_receives_json_lines() {
        let temp = tempdir().expect("tempdir");
        let hooks = temp.path().join("hooks");
        fs::create_dir_all(&hooks).expect("hooks dir");
        let out = temp.path().join("seen.txt");
        write_script(
            &hooks.join("on-change.record"),
            &format!("#!/bin/sh\ncat > '{}'\n", out.display()),
            0o755,
        );
        write_script(
            &hooks.join("on-change.disabled"),
            "#!/bin/sh\nexit 1\n",
            0o644,
        );

        let runner = HookRunner::new(&Config::default(), temp.path());
        runner.run_on_change(&[Change::Tasks, Change::Undo { available: true }]);

        let seen = fs::read_to_string(&out).expect("hook output");
        assert_eq!(
            seen,
            "{\"change\":\"tasks\"}\n{\"change\":\"undo\",\"available\":true}\n"
        );
    }

    #[test]
    fn failing_hook_does_not_stop_later_hooks() {
        let temp = tempdir().expect("tempdir");
        let hooks = temp.path().join("hooks");
        fs::create_dir_all(&hooks).expect("hooks dir");
        let out = temp.path().join("seen.txt");
        write_script(
            &hooks.join("on-change.a-fail"),
            "#!/bin/sh\necho nope >&2\nexit 3\n",
            0o755,
        );
        write_script(
            &hooks.join("on-change.b-record"),
            &format!("#!/bin/sh\ncat > '{}'\n", out.display()),
            0o755,
        );

        let runner = HookRunner::new(&Config::default(), temp.path());
        runner.run_on_change(&[Change::Tasks]);

        assert_eq!(
            fs::read_to_string(&out).expect("later hook ran"),
            "{\"change\":\"tasks\"}\n"
        );
    }

    #[test]
    fn hook_ignoring_stdin_is_reaped_and_ok() {
        let temp = tempdir().expect("tempdir");
        let hooks = temp.path().join("hooks");
        fs::create_dir_all(&hooks).expect("hooks dir");
        let script = hooks.join("on-change.deaf");
        write_script(&script, "#!/bin/sh\nexit 0\n", 0o755);

        let changes: Vec<String> = (0..20_000)
            .map(|idx| format!("{{\"change\":\"searchQuery\",\"query\":\"{idx}\"}}"))
            .collect();
        run_hook_with_lines(&script, &changes).expect("stdin closed early is fine");
    }

    #[test]
    fn disabled_hooks_never_run() {
        let temp = tempdir().expect("tempdir");
        let hooks = temp.path().join("hooks");
        fs::create_dir_all(&hooks).expect("hooks dir");
        let out = temp.path().join("seen.txt");
        write_script(
            &hooks.join("on-change.record"),
            &format!("#!/bin/sh\ncat > '{}'\n", out.display()),
            0o755,
        );

        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("hooks".to_string(), "off".to_string())])
            .expect("override");
        HookRunner::new(&cfg, temp.path()).run_on_change(&[Change::Tasks]);
        assert!(!out.exists());
    }
}
