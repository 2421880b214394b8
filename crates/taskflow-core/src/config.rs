use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow,
  bail
};
use chrono_tz::Tz;
use tracing::{
  debug,
  info,
  trace
};

use crate::commands::{
  expand_command_abbrev,
  known_command_names
};

const RC_ENV_VAR: &str = "TASKFLOWRC";
const RC_FILE_NAME: &str =
  ".taskflowrc";

/// Settings from `~/.taskflowrc` plus
/// `rc.` overrides. The set of keys is
/// closed: unknown keys and malformed
/// values are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub data_location:   PathBuf,
  pub default_command: String,
  pub color:           bool,
  pub hooks:           bool,
  pub timezone:        Option<String>,
  pub source:          Option<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_location:   PathBuf::from(
        "~/.taskflow"
      ),
      default_command: "list"
        .to_string(),
      color:           true,
      hooks:           true,
      timezone:        None,
      source:          None
    }
  }
}

impl Config {
  #[tracing::instrument]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::default();
    let Some(path) =
      locate_rc(rc_override)
    else {
      debug!(
        "no taskflowrc; using defaults"
      );
      return Ok(cfg);
    };

    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    info!(rc = %path.display(), "loading taskflowrc");
    cfg.read_settings(&text).with_context(
      || {
        format!(
          "invalid taskflowrc {}",
          path.display()
        )
      }
    )?;
    cfg.source = Some(path);
    Ok(cfg)
  }

  /// `rc.KEY` and bare `KEY` are both
  /// accepted.
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (raw_key, value) in overrides {
      let key = raw_key
        .strip_prefix("rc.")
        .unwrap_or(&raw_key);
      debug!(key, value = %value, "applying override");
      self.set(key, &value).with_context(
        || {
          format!(
            "invalid override rc.{key}"
          )
        }
      )?;
    }
    Ok(())
  }

  pub fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    let value = value.trim();
    match key.trim() {
      | "data.location" => {
        if value.is_empty() {
          bail!(
            "data.location cannot be \
             empty"
          );
        }
        self.data_location =
          PathBuf::from(value);
      }
      | "default.command" => {
        let known =
          known_command_names();
        let command =
          expand_command_abbrev(
            value, &known
          )
          .ok_or_else(|| {
            anyhow!(
              "default.command: unknown \
               command {value:?}"
            )
          })?;
        self.default_command =
          command.to_string();
      }
      | "color" => {
        self.color =
          parse_switch(key, value)?;
      }
      | "hooks" => {
        self.hooks =
          parse_switch(key, value)?;
      }
      | "timezone" => {
        self.timezone = if value
          .is_empty()
        {
          None
        } else {
          value.parse::<Tz>().map_err(
            |err| {
              anyhow!(
                "timezone: {err}"
              )
            }
          )?;
          Some(value.to_string())
        };
      }
      | other => {
        bail!("unknown setting: {other}")
      }
    }
    trace!(key, value, "setting applied");
    Ok(())
  }

  /// `--data` wins over
  /// `data.location`. The directory is
  /// created when missing.
  #[tracing::instrument(skip(self))]
  pub fn data_dir(
    &self,
    override_dir: Option<&Path>
  ) -> anyhow::Result<PathBuf> {
    let dir = match override_dir {
      | Some(dir) => dir.to_path_buf(),
      | None => {
        expand_home(&self.data_location)?
      }
    };

    if !dir.is_dir() {
      info!(dir = %dir.display(), "creating data directory");
      fs::create_dir_all(&dir)
        .with_context(|| {
          format!(
            "failed to create {}",
            dir.display()
          )
        })?;
    }
    Ok(dir)
  }

  fn read_settings(
    &mut self,
    text: &str
  ) -> anyhow::Result<()> {
    for (idx, raw) in
      text.lines().enumerate()
    {
      let line = raw
        .split_once('#')
        .map_or(raw, |(kept, _)| kept)
        .trim();
      if line.is_empty() {
        continue;
      }

      let (key, value) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "line {}: expected `key = \
             value`, got {raw:?}",
            idx + 1
          )
        })?;
      self.set(key, value).with_context(
        || format!("line {}", idx + 1)
      )?;
    }
    Ok(())
  }
}

/// Explicit path, then `TASKFLOWRC`
/// (`/dev/null` or empty disables),
/// then `~/.taskflowrc` if present.
fn locate_rc(
  explicit: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = explicit {
    return Some(path.to_path_buf());
  }

  if let Ok(env_path) =
    std::env::var(RC_ENV_VAR)
  {
    let env_path = env_path.trim();
    if env_path.is_empty()
      || env_path == "/dev/null"
    {
      return None;
    }
    return Some(PathBuf::from(
      env_path
    ));
  }

  dirs::home_dir()
    .map(|home| home.join(RC_FILE_NAME))
    .filter(|path| path.is_file())
}

fn expand_home(
  path: &Path
) -> anyhow::Result<PathBuf> {
  let Ok(rest) = path.strip_prefix("~")
  else {
    return Ok(path.to_path_buf());
  };
  let home =
    dirs::home_dir().ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory for {}",
        path.display()
      )
    })?;
  Ok(home.join(rest))
}

fn parse_switch(
  key: &str,
  value: &str
) -> anyhow::Result<bool> {
  match value
    .to_ascii_lowercase()
    .as_str()
  {
    | "on" | "yes" | "y" | "true"
    | "1" => Ok(true),
    | "off" | "no" | "n" | "false"
    | "0" => Ok(false),
    | other => {
      Err(anyhow!(
        "{key}: expected on or off, \
         got {other:?}"
      ))
    }
  }
}
