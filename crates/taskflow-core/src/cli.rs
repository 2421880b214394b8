use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{expand_command_abbrev, known_command_names};
use crate::config::Config;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskflow",
    version,
    about = "TaskFlow: personal task tracking from the terminal",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[command(flatten)]
    pub verbosity: Verbosity,

    /// Override one setting, e.g. `--rc color=off`.
    #[arg(long = "rc", value_name = "KEY=VALUE", value_parser = parse_setting)]
    pub settings: Vec<(String, String)>,

    #[arg(long = "taskflowrc", value_name = "PATH")]
    pub taskflowrc: Option<PathBuf>,

    #[arg(long = "data", value_name = "DIR")]
    pub data: Option<PathBuf>,

    /// Command followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct Verbosity {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, conflicts_with = "verbose")]
    pub quiet: u8,
}

impl Verbosity {
    /// Log level used when `RUST_LOG` is unset.
    pub fn default_level(self) -> &'static str {
        match (self.quiet, self.verbose) {
            (2.., _) => "error",
            (1, _) => "warn",
            (0, 0) => "warn",
            (0, 1) => "info",
            (0, 2) => "debug",
            (0, _) => "trace",
        }
    }
}

pub fn init_tracing(verbosity: Verbosity) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(verbosity.default_level())
            .map_err(|e| anyhow!("invalid log filter: {e}"))?,
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
    if let Err(err) = installed {
        debug!(error = %err, "tracing subscriber already installed");
    }
    Ok(())
}

/// `KEY=VALUE` or `KEY:VALUE`.
pub fn parse_setting(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .or_else(|| raw.split_once(':'))
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in {raw:?}"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Separates positional `rc.KEY=VALUE` words from the rest of the
/// command line so they may appear anywhere, even after the command.
#[tracing::instrument(skip_all)]
pub fn split_settings(raw: Vec<OsString>) -> (Vec<OsString>, Vec<(String, String)>) {
    let mut args = Vec::with_capacity(raw.len());
    let mut settings = Vec::new();

    for (idx, arg) in raw.into_iter().enumerate() {
        let setting = (idx > 0)
            .then(|| arg.to_str())
            .flatten()
            .and_then(|word| word.strip_prefix("rc."))
            .and_then(|word| parse_setting(word).ok());
        match setting {
            Some(pair) => {
                debug!(key = %pair.0, value = %pair.1, "positional setting");
                settings.push(pair);
            }
            None => args.push(arg),
        }
    }

    (args, settings)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let words: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        Self::from_tokens(cfg, &words)
    }

    /// The first word names the command, or a unique prefix of one; the
    /// configured default runs when there are no words at all.
    pub fn from_tokens(cfg: &Config, words: &[String]) -> anyhow::Result<Self> {
        let Some((first, args)) = words.split_first() else {
            return Ok(Self {
                command: cfg.default_command.clone(),
                command_args: Vec::new(),
            });
        };

        let known = known_command_names();
        let command = expand_command_abbrev(first, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {first}"))?;
        Ok(Self {
            command: command.to_string(),
            command_args: args.to_vec(),
        })
    }
}
