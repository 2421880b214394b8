pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod hooks;
pub mod kv;
pub mod notify;
pub mod render;
pub mod stats;
pub mod store;
pub mod task;
pub mod undo;
pub mod view;

use std::ffi::OsString;
use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let (args, positional_settings) =
    cli::split_settings(raw_args);
  let cli =
    cli::GlobalCli::parse_from(args);

  cli::init_tracing(cli.verbosity)?;
  info!(
    verbose = cli.verbosity.verbose,
    quiet = cli.verbosity.quiet,
    "starting taskflow CLI"
  );
  debug!(?positional_settings, "positional settings");

  let mut cfg = config::Config::load(
    cli.taskflowrc.as_deref()
  )?;
  cfg.apply_overrides(
    positional_settings
      .into_iter()
      .chain(cli.settings)
  )?;

  let data_dir = cfg
    .data_dir(cli.data.as_deref())
    .context(
      "failed to resolve data \
       directory"
    )?;

  let kv = kv::FileKvStore::open(
    &data_dir
  )
  .with_context(|| {
    format!(
      "failed to open task data at {}",
      data_dir.display()
    )
  })?;

  let zone = datetime::Zone::resolve(
    cfg.timezone.as_deref()
  );
  let mut session =
    commands::Session::new(
      store::TaskStore::open(kv),
      render::Renderer::new(&cfg),
      zone,
      hooks::HookRunner::new(
        &cfg, &data_dir
      )
    );

  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  let stdout = std::io::stdout();
  let mut out = stdout.lock();
  commands::dispatch(
    &mut session,
    &cfg,
    inv,
    &mut out
  )?;
  out.flush()?;

  info!("done");
  Ok(())
}
