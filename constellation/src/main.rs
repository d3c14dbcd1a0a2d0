use clap::Parser;
use cli::{Commands, GlobalArgs, LogLevel};
use commands::{
    endpoint::endpoint, get_vips::get_vips, list_clusters::list_clusters,
    reconcile_vips::reconcile_vips, use_constellation::use_constellation, validate::validate,
};
use context::ConfigContext;
use env_logger::Target;
use log::LevelFilter;

use crate::cli::Cli;

mod cli;
mod commands;
mod config;
mod context;
mod output;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    configure_logging(&cli.global_args);

    let context = ConfigContext::new(
        cli.global_args.config_dir.as_deref(),
        cli.global_args.constellation.as_deref(),
    )?;

    if let Some(command) = cli.command {
        match command {
            Commands::Use(args) => use_constellation(args, context)?,
            Commands::Validate => validate(context)?,
            Commands::ListClusters(args) => list_clusters(args, context)?,
            Commands::ReconcileVips(args) => reconcile_vips(args, context).await?,
            Commands::GetVips(args) => get_vips(args, context)?,
            Commands::Endpoint(args) => endpoint(args, context)?,
        }
    }

    Ok(())
}

fn configure_logging(global_args: &GlobalArgs) {
    let log_level = global_args.get_log_level();
    let mut logger = env_logger::builder();

    logger
        .format_timestamp(None)
        .format_module_path(matches!(log_level, LogLevel::Trace))
        .format_target(false)
        .format_level(false)
        .target(Target::Stderr);

    match log_level {
        LogLevel::Normal => {
            logger
                .filter(Some("constellation"), LevelFilter::Info)
                .filter(Some("constellation_core"), LevelFilter::Info);
        }
        LogLevel::Verbose => {
            logger
                .filter(Some("constellation"), LevelFilter::Debug)
                .filter(Some("constellation_core"), LevelFilter::Debug);
        }
        LogLevel::Trace => {
            logger.filter(None, LevelFilter::Debug);
        }
    }

    logger.init();
}
