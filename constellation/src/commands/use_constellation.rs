use anyhow::Context;
use constellation_core::spec::Constellation;
use log::info;

use crate::{cli::UseArgs, context::ConfigContext};

pub fn use_constellation(args: UseArgs, mut context: ConfigContext) -> anyhow::Result<()> {
    let constellation = Constellation::load(context.config_dir(), &args.name)
        .with_context(|| format!("Couldn't load the '{}' constellation spec!", args.name))?;

    let config = context.cli_config_mut();
    config.constellation = Some(args.name.to_owned());
    config
        .save()
        .context("Couldn't save the configuration file!")?;

    info!(
        "Switched to the '{}' constellation! ({} clusters)",
        args.name,
        constellation.clusters().count()
    );

    Ok(())
}
