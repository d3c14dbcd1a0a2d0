use log::info;

use crate::context::ConfigContext;

pub fn validate(context: ConfigContext) -> anyhow::Result<()> {
    let constellation = context.load_constellation()?;
    let vip_count = constellation
        .clusters()
        .map(|cluster| cluster.vips.len())
        .sum::<usize>();

    info!(
        "The '{}' constellation is valid! ({} clusters, {} VIP declarations)",
        constellation.name,
        constellation.clusters().count(),
        vip_count
    );

    Ok(())
}
