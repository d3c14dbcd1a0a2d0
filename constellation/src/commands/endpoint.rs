use constellation_core::{
    endpoints::{control_plane_endpoint, role_address},
    spec::vip::VipRole,
};

use crate::{cli::EndpointArgs, context::ConfigContext};

pub fn endpoint(args: EndpointArgs, context: ConfigContext) -> anyhow::Result<()> {
    let constellation = context.load_constellation()?;
    let cluster = constellation.lookup(&args.cluster)?;
    let store = context.store(&constellation);

    let endpoint = match args.role.map(VipRole::from) {
        None | Some(VipRole::Cp) => control_plane_endpoint(&store, &cluster.name)?,
        Some(role) => role_address(&store, &cluster.name, role)?,
    };

    println!("{endpoint}");

    Ok(())
}
