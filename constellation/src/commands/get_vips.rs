use anyhow::anyhow;
use constellation_core::{spec::vip::VipRole, store::ReservedVips};
use constellation_macros::TableOutputRow;
use serde::Serialize;

use crate::{
    cli::GetVipsArgs,
    context::ConfigContext,
    output::{CliPrint, TableCellSlice},
};

pub fn get_vips(args: GetVipsArgs, context: ConfigContext) -> anyhow::Result<()> {
    let constellation = context.load_constellation()?;
    let cluster = constellation.lookup(&args.cluster)?;
    let store = context.store(&constellation);

    let records = match args.role {
        Some(role) => {
            let role = VipRole::from(role);
            vec![(role, store.read(&cluster.name, role)?)]
        }
        None => store.read_all(&cluster.name)?,
    };

    if records.iter().all(|(_, vips)| vips.is_empty()) {
        return Err(anyhow!(
            "No VIPs are recorded for '{}' yet! Run `constellation reconcile-vips` first!",
            cluster.name
        ));
    }

    let views = records
        .iter()
        .map(|(role, vips)| VipRecordView::new(*role, vips))
        .collect::<Vec<_>>();

    views.print(args.output)?;

    Ok(())
}

#[derive(Serialize, TableOutputRow)]
struct VipRecordView<'a> {
    #[name_column]
    pub role: VipRole,
    pub public_ipv4: TableCellSlice<'a, String>,
    pub global_ipv4: TableCellSlice<'a, String>,
}

impl<'a> VipRecordView<'a> {
    fn new(role: VipRole, vips: &'a ReservedVips) -> Self {
        VipRecordView {
            role,
            public_ipv4: vips.public_ipv4.as_slice().into(),
            global_ipv4: vips.global_ipv4.as_slice().into(),
        }
    }
}
