use anyhow::{anyhow, Context};
use constellation_core::{
    reconciler::{
        report::ReconcileReport,
        state::{VipKey, VipResolution, VipState},
        VipReconciler,
    },
    spec::VipType,
    store::ReservedVips,
};
use constellation_macros::TableOutputRow;
use log::{error, info};
use serde::Serialize;

use crate::{
    cli::{OutputFormat, ReconcileVipsArgs},
    context::ConfigContext,
    output::{CliPrint, TableCellSlice},
};

pub async fn reconcile_vips(args: ReconcileVipsArgs, context: ConfigContext) -> anyhow::Result<()> {
    let constellation = context.load_constellation()?;
    let store = context.store(&constellation);
    let inventory = context.create_inventory(args.metal_project, args.metal_api_url)?;
    let reconciler = VipReconciler::new(&inventory, &store).dry_run(args.dry_run);

    let report = match &args.cluster {
        Some(cluster) => reconciler.reconcile_cluster(&constellation, cluster).await,
        None => reconciler.reconcile_all(&constellation).await,
    }
    .context("VIP reconciliation failed!")?;

    print_summary(&report, args.output)?;

    if args.dry_run {
        info!(
            "Dry run: {} VIP declaration(s) would need new addresses",
            report.planned().count()
        );
    }

    for vip in &report.unresolved {
        error!("{}/{}: {}", vip.cluster, vip.role, vip.reason);
    }

    if !report.is_complete() {
        return Err(anyhow!(
            "{} VIP declaration(s) couldn't be reconciled!",
            report.unresolved.len()
        ));
    }

    Ok(())
}

fn print_summary(report: &ReconcileReport, format: OutputFormat) -> anyhow::Result<()> {
    let projections = report
        .resolutions
        .values()
        .map(|resolution| (resolution, resolution.projection()))
        .collect::<Vec<_>>();
    let views = projections
        .iter()
        .map(|(resolution, vips)| ResolutionView::new(resolution, vips))
        .collect::<Vec<_>>();

    views.print(format)
}

#[derive(Serialize, TableOutputRow)]
struct ResolutionView<'a> {
    #[name_column]
    pub vip: &'a VipKey,
    pub vip_type: VipType,
    pub count: u32,
    pub state: VipState,
    pub public_ipv4: TableCellSlice<'a, String>,
    pub global_ipv4: TableCellSlice<'a, String>,
}

impl<'a> ResolutionView<'a> {
    fn new(resolution: &'a VipResolution, vips: &'a ReservedVips) -> Self {
        ResolutionView {
            vip: &resolution.key,
            vip_type: resolution.declaration.vip_type,
            count: resolution.declaration.count,
            state: resolution.state,
            public_ipv4: vips.public_ipv4.as_slice().into(),
            global_ipv4: vips.global_ipv4.as_slice().into(),
        }
    }
}
