use constellation_core::spec::{Cluster, Constellation, NodeRole, Vip};
use constellation_macros::TableOutputRow;
use serde::Serialize;

use crate::{
    cli::ListClustersArgs,
    context::ConfigContext,
    output::{CliPrint, TableCellSlice},
};

pub fn list_clusters(args: ListClustersArgs, context: ConfigContext) -> anyhow::Result<()> {
    let constellation = context.load_constellation()?;
    let clusters = constellation
        .clusters()
        .map(|cluster| ClusterView::new(&constellation, cluster))
        .collect::<Vec<_>>();

    clusters.print(args.output)?;

    Ok(())
}

#[derive(Serialize, TableOutputRow)]
struct ClusterView<'a> {
    #[name_column]
    pub name: &'a str,
    pub kind: &'static str,
    pub metro: &'a str,
    pub kubernetes: &'a str,
    pub control_nodes: u32,
    pub worker_nodes: u32,
    pub vips: TableCellSlice<'a, Vip>,
}

impl<'a> ClusterView<'a> {
    fn new(constellation: &Constellation, cluster: &'a Cluster) -> Self {
        ClusterView {
            name: &cluster.name,
            kind: if constellation.is_bary(cluster) {
                "bary"
            } else {
                "satellite"
            },
            metro: &cluster.metro,
            kubernetes: &cluster.versions.kubernetes,
            control_nodes: cluster.node_count(NodeRole::Control),
            worker_nodes: cluster.node_count(NodeRole::Worker),
            vips: cluster.vips.as_slice().into(),
        }
    }
}
