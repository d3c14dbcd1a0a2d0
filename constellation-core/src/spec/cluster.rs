use std::fmt::{Display, Formatter};

use ipnet::{IpNet, Ipv4Net};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{
    vip::{Vip, VipRole},
    SpecError, CLUSTER_NAME_REGEX, LOCAL_BOOTSTRAP_CLUSTER_NAME,
};

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Cluster {
    pub name: String,
    pub metro: String,
    pub versions: ClusterVersions,
    pub pod_cidr: IpNet,
    pub service_cidr: IpNet,
    #[serde(default)]
    pub vips: Vec<Vip>,
    #[serde(default)]
    pub control_nodes: Vec<NodePool>,
    #[serde(default)]
    pub worker_nodes: Vec<NodePool>,
}

/// Software versions rolled out to a single cluster.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterVersions {
    /// node operating system
    pub talos: String,
    pub kubernetes: String,
    /// cloud-provider integration
    pub ccm: String,
}

/// A homogeneous group of machines, not an individual machine.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct NodePool {
    pub count: u32,
    pub plan: String,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Control,
    Worker,
}

impl Display for NodeRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Control => f.write_str("control"),
            NodeRole::Worker => f.write_str("worker"),
        }
    }
}

impl Cluster {
    /// Stand-in for the throwaway local cluster used to bootstrap the bary.
    pub(super) fn local_bootstrap() -> Self {
        Self {
            name: LOCAL_BOOTSTRAP_CLUSTER_NAME.to_owned(),
            metro: "local".to_owned(),
            versions: ClusterVersions::default(),
            pod_cidr: IpNet::V4(Ipv4Net::default()),
            service_cidr: IpNet::V4(Ipv4Net::default()),
            vips: Vec::new(),
            control_nodes: Vec::new(),
            worker_nodes: Vec::new(),
        }
    }

    pub fn vip(&self, role: VipRole) -> Option<&Vip> {
        self.vips.iter().find(|vip| vip.role == role)
    }

    pub fn node_pools(&self) -> impl Iterator<Item = (NodeRole, &NodePool)> {
        self.control_nodes
            .iter()
            .map(|pool| (NodeRole::Control, pool))
            .chain(self.worker_nodes.iter().map(|pool| (NodeRole::Worker, pool)))
    }

    pub fn node_count(&self, role: NodeRole) -> u32 {
        self.node_pools()
            .filter(|(pool_role, _)| *pool_role == role)
            .map(|(_, pool)| pool.count)
            .sum()
    }

    pub fn validate(&self) -> Result<(), SpecError> {
        if self.name == LOCAL_BOOTSTRAP_CLUSTER_NAME {
            return Err(SpecError::ReservedClusterName(self.name.to_owned()));
        }

        if !CLUSTER_NAME_REGEX.is_match(&self.name) {
            return Err(SpecError::InvalidClusterName(self.name.to_owned()));
        }

        if self.metro.trim().is_empty() {
            return Err(SpecError::InvalidCluster {
                cluster: self.name.to_owned(),
                reason: "metro cannot be empty".into(),
            });
        }

        // provider metro codes are compared lowercased
        if self.metro != self.metro.to_lowercase() {
            return Err(SpecError::InvalidCluster {
                cluster: self.name.to_owned(),
                reason: format!("metro '{}' must be lowercase", self.metro).into(),
            });
        }

        if let Some(role) = self.vips.iter().map(|vip| vip.role).duplicates().next() {
            return Err(SpecError::DuplicateVipRole {
                cluster: self.name.to_owned(),
                role,
            });
        }

        if let Some(vip) = self.vips.iter().find(|vip| vip.count == 0) {
            return Err(SpecError::InvalidCluster {
                cluster: self.name.to_owned(),
                reason: format!("'{}' VIP count must be at least 1", vip.role).into(),
            });
        }

        if let Some((role, pool)) = self.node_pools().find(|(_, pool)| pool.count == 0) {
            return Err(SpecError::InvalidCluster {
                cluster: self.name.to_owned(),
                reason: format!("{role} node pool '{}' must have at least 1 node", pool.plan)
                    .into(),
            });
        }

        if self.pod_cidr.contains(&self.service_cidr) || self.service_cidr.contains(&self.pod_cidr)
        {
            return Err(SpecError::InvalidCluster {
                cluster: self.name.to_owned(),
                reason: format!(
                    "pod CIDR {} overlaps with service CIDR {}",
                    self.pod_cidr, self.service_cidr
                )
                .into(),
            });
        }

        Ok(())
    }
}

impl PartialEq for Cluster {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Cluster {}

#[cfg(test)]
mod tests {
    use crate::spec::{vip::VipType, SpecError};

    use super::*;

    fn cluster(name: &str) -> Cluster {
        Cluster {
            name: name.to_owned(),
            metro: "pa".to_owned(),
            versions: ClusterVersions::default(),
            pod_cidr: "172.16.0.0/17".parse().unwrap(),
            service_cidr: "172.16.128.0/17".parse().unwrap(),
            vips: vec![Vip::new(VipRole::Cp, 1, VipType::PublicIpv4)],
            control_nodes: vec![NodePool {
                count: 3,
                plan: "c3.small.x86".to_owned(),
            }],
            worker_nodes: vec![
                NodePool {
                    count: 2,
                    plan: "m3.small.x86".to_owned(),
                },
                NodePool {
                    count: 1,
                    plan: "g2.large.x86".to_owned(),
                },
            ],
        }
    }

    #[test]
    fn clusters_are_equal_by_name() {
        let mut other = cluster("jupiter");
        other.metro = "fr".to_owned();

        assert_eq!(cluster("jupiter"), other);
        assert_ne!(cluster("jupiter"), cluster("io"));
    }

    #[test]
    fn node_pools_list_control_before_workers() {
        let cluster = cluster("jupiter");
        let roles = cluster
            .node_pools()
            .map(|(role, _)| role)
            .collect::<Vec<_>>();

        assert_eq!(roles, [NodeRole::Control, NodeRole::Worker, NodeRole::Worker]);
        assert_eq!(cluster.node_count(NodeRole::Control), 3);
        assert_eq!(cluster.node_count(NodeRole::Worker), 3);
    }

    #[test]
    fn validate_rejects_duplicate_vip_roles() {
        let mut cluster = cluster("jupiter");
        cluster
            .vips
            .push(Vip::new(VipRole::Cp, 1, VipType::GlobalIpv4));

        assert!(matches!(
            cluster.validate(),
            Err(SpecError::DuplicateVipRole { role: VipRole::Cp, .. })
        ));
    }

    #[test]
    fn validate_rejects_names_unusable_in_tags() {
        assert!(cluster("jupiter").validate().is_ok());
        assert!(matches!(
            cluster("jupiter:moon").validate(),
            Err(SpecError::InvalidClusterName(_))
        ));
        assert!(matches!(
            cluster("Jupiter").validate(),
            Err(SpecError::InvalidClusterName(_))
        ));
        assert!(matches!(
            cluster(LOCAL_BOOTSTRAP_CLUSTER_NAME).validate(),
            Err(SpecError::ReservedClusterName(_))
        ));
    }

    #[test]
    fn validate_rejects_uppercase_metro() {
        let mut cluster = cluster("jupiter");
        cluster.metro = "PA".to_owned();

        match cluster.validate() {
            Err(SpecError::InvalidCluster { cluster, reason }) => {
                assert_eq!(cluster, "jupiter");
                assert!(reason.contains("'PA'"));
            }
            other => panic!("unexpected validation result: {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_overlapping_cidrs() {
        let mut cluster = cluster("jupiter");
        cluster.service_cidr = "172.16.64.0/18".parse().unwrap();

        assert!(matches!(
            cluster.validate(),
            Err(SpecError::InvalidCluster { .. })
        ));
    }

    #[test]
    fn validate_rejects_empty_pools_and_vips() {
        let mut empty_vip = cluster("jupiter");
        empty_vip.vips[0].count = 0;
        let mut empty_pool = cluster("jupiter");
        empty_pool.worker_nodes[0].count = 0;

        assert!(empty_vip.validate().is_err());
        assert!(empty_pool.validate().is_err());
    }
}
