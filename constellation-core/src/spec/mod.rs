use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use self::vip::VipRole;

pub mod cluster;
pub mod constellation;
pub mod vip;

pub use cluster::{Cluster, ClusterVersions, NodePool, NodeRole};
pub use constellation::{Constellation, ProviderVersions};
pub use vip::{Vip, VipType};

pub const SPEC_FILE_SUFFIX: &str = ".constellation.yaml";
/// Name of the temporary local cluster the bary is bootstrapped from.
pub const LOCAL_BOOTSTRAP_CLUSTER_NAME: &str = "kind-bootstrap";

// cluster names end up in provider tags, which are parsed on ':'
static CLUSTER_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

pub fn spec_file_name(constellation: &str) -> String {
    format!("{constellation}{SPEC_FILE_SUFFIX}")
}

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("Io error: {}", .0)]
    IoError(std::io::Error),
    #[error("Couldn't parse the constellation spec! Reason: {}", .0)]
    ParseError(serde_yaml::Error),
    #[error("Cluster '{}' is declared more than once!", .0)]
    DuplicateCluster(String),
    #[error("'{}' is not a valid cluster name! Use lowercase alphanumerics and '-'", .0)]
    InvalidClusterName(String),
    #[error("'{}' is reserved for the local bootstrap cluster!", .0)]
    ReservedClusterName(String),
    #[error("Cluster '{cluster}' declares the '{role}' VIP more than once!")]
    DuplicateVipRole { cluster: String, role: VipRole },
    #[error("Cluster '{cluster}' is invalid: {reason}")]
    InvalidCluster {
        cluster: String,
        reason: Cow<'static, str>,
    },
    #[error("Constellation name cannot be empty!")]
    EmptyConstellationName,
    #[error("There's no '{name}' cluster in the '{constellation}' constellation!")]
    ClusterNotFound { name: String, constellation: String },
    #[error("Unknown VIP role '{}'! Expected one of: cp, ingress, mesh", .0)]
    UnknownVipRole(String),
    #[error("Unknown VIP type '{}'! Expected one of: public_ipv4, global_ipv4", .0)]
    UnknownVipType(String),
}
