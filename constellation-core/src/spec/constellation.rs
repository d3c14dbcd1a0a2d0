use std::{fs::File, path::Path};

use itertools::Itertools;
use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::{spec_file_name, Cluster, SpecError, LOCAL_BOOTSTRAP_CLUSTER_NAME};

static LOCAL_BOOTSTRAP_CLUSTER: Lazy<Cluster> = Lazy::new(Cluster::local_bootstrap);

/// One bary (management) cluster and the satellites it manages.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Constellation {
    pub name: String,
    pub providers: ProviderVersions,
    pub bary: Cluster,
    #[serde(default)]
    pub satellites: Vec<Cluster>,
}

/// Versions of the cluster-api providers installed on the bary cluster.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderVersions {
    pub core: String,
    pub bootstrap: String,
    pub control_plane: String,
    pub infrastructure: String,
}

impl Constellation {
    pub fn load(dir: &Path, name: &str) -> Result<Self, SpecError> {
        let path = dir.join(spec_file_name(name));

        debug!("Loading constellation spec from {path:?}");

        let file = File::open(&path).map_err(SpecError::IoError)?;
        let constellation: Constellation =
            serde_yaml::from_reader(file).map_err(SpecError::ParseError)?;

        constellation.validated()
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, SpecError> {
        serde_yaml::from_str::<Constellation>(yaml)
            .map_err(SpecError::ParseError)?
            .validated()
    }

    pub fn validated(self) -> Result<Self, SpecError> {
        if self.name.trim().is_empty() {
            return Err(SpecError::EmptyConstellationName);
        }

        if let Some(name) = self.cluster_names().duplicates().next() {
            return Err(SpecError::DuplicateCluster(name.to_owned()));
        }

        for cluster in self.clusters() {
            cluster.validate()?;
        }

        Ok(self)
    }

    /// Bary first, then satellites in declaration order.
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        std::iter::once(&self.bary).chain(self.satellites.iter())
    }

    pub fn cluster_names(&self) -> impl Iterator<Item = &str> {
        self.clusters().map(|cluster| cluster.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cluster_names().any(|cluster| cluster == name)
    }

    pub fn contains_cluster(&self, cluster: &Cluster) -> bool {
        self.contains(&cluster.name)
    }

    pub fn is_bary(&self, cluster: &Cluster) -> bool {
        self.bary == *cluster
    }

    pub fn lookup(&self, name: &str) -> Result<&Cluster, SpecError> {
        if name == LOCAL_BOOTSTRAP_CLUSTER_NAME {
            return Ok(&*LOCAL_BOOTSTRAP_CLUSTER);
        }

        self.clusters()
            .find(|cluster| cluster.name == name)
            .ok_or_else(|| SpecError::ClusterNotFound {
                name: name.to_owned(),
                constellation: self.name.to_owned(),
            })
    }
}
