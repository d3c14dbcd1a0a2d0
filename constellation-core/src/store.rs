use std::{
    fs::{create_dir_all, File},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    inventory::AllocationRecord,
    spec::{vip::VipRole, VipType},
};

/// Addresses reserved for one role of one cluster, as consumed by templating.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ReservedVips {
    pub public_ipv4: Vec<String>,
    pub global_ipv4: Vec<String>,
}

impl ReservedVips {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AllocationRecord>) -> Self {
        let mut vips = ReservedVips::default();

        for record in records {
            let addresses = match record.vip_type {
                VipType::PublicIpv4 => &mut vips.public_ipv4,
                VipType::GlobalIpv4 => &mut vips.global_ipv4,
            };

            addresses.extend(record.addresses().iter().map(|a| a.to_string()));
        }

        vips
    }

    pub fn is_empty(&self) -> bool {
        self.public_ipv4.is_empty() && self.global_ipv4.is_empty()
    }

    /// First public address, falling back to the first global one.
    pub fn first_address(&self) -> Option<&str> {
        self.public_ipv4
            .first()
            .or_else(|| self.global_ipv4.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("VIPs for the '{role}' role of '{cluster}' are not registered yet! ({path:?} doesn't exist)")]
    NotFound {
        cluster: String,
        role: VipRole,
        path: PathBuf,
    },
    #[error("The '{role}' VIP record of '{cluster}' contains no addresses!")]
    EmptyRecord { cluster: String, role: VipRole },
    #[error("Io error: {}", .0)]
    IoError(std::io::Error),
    #[error("Serialization error: {}", .0)]
    SerializationError(serde_yaml::Error),
    #[error("Deserialization error: {}", .0)]
    DeserializationError(serde_yaml::Error),
}

/// On-disk projection of the reserved addresses of a constellation,
/// laid out as `<root>/<constellation>/<cluster>/vips-<role>.yaml`.
#[derive(Debug, Clone)]
pub struct VipStore {
    dir: PathBuf,
}

impl VipStore {
    pub fn new(root: &Path, constellation: &str) -> Self {
        Self {
            dir: root.join(constellation),
        }
    }

    pub fn path(&self, cluster: &str, role: VipRole) -> PathBuf {
        self.dir.join(cluster).join(format!("vips-{role}.yaml"))
    }

    pub fn write(
        &self,
        cluster: &str,
        role: VipRole,
        vips: &ReservedVips,
    ) -> Result<PathBuf, StoreError> {
        let path = self.path(cluster, role);

        if let Some(parent) = path.parent() {
            create_dir_all(parent).map_err(StoreError::IoError)?;
        }

        let file = File::options()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(StoreError::IoError)?;

        serde_yaml::to_writer(file, vips).map_err(StoreError::SerializationError)?;

        debug!("Saved {role} VIPs of '{cluster}' to {path:?}");

        Ok(path)
    }

    pub fn read(&self, cluster: &str, role: VipRole) -> Result<ReservedVips, StoreError> {
        let path = self.path(cluster, role);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    cluster: cluster.to_owned(),
                    role,
                    path,
                })
            }
            Err(error) => return Err(StoreError::IoError(error)),
        };

        serde_yaml::from_reader(file).map_err(StoreError::DeserializationError)
    }

    /// Every role of the cluster that has a record.
    pub fn read_all(&self, cluster: &str) -> Result<Vec<(VipRole, ReservedVips)>, StoreError> {
        let mut records = Vec::new();

        for role in VipRole::ALL {
            match self.read(cluster, role) {
                Ok(vips) => records.push((role, vips)),
                Err(StoreError::NotFound { .. }) => continue,
                Err(error) => return Err(error),
            }
        }

        Ok(records)
    }
}
