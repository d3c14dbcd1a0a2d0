use std::{collections::BTreeMap, path::PathBuf};

use serde::Serialize;

use super::state::{VipKey, VipResolution, VipState};
use crate::{spec::vip::VipRole, store::ReservedVips};

/// A declaration left without addresses at the end of a run.
#[derive(Serialize, Clone, Debug)]
pub struct UnresolvedVip {
    pub cluster: String,
    pub role: VipRole,
    pub reason: String,
}

#[derive(Serialize, Debug, Default)]
pub struct ReconcileReport {
    pub resolutions: BTreeMap<VipKey, VipResolution>,
    /// number of allocation requests sent to the provider
    pub allocation_requests: usize,
    pub unresolved: Vec<UnresolvedVip>,
    pub written: Vec<PathBuf>,
}

impl ReconcileReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn resolution(&self, cluster: &str, role: VipRole) -> Option<&VipResolution> {
        self.resolutions.get(&VipKey::new(cluster, role))
    }

    pub fn reserved(&self, cluster: &str, role: VipRole) -> Option<ReservedVips> {
        self.resolution(cluster, role)
            .filter(|resolution| resolution.state == VipState::Matched)
            .map(VipResolution::projection)
    }

    pub fn planned(&self) -> impl Iterator<Item = &VipResolution> {
        self.resolutions
            .values()
            .filter(|resolution| resolution.state == VipState::Planned)
    }

    pub(super) fn mark_unresolved(&mut self, key: &VipKey, reason: String) {
        self.unresolved.push(UnresolvedVip {
            cluster: key.cluster.to_owned(),
            role: key.role,
            reason,
        });
    }
}
