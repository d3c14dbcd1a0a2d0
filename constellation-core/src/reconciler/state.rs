use std::fmt::{Display, Formatter};

use log::debug;
use serde::{Serialize, Serializer};

use crate::{
    inventory::AllocationRecord,
    spec::{vip::VipRole, Cluster, Vip, VipType},
    store::ReservedVips,
};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VipState {
    Unresolved,
    Allocating,
    /// enough addresses are reserved
    Matched,
    /// the provider refused the allocation
    Failed,
    /// an allocation is needed but the run is dry
    Planned,
}

impl VipState {
    pub fn can_transition_to(&self, next: VipState) -> bool {
        matches!(
            (self, next),
            (VipState::Unresolved, VipState::Matched)
                | (VipState::Unresolved, VipState::Allocating)
                | (VipState::Unresolved, VipState::Planned)
                | (VipState::Allocating, VipState::Matched)
                | (VipState::Allocating, VipState::Failed)
        )
    }
}

impl Display for VipState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VipState::Unresolved => f.write_str("unresolved"),
            VipState::Allocating => f.write_str("allocating"),
            VipState::Matched => f.write_str("matched"),
            VipState::Failed => f.write_str("failed"),
            VipState::Planned => f.write_str("planned"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct VipKey {
    pub cluster: String,
    pub role: VipRole,
}

impl VipKey {
    pub fn new(cluster: &str, role: VipRole) -> Self {
        Self {
            cluster: cluster.to_owned(),
            role,
        }
    }
}

impl Serialize for VipKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Display for VipKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.cluster, self.role)
    }
}

/// Reconciliation progress of a single VIP declaration.
#[derive(Serialize, Clone, Debug)]
pub struct VipResolution {
    pub key: VipKey,
    pub declaration: Vip,
    pub state: VipState,
    pub reserved: Vec<AllocationRecord>,
}

impl VipResolution {
    pub fn new(cluster: &Cluster, declaration: &Vip) -> Self {
        Self {
            key: VipKey::new(&cluster.name, declaration.role),
            declaration: declaration.to_owned(),
            state: VipState::Unresolved,
            reserved: Vec::new(),
        }
    }

    pub fn transition(&mut self, next: VipState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "{}: invalid transition {} -> {next}",
            self.key,
            self.state
        );
        debug!("{}: {} -> {next}", self.key, self.state);

        self.state = next;
    }

    /// Global declarations are satisfied by the single shared address,
    /// whatever their declared count.
    pub fn missing(&self) -> u32 {
        match self.declaration.vip_type {
            VipType::PublicIpv4 => self
                .declaration
                .count
                .saturating_sub(self.reserved.len() as u32),
            VipType::GlobalIpv4 => u32::from(self.reserved.is_empty()),
        }
    }

    pub fn projection(&self) -> ReservedVips {
        ReservedVips::from_records(&self.reserved)
    }
}
