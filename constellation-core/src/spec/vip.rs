use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use super::SpecError;

/// A virtual IP declaration. Pure data, the addresses reserved for it are
/// tracked by the reconciler, never here.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Vip {
    pub role: VipRole,
    pub count: u32,
    pub vip_type: VipType,
}

impl Vip {
    pub fn new(role: VipRole, count: u32, vip_type: VipType) -> Self {
        Self {
            role,
            count,
            vip_type,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self.vip_type, VipType::GlobalIpv4)
    }
}

impl Display for Vip {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}x{}", self.role, self.count, self.vip_type)
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VipRole {
    /// kubernetes API endpoint
    Cp,
    Ingress,
    Mesh,
}

impl VipRole {
    pub const ALL: [VipRole; 3] = [VipRole::Cp, VipRole::Ingress, VipRole::Mesh];

    pub fn as_str(&self) -> &'static str {
        match self {
            VipRole::Cp => "cp",
            VipRole::Ingress => "ingress",
            VipRole::Mesh => "mesh",
        }
    }
}

impl Display for VipRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VipRole {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cp" => Ok(VipRole::Cp),
            "ingress" => Ok(VipRole::Ingress),
            "mesh" => Ok(VipRole::Mesh),
            _ => Err(SpecError::UnknownVipRole(s.to_owned())),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VipType {
    /// scoped to a single metro
    PublicIpv4,
    /// anycast, shared by the whole constellation
    GlobalIpv4,
}

impl VipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VipType::PublicIpv4 => "public_ipv4",
            VipType::GlobalIpv4 => "global_ipv4",
        }
    }
}

impl Display for VipType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VipType {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public_ipv4" => Ok(VipType::PublicIpv4),
            "global_ipv4" => Ok(VipType::GlobalIpv4),
            _ => Err(SpecError::UnknownVipType(s.to_owned())),
        }
    }
}
