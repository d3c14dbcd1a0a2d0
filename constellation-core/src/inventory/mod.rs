use std::net::Ipv4Addr;

use async_trait::async_trait;
use ipnet::{Ipv4AddrRange, Ipv4Net};
use serde::Serialize;
use thiserror::Error;

use crate::spec::VipType;

pub mod metal;

#[cfg(test)]
pub mod mock;

/// An address block reserved in the provider account.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct AllocationRecord {
    pub address: Ipv4Addr,
    pub cidr: u8,
    pub vip_type: VipType,
    pub tags: Vec<String>,
    /// unset for global addresses
    pub metro: Option<String>,
}

impl AllocationRecord {
    pub fn network(&self) -> Result<Ipv4Net, InventoryError> {
        Ipv4Net::new(self.address, self.cidr)
            .map_err(|_| InventoryError::InvalidRecord(format!("{}/{}", self.address, self.cidr)))
    }

    pub fn addresses(&self) -> Vec<Ipv4Addr> {
        match self.network() {
            Ok(network) if network.prefix_len() < 32 => {
                Ipv4AddrRange::new(network.network(), network.broadcast()).collect()
            }
            _ => vec![self.address],
        }
    }

    /// Splits a combined block into one record per address.
    pub fn split(self) -> Vec<AllocationRecord> {
        if self.cidr >= 32 {
            return vec![self];
        }

        self.addresses()
            .into_iter()
            .map(|address| AllocationRecord {
                address,
                cidr: 32,
                ..self.clone()
            })
            .collect()
    }

    pub fn is_in_metro(&self, metro: &str) -> bool {
        self.metro.as_deref() == Some(metro)
    }
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("The provider refused the allocation due to quota limits! Details: {}", .0)]
    Quota(String),
    #[error("The provider rejected the request ({status})! Details: {message}")]
    Provider { status: u16, message: String },
    #[error("Couldn't reach the provider API! Reason: {}", .0)]
    Transport(reqwest::Error),
    #[error("The provider returned an invalid address record: {}", .0)]
    InvalidRecord(String),
}

/// Read and write access to the addresses reserved in the provider account.
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    async fn list_all_addresses(&self) -> Result<Vec<AllocationRecord>, InventoryError>;

    async fn allocate_public(
        &self,
        metro: &str,
        vip_type: VipType,
        count: u32,
        tags: &[String],
    ) -> Result<Vec<AllocationRecord>, InventoryError>;

    async fn allocate_global(
        &self,
        count: u32,
        tags: &[String],
    ) -> Result<Vec<AllocationRecord>, InventoryError>;
}
