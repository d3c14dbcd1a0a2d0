use std::{
    net::Ipv4Addr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use super::{AllocationRecord, InventoryError, InventoryGateway};
use crate::spec::VipType;

const PUBLIC_BASE: Ipv4Addr = Ipv4Addr::new(145, 40, 0, 0);
const GLOBAL_BASE: Ipv4Addr = Ipv4Addr::new(147, 75, 0, 0);

/// In-memory provider account, allocations become visible to later listings.
#[derive(Default)]
pub struct MockInventory {
    records: Mutex<Vec<AllocationRecord>>,
    rejected_tags: Mutex<Vec<Vec<String>>>,
    next_offset: Mutex<u32>,
    combine_blocks: bool,
    unreachable: bool,
    public_calls: AtomicUsize,
    global_calls: AtomicUsize,
}

impl MockInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Multi-address requests come back as a single CIDR block.
    pub fn combining_blocks() -> Self {
        Self {
            combine_blocks: true,
            ..Default::default()
        }
    }

    /// Every listing fails.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn with_records(records: Vec<AllocationRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    pub fn reject_quota_for(&self, tags: Vec<String>) {
        self.rejected_tags.lock().unwrap().push(tags);
    }

    pub fn public_calls(&self) -> usize {
        self.public_calls.load(Ordering::SeqCst)
    }

    pub fn global_calls(&self) -> usize {
        self.global_calls.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<AllocationRecord> {
        self.records.lock().unwrap().clone()
    }

    fn reserve(
        &self,
        base: Ipv4Addr,
        count: u32,
        vip_type: VipType,
        tags: &[String],
        metro: Option<&str>,
    ) -> Result<Vec<AllocationRecord>, InventoryError> {
        if self.rejected_tags.lock().unwrap().iter().any(|t| t == tags) {
            return Err(InventoryError::Quota(format!(
                "no more {vip_type} addresses for {tags:?}"
            )));
        }

        let block = count.next_power_of_two();
        let offset = {
            let mut next_offset = self.next_offset.lock().unwrap();
            let offset = (*next_offset + block - 1) / block * block;
            *next_offset = offset + block;
            offset
        };
        let first = Ipv4Addr::from(u32::from(base) + offset);

        let allocated = if self.combine_blocks && count > 1 {
            vec![AllocationRecord {
                address: first,
                cidr: 32 - block.trailing_zeros() as u8,
                vip_type,
                tags: tags.to_vec(),
                metro: metro.map(str::to_owned),
            }]
        } else {
            (0..count)
                .map(|index| AllocationRecord {
                    address: Ipv4Addr::from(u32::from(first) + index),
                    cidr: 32,
                    vip_type,
                    tags: tags.to_vec(),
                    metro: metro.map(str::to_owned),
                })
                .collect()
        };

        self.records
            .lock()
            .unwrap()
            .extend(allocated.iter().cloned());

        Ok(allocated)
    }
}

#[async_trait]
impl InventoryGateway for MockInventory {
    async fn list_all_addresses(&self) -> Result<Vec<AllocationRecord>, InventoryError> {
        if self.unreachable {
            return Err(InventoryError::Provider {
                status: 503,
                message: "service unavailable".to_owned(),
            });
        }

        Ok(self.records())
    }

    async fn allocate_public(
        &self,
        metro: &str,
        vip_type: VipType,
        count: u32,
        tags: &[String],
    ) -> Result<Vec<AllocationRecord>, InventoryError> {
        self.public_calls.fetch_add(1, Ordering::SeqCst);
        self.reserve(PUBLIC_BASE, count, vip_type, tags, Some(metro))
    }

    async fn allocate_global(
        &self,
        _count: u32,
        tags: &[String],
    ) -> Result<Vec<AllocationRecord>, InventoryError> {
        self.global_calls.fetch_add(1, Ordering::SeqCst);
        self.reserve(GLOBAL_BASE, 1, VipType::GlobalIpv4, tags, None)
    }
}
