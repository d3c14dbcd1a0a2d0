//! Reconciles the VIPs declared by a constellation against the addresses
//! already reserved in the provider account.
//!
//! A run takes one inventory snapshot, matches every declaration of the
//! targeted clusters against it, requests whatever is still missing and
//! persists the result per cluster and role. Allocation failures are local
//! to their declaration, the run carries on and reports them at the end.
//!
//! Global (anycast) addresses are shared by the whole constellation: the
//! first one found or allocated during a run satisfies every global
//! declaration of that run.

use itertools::Itertools;
use log::{debug, error, info, warn};
use once_cell::unsync::OnceCell;

use crate::{
    inventory::{AllocationRecord, InventoryError, InventoryGateway},
    spec::{vip::VipRole, Cluster, Constellation, VipType},
    store::VipStore,
    tags::{is_ambiguous_single_tag, is_constellation_member, role_matches, vip_tags},
};

use self::{
    error::ReconcilerError,
    report::ReconcileReport,
    state::{VipKey, VipResolution, VipState},
};

pub mod error;
pub mod report;
pub mod state;

pub struct VipReconciler<'a> {
    gateway: &'a dyn InventoryGateway,
    store: &'a VipStore,
    dry_run: bool,
}

impl<'a> VipReconciler<'a> {
    pub fn new(gateway: &'a dyn InventoryGateway, store: &'a VipStore) -> Self {
        Self {
            gateway,
            store,
            dry_run: false,
        }
    }

    /// Match only, nothing gets allocated or written.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn reconcile_all(
        &self,
        constellation: &Constellation,
    ) -> Result<ReconcileReport, ReconcilerError> {
        let targets = constellation.clusters().collect::<Vec<_>>();

        self.reconcile(constellation, &targets).await
    }

    pub async fn reconcile_cluster(
        &self,
        constellation: &Constellation,
        cluster_name: &str,
    ) -> Result<ReconcileReport, ReconcilerError> {
        let cluster = constellation
            .lookup(cluster_name)
            .map_err(ReconcilerError::SpecError)?;

        self.reconcile(constellation, &[cluster]).await
    }

    async fn reconcile(
        &self,
        constellation: &Constellation,
        targets: &[&Cluster],
    ) -> Result<ReconcileReport, ReconcilerError> {
        info!(
            "Reconciling VIPs of {} cluster(s) in the '{}' constellation...",
            targets.len(),
            constellation.name
        );

        let snapshot = self
            .gateway
            .list_all_addresses()
            .await
            .map_err(ReconcilerError::InventoryListingError)?;

        debug!("Inventory snapshot holds {} record(s)", snapshot.len());

        let global_vip = OnceCell::new();
        let mut report = ReconcileReport::default();

        for cluster in targets {
            for vip in &cluster.vips {
                let mut resolution = VipResolution::new(cluster, vip);

                match vip.vip_type {
                    VipType::GlobalIpv4 => {
                        discover_global_vip(constellation, vip.role, &snapshot, &global_vip);
                        if let Some(record) = global_vip.get() {
                            resolution.reserved.push(record.clone());
                        }
                    }
                    VipType::PublicIpv4 => {
                        resolution.reserved.extend(
                            match_public(cluster, vip.role, &snapshot)
                                .cloned()
                                .flat_map(AllocationRecord::split),
                        );

                        if resolution.reserved.len() > vip.count as usize {
                            warn!(
                                "{}: found {} reserved addresses, {} declared",
                                resolution.key,
                                resolution.reserved.len(),
                                vip.count
                            );
                        }
                    }
                }

                if resolution.missing() == 0 {
                    info!("{}: found already reserved VIP(s)", resolution.key);
                    resolution.transition(VipState::Matched);
                }

                report
                    .resolutions
                    .insert(resolution.key.to_owned(), resolution);
            }
        }

        for cluster in targets {
            for vip in &cluster.vips {
                let key = VipKey::new(&cluster.name, vip.role);
                let Some(mut resolution) = report.resolutions.remove(&key) else {
                    continue;
                };

                if resolution.state == VipState::Unresolved {
                    self.resolve(cluster, &mut resolution, &global_vip, &mut report)
                        .await;
                }

                report.resolutions.insert(key, resolution);
            }

            if !self.dry_run {
                self.persist(cluster, &mut report);
            }
        }

        if report.is_complete() {
            info!("All VIPs are reconciled!");
        } else {
            warn!(
                "{} VIP declaration(s) remain unresolved: {}",
                report.unresolved.len(),
                report
                    .unresolved
                    .iter()
                    .map(|vip| format!("{}/{}", vip.cluster, vip.role))
                    .join(", ")
            );
        }

        Ok(report)
    }

    async fn resolve(
        &self,
        cluster: &Cluster,
        resolution: &mut VipResolution,
        global_vip: &OnceCell<AllocationRecord>,
        report: &mut ReconcileReport,
    ) {
        let vip_type = resolution.declaration.vip_type;

        if vip_type == VipType::GlobalIpv4 {
            if let Some(record) = global_vip.get() {
                if !resolution.reserved.contains(record) {
                    resolution.reserved.push(record.clone());
                }
                resolution.transition(VipState::Matched);
                return;
            }
        }

        let count = match vip_type {
            VipType::PublicIpv4 => resolution.missing(),
            VipType::GlobalIpv4 => 1,
        };

        if self.dry_run {
            info!(
                "{}: would allocate {count} {vip_type} address(es)",
                resolution.key
            );
            resolution.transition(VipState::Planned);
            return;
        }

        resolution.transition(VipState::Allocating);
        report.allocation_requests += 1;

        match self.allocate(cluster, resolution, count).await {
            Ok(records) => {
                if vip_type == VipType::GlobalIpv4 {
                    let _ = global_vip.set(records[0].clone());
                    resolution.reserved.push(records[0].clone());
                } else {
                    resolution.reserved.extend(records);
                }

                if resolution.missing() > 0 {
                    warn!(
                        "{}: the provider returned fewer addresses than requested",
                        resolution.key
                    );
                }

                resolution.transition(VipState::Matched);
            }
            Err(error) => {
                warn!("{}: allocation failed! {error}", resolution.key);
                resolution.transition(VipState::Failed);
                report.mark_unresolved(&resolution.key, error.to_string());
            }
        }
    }

    async fn allocate(
        &self,
        cluster: &Cluster,
        resolution: &VipResolution,
        count: u32,
    ) -> Result<Vec<AllocationRecord>, InventoryError> {
        let role = resolution.declaration.role;
        let tags = vip_tags(role, &cluster.name);

        let records = match resolution.declaration.vip_type {
            VipType::PublicIpv4 => {
                info!(
                    "{}: requesting {count} public address(es) in '{}'...",
                    resolution.key, cluster.metro
                );
                self.gateway
                    .allocate_public(&cluster.metro, VipType::PublicIpv4, count, &tags)
                    .await?
            }
            VipType::GlobalIpv4 => {
                info!("{}: requesting a global address...", resolution.key);
                self.gateway.allocate_global(count, &tags).await?
            }
        };

        let records = records
            .into_iter()
            .flat_map(AllocationRecord::split)
            .collect::<Vec<_>>();

        if records.is_empty() {
            return Err(InventoryError::InvalidRecord(
                "the provider returned no addresses".to_owned(),
            ));
        }

        Ok(records)
    }

    fn persist(&self, cluster: &Cluster, report: &mut ReconcileReport) {
        for vip in &cluster.vips {
            let key = VipKey::new(&cluster.name, vip.role);
            let vips = match report.resolutions.get(&key) {
                Some(resolution) if resolution.state == VipState::Matched => {
                    resolution.projection()
                }
                _ => continue,
            };

            match self.store.write(&cluster.name, vip.role, &vips) {
                Ok(path) => report.written.push(path),
                Err(error) => {
                    error!("{key}: couldn't save reserved VIPs! {error}");
                    report.mark_unresolved(&key, error.to_string());
                }
            }
        }
    }
}

/// Fills the global slot with the first matching record of the snapshot.
fn discover_global_vip(
    constellation: &Constellation,
    role: VipRole,
    snapshot: &[AllocationRecord],
    global_vip: &OnceCell<AllocationRecord>,
) {
    if global_vip.get().is_some() {
        return;
    }

    let candidates = global_candidates(constellation, role, snapshot);
    let Some(first) = candidates.first() else {
        return;
    };

    if role == VipRole::Cp && is_ambiguous_single_tag(&first.tags) {
        warn!(
            "{} was classified as a control-plane VIP only because it carries a single tag ({:?}), please review it",
            first.address, first.tags
        );
    }

    let others = candidates
        .iter()
        .skip(1)
        .filter(|record| record.address != first.address)
        .map(|record| record.address.to_string())
        .collect::<Vec<_>>();

    if !others.is_empty() {
        warn!(
            "Multiple global VIPs match the '{}' constellation, using {} and ignoring: {}",
            constellation.name,
            first.address,
            others.join(", ")
        );
    }

    let _ = global_vip.set((*first).to_owned());
}

fn global_candidates<'s>(
    constellation: &Constellation,
    role: VipRole,
    snapshot: &'s [AllocationRecord],
) -> Vec<&'s AllocationRecord> {
    snapshot
        .iter()
        .filter(|record| record.vip_type == VipType::GlobalIpv4)
        .filter(|record| is_constellation_member(&record.tags, constellation))
        .filter(|record| role_matches(role, &record.tags))
        .collect()
}

fn match_public<'s>(
    cluster: &'s Cluster,
    role: VipRole,
    snapshot: &'s [AllocationRecord],
) -> impl Iterator<Item = &'s AllocationRecord> {
    let tags = vip_tags(role, &cluster.name);

    snapshot.iter().filter(move |record| {
        record.vip_type == VipType::PublicIpv4
            && record.tags == tags
            && record.is_in_metro(&cluster.metro)
    })
}


#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::{
        inventory::mock::MockInventory,
        spec::{constellation::tests::{demo, DEMO_SPEC}, SpecError},
        store::StoreError,
    };

    use super::*;

    fn store(dir: &Path) -> VipStore {
        VipStore::new(dir, "demo")
    }

    fn existing(address: &str, vip_type: VipType, tags: Vec<String>, metro: Option<&str>) -> AllocationRecord {
        AllocationRecord {
            address: address.parse().unwrap(),
            cidr: 32,
            vip_type,
            tags,
            metro: metro.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn demo_constellation_allocates_missing_vips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let inventory = MockInventory::new();

        let report = VipReconciler::new(&inventory, &store)
            .reconcile_all(&demo())
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(inventory.public_calls(), 3);
        assert_eq!(inventory.global_calls(), 1);
        assert_eq!(report.allocation_requests, 4);
        assert_eq!(report.written.len(), 5);

        let ganymede = store.read("ganymede", VipRole::Ingress).unwrap();
        let callisto = store.read("callisto", VipRole::Ingress).unwrap();

        assert_eq!(ganymede.global_ipv4.len(), 1);
        assert_eq!(ganymede, callisto);
        assert_eq!(
            store.read("jupiter", VipRole::Cp).unwrap().public_ipv4,
            ["145.40.0.0"]
        );
    }

    #[tokio::test]
    async fn second_run_matches_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let inventory = MockInventory::new();
        let demo = demo();

        VipReconciler::new(&inventory, &store)
            .reconcile_all(&demo)
            .await
            .unwrap();

        let before = demo
            .cluster_names()
            .map(|cluster| store.read_all(cluster).unwrap())
            .collect::<Vec<_>>();

        let report = VipReconciler::new(&inventory, &store)
            .reconcile_all(&demo)
            .await
            .unwrap();

        let after = demo
            .cluster_names()
            .map(|cluster| store.read_all(cluster).unwrap())
            .collect::<Vec<_>>();

        assert!(report.is_complete());
        assert_eq!(report.allocation_requests, 0);
        assert_eq!(inventory.public_calls(), 3);
        assert_eq!(inventory.global_calls(), 1);
        assert_eq!(before, after);
        assert!(report
            .resolutions
            .values()
            .all(|resolution| resolution.state == VipState::Matched));
    }

    #[tokio::test]
    async fn multi_count_global_vip_is_recorded_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let inventory = MockInventory::new();
        let spec = DEMO_SPEC.replacen(
            "      - role: ingress\n        count: 1\n        vip_type: global_ipv4",
            "      - role: ingress\n        count: 2\n        vip_type: global_ipv4",
            1,
        );
        let constellation = Constellation::from_yaml(&spec).unwrap();
        assert_eq!(constellation.satellites[0].vips[0].count, 2);

        VipReconciler::new(&inventory, &store)
            .reconcile_all(&constellation)
            .await
            .unwrap();
        let first = store.read("ganymede", VipRole::Ingress).unwrap();

        let rerun = VipReconciler::new(&inventory, &store)
            .reconcile_all(&constellation)
            .await
            .unwrap();
        let second = store.read("ganymede", VipRole::Ingress).unwrap();

        assert_eq!(first.global_ipv4.len(), 1);
        assert_eq!(first, second);
        assert_eq!(rerun.allocation_requests, 0);
        assert_eq!(inventory.global_calls(), 1);
        assert_eq!(
            rerun.resolution("ganymede", VipRole::Ingress).unwrap().state,
            VipState::Matched
        );
    }

    #[tokio::test]
    async fn public_vips_are_matched_within_metro() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let inventory = MockInventory::with_records(vec![
            existing("145.40.90.12", VipType::PublicIpv4, vip_tags(VipRole::Cp, "jupiter"), Some("md")),
            existing("145.40.90.13", VipType::PublicIpv4, vip_tags(VipRole::Mesh, "jupiter"), Some("pa")),
        ]);

        let report = VipReconciler::new(&inventory, &store)
            .reconcile_all(&demo())
            .await
            .unwrap();

        let cp = report.reserved("jupiter", VipRole::Cp).unwrap();

        assert_ne!(cp.public_ipv4, ["145.40.90.12"]);
        assert_eq!(
            report.reserved("jupiter", VipRole::Mesh).unwrap().public_ipv4,
            ["145.40.90.13"]
        );
        assert_eq!(inventory.public_calls(), 2);
    }

    #[tokio::test]
    async fn failed_allocation_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let inventory = MockInventory::new();
        inventory.reject_quota_for(vip_tags(VipRole::Ingress, "jupiter"));

        let report = VipReconciler::new(&inventory, &store)
            .reconcile_all(&demo())
            .await
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].cluster, "jupiter");
        assert_eq!(report.unresolved[0].role, VipRole::Ingress);
        assert_eq!(
            report.resolution("jupiter", VipRole::Ingress).unwrap().state,
            VipState::Failed
        );
        assert_eq!(report.written.len(), 4);

        assert!(store.read("jupiter", VipRole::Cp).is_ok());
        assert!(store.read("jupiter", VipRole::Mesh).is_ok());
        assert!(store.read("callisto", VipRole::Ingress).is_ok());
        assert!(matches!(
            store.read("jupiter", VipRole::Ingress),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn combined_blocks_are_split_per_address() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let inventory = MockInventory::combining_blocks();
        let spec = DEMO_SPEC.replace(
            "    - role: mesh\n      count: 1",
            "    - role: mesh\n      count: 2",
        );
        let constellation = Constellation::from_yaml(&spec).unwrap();

        let report = VipReconciler::new(&inventory, &store)
            .reconcile_cluster(&constellation, "jupiter")
            .await
            .unwrap();

        assert_eq!(
            report.reserved("jupiter", VipRole::Mesh).unwrap().public_ipv4,
            ["145.40.0.2", "145.40.0.3"]
        );

        let rerun = VipReconciler::new(&inventory, &store)
            .reconcile_cluster(&constellation, "jupiter")
            .await
            .unwrap();

        assert_eq!(rerun.allocation_requests, 0);
        assert_eq!(inventory.public_calls(), 3);
    }

    #[tokio::test]
    async fn partial_match_allocates_the_remainder() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let inventory = MockInventory::with_records(vec![existing(
            "145.40.90.13",
            VipType::PublicIpv4,
            vip_tags(VipRole::Mesh, "jupiter"),
            Some("pa"),
        )]);
        let spec = DEMO_SPEC.replace(
            "    - role: mesh\n      count: 1",
            "    - role: mesh\n      count: 3",
        );
        let constellation = Constellation::from_yaml(&spec).unwrap();

        let report = VipReconciler::new(&inventory, &store)
            .reconcile_cluster(&constellation, "jupiter")
            .await
            .unwrap();

        let mesh = report.reserved("jupiter", VipRole::Mesh).unwrap();

        assert_eq!(mesh.public_ipv4.len(), 3);
        assert_eq!(mesh.public_ipv4[0], "145.40.90.13");
        assert_eq!(inventory.public_calls(), 3);
    }

    #[tokio::test]
    async fn first_global_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let inventory = MockInventory::with_records(vec![
            existing("147.75.40.8", VipType::GlobalIpv4, vip_tags(VipRole::Ingress, "callisto"), None),
            existing("147.75.40.9", VipType::GlobalIpv4, vip_tags(VipRole::Ingress, "ganymede"), None),
            existing("147.75.40.10", VipType::GlobalIpv4, vip_tags(VipRole::Ingress, "europa"), None),
        ]);

        let report = VipReconciler::new(&inventory, &store)
            .reconcile_all(&demo())
            .await
            .unwrap();

        assert_eq!(inventory.global_calls(), 0);
        for cluster in ["ganymede", "callisto"] {
            assert_eq!(
                report.reserved(cluster, VipRole::Ingress).unwrap().global_ipv4,
                ["147.75.40.8"]
            );
        }
    }

    #[tokio::test]
    async fn dry_run_only_plans() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let inventory = MockInventory::with_records(vec![existing(
            "145.40.90.12",
            VipType::PublicIpv4,
            vip_tags(VipRole::Cp, "jupiter"),
            Some("pa"),
        )]);

        let report = VipReconciler::new(&inventory, &store)
            .dry_run(true)
            .reconcile_all(&demo())
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.allocation_requests, 0);
        assert_eq!(inventory.public_calls() + inventory.global_calls(), 0);
        assert_eq!(report.planned().count(), 4);
        assert_eq!(
            report.resolution("jupiter", VipRole::Cp).unwrap().state,
            VipState::Matched
        );
        assert!(report.written.is_empty());
        assert!(store.read_all("jupiter").unwrap().is_empty());
    }

    #[tokio::test]
    async fn single_cluster_run_touches_only_that_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let inventory = MockInventory::new();
        let demo = demo();
        let reconciler = VipReconciler::new(&inventory, &store);

        let report = reconciler.reconcile_cluster(&demo, "callisto").await.unwrap();

        assert_eq!(report.resolutions.len(), 1);
        assert_eq!(inventory.global_calls(), 1);
        assert_eq!(inventory.public_calls(), 0);
        assert!(store.read_all("jupiter").unwrap().is_empty());

        assert!(matches!(
            reconciler.reconcile_cluster(&demo, "europa").await,
            Err(ReconcilerError::SpecError(SpecError::ClusterNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn listing_failure_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let inventory = MockInventory::unreachable();

        let result = VipReconciler::new(&inventory, &store)
            .reconcile_all(&demo())
            .await;

        assert!(matches!(
            result,
            Err(ReconcilerError::InventoryListingError(_))
        ));
        assert_eq!(inventory.public_calls(), 0);
    }
}
