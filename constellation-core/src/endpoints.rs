use crate::{
    spec::vip::VipRole,
    store::{StoreError, VipStore},
};

pub const CONTROL_PLANE_PORT: u16 = 6443;

/// Kubernetes API endpoint served on the first control-plane VIP of the cluster.
pub fn control_plane_endpoint(store: &VipStore, cluster: &str) -> Result<String, StoreError> {
    let vips = store.read(cluster, VipRole::Cp)?;
    let address = vips
        .public_ipv4
        .first()
        .ok_or_else(|| StoreError::EmptyRecord {
            cluster: cluster.to_owned(),
            role: VipRole::Cp,
        })?;

    Ok(format!("https://{address}:{CONTROL_PLANE_PORT}"))
}

pub fn role_address(store: &VipStore, cluster: &str, role: VipRole) -> Result<String, StoreError> {
    store
        .read(cluster, role)?
        .first_address()
        .map(str::to_owned)
        .ok_or_else(|| StoreError::EmptyRecord {
            cluster: cluster.to_owned(),
            role,
        })
}
