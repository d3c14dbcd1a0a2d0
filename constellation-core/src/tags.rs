//! Provider tags identifying which cluster and role an address was reserved for.
//!
//! Control-plane VIPs are tagged by the infrastructure provider's own
//! machinery with a single `cluster-id` tag, every other role carries a
//! cluster tag followed by a role tag.

use crate::spec::{vip::VipRole, Constellation};

/// Owner of the control-plane VIP tag format, dictated by the infrastructure provider.
pub const CP_TAG_OWNER: &str = "cluster-api-provider-packet";
pub const TAG_NAMESPACE: &str = "constellation";

pub fn vip_tags(role: VipRole, cluster_name: &str) -> Vec<String> {
    match role {
        VipRole::Cp => vec![format!("{CP_TAG_OWNER}:cluster-id:{cluster_name}")],
        _ => vec![
            format!("{TAG_NAMESPACE}:cluster:{cluster_name}"),
            format!("{TAG_NAMESPACE}:vip:{role}"),
        ],
    }
}

/// Single-tag records are always classified as control-plane VIPs, the
/// provider never adds a role tag to those.
pub fn role_matches<S: AsRef<str>>(role: VipRole, tags: &[S]) -> bool {
    match tags {
        [] => false,
        [_] => role == VipRole::Cp,
        [_, role_tag, ..] => trailing_field(role_tag.as_ref()) == role.as_str(),
    }
}

pub fn is_constellation_member<S: AsRef<str>>(tags: &[S], constellation: &Constellation) -> bool {
    tags.first()
        .map(|tag| constellation.contains(trailing_field(tag.as_ref())))
        .unwrap_or(false)
}

/// True for a lone tag that wasn't issued by the provider's control-plane
/// machinery, yet still gets treated as a control-plane VIP.
pub fn is_ambiguous_single_tag<S: AsRef<str>>(tags: &[S]) -> bool {
    match tags {
        [tag] => !tag
            .as_ref()
            .starts_with(&format!("{CP_TAG_OWNER}:cluster-id:")),
        _ => false,
    }
}

fn trailing_field(tag: &str) -> &str {
    tag.rsplit(':').next().unwrap_or(tag)
}
