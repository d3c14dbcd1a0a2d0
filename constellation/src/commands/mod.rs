pub mod endpoint;
pub mod get_vips;
pub mod list_clusters;
pub mod reconcile_vips;
pub mod use_constellation;
pub mod validate;
