pub mod endpoints;
pub mod inventory;
pub mod reconciler;
pub mod spec;
pub mod store;
pub mod tags;
