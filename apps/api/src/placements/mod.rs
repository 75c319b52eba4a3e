//! Placement orchestration: the service, its ports and their adapters, and the
//! HTTP handlers in front of it.

pub mod cache;
pub mod handlers;
pub mod lifecycle;
pub mod locks;
pub mod service;
pub mod store;

#[cfg(test)]
pub mod testing;
