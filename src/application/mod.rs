//! Application services: purge and registry orchestration over injected stores.

pub mod error;
pub mod purge;
pub mod registry;
pub mod repos;
pub mod storage;
