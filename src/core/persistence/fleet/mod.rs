//! Fleet records (accounts, users, devices, groups, events) backing the reports

pub mod fleet_entity;
pub mod fleet_fs_adapter;
pub mod fleet_repository;
pub mod fleet_repository_trait;
