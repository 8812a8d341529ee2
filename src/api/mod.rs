//! HTTP surface: routes, controllers, DTOs

pub mod controller;
pub mod dto;
pub mod routes;
pub mod util;
