pub mod event;
pub mod model;
pub mod page;
pub mod registry;
pub mod render;
pub mod request_context;
pub mod service;
pub mod sink;
