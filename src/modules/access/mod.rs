pub mod catalog;
pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use catalog::build_registry;
pub use router::init_access_router;
