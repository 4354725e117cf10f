//! Live drive instances and their registry

pub mod registry;
pub mod service;

pub use registry::DriveRegistry;
pub use service::DriveService;
