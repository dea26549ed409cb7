pub mod accountant;
pub mod analytics;
pub mod provisioning;
pub mod render;
pub mod resolver;
pub mod variation;

pub use accountant::ScanAccountant;
pub use resolver::{Resolution, Resolver};
