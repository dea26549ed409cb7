pub mod authmw;

pub use authmw::JwtAuth;
