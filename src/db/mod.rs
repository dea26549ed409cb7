pub mod mongodb;

pub use self::mongodb::{connect_store, get_database};
