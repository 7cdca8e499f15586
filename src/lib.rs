pub mod config;
pub mod firestore;
pub mod homepage;
pub mod igdb;
pub mod tracing;
pub mod transform;

pub mod util {
    pub mod env;
}
