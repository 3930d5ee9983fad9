pub mod error;
pub mod market;
pub mod provider;
pub mod types;
