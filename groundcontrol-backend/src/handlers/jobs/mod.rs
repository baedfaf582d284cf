pub mod list;
pub mod metrics;
