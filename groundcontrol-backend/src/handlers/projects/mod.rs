pub mod clone;
pub mod pull;
