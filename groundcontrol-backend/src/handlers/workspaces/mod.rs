pub mod clone;
pub mod list;
pub mod pull;
pub mod run;
