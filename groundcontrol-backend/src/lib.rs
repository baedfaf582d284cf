pub mod app;
pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod state;

pub use app::build_router;
