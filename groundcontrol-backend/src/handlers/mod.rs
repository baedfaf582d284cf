pub mod jobs;
pub mod nodes;
pub mod projects;
pub mod subscriptions;
pub mod utils;
pub mod viewer;
pub mod workspaces;
