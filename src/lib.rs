// Library exports for CookHUB
// The CLI binary and the integration tests both build on these modules

pub mod api;
pub mod auth;
pub mod communities;
pub mod config;
pub mod confirm;
pub mod error;
pub mod feed;
pub mod models;
pub mod plans;
pub mod posts;
pub mod session;
pub mod state;
