pub mod api;
pub mod app;
pub mod auth;
pub mod metrics;
pub mod profile;
pub mod records;
pub mod view;
