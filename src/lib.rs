pub mod access;
pub mod api;
pub mod app;
pub mod board;
pub mod config;
pub mod errors;
pub mod models;
pub mod session;
pub mod stores;
