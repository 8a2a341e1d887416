pub mod analysis;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod sensors;
pub mod weather;
