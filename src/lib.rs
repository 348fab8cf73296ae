pub mod agent;
pub mod ai;
pub mod api;
pub mod config;
pub mod db;
pub mod events;
pub mod models;
pub mod notify;
pub mod workflow;
