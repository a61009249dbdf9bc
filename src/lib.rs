pub mod auth;
pub mod config;
pub mod demo_backend;
pub mod directory;
pub mod http_client;
pub mod orchestrator;
pub mod player;
pub mod predict_api;
pub mod prediction;
pub mod profile;
pub mod provider;
pub mod state;
pub mod user;
pub mod users_api;
