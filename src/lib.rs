pub mod auth;
pub mod clients;
pub mod config;
pub mod db;
pub mod docs;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod websocket;
pub mod ws;

pub use state::AppState;
