pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod graph;
pub mod handlers;
pub mod models;
pub mod palette;
pub mod popup;
pub mod state;
pub mod storage;
pub mod store;
pub mod ui;
pub mod view;

pub use app::router;
pub use client::GanttClient;
pub use config::Config;
pub use state::AppState;
