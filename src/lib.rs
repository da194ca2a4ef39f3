pub mod aggregator;
pub mod api;
pub mod chains;
pub mod config;
pub mod eth;
pub mod models;
pub mod provider;
pub mod score;
pub mod stats;
pub mod wallet;
