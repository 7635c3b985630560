pub mod config;
pub mod error;
pub mod filters;
pub mod indexer;
pub mod models;
pub mod providers;
pub mod rag;
pub mod retry;
pub mod server;
