pub mod api;
pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod query;
pub mod router;
pub mod service;
pub mod types;

pub use error::LensError;
pub use pipeline::{QueryPipeline, QueryResponse};
