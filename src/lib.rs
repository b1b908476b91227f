pub mod config;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod probe;
pub mod scheduler;
pub mod storage;
pub mod transform;
