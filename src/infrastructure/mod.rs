pub mod codec;
pub mod config;
pub mod db;
pub mod ingest;
pub mod logging;
pub mod security;
