pub mod config;
pub mod draft;
pub mod error;
pub mod record;
pub mod state;
