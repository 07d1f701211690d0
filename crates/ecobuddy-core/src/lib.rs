pub mod backend;
pub mod chat;
pub mod config;
pub mod error;
pub mod filter;
pub mod local;
pub mod model;
pub mod scope;
pub mod seed;
pub mod store;
pub mod sync;
