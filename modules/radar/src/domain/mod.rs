pub mod error;
pub mod geo;
pub mod query;
pub mod repo;
pub mod service;
pub mod updater;
