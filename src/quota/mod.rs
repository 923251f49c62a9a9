pub mod enums;
pub mod errors;
pub mod models;
pub mod service;
pub mod store;
pub mod subscriptions;
