pub mod errors;
pub mod extractor;
pub mod replicate;
pub mod service;
