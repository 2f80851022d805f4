pub mod client;
pub mod collector;
pub mod error;
pub mod extractor;
