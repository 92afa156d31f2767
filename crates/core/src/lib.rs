pub mod application;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod literal;
pub mod patcher;
pub mod ports;
