pub mod types;
pub mod config;
pub mod error;
pub mod cancel;
pub mod stats;
pub mod fields;
pub mod object;
pub mod index;
