pub mod intermediate;
pub mod merger;
pub mod fuzzy;
pub mod executor;
pub mod results;
