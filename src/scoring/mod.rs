pub mod scorer;
pub mod boost;
