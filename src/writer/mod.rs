pub mod document;
pub mod batch;
pub mod write_lock;
