pub mod child_map;
pub mod match_map;
pub mod node;
pub mod mutation;
pub mod navigator;
pub mod pool;
pub mod id_pool;
pub mod metadata;
pub mod snapshot;
pub mod persistent_map;
