pub mod dictionary;
pub mod graph;
pub mod index_manager;
pub mod rule;
pub mod terms;
pub mod triple;
