pub mod draft_repository;
pub mod id_gen;
pub mod persistence;
pub mod pipeline;
pub mod selection;
pub mod stats;
pub mod validity_filter;
