pub mod case_store;
pub mod llm_clients;
pub mod response;
