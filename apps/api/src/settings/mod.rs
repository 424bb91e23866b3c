// Runtime settings: extraction policy, LLM model selection, and the
// read-only taxonomy view for the admin surface.

pub mod handlers;
pub mod models;
pub mod repository;
