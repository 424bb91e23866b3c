// Employee profiles: listing, CV skill preview, and confirmed skill updates.
// Preview never persists; only PUT /skills writes to the repository.

pub mod handlers;
pub mod models;
pub mod repository;
pub mod validation;
