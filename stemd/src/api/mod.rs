//! HTTP API handlers for stemd

pub mod health;
pub mod jobs;
pub mod models;

pub use health::health_routes;
pub use jobs::job_routes;
pub use models::model_routes;
