mod health;
mod jobs;
mod sync;

pub use health::health_handler;
pub use jobs::{get_job_handler, list_jobs_handler};
pub use sync::fetch_jobs_handler;
