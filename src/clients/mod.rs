pub mod review_client;

pub use review_client::{FieldUpdate, HttpReviewClient, JobProgressResponse, ReviewBackend};
