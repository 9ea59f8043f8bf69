//! 业务能力层：每个服务只负责一种能力

pub mod catalog_loader;
pub mod detail_fetcher;
pub mod edit_tracker;
pub mod reference_resolver;
pub mod update_submitter;

pub use catalog_loader::{parse_job_progress, CatalogLoader};
pub use detail_fetcher::DetailFetcher;
pub use edit_tracker::{split_delimited, EditOutcome, EditTracker, FieldEdit, RejectReason};
pub use reference_resolver::{validate_reference, ReferenceResolver, ResolvedImages};
pub use update_submitter::UpdateSubmitter;
