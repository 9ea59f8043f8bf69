pub mod bias;
pub mod field_value;
pub mod work_detail;
pub mod work_item;

pub use bias::{collect_findings, BiasFinding, BiasLevel};
pub use field_value::FieldValue;
pub use work_detail::{is_reserved, WorkDetail, RESERVED_KEYS};
pub use work_item::{CatalogSummary, JobType, WorkItem, WorkStatus};
