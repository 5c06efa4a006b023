pub mod matching;
pub mod models;
pub mod sources;
pub mod utils;

pub use matching::manager::run_matching_pipeline;
pub use models::applications::{ApprovalDate, BrandApplication, GenericApplication};
pub use models::matching::{
    ExtractionStatus, MonopolyRecord, PipelineOutput, UnmatchedBrand, UnmatchedReason,
    ValidatedMatch, ValidationStatus,
};
pub use sources::evidence_source::EvidenceSource;
pub use utils::validation_config::ValidationPolicy;
