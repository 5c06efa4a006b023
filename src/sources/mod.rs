pub mod drugs_fda;
pub mod evidence_source;
pub mod output;
pub mod records;
