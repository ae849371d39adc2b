//! Core data model definitions shared across prunarr crates.
#![allow(missing_docs)]

pub mod audit;
pub mod candidate;
pub mod error;
pub mod field;
pub mod ids;
pub mod media_item;
pub mod media_type;
pub mod operator;
pub mod predicate;
pub mod rule;
pub mod scan;

// Intentionally curated re-exports for downstream consumers.
pub use audit::DeletionLogEntry;
pub use candidate::{Candidate, CandidateInit, ReviewStatus};
pub use error::{ModelError, Result as ModelResult};
pub use field::{DataSource, EnumValue, Field, FieldType, Unit};
pub use ids::{CandidateId, RuleId, ScanId};
pub use media_item::{MediaItem, RadarrInfo, SonarrInfo};
pub use media_type::MediaType;
pub use operator::Operator;
pub use predicate::{
    ComplexityLabel, ConditionNode, ConditionValue, CriteriaComplexity,
    CriteriaNode, GroupNode, GroupOperator, ValueUnit,
};
pub use rule::{ActionType, MaintenanceRule};
pub use scan::{MaintenanceScan, ScanStatus};
