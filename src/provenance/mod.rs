pub mod bundle;
pub mod record;
pub mod table;

pub use bundle::ProvenanceBundle;
pub use record::{
    build_record_candidate_provenance, FieldProvenance, RecordCandidate, RecordCandidateSet,
    RecordProvenanceResult,
};
pub use table::{build_table_provenance, CellProvenance, TableProvenanceResult};
