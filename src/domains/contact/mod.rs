pub mod repository;
pub mod types;

pub use repository::{CrmRepository, SqliteCrmRepository};
pub use types::{CandidateCriteria, ContactRecord};
