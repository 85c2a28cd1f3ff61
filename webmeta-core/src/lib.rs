//! Shared vocabulary for the webmeta crates: provider identities, search
//! candidates, the per-file attribute bag, match policy, and the error
//! taxonomy every component reports in.

pub mod candidate;
pub mod error;
pub mod file;
pub mod policy;
pub mod provider;

pub use candidate::MatchCandidate;
pub use error::CatalogError;
pub use file::FileInfo;
pub use policy::MatchPolicy;
pub use provider::{CatalogId, IdParseError, Provider};
