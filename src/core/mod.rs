/// Credential validation and sign-up answer classification
pub mod auth;
/// Replace-by-id, else prepend reconciliation of one collection
pub mod mirror;
/// Local data store: identity plus one mirror per collection
pub mod store;

pub use mirror::{Mirror, Placement};
pub use store::{DataStore, LoadSummary, Mirrored};
