//! `fleetdesk` - a front end for managing a small car-rental fleet
//!
//! The crate signs a user in against a hosted backend, mirrors the user's
//! vehicles, bookings, transactions and settings locally, and renders the
//! fleet overview. The backend is reached through the [`backend::Backend`]
//! trait so everything above it runs unchanged against an in-memory double.

// Deny the most critical lints that could lead to bugs or security issues
#![deny(
    // Security and correctness
    unsafe_code,
    unsafe_op_in_unsafe_fn,

    // Code quality - things that are almost always bugs
    unreachable_code,
    unreachable_patterns,
    unused_must_use,

    // Documentation - broken links are bugs
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
)]
// Warn on things that should be fixed but aren't necessarily bugs
#![warn(
    // Documentation - missing docs should be added gradually
    missing_docs,

    // Clippy categories for overall code quality
    clippy::all,
    clippy::pedantic,
    clippy::nursery,

    // Performance
    clippy::inefficient_to_string,
    clippy::large_types_passed_by_value,
    clippy::needless_pass_by_value,
    clippy::unnecessary_wraps,

    // Correctness
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro,
    clippy::exit,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,

    // Complexity and readability
    clippy::cognitive_complexity,
    clippy::large_enum_variant,
    clippy::match_same_arms,
    clippy::too_many_lines,

    // Style consistency
    clippy::enum_glob_use,
    clippy::inconsistent_struct_constructor,
    clippy::must_use_candidate,
    clippy::redundant_closure_for_method_calls,
    clippy::semicolon_if_nothing_returned,
    clippy::wildcard_imports,

    // Future compatibility
    future_incompatible,
    rust_2018_idioms,
)]
// Allow some pedantic lints that are too noisy or not applicable
#![allow(
    clippy::module_name_repetitions,  // Common pattern in Rust
    clippy::missing_errors_doc,        // Will add gradually
    clippy::missing_panics_doc,        // Will add gradually
)]

/// Application state and the authentication controller
pub mod app;
/// Remote backend seam and its hosted implementation
pub mod backend;
/// Configuration from the environment and the TOML application file
pub mod config;
/// Core logic - reconciliation, the local data store, credential checks
pub mod core;
/// Serde models for backend rows, identities and sessions
pub mod entities;
/// Unified error types and result handling
pub mod errors;
/// Page regions and the HTML views rendered into them
pub mod presentation;
/// Line-oriented command shell
pub mod shell;

#[cfg(test)]
pub mod test_utils;
