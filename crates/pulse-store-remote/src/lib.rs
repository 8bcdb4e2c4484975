//! Managed-backend adapters for PulseTrack.
//!
//! - [`FirestoreSource`]: a document store, through the Firestore REST API.
//! - [`SupabaseSource`]: a relational backend-as-a-service, through its
//!   PostgREST endpoint.
//!
//! Both speak plain HTTPS via [`reqwest`]; neither keeps any local state.

pub mod error;
pub mod firestore;
pub mod supabase;

mod http;

pub use error::{Error, Result};
pub use firestore::{FirestoreConfig, FirestoreSource};
pub use supabase::{SupabaseConfig, SupabaseSource};

/// Collection / table names shared by every backend.
pub mod collections {
  pub const APPROVAL_RATINGS: &str = "approval_ratings";
  pub const SENTIMENT_BREAKDOWN: &str = "sentiment_breakdown";
  pub const STATE_DEMOGRAPHICS: &str = "state_demographics";
  pub const RAW_INPUTS: &str = "raw_inputs";
}
