//! # Domain Models
//!
//! Strongly-typed values shared by the client, classifier and orchestrator.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Isin`] | Validated ISO 6166 identifier |
//! | [`SecurityType`] | Internal security classification stored with each record |

mod isin;
mod security_type;

pub use isin::Isin;
pub use security_type::SecurityType;
