//! Verifiable multi-server private information retrieval.
//!
//! A [`Client`] turns the index of a database entry into one [`Query`] per server. Each
//! [`Server`] answers its query against its own copy of the [`Database`], and the client sums the
//! answers back into the requested block. Every block is accompanied by an authentication tag
//! keyed by a secret known only to the client, so an answer that was tampered with by any server
//! is rejected rather than silently returning the wrong data.
//!
//! Queries are either a pair of DPF keys ([`Scheme::PointFunction`]), which only works with
//! exactly two servers, or additive secret shares of the selection vector ([`Scheme::Additive`]),
//! which works with any number of servers at the cost of larger queries.
use thiserror::Error;
use vpir_dpf::DpfError;

pub mod client;
pub use client::Client;

pub mod database;
pub use database::{calculate_num_rows_and_columns, Database, DatabaseInfo, SINGLE_BIT_BLOCK_LENGTH};

pub mod query;
pub use query::Query;

pub mod server;
pub use server::Server;

pub mod sharing;
pub use sharing::{reconstruct_shares, share_vector};

pub use vpir_dpf::field::{FieldElement, F127, F64};


/// Errors raised by the PIR client and servers
#[derive(Debug, Error)]
pub enum PirError {
    /// An index, server count or database layout that the scheme does not support
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    /// The reconstructed answer does not carry a valid tag. At least one server misbehaved.
    #[error("verification failed: REJECT")]
    VerificationFailure,
    /// A query, answer or database whose shape does not match the agreed layout
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("dpf error: {0}")]
    Dpf(#[from] DpfError),
    #[error("serialization error: {0}")]
    Serialization(#[from] ark_serialize::SerializationError),
}

/// The way a client hides the index it retrieves
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Scheme {
    /// Two servers, each receiving one key of a distributed point function
    PointFunction,
    /// Two or more servers, each receiving an additive share of the selection vector
    Additive,
}

impl Scheme {
    /// Byte identifying the scheme on the wire
    pub(crate) fn tag(&self) -> u8 {
        match self {
            Scheme::PointFunction => 0,
            Scheme::Additive => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Scheme::PointFunction),
            1 => Some(Scheme::Additive),
            _ => None,
        }
    }

    /// Checks that `num_servers` servers can take part in a query
    pub fn check_num_servers(&self, num_servers: usize) -> Result<(), PirError> {
        match self {
            Scheme::PointFunction if num_servers != 2 => Err(PirError::InvalidParameters(format!(
                "point function queries need exactly 2 servers, got {}",
                num_servers
            ))),
            Scheme::Additive if num_servers < 2 => Err(PirError::InvalidParameters(format!(
                "additive queries need at least 2 servers, got {}",
                num_servers
            ))),
            _ => Ok(()),
        }
    }
}
