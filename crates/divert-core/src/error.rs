//! Error types for the decision core.

use thiserror::Error;
use uuid::Uuid;

use crate::models::OptionId;

/// Rejections and failures raised by the decision lifecycle.
///
/// All variants are recoverable: the caller refreshes its view of the
/// flight and retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    #[error("option '{option_id}' is not offered by context {context_id}")]
    InvalidOption { context_id: Uuid, option_id: OptionId },

    #[error("context {0} has already been decided")]
    ContextAlreadyDecided(Uuid),

    #[error("context {0} was superseded by a newer context")]
    StaleContext(Uuid),

    #[error("context {0} was not issued for this flight")]
    UnknownContext(Uuid),

    #[error("no active decision context for flight {0}")]
    NoActiveContext(String),

    #[error("unknown aircraft type '{0}'")]
    UnknownAircraftType(String),

    #[error("no decision options could be built for flight {0}")]
    NoOptions(String),
}

/// Problems loading reference tables.
#[derive(Debug, Error)]
pub enum ReferenceDataError {
    #[error("failed to parse reference data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate airport code '{0}'")]
    DuplicateAirport(String),

    #[error("duplicate aircraft type '{0}'")]
    DuplicateAircraft(String),

    #[error("aircraft profile '{0}' has non-positive performance constants")]
    InvalidAircraft(String),
}
