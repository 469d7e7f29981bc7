//! Aggregated engine error.

use crate::command::CommandError;
use crate::group::GroupError;
use crate::host::HostError;
use crate::store::StoreError;
use crate::tokenizer::MappingError;

/// Any error the engine can report.
///
/// Operator command handlers turn every variant into a reply; only
/// [`AliasError::Host`] ever propagates out of the engine entry point.
#[derive(Debug, thiserror::Error)]
pub enum AliasError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("alias not found: {0}")]
    UnknownAlias(String),

    #[error(transparent)]
    Group(#[from] GroupError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Host(#[from] HostError),
}
