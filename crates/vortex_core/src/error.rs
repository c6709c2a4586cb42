use crate::entity::EntityId;
use thiserror::Error;

/// Errors surfaced by the simulation core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no entity with id {0}")]
    NotFound(EntityId),

    #[error("entity {0} cannot be connected to itself")]
    SelfEdge(EntityId),

    #[error("entities {a} and {b} are already connected")]
    DuplicateEdge { a: EntityId, b: EntityId },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Errors raised while allocating or writing GPU buffers.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("failed to allocate buffer '{label}' of {size_bytes} bytes: {reason}")]
    Allocation {
        label: String,
        size_bytes: u64,
        reason: String,
    },

    #[error("write of {len} bytes at offset {offset} exceeds buffer '{label}' ({size_bytes} bytes)")]
    OutOfRange {
        label: String,
        offset: u64,
        len: u64,
        size_bytes: u64,
    },
}
