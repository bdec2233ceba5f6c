use ulid::Ulid;

use crate::model::ReservationStatus;

/// Coarse classification used at the wire boundary. Callers branch on this
/// (or on the concrete variant), never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    Unexpected,
}

#[derive(Debug)]
pub enum EngineError {
    InvalidInput(&'static str),
    CustomerNotFound(Ulid),
    TableNotFound(Ulid),
    ReservationNotFound(Ulid),
    /// A reservation's table set referenced a table that does not exist or
    /// is not active. The whole batch is rejected.
    UnknownOrInactiveTable(Ulid),
    AlreadyExists(Ulid),
    DuplicateCode(String),
    InsufficientCapacity {
        total: u32,
        party_size: u32,
    },
    /// A table already has an overlapping claim from another reservation.
    TableOccupied {
        table_id: Ulid,
        reservation_id: Ulid,
    },
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },
    /// The reservation is CANCELLED or NO_SHOW and cannot be changed.
    TerminalReservation(Ulid),
    /// Greedy assignment exhausted all free tables below the party size.
    NoSuitableCombination {
        party_size: u32,
    },
    LimitExceeded(&'static str),
    WalError(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidInput(_)
            | EngineError::UnknownOrInactiveTable(_)
            | EngineError::LimitExceeded(_) => ErrorKind::InvalidInput,
            EngineError::CustomerNotFound(_)
            | EngineError::TableNotFound(_)
            | EngineError::ReservationNotFound(_) => ErrorKind::NotFound,
            EngineError::AlreadyExists(_)
            | EngineError::DuplicateCode(_)
            | EngineError::InsufficientCapacity { .. }
            | EngineError::TableOccupied { .. }
            | EngineError::InvalidTransition { .. }
            | EngineError::TerminalReservation(_)
            | EngineError::NoSuitableCombination { .. } => ErrorKind::Conflict,
            EngineError::WalError(_) => ErrorKind::Unexpected,
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::CustomerNotFound(id) => write!(f, "customer not found: {id}"),
            EngineError::TableNotFound(id) => write!(f, "table not found: {id}"),
            EngineError::ReservationNotFound(id) => write!(f, "reservation not found: {id}"),
            EngineError::UnknownOrInactiveTable(id) => {
                write!(f, "table does not exist or is not active: {id}")
            }
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::DuplicateCode(code) => write!(f, "table code already in use: {code}"),
            EngineError::InsufficientCapacity { total, party_size } => {
                write!(f, "insufficient capacity: {total} seats for party of {party_size}")
            }
            EngineError::TableOccupied {
                table_id,
                reservation_id,
            } => {
                write!(f, "table {table_id} is held by reservation {reservation_id} in that window")
            }
            EngineError::InvalidTransition { from, to } => {
                write!(f, "invalid transition: {from} -> {to}")
            }
            EngineError::TerminalReservation(id) => {
                write!(f, "reservation {id} is in a terminal status")
            }
            EngineError::NoSuitableCombination { party_size } => {
                write!(f, "no available table combination seats a party of {party_size}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
