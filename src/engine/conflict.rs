use ulid::Ulid;

use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

pub(crate) fn validate_window(span: &Span) -> Result<(), EngineError> {
    use crate::limits::*;
    if span.start >= span.end {
        return Err(EngineError::InvalidInput("end must be after start"));
    }
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_ms() > MAX_WINDOW_DURATION_MS {
        return Err(EngineError::LimitExceeded("reservation window too wide"));
    }
    Ok(())
}

/// Check that a table has no live claim overlapping `window`.
/// A claim by `exclude` (the reservation being modified) never blocks.
pub(crate) fn check_table_free(
    ts: &TableState,
    window: &Span,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    for claim in ts.overlapping(window) {
        if exclude == Some(claim.reservation_id) {
            continue;
        }
        return Err(EngineError::TableOccupied {
            table_id: ts.id,
            reservation_id: claim.reservation_id,
        });
    }
    Ok(())
}

/// Sum the capacity of the given active tables. Duplicates must already be
/// removed by the caller; inactive tables contribute nothing.
pub(crate) fn sum_active_capacity<'a>(tables: impl Iterator<Item = &'a TableState>) -> u32 {
    tables.filter(|t| t.active).map(|t| t.capacity).sum()
}
