use ulid::Ulid;

use crate::limits::MAX_QUERY_WINDOW_MS;
use crate::model::*;

use super::conflict::check_table_free;
use super::{Engine, EngineError};

impl Engine {
    /// All customers, ordered by name then id for a stable listing.
    pub fn list_customers(&self) -> Vec<Customer> {
        let mut out: Vec<Customer> = self.customers.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));
        out
    }

    /// All tables, active or not, ordered by code.
    pub async fn list_tables(&self) -> Vec<TableInfo> {
        let tables: Vec<_> = self.tables.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::with_capacity(tables.len());
        for ts in tables {
            let guard = ts.read().await;
            out.push(TableInfo {
                id: guard.id,
                code: guard.code.clone(),
                capacity: guard.capacity,
                active: guard.active,
            });
        }
        out.sort_by(|a, b| a.code.cmp(&b.code));
        out
    }

    /// Active tables with no claim overlapping `window`, ordered by code.
    pub async fn list_available_tables(&self, window: &Span) -> Result<Vec<TableInfo>, EngineError> {
        if window.start >= window.end {
            return Err(EngineError::InvalidInput("end must be after start"));
        }
        if window.duration_ms() > MAX_QUERY_WINDOW_MS {
            return Err(EngineError::LimitExceeded("query window too wide"));
        }
        let tables: Vec<_> = self.tables.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::new();
        for ts in tables {
            let guard = ts.read().await;
            if guard.active && check_table_free(&guard, window, None).is_ok() {
                out.push(TableInfo {
                    id: guard.id,
                    code: guard.code.clone(),
                    capacity: guard.capacity,
                    active: guard.active,
                });
            }
        }
        out.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(out)
    }

    /// True when every listed table is free for `window`. An empty list is
    /// trivially available; ids that match no table carry no claims and so
    /// never block. `exclude` discounts that reservation's own claims.
    pub async fn is_available_for_tables(
        &self,
        table_ids: &[Ulid],
        window: &Span,
        exclude: Option<Ulid>,
    ) -> Result<bool, EngineError> {
        if window.start >= window.end {
            return Err(EngineError::InvalidInput("end must be after start"));
        }
        for tid in table_ids {
            if let Some(ts) = self.get_table(tid) {
                let guard = ts.read().await;
                if check_table_free(&guard, window, exclude).is_err() {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Reservations joined with the customer name and assigned table codes,
    /// optionally filtered to a window overlap and/or a status, ordered by
    /// start time.
    pub async fn list_reservations(
        &self,
        window: Option<&Span>,
        status: Option<ReservationStatus>,
    ) -> Vec<ReservationInfo> {
        let reservations: Vec<_> = self.reservations.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::new();
        for rs in reservations {
            let guard = rs.read().await;
            if let Some(w) = window
                && !guard.window().overlaps(w) {
                    continue;
                }
            if let Some(s) = status
                && guard.status != s {
                    continue;
                }
            let customer_name = self
                .customers
                .get(&guard.customer_id)
                .map(|c| c.full_name.clone())
                .unwrap_or_default();
            let mut table_codes = Vec::with_capacity(guard.table_ids.len());
            for tid in &guard.table_ids {
                if let Some(ts) = self.get_table(tid) {
                    table_codes.push(ts.read().await.code.clone());
                }
            }
            table_codes.sort();
            out.push(ReservationInfo {
                id: guard.id,
                customer_id: guard.customer_id,
                customer_name,
                start_at: guard.start_at,
                end_at: guard.end_at,
                party_size: guard.party_size,
                status: guard.status,
                notes: guard.notes.clone(),
                cancellation_reason: guard.cancellation_reason.clone(),
                cancelled_at: guard.cancelled_at,
                created_at: guard.created_at,
                table_codes,
            });
        }
        out.sort_by(|a, b| a.start_at.cmp(&b.start_at).then(a.id.cmp(&b.id)));
        out
    }

    /// The (table id, table code) pairs assigned to one reservation,
    /// ordered by code.
    pub async fn reservation_tables(
        &self,
        reservation_id: Ulid,
    ) -> Result<Vec<(Ulid, String)>, EngineError> {
        let rs = self
            .get_reservation(&reservation_id)
            .ok_or(EngineError::ReservationNotFound(reservation_id))?;
        let table_ids = rs.read().await.table_ids.clone();
        let mut out = Vec::with_capacity(table_ids.len());
        for tid in &table_ids {
            if let Some(ts) = self.get_table(tid) {
                out.push((*tid, ts.read().await.code.clone()));
            }
        }
        out.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(out)
    }
}
