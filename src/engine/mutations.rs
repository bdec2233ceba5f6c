use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{oneshot, RwLock};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::assign::{pick_tables, sort_candidates, Candidate};
use super::conflict::{check_table_free, now_ms, sum_active_capacity, validate_window};
use super::lifecycle::{plan_transition, Applied};
use super::{Engine, EngineError, WalCommand};

impl Engine {
    pub async fn add_customer(
        &self,
        id: Ulid,
        full_name: String,
        phone: String,
        email: Option<String>,
    ) -> Result<(), EngineError> {
        if full_name.trim().is_empty() {
            return Err(EngineError::InvalidInput("customer name must not be blank"));
        }
        if full_name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("customer name too long"));
        }
        if phone.trim().is_empty() {
            return Err(EngineError::InvalidInput("phone must not be blank"));
        }
        if phone.len() > MAX_PHONE_LEN {
            return Err(EngineError::LimitExceeded("phone too long"));
        }
        if let Some(ref e) = email
            && e.len() > MAX_EMAIL_LEN {
                return Err(EngineError::LimitExceeded("email too long"));
            }
        if self.customers.len() >= MAX_CUSTOMERS_PER_VENUE {
            return Err(EngineError::LimitExceeded("too many customers"));
        }
        if self.customers.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let created_at = now_ms();
        let event = Event::CustomerAdded {
            id,
            full_name: full_name.clone(),
            phone: phone.clone(),
            email: email.clone(),
            created_at,
        };
        self.wal_append(&event).await?;
        self.customers.insert(
            id,
            Customer {
                id,
                full_name,
                phone,
                email,
                created_at,
            },
        );
        Ok(())
    }

    pub async fn add_table(
        &self,
        id: Ulid,
        code: String,
        capacity: u32,
        active: bool,
    ) -> Result<(), EngineError> {
        if code.trim().is_empty() {
            return Err(EngineError::InvalidInput("table code must not be blank"));
        }
        if code.len() > MAX_CODE_LEN {
            return Err(EngineError::LimitExceeded("table code too long"));
        }
        if capacity == 0 {
            return Err(EngineError::InvalidInput("capacity must be positive"));
        }
        if capacity > MAX_TABLE_CAPACITY {
            return Err(EngineError::LimitExceeded("capacity too large"));
        }
        if self.tables.len() >= MAX_TABLES_PER_VENUE {
            return Err(EngineError::LimitExceeded("too many tables"));
        }
        if self.tables.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        if self.codes.contains_key(&code) {
            return Err(EngineError::DuplicateCode(code));
        }

        let event = Event::TableAdded {
            id,
            code: code.clone(),
            capacity,
            active,
        };
        self.wal_append(&event).await?;
        let ts = TableState::new(id, code.clone(), capacity, active);
        self.tables.insert(id, Arc::new(RwLock::new(ts)));
        self.codes.insert(code, id);
        self.notify.send(id, &event);
        Ok(())
    }

    /// Flip a table's active flag. Existing reservations keep their claims;
    /// deactivation only stops the table from being selectable.
    /// Returns false when the flag already had the requested value.
    pub async fn set_table_active(&self, id: Ulid, active: bool) -> Result<bool, EngineError> {
        let ts = self.get_table(&id).ok_or(EngineError::TableNotFound(id))?;
        let mut guard = ts.write().await;
        if guard.active == active {
            return Ok(false);
        }
        let event = Event::TableActiveSet { id, active };
        self.wal_append(&event).await?;
        guard.active = active;
        self.notify.send(id, &event);
        Ok(true)
    }

    /// Create a reservation together with its table assignments, all or
    /// nothing. Validation order is fixed: window, party size, table set
    /// non-empty, status, customer, table existence/activity, capacity,
    /// overlap, insert. The write locks on every assigned table are held
    /// from validation through the claim inserts, so two concurrent
    /// creators for the same table serialize here.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_with_tables(
        &self,
        id: Ulid,
        customer_id: Ulid,
        start_at: Ms,
        end_at: Option<Ms>,
        party_size: u32,
        status: Option<ReservationStatus>,
        notes: Option<String>,
        table_ids: &[Ulid],
    ) -> Result<(), EngineError> {
        if let Some(end) = end_at
            && end <= start_at {
                return Err(EngineError::InvalidInput("end must be after start"));
            }
        let window = effective_window(start_at, end_at);
        validate_window(&window)?;
        if party_size == 0 {
            return Err(EngineError::InvalidInput("party size must be positive"));
        }
        if party_size > MAX_PARTY_SIZE {
            return Err(EngineError::LimitExceeded("party size too large"));
        }
        if table_ids.is_empty() {
            return Err(EngineError::InvalidInput("no tables selected"));
        }
        if table_ids.len() > MAX_TABLES_PER_RESERVATION {
            return Err(EngineError::LimitExceeded("too many tables for one reservation"));
        }
        let status = status.unwrap_or(ReservationStatus::Pending);
        if let Some(ref n) = notes
            && n.len() > MAX_NOTES_LEN {
                return Err(EngineError::LimitExceeded("notes too long"));
            }
        if !self.customers.contains_key(&customer_id) {
            return Err(EngineError::CustomerNotFound(customer_id));
        }
        if self.reservations.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        if self.reservations.len() >= MAX_RESERVATIONS_PER_VENUE {
            return Err(EngineError::LimitExceeded("too many reservations"));
        }

        // The assignment set: sorted and deduplicated. Write locks are
        // acquired in this order to prevent deadlocks.
        let mut ids: Vec<Ulid> = table_ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for tid in &ids {
            let ts = self
                .get_table(tid)
                .ok_or(EngineError::UnknownOrInactiveTable(*tid))?;
            let guard = ts.write_owned().await;
            if !guard.active {
                return Err(EngineError::UnknownOrInactiveTable(*tid));
            }
            if guard.claims.len() >= MAX_CLAIMS_PER_TABLE {
                return Err(EngineError::LimitExceeded("too many claims on table"));
            }
            guards.push(guard);
        }

        let total = sum_active_capacity(guards.iter().map(|g| &**g));
        if total < party_size {
            return Err(EngineError::InsufficientCapacity { total, party_size });
        }

        // A reservation born terminal claims no tables, so it cannot conflict.
        if !status.is_terminal() {
            for guard in &guards {
                check_table_free(guard, &window, None)?;
            }
        }

        let created_at = now_ms();
        let event = Event::ReservationCreated {
            id,
            customer_id,
            start_at,
            end_at,
            party_size,
            status,
            notes: notes.clone(),
            table_ids: ids.clone(),
            created_at,
        };
        self.wal_append(&event).await?;

        let reservation = Reservation {
            id,
            customer_id,
            start_at,
            end_at,
            party_size,
            status,
            notes,
            cancellation_reason: None,
            cancelled_at: None,
            created_at,
            table_ids: ids.clone(),
        };
        self.reservations.insert(id, Arc::new(RwLock::new(reservation)));
        if !status.is_terminal() {
            for guard in &mut guards {
                guard.insert_claim(Claim {
                    reservation_id: id,
                    window,
                });
            }
        }
        self.notify_tables(&ids, &event);
        Ok(())
    }

    /// Greedy auto-assignment: pick the cheapest deterministic combination
    /// of free tables covering the party, then create through
    /// `create_with_tables`, which re-validates under the table locks.
    /// Returns the chosen table ids.
    pub async fn create_auto_assign(
        &self,
        id: Ulid,
        customer_id: Ulid,
        start_at: Ms,
        end_at: Option<Ms>,
        party_size: u32,
        status: Option<ReservationStatus>,
        notes: Option<String>,
    ) -> Result<Vec<Ulid>, EngineError> {
        if let Some(end) = end_at
            && end <= start_at {
                return Err(EngineError::InvalidInput("end must be after start"));
            }
        let window = effective_window(start_at, end_at);
        validate_window(&window)?;
        if party_size == 0 {
            return Err(EngineError::InvalidInput("party size must be positive"));
        }
        if !self.customers.contains_key(&customer_id) {
            return Err(EngineError::CustomerNotFound(customer_id));
        }

        // Snapshot the shards first; never hold a DashMap ref across await.
        let tables: Vec<_> = self.tables.iter().map(|e| e.value().clone()).collect();
        let mut candidates = Vec::new();
        for ts in tables {
            let guard = ts.read().await;
            if guard.active && check_table_free(&guard, &window, None).is_ok() {
                candidates.push(Candidate {
                    id: guard.id,
                    code: guard.code.clone(),
                    capacity: guard.capacity,
                });
            }
        }
        sort_candidates(&mut candidates);
        let chosen = pick_tables(&candidates, party_size)
            .ok_or(EngineError::NoSuitableCombination { party_size })?;

        self.create_with_tables(id, customer_id, start_at, end_at, party_size, status, notes, &chosen)
            .await?;
        Ok(chosen)
    }

    /// PENDING → CONFIRMED. Returns false when already confirmed.
    pub async fn confirm_reservation(&self, id: Ulid) -> Result<bool, EngineError> {
        let rs = self
            .get_reservation(&id)
            .ok_or(EngineError::ReservationNotFound(id))?;
        let mut guard = rs.write_owned().await;
        match plan_transition(guard.status, ReservationStatus::Confirmed)? {
            Applied::AlreadyInTarget => Ok(false),
            Applied::Changed => {
                let event = Event::ReservationConfirmed { id };
                self.wal_append(&event).await?;
                guard.status = ReservationStatus::Confirmed;
                self.notify_tables(&guard.table_ids, &event);
                Ok(true)
            }
        }
    }

    /// Cancel a reservation, releasing its table claims. The reason and
    /// timestamp are written once; re-cancelling returns false and leaves
    /// the original audit fields untouched.
    pub async fn cancel_reservation(
        &self,
        id: Ulid,
        reason: Option<String>,
    ) -> Result<bool, EngineError> {
        if let Some(ref r) = reason
            && r.len() > MAX_REASON_LEN {
                return Err(EngineError::LimitExceeded("cancellation reason too long"));
            }
        let rs = self
            .get_reservation(&id)
            .ok_or(EngineError::ReservationNotFound(id))?;
        let mut guard = rs.write_owned().await;
        match plan_transition(guard.status, ReservationStatus::Cancelled)? {
            Applied::AlreadyInTarget => Ok(false),
            Applied::Changed => {
                // Lock order: reservation first, then its tables in sorted order.
                let mut table_guards = Vec::with_capacity(guard.table_ids.len());
                for tid in &guard.table_ids {
                    if let Some(ts) = self.get_table(tid) {
                        table_guards.push(ts.write_owned().await);
                    }
                }

                let cancelled_at = now_ms();
                let event = Event::ReservationCancelled {
                    id,
                    reason: reason.clone(),
                    cancelled_at,
                };
                self.wal_append(&event).await?;
                guard.status = ReservationStatus::Cancelled;
                guard.cancellation_reason = reason;
                guard.cancelled_at = Some(cancelled_at);
                for tg in &mut table_guards {
                    tg.remove_claim(id);
                }
                self.notify_tables(&guard.table_ids, &event);
                Ok(true)
            }
        }
    }

    /// PENDING/CONFIRMED → NO_SHOW, releasing table claims. Unlike cancel,
    /// a repeated no-show is rejected rather than a no-op.
    pub async fn mark_no_show(&self, id: Ulid) -> Result<bool, EngineError> {
        let rs = self
            .get_reservation(&id)
            .ok_or(EngineError::ReservationNotFound(id))?;
        let mut guard = rs.write_owned().await;
        // The transition table has no NO_SHOW self-loop, so a repeat errors
        // above and only Changed reaches this point.
        plan_transition(guard.status, ReservationStatus::NoShow)?;

        let mut table_guards = Vec::with_capacity(guard.table_ids.len());
        for tid in &guard.table_ids {
            if let Some(ts) = self.get_table(tid) {
                table_guards.push(ts.write_owned().await);
            }
        }

        let event = Event::ReservationNoShow { id };
        self.wal_append(&event).await?;
        guard.status = ReservationStatus::NoShow;
        for tg in &mut table_guards {
            tg.remove_claim(id);
        }
        self.notify_tables(&guard.table_ids, &event);
        Ok(true)
    }

    /// Replace a reservation's whole assignment set. The new set must exist,
    /// be active, cover the party size, and be free for the reservation's
    /// window (the reservation's own claims do not block it). Old and new
    /// claims swap atomically under the union of the table locks.
    pub async fn reassign_tables(
        &self,
        id: Ulid,
        table_ids: &[Ulid],
    ) -> Result<(), EngineError> {
        if table_ids.is_empty() {
            return Err(EngineError::InvalidInput("no tables selected"));
        }
        if table_ids.len() > MAX_TABLES_PER_RESERVATION {
            return Err(EngineError::LimitExceeded("too many tables for one reservation"));
        }
        let rs = self
            .get_reservation(&id)
            .ok_or(EngineError::ReservationNotFound(id))?;
        let mut guard = rs.write_owned().await;
        if guard.status.is_terminal() {
            return Err(EngineError::TerminalReservation(id));
        }

        let mut new_ids: Vec<Ulid> = table_ids.to_vec();
        new_ids.sort();
        new_ids.dedup();

        // Lock the union of old and new tables, sorted, so the swap is one
        // atomic step with respect to concurrent creators.
        let mut all_ids = new_ids.clone();
        all_ids.extend(guard.table_ids.iter().copied());
        all_ids.sort();
        all_ids.dedup();

        let mut guards = HashMap::with_capacity(all_ids.len());
        for tid in &all_ids {
            match self.get_table(tid) {
                Some(ts) => {
                    guards.insert(*tid, ts.write_owned().await);
                }
                None if new_ids.contains(tid) => {
                    return Err(EngineError::UnknownOrInactiveTable(*tid));
                }
                None => {} // stale old assignment, nothing to unclaim
            }
        }

        let window = guard.window();
        let mut total: u32 = 0;
        for tid in &new_ids {
            let tg = guards
                .get(tid)
                .ok_or(EngineError::UnknownOrInactiveTable(*tid))?;
            if !tg.active {
                return Err(EngineError::UnknownOrInactiveTable(*tid));
            }
            if tg.claims.len() >= MAX_CLAIMS_PER_TABLE {
                return Err(EngineError::LimitExceeded("too many claims on table"));
            }
            total = total.saturating_add(tg.capacity);
        }
        if total < guard.party_size {
            return Err(EngineError::InsufficientCapacity {
                total,
                party_size: guard.party_size,
            });
        }
        for tid in &new_ids {
            if let Some(tg) = guards.get(tid) {
                check_table_free(tg, &window, Some(id))?;
            }
        }

        let event = Event::TablesReassigned {
            id,
            table_ids: new_ids.clone(),
        };
        self.wal_append(&event).await?;

        for tg in guards.values_mut() {
            tg.remove_claim(id);
        }
        for tid in &new_ids {
            if let Some(tg) = guards.get_mut(tid) {
                tg.insert_claim(Claim {
                    reservation_id: id,
                    window,
                });
            }
        }
        guard.table_ids = new_ids;
        self.notify_tables(&all_ids, &event);
        Ok(())
    }

    /// Compact the WAL by rewriting it with only the events needed to recreate the current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();

        // Referenced entities first: customers and tables before reservations.
        for entry in self.customers.iter() {
            let c = entry.value();
            events.push(Event::CustomerAdded {
                id: c.id,
                full_name: c.full_name.clone(),
                phone: c.phone.clone(),
                email: c.email.clone(),
                created_at: c.created_at,
            });
        }
        for entry in self.tables.iter() {
            let ts = entry.value().clone();
            let guard = ts.try_read().expect("compact: uncontended read");
            events.push(Event::TableAdded {
                id: guard.id,
                code: guard.code.clone(),
                capacity: guard.capacity,
                active: guard.active,
            });
        }
        for entry in self.reservations.iter() {
            let rs = entry.value().clone();
            let guard = rs.try_read().expect("compact: uncontended read");
            // Terminal reservations replay as a create plus the terminal
            // event, so claims are added and removed the same way they were
            // originally.
            let created_status = if guard.status.is_terminal() {
                ReservationStatus::Pending
            } else {
                guard.status
            };
            events.push(Event::ReservationCreated {
                id: guard.id,
                customer_id: guard.customer_id,
                start_at: guard.start_at,
                end_at: guard.end_at,
                party_size: guard.party_size,
                status: created_status,
                notes: guard.notes.clone(),
                table_ids: guard.table_ids.clone(),
                created_at: guard.created_at,
            });
            match guard.status {
                ReservationStatus::Cancelled => events.push(Event::ReservationCancelled {
                    id: guard.id,
                    reason: guard.cancellation_reason.clone(),
                    cancelled_at: guard.cancelled_at.unwrap_or(guard.created_at),
                }),
                ReservationStatus::NoShow => {
                    events.push(Event::ReservationNoShow { id: guard.id })
                }
                _ => {}
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
