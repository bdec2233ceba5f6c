mod assign;
mod conflict;
mod error;
mod lifecycle;
mod mutations;
mod queries;

pub use error::{EngineError, ErrorKind};
pub use lifecycle::{plan_transition, Applied};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, RwLock};
use ulid::Ulid;

use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

pub type SharedTable = Arc<RwLock<TableState>>;
pub type SharedReservation = Arc<RwLock<Reservation>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                                .record(batch.len() as f64);
                            let flush_start = std::time::Instant::now();
                            let result = flush_batch(&mut wal, &mut batch);
                            metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                                .record(flush_start.elapsed().as_secs_f64());
                            respond_batch(&mut batch, &result);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                        .record(batch.len() as f64);
                    let flush_start = std::time::Instant::now();
                    let result = flush_batch(&mut wal, &mut batch);
                    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                        .record(flush_start.elapsed().as_secs_f64());
                    respond_batch(&mut batch, &result);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_batch(
    wal: &mut Wal,
    batch: &mut [(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn respond_batch(batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch.drain(..) {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// One venue's reservation engine: customers, tables with live claims, and
/// reservations, all recoverable from the WAL.
pub struct Engine {
    pub tables: DashMap<Ulid, SharedTable>,
    pub customers: DashMap<Ulid, Customer>,
    pub reservations: DashMap<Ulid, SharedReservation>,
    /// Unique index: table code → table id.
    pub(super) codes: DashMap<String, Ulid>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
}

impl Engine {
    pub fn new(wal_path: PathBuf, notify: Arc<NotifyHub>) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            tables: DashMap::new(),
            customers: DashMap::new(),
            reservations: DashMap::new(),
            codes: DashMap::new(),
            wal_tx,
            notify,
        };

        // Replay events — we're the sole owner of these Arcs, so try_read/try_write
        // always succeed instantly (no contention). Never use blocking_read/blocking_write
        // here because this may run inside an async context (e.g. lazy tenant creation).
        for event in &events {
            engine.replay_apply(event);
        }

        Ok(engine)
    }

    /// Apply one replayed event to in-memory state. Events come from our own
    /// WAL, so malformed references are skipped rather than surfaced.
    fn replay_apply(&self, event: &Event) {
        match event {
            Event::CustomerAdded {
                id,
                full_name,
                phone,
                email,
                created_at,
            } => {
                self.customers.insert(
                    *id,
                    Customer {
                        id: *id,
                        full_name: full_name.clone(),
                        phone: phone.clone(),
                        email: email.clone(),
                        created_at: *created_at,
                    },
                );
            }
            Event::TableAdded {
                id,
                code,
                capacity,
                active,
            } => {
                let ts = TableState::new(*id, code.clone(), *capacity, *active);
                self.tables.insert(*id, Arc::new(RwLock::new(ts)));
                self.codes.insert(code.clone(), *id);
            }
            Event::TableActiveSet { id, active } => {
                if let Some(entry) = self.tables.get(id) {
                    let mut guard = entry.try_write().expect("replay: uncontended write");
                    guard.active = *active;
                }
            }
            Event::ReservationCreated {
                id,
                customer_id,
                start_at,
                end_at,
                party_size,
                status,
                notes,
                table_ids,
                created_at,
            } => {
                let reservation = Reservation {
                    id: *id,
                    customer_id: *customer_id,
                    start_at: *start_at,
                    end_at: *end_at,
                    party_size: *party_size,
                    status: *status,
                    notes: notes.clone(),
                    cancellation_reason: None,
                    cancelled_at: None,
                    created_at: *created_at,
                    table_ids: table_ids.clone(),
                };
                let window = reservation.window();
                if !status.is_terminal() {
                    for tid in table_ids {
                        if let Some(entry) = self.tables.get(tid) {
                            let mut guard =
                                entry.try_write().expect("replay: uncontended write");
                            guard.insert_claim(Claim {
                                reservation_id: *id,
                                window,
                            });
                        }
                    }
                }
                self.reservations.insert(*id, Arc::new(RwLock::new(reservation)));
            }
            Event::ReservationConfirmed { id } => {
                if let Some(entry) = self.reservations.get(id) {
                    let mut guard = entry.try_write().expect("replay: uncontended write");
                    guard.status = ReservationStatus::Confirmed;
                }
            }
            Event::ReservationCancelled {
                id,
                reason,
                cancelled_at,
            } => {
                if let Some(entry) = self.reservations.get(id) {
                    let mut guard = entry.try_write().expect("replay: uncontended write");
                    guard.status = ReservationStatus::Cancelled;
                    guard.cancellation_reason = reason.clone();
                    guard.cancelled_at = Some(*cancelled_at);
                    let table_ids = guard.table_ids.clone();
                    drop(guard);
                    self.release_claims_replay(*id, &table_ids);
                }
            }
            Event::ReservationNoShow { id } => {
                if let Some(entry) = self.reservations.get(id) {
                    let mut guard = entry.try_write().expect("replay: uncontended write");
                    guard.status = ReservationStatus::NoShow;
                    let table_ids = guard.table_ids.clone();
                    drop(guard);
                    self.release_claims_replay(*id, &table_ids);
                }
            }
            Event::TablesReassigned { id, table_ids } => {
                if let Some(entry) = self.reservations.get(id) {
                    let mut guard = entry.try_write().expect("replay: uncontended write");
                    let old = std::mem::replace(&mut guard.table_ids, table_ids.clone());
                    let window = guard.window();
                    let terminal = guard.status.is_terminal();
                    drop(guard);
                    self.release_claims_replay(*id, &old);
                    if !terminal {
                        for tid in table_ids {
                            if let Some(t) = self.tables.get(tid) {
                                let mut g = t.try_write().expect("replay: uncontended write");
                                g.insert_claim(Claim {
                                    reservation_id: *id,
                                    window,
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    fn release_claims_replay(&self, reservation_id: Ulid, table_ids: &[Ulid]) {
        for tid in table_ids {
            if let Some(entry) = self.tables.get(tid) {
                let mut guard = entry.try_write().expect("replay: uncontended write");
                guard.remove_claim(reservation_id);
            }
        }
    }

    /// Write event to WAL via the background group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub fn get_table(&self, id: &Ulid) -> Option<SharedTable> {
        self.tables.get(id).map(|e| e.value().clone())
    }

    pub fn get_reservation(&self, id: &Ulid) -> Option<SharedReservation> {
        self.reservations.get(id).map(|e| e.value().clone())
    }

    /// Fan an event out to every table it touches.
    pub(super) fn notify_tables(&self, table_ids: &[Ulid], event: &Event) {
        for tid in table_ids {
            self.notify.send(*tid, event);
        }
    }
}
