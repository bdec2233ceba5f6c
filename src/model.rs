use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Default reservation length when no end is given: 2 hours.
pub const DEFAULT_DURATION_MS: Ms = 2 * 60 * 60 * 1000;

/// Resolve a reservation's effective `[start, end)` window.
/// An absent end defaults to `start + 2h`. Every component that needs an
/// effective end goes through here, so the default cannot drift.
pub fn effective_window(start: Ms, end: Option<Ms>) -> Span {
    Span::new(start, end.unwrap_or(start + DEFAULT_DURATION_MS))
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Reservation status. `Cancelled` and `NoShow` are terminal: they release
/// table claims and accept no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "CONFIRMED" => Some(Self::Confirmed),
            "CANCELLED" => Some(Self::Cancelled),
            "NO_SHOW" => Some(Self::NoShow),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::NoShow => "NO_SHOW",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::NoShow)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: Ulid,
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub created_at: Ms,
}

/// A live table claim by a non-terminal reservation. Cancelling or
/// no-showing the reservation removes its claims, so any claim found here
/// blocks the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    pub reservation_id: Ulid,
    pub window: Span,
}

#[derive(Debug, Clone)]
pub struct TableState {
    pub id: Ulid,
    pub code: String,
    pub capacity: u32,
    pub active: bool,
    /// Claims sorted by `window.start`.
    pub claims: Vec<Claim>,
}

impl TableState {
    pub fn new(id: Ulid, code: String, capacity: u32, active: bool) -> Self {
        Self {
            id,
            code,
            capacity,
            active,
            claims: Vec::new(),
        }
    }

    /// Insert a claim maintaining sort order by window.start.
    pub fn insert_claim(&mut self, claim: Claim) {
        let pos = self
            .claims
            .binary_search_by_key(&claim.window.start, |c| c.window.start)
            .unwrap_or_else(|e| e);
        self.claims.insert(pos, claim);
    }

    /// Remove the claim held by a reservation.
    pub fn remove_claim(&mut self, reservation_id: Ulid) -> Option<Claim> {
        if let Some(pos) = self
            .claims
            .iter()
            .position(|c| c.reservation_id == reservation_id)
        {
            Some(self.claims.remove(pos))
        } else {
            None
        }
    }

    /// Return only claims whose window overlaps the query window.
    /// Uses binary search to skip claims starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Claim> {
        let right_bound = self.claims.partition_point(|c| c.window.start < query.end);
        self.claims[..right_bound]
            .iter()
            .filter(move |c| c.window.end > query.start)
    }
}

#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: Ulid,
    pub customer_id: Ulid,
    pub start_at: Ms,
    /// Absent means open-ended; resolved via `effective_window`.
    pub end_at: Option<Ms>,
    pub party_size: u32,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<Ms>,
    pub created_at: Ms,
    /// Assigned tables, sorted and deduplicated. Replaced only as a unit.
    pub table_ids: Vec<Ulid>,
}

impl Reservation {
    pub fn window(&self) -> Span {
        effective_window(self.start_at, self.end_at)
    }
}

/// The event types — flat, no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    CustomerAdded {
        id: Ulid,
        full_name: String,
        phone: String,
        email: Option<String>,
        created_at: Ms,
    },
    TableAdded {
        id: Ulid,
        code: String,
        capacity: u32,
        active: bool,
    },
    TableActiveSet {
        id: Ulid,
        active: bool,
    },
    ReservationCreated {
        id: Ulid,
        customer_id: Ulid,
        start_at: Ms,
        end_at: Option<Ms>,
        party_size: u32,
        status: ReservationStatus,
        notes: Option<String>,
        table_ids: Vec<Ulid>,
        created_at: Ms,
    },
    ReservationConfirmed {
        id: Ulid,
    },
    ReservationCancelled {
        id: Ulid,
        reason: Option<String>,
        cancelled_at: Ms,
    },
    ReservationNoShow {
        id: Ulid,
    },
    TablesReassigned {
        id: Ulid,
        table_ids: Vec<Ulid>,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub id: Ulid,
    pub code: String,
    pub capacity: u32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationInfo {
    pub id: Ulid,
    pub customer_id: Ulid,
    pub customer_name: String,
    pub start_at: Ms,
    pub end_at: Option<Ms>,
    pub party_size: u32,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<Ms>,
    pub created_at: Ms,
    /// Codes of assigned tables, sorted.
    pub table_codes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_overlap() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        let c = Span::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
    }

    #[test]
    fn effective_window_defaults_two_hours() {
        let w = effective_window(1_000_000, None);
        assert_eq!(w.start, 1_000_000);
        assert_eq!(w.end, 1_000_000 + DEFAULT_DURATION_MS);

        let explicit = effective_window(1_000_000, Some(2_000_000));
        assert_eq!(explicit.end, 2_000_000);
    }

    #[test]
    fn status_parse_roundtrip() {
        for s in ["PENDING", "CONFIRMED", "CANCELLED", "NO_SHOW"] {
            let parsed = ReservationStatus::parse(s).unwrap();
            assert_eq!(parsed.as_str(), s);
        }
        // Case-insensitive in, canonical out
        assert_eq!(
            ReservationStatus::parse("pending"),
            Some(ReservationStatus::Pending)
        );
        assert_eq!(ReservationStatus::parse("SEATED"), None);
    }

    #[test]
    fn status_terminal() {
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(!ReservationStatus::Confirmed.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(ReservationStatus::NoShow.is_terminal());
    }

    #[test]
    fn claim_ordering() {
        let mut ts = TableState::new(Ulid::new(), "T1".into(), 4, true);
        ts.insert_claim(Claim {
            reservation_id: Ulid::new(),
            window: Span::new(300, 400),
        });
        ts.insert_claim(Claim {
            reservation_id: Ulid::new(),
            window: Span::new(100, 200),
        });
        ts.insert_claim(Claim {
            reservation_id: Ulid::new(),
            window: Span::new(200, 300),
        });
        assert_eq!(ts.claims[0].window.start, 100);
        assert_eq!(ts.claims[1].window.start, 200);
        assert_eq!(ts.claims[2].window.start, 300);
    }

    #[test]
    fn claim_remove() {
        let mut ts = TableState::new(Ulid::new(), "T1".into(), 4, true);
        let rid = Ulid::new();
        ts.insert_claim(Claim {
            reservation_id: rid,
            window: Span::new(100, 200),
        });
        assert_eq!(ts.claims.len(), 1);
        assert!(ts.remove_claim(rid).is_some());
        assert!(ts.claims.is_empty());
        assert!(ts.remove_claim(rid).is_none());
    }

    #[test]
    fn overlapping_skips_past_and_future() {
        let mut ts = TableState::new(Ulid::new(), "T1".into(), 4, true);
        ts.insert_claim(Claim {
            reservation_id: Ulid::new(),
            window: Span::new(100, 200),
        });
        let hit = Ulid::new();
        ts.insert_claim(Claim {
            reservation_id: hit,
            window: Span::new(450, 600),
        });
        ts.insert_claim(Claim {
            reservation_id: Ulid::new(),
            window: Span::new(1000, 1100),
        });

        let query = Span::new(500, 800);
        let hits: Vec<_> = ts.overlapping(&query).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].reservation_id, hit);
    }

    #[test]
    fn overlapping_adjacent_not_included() {
        // Claim ending exactly at query.start is NOT overlapping (half-open)
        let mut ts = TableState::new(Ulid::new(), "T1".into(), 4, true);
        ts.insert_claim(Claim {
            reservation_id: Ulid::new(),
            window: Span::new(100, 200),
        });
        let hits: Vec<_> = ts.overlapping(&Span::new(200, 300)).collect();
        assert!(hits.is_empty());
    }

    #[test]
    fn overlapping_empty_table() {
        let ts = TableState::new(Ulid::new(), "T1".into(), 4, true);
        let hits: Vec<_> = ts.overlapping(&Span::new(0, 1000)).collect();
        assert!(hits.is_empty());
    }

    #[test]
    fn overlapping_large_claim_spanning_query() {
        let mut ts = TableState::new(Ulid::new(), "T1".into(), 4, true);
        ts.insert_claim(Claim {
            reservation_id: Ulid::new(),
            window: Span::new(0, 10_000),
        });
        let hits: Vec<_> = ts.overlapping(&Span::new(500, 600)).collect();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn reservation_window_uses_default() {
        let r = Reservation {
            id: Ulid::new(),
            customer_id: Ulid::new(),
            start_at: 5_000_000,
            end_at: None,
            party_size: 2,
            status: ReservationStatus::Pending,
            notes: None,
            cancellation_reason: None,
            cancelled_at: None,
            created_at: 0,
            table_ids: vec![],
        };
        assert_eq!(r.window(), Span::new(5_000_000, 5_000_000 + DEFAULT_DURATION_MS));
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::ReservationCreated {
            id: Ulid::new(),
            customer_id: Ulid::new(),
            start_at: 1000,
            end_at: None,
            party_size: 4,
            status: ReservationStatus::Pending,
            notes: Some("window seat".into()),
            table_ids: vec![Ulid::new(), Ulid::new()],
            created_at: 500,
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
