//! Hard limits enforced before any write. These protect the WAL and the
//! in-memory maps from unbounded input, not business rules.

/// Max length of a customer full name, in bytes.
pub const MAX_NAME_LEN: usize = 256;

/// Max length of a customer phone number, in bytes.
pub const MAX_PHONE_LEN: usize = 32;

/// Max length of a customer email, in bytes.
pub const MAX_EMAIL_LEN: usize = 256;

/// Max length of a table code, in bytes.
pub const MAX_CODE_LEN: usize = 32;

/// Max length of reservation notes, in bytes.
pub const MAX_NOTES_LEN: usize = 1024;

/// Max length of a cancellation reason, in bytes.
pub const MAX_REASON_LEN: usize = 512;

/// Largest party a single reservation may seat.
pub const MAX_PARTY_SIZE: u32 = 500;

/// Largest capacity a single table may declare.
pub const MAX_TABLE_CAPACITY: u32 = 500;

pub const MAX_TABLES_PER_VENUE: usize = 10_000;
pub const MAX_CUSTOMERS_PER_VENUE: usize = 1_000_000;
pub const MAX_RESERVATIONS_PER_VENUE: usize = 1_000_000;

/// Max tables a single reservation may claim.
pub const MAX_TABLES_PER_RESERVATION: usize = 50;

/// Max live claims on one table. A restaurant table with more open
/// reservations than this is garbage input, not a busy night.
pub const MAX_CLAIMS_PER_TABLE: usize = 100_000;

/// Timestamps must fall in [1970-01-01, ~2100-01-01).
pub const MIN_VALID_TIMESTAMP_MS: i64 = 0;
pub const MAX_VALID_TIMESTAMP_MS: i64 = 4_102_444_800_000;

/// A single reservation window may not exceed 7 days.
pub const MAX_WINDOW_DURATION_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Availability / listing queries may not scan more than ~1 year.
pub const MAX_QUERY_WINDOW_MS: i64 = 366 * 24 * 60 * 60 * 1000;

pub const MAX_VENUES: usize = 256;
pub const MAX_VENUE_NAME_LEN: usize = 256;
