//! Greedy table auto-assignment.
//!
//! Deterministic first-fit: candidates sort by capacity ascending, then by
//! the numeric suffix of the table code ascending (codes without one sort
//! last), then by the code itself. Walk the sorted list accumulating
//! capacity until the party fits. This can over-allocate (two 4-tops for a
//! party of 5 instead of one 5-top); that is the documented heuristic, not
//! a bug.

use ulid::Ulid;

/// Snapshot of one free, active table considered for assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Candidate {
    pub id: Ulid,
    pub code: String,
    pub capacity: u32,
}

/// Trailing digit run of a code, e.g. "T12" -> 12. Codes with no trailing
/// number (or one too large for i64) sort after all numbered codes.
fn code_number(code: &str) -> i64 {
    let digits: String = code
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().unwrap_or(i64::MAX)
}

/// Sort candidates by the documented comparator chain.
pub(super) fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        a.capacity
            .cmp(&b.capacity)
            .then_with(|| code_number(&a.code).cmp(&code_number(&b.code)))
            .then_with(|| a.code.cmp(&b.code))
    });
}

/// Pick the first prefix of the sorted candidates whose combined capacity
/// covers `party_size`. None when the whole list is not enough.
pub(super) fn pick_tables(candidates: &[Candidate], party_size: u32) -> Option<Vec<Ulid>> {
    let mut chosen = Vec::new();
    let mut total: u32 = 0;
    for c in candidates {
        chosen.push(c.id);
        total = total.saturating_add(c.capacity);
        if total >= party_size {
            return Some(chosen);
        }
    }
    None
}
