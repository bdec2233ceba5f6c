//! The status state machine, as a pure transition table.
//!
//! Idempotent re-entry into CONFIRMED or CANCELLED is success with no
//! change, not an error. Terminal statuses accept nothing else.

use crate::model::ReservationStatus;

use super::EngineError;

/// Outcome of a legal transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The transition is applied now; the caller reports changed=true.
    Changed,
    /// The reservation already holds the target status; changed=false.
    AlreadyInTarget,
}

/// Decide whether `from -> to` is legal. No side effects; the caller emits
/// the event and mutates state only on `Changed`.
pub fn plan_transition(
    from: ReservationStatus,
    to: ReservationStatus,
) -> Result<Applied, EngineError> {
    use ReservationStatus::*;
    match (from, to) {
        (Pending, Confirmed) => Ok(Applied::Changed),
        (Confirmed, Confirmed) => Ok(Applied::AlreadyInTarget),
        (Pending | Confirmed, Cancelled) => Ok(Applied::Changed),
        (Cancelled, Cancelled) => Ok(Applied::AlreadyInTarget),
        (Pending | Confirmed, NoShow) => Ok(Applied::Changed),
        // NO_SHOW -> NO_SHOW is rejected, unlike the other self-loops.
        (from, to) => Err(EngineError::InvalidTransition { from, to }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationStatus::*;

    #[test]
    fn pending_paths() {
        assert_eq!(plan_transition(Pending, Confirmed).unwrap(), Applied::Changed);
        assert_eq!(plan_transition(Pending, Cancelled).unwrap(), Applied::Changed);
        assert_eq!(plan_transition(Pending, NoShow).unwrap(), Applied::Changed);
    }

    #[test]
    fn confirmed_paths() {
        assert_eq!(
            plan_transition(Confirmed, Confirmed).unwrap(),
            Applied::AlreadyInTarget
        );
        assert_eq!(plan_transition(Confirmed, Cancelled).unwrap(), Applied::Changed);
        assert_eq!(plan_transition(Confirmed, NoShow).unwrap(), Applied::Changed);
    }

    #[test]
    fn cancelled_is_terminal_except_self_loop() {
        assert_eq!(
            plan_transition(Cancelled, Cancelled).unwrap(),
            Applied::AlreadyInTarget
        );
        assert!(matches!(
            plan_transition(Cancelled, Confirmed),
            Err(EngineError::InvalidTransition { .. })
        ));
        assert!(matches!(
            plan_transition(Cancelled, NoShow),
            Err(EngineError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn no_show_accepts_nothing() {
        for to in [Pending, Confirmed, Cancelled, NoShow] {
            assert!(matches!(
                plan_transition(NoShow, to),
                Err(EngineError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn pending_is_not_a_target() {
        assert!(matches!(
            plan_transition(Confirmed, Pending),
            Err(EngineError::InvalidTransition { .. })
        ));
        assert!(matches!(
            plan_transition(Pending, Pending),
            Err(EngineError::InvalidTransition { .. })
        ));
    }
}
