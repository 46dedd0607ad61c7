//! Order State Machine Service
//!
//! ```text
//! PENDING_SUBMIT -> SUBMITTED -> {PARTIALLY_FILLED <-> SUBMITTED} -> FILLED
//! SUBMITTED | PARTIALLY_FILLED -> CANCELLED
//! PENDING_SUBMIT -> REJECTED
//! any non-terminal -> EXPIRED
//! ```

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::OrderStatus;

/// Validates order lifecycle transitions.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        matches!(
            (from, to),
            // From PendingSubmit
            (OrderStatus::PendingSubmit, OrderStatus::Submitted)
                | (OrderStatus::PendingSubmit, OrderStatus::Rejected)
                | (OrderStatus::PendingSubmit, OrderStatus::Cancelled)
                | (OrderStatus::PendingSubmit, OrderStatus::Expired)
                // From Submitted
                | (OrderStatus::Submitted, OrderStatus::PartiallyFilled)
                | (OrderStatus::Submitted, OrderStatus::Filled)
                | (OrderStatus::Submitted, OrderStatus::Cancelled)
                | (OrderStatus::Submitted, OrderStatus::Rejected)
                | (OrderStatus::Submitted, OrderStatus::Expired)
                // From PartiallyFilled
                | (OrderStatus::PartiallyFilled, OrderStatus::PartiallyFilled)
                | (OrderStatus::PartiallyFilled, OrderStatus::Submitted)
                | (OrderStatus::PartiallyFilled, OrderStatus::Filled)
                | (OrderStatus::PartiallyFilled, OrderStatus::Cancelled)
                | (OrderStatus::PartiallyFilled, OrderStatus::Expired)
        )
    }

    /// Validate a state transition.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                from,
                to,
                reason: Self::transition_error_reason(from, to),
            })
        }
    }

    /// Human-readable reason for an invalid transition.
    #[must_use]
    pub fn transition_error_reason(from: OrderStatus, to: OrderStatus) -> String {
        match from {
            OrderStatus::Filled => format!("order is already filled, cannot transition to {to}"),
            OrderStatus::Cancelled => format!("order is cancelled, cannot transition to {to}"),
            OrderStatus::Rejected => format!("order was rejected, cannot transition to {to}"),
            OrderStatus::Expired => format!("order has expired, cannot transition to {to}"),
            _ => format!("invalid transition from {from} to {to}"),
        }
    }

    /// All valid next states from a given state.
    #[must_use]
    pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
        match from {
            OrderStatus::PendingSubmit => vec![
                OrderStatus::Submitted,
                OrderStatus::Rejected,
                OrderStatus::Cancelled,
                OrderStatus::Expired,
            ],
            OrderStatus::Submitted => vec![
                OrderStatus::PartiallyFilled,
                OrderStatus::Filled,
                OrderStatus::Cancelled,
                OrderStatus::Rejected,
                OrderStatus::Expired,
            ],
            OrderStatus::PartiallyFilled => vec![
                OrderStatus::PartiallyFilled,
                OrderStatus::Submitted,
                OrderStatus::Filled,
                OrderStatus::Cancelled,
                OrderStatus::Expired,
            ],
            OrderStatus::Filled
            | OrderStatus::Cancelled
            | OrderStatus::Rejected
            | OrderStatus::Expired => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 7] = [
        OrderStatus::PendingSubmit,
        OrderStatus::Submitted,
        OrderStatus::PartiallyFilled,
        OrderStatus::Filled,
        OrderStatus::Cancelled,
        OrderStatus::Rejected,
        OrderStatus::Expired,
    ];

    #[test]
    fn terminal_states_have_no_exits() {
        for from in ALL.into_iter().filter(OrderStatus::is_terminal) {
            for to in ALL {
                assert!(!OrderStateMachine::is_valid_transition(from, to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn next_states_agree_with_table() {
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    OrderStateMachine::valid_next_states(from).contains(&to),
                    OrderStateMachine::is_valid_transition(from, to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn every_open_state_can_expire() {
        for from in ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert!(OrderStateMachine::is_valid_transition(from, OrderStatus::Expired));
        }
    }

    #[test]
    fn rejected_from_terminal_reports_reason() {
        let err =
            OrderStateMachine::validate_transition(OrderStatus::Filled, OrderStatus::Cancelled)
                .unwrap_err();
        assert!(err.to_string().contains("already filled"));
    }
}
