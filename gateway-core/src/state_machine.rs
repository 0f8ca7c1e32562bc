//! Status transition state machine
//!
//! The transition tables below are authoritative for the whole system; the
//! ledger, the orchestrator, and the webhook reconciler all validate through
//! this module. It holds no state and performs no I/O, so it is callable
//! concurrently without synchronization.

use crate::error::{EntityKind, TransitionError};
use crate::types::{InvoiceStatus, TransactionStatus};

impl InvoiceStatus {
    /// Statuses reachable from this one.
    pub fn next_states(&self) -> &'static [InvoiceStatus] {
        match self {
            InvoiceStatus::Pending => &[InvoiceStatus::Processing],
            InvoiceStatus::Processing => &[InvoiceStatus::Paid, InvoiceStatus::Failed],
            InvoiceStatus::Paid => &[],
            InvoiceStatus::Failed => &[],
        }
    }

    /// Whether `to` is reachable from this status.
    pub fn can_transition(&self, to: InvoiceStatus) -> bool {
        self.next_states().contains(&to)
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }
}

impl TransactionStatus {
    /// Statuses reachable from this one.
    pub fn next_states(&self) -> &'static [TransactionStatus] {
        match self {
            TransactionStatus::Created => {
                &[TransactionStatus::Authorized, TransactionStatus::Declined]
            }
            TransactionStatus::Authorized => {
                &[TransactionStatus::Captured, TransactionStatus::Cancelled]
            }
            TransactionStatus::Captured => {
                &[TransactionStatus::Settled, TransactionStatus::Refunded]
            }
            // Settled funds can still be refunded
            TransactionStatus::Settled => &[TransactionStatus::Refunded],
            TransactionStatus::Declined => &[],
            TransactionStatus::Cancelled => &[],
            TransactionStatus::Refunded => &[],
        }
    }

    /// Whether `to` is reachable from this status.
    pub fn can_transition(&self, to: TransactionStatus) -> bool {
        self.next_states().contains(&to)
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }
}

/// Validate an invoice status transition.
pub fn validate_invoice_transition(
    from: InvoiceStatus,
    to: InvoiceStatus,
) -> Result<(), TransitionError> {
    if from.can_transition(to) {
        Ok(())
    } else {
        Err(TransitionError::Disallowed {
            entity: EntityKind::Invoice,
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Validate a transaction status transition.
pub fn validate_transaction_transition(
    from: TransactionStatus,
    to: TransactionStatus,
) -> Result<(), TransitionError> {
    if from.can_transition(to) {
        Ok(())
    } else {
        Err(TransitionError::Disallowed {
            entity: EntityKind::Transaction,
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Validate an invoice transition expressed as stored strings.
///
/// Distinguishes an unrecognized status value from a disallowed pair, which
/// matters when the current status comes from persistence or a webhook.
pub fn validate_invoice_transition_str(from: &str, to: &str) -> Result<(), TransitionError> {
    let from: InvoiceStatus = from.parse()?;
    let to: InvoiceStatus = to.parse()?;
    validate_invoice_transition(from, to)
}

/// Validate a transaction transition expressed as stored strings.
pub fn validate_transaction_transition_str(from: &str, to: &str) -> Result<(), TransitionError> {
    let from: TransactionStatus = from.parse()?;
    let to: TransactionStatus = to.parse()?;
    validate_transaction_transition(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_INVOICE: [InvoiceStatus; 4] = [
        InvoiceStatus::Pending,
        InvoiceStatus::Processing,
        InvoiceStatus::Paid,
        InvoiceStatus::Failed,
    ];

    const ALL_TRANSACTION: [TransactionStatus; 7] = [
        TransactionStatus::Created,
        TransactionStatus::Authorized,
        TransactionStatus::Captured,
        TransactionStatus::Settled,
        TransactionStatus::Declined,
        TransactionStatus::Cancelled,
        TransactionStatus::Refunded,
    ];

    #[test]
    fn test_invoice_table_is_exact() {
        // Every pair in the table validates; every pair outside it fails.
        for from in ALL_INVOICE {
            for to in ALL_INVOICE {
                let expected = from.next_states().contains(&to);
                assert_eq!(
                    validate_invoice_transition(from, to).is_ok(),
                    expected,
                    "{} -> {}",
                    from,
                    to
                );
            }
        }

        assert!(InvoiceStatus::Pending.can_transition(InvoiceStatus::Processing));
        assert!(InvoiceStatus::Processing.can_transition(InvoiceStatus::Paid));
        assert!(InvoiceStatus::Processing.can_transition(InvoiceStatus::Failed));
        assert!(!InvoiceStatus::Pending.can_transition(InvoiceStatus::Paid));
        assert!(InvoiceStatus::Paid.is_terminal());
        assert!(InvoiceStatus::Failed.is_terminal());
    }

    #[test]
    fn test_transaction_table_is_exact() {
        for from in ALL_TRANSACTION {
            for to in ALL_TRANSACTION {
                let expected = from.next_states().contains(&to);
                assert_eq!(
                    validate_transaction_transition(from, to).is_ok(),
                    expected,
                    "{} -> {}",
                    from,
                    to
                );
            }
        }

        assert!(TransactionStatus::Settled.can_transition(TransactionStatus::Refunded));
        assert!(!TransactionStatus::Settled.can_transition(TransactionStatus::Authorized));
        assert!(TransactionStatus::Declined.is_terminal());
        assert!(TransactionStatus::Cancelled.is_terminal());
        assert!(TransactionStatus::Refunded.is_terminal());
        assert!(!TransactionStatus::Settled.is_terminal());
    }

    #[test]
    fn test_string_entry_points() {
        assert!(validate_invoice_transition_str("PENDING", "PROCESSING").is_ok());

        let err = validate_invoice_transition_str("PAID", "PENDING").unwrap_err();
        assert!(matches!(err, TransitionError::Disallowed { .. }));

        let err = validate_transaction_transition_str("BOGUS", "CAPTURED").unwrap_err();
        assert!(matches!(err, TransitionError::UnknownStatus { .. }));
    }
}
