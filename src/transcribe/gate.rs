use crate::error::TranscribeError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single in-flight submission guard.
///
/// One pipeline permits one pending submission at a time; a second attempt
/// while one is in flight is rejected immediately with
/// `SubmissionInProgress` rather than silently racing. There is no mid-flight
/// cancellation: a pending submission completes or fails naturally, and the
/// ticket clears the gate when it drops.
#[derive(Clone, Default)]
pub struct SubmissionGate {
    in_flight: Arc<AtomicBool>,
}

impl SubmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Result<SubmissionTicket, TranscribeError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(TranscribeError::SubmissionInProgress);
        }
        Ok(SubmissionTicket {
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

pub struct SubmissionTicket {
    in_flight: Arc<AtomicBool>,
}

impl Drop for SubmissionTicket {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_rejected_until_ticket_drops() {
        let gate = SubmissionGate::new();
        let ticket = gate.try_begin().expect("gate should be free");
        assert!(matches!(
            gate.try_begin(),
            Err(TranscribeError::SubmissionInProgress)
        ));
        drop(ticket);
        assert!(gate.try_begin().is_ok());
    }
}
