//! Transaction record structures

use serde::{Deserialize, Serialize};

/// Counterparty identifier (sender or receiver)
pub type CounterpartyId = u64;

/// A normalized transaction row, one per input record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transferred amount
    pub amount: f64,

    /// Sending counterparty
    pub sender_id: CounterpartyId,

    /// Receiving counterparty
    pub receiver_id: CounterpartyId,

    /// Ground-truth fraud label (`Class == 1`)
    pub is_labeled_fraud: bool,
}

impl TransactionRecord {
    pub fn new(
        amount: f64,
        sender_id: CounterpartyId,
        receiver_id: CounterpartyId,
        is_labeled_fraud: bool,
    ) -> Self {
        Self {
            amount,
            sender_id,
            receiver_id,
            is_labeled_fraud,
        }
    }

    /// The counterparty pair with the smaller id first.
    ///
    /// Rows in either direction between two parties share one key.
    pub fn unordered_pair(&self) -> (CounterpartyId, CounterpartyId) {
        if self.sender_id <= self.receiver_id {
            (self.sender_id, self.receiver_id)
        } else {
            (self.receiver_id, self.sender_id)
        }
    }
}
