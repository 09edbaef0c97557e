//! Purchase pricing and the append-only transaction ledger.

use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    PiecePurchase,
    FeeTransfer,
}

/// One ledger entry. Never mutated after creation, only summed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub payer: PlayerId,
    /// Absent for purchases (paid into the game), set for transfers.
    pub payee: Option<PlayerId>,
    pub amount: u64,
    /// Milliseconds since the game was created.
    pub at_ms: u64,
}

/// Append-only fee and settlement ledger for one game.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<Transaction>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_purchase(&mut self, payer: PlayerId, amount: u64, at_ms: u64) {
        self.entries.push(Transaction {
            kind: TransactionKind::PiecePurchase,
            payer,
            payee: None,
            amount,
            at_ms,
        });
    }

    pub fn record_fee_transfer(
        &mut self,
        payer: PlayerId,
        payee: PlayerId,
        amount: u64,
        at_ms: u64,
    ) {
        self.entries.push(Transaction {
            kind: TransactionKind::FeeTransfer,
            payer,
            payee: Some(payee),
            amount,
            at_ms,
        });
    }

    pub fn entries(&self) -> &[Transaction] {
        &self.entries
    }

    /// Total purchase fees a player has paid into the game.
    pub fn purchases_by(&self, player: PlayerId) -> u64 {
        self.entries
            .iter()
            .filter(|t| t.kind == TransactionKind::PiecePurchase && t.payer == player)
            .map(|t| t.amount)
            .sum()
    }

    /// Total fees transferred to a player through king captures.
    pub fn transfers_to(&self, player: PlayerId) -> u64 {
        self.entries
            .iter()
            .filter(|t| t.kind == TransactionKind::FeeTransfer && t.payee == Some(player))
            .map(|t| t.amount)
            .sum()
    }
}
