//! Submission and confirmation tracking
//!
//! A [`SubmittedTransaction`] only ever moves forward:
//! `queued → included_in_block → completed | failed`. Observations that would
//! move it backwards (a reorg dropping it back to the mempool, a lagging
//! node) are ignored, and the two terminal states never change.

pub mod broadcast;
pub mod failure;
pub mod poller;

pub use broadcast::{prepare_transaction, submit};
pub use failure::{fetch_failure_reason, parse_failure_reason, FailureReason};
pub use poller::{fetch_status, poll_until_terminal, PollConfig};

use alloy::primitives::{B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Queued,
    IncludedInBlock,
    Completed,
    Failed,
}

impl TransactionState {
    fn rank(self) -> u8 {
        match self {
            TransactionState::Queued => 0,
            TransactionState::IncludedInBlock => 1,
            TransactionState::Completed | TransactionState::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionState::Completed | TransactionState::Failed)
    }
}

/// Gas accounting from the receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasInfo {
    pub gas_used: u64,
    pub effective_gas_price: u128,
    /// `gasUsed * effectiveGasPrice`, plus the L1 data fee on rollups
    pub total_fee: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l1_fee: Option<U256>,
}

impl GasInfo {
    pub fn new(gas_used: u64, effective_gas_price: u128, l1_fee: Option<U256>) -> Self {
        let execution = U256::from(gas_used) * U256::from(effective_gas_price);
        Self {
            gas_used,
            effective_gas_price,
            total_fee: execution + l1_fee.unwrap_or(U256::ZERO),
            l1_fee,
        }
    }
}

/// One observation of a transaction on chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStatus {
    /// Known to the node, not mined
    Pending,
    /// Mined, receipt not available yet
    Included { block_number: u64 },
    Succeeded {
        block_number: u64,
        confirmations: u64,
        gas_info: GasInfo,
    },
    Reverted { block_number: u64, gas_info: GasInfo },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTransaction {
    pub hash: B256,
    pub state: TransactionState,
    pub queued_at: DateTime<Utc>,
    pub included_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub block_number: Option<u64>,
    pub gas_info: Option<GasInfo>,
}

impl SubmittedTransaction {
    pub fn queued(hash: B256, at: DateTime<Utc>) -> Self {
        Self {
            hash,
            state: TransactionState::Queued,
            queued_at: at,
            included_at: None,
            completed_at: None,
            failed_at: None,
            block_number: None,
            gas_info: None,
        }
    }

    /// The polling loop stops once this is true
    pub fn should_stop(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply an observation. Returns whether the state changed.
    ///
    /// A successful receipt only completes the transaction once it has
    /// `min_confirmations`; until then it counts as included.
    pub fn advance(&mut self, status: &ChainStatus, min_confirmations: u64, now: DateTime<Utc>) -> bool {
        if self.state.is_terminal() {
            return false;
        }

        let (target, block_number, gas_info) = match status {
            ChainStatus::Pending => (TransactionState::Queued, None, None),
            ChainStatus::Included { block_number } => {
                (TransactionState::IncludedInBlock, Some(*block_number), None)
            }
            ChainStatus::Succeeded {
                block_number,
                confirmations,
                gas_info,
            } => {
                let target = if *confirmations >= min_confirmations {
                    TransactionState::Completed
                } else {
                    TransactionState::IncludedInBlock
                };
                (target, Some(*block_number), Some(*gas_info))
            }
            ChainStatus::Reverted {
                block_number,
                gas_info,
            } => (TransactionState::Failed, Some(*block_number), Some(*gas_info)),
        };

        if target.rank() <= self.state.rank() {
            return false;
        }

        if block_number.is_some() {
            self.block_number = block_number;
            self.included_at.get_or_insert(now);
        }
        if gas_info.is_some() {
            self.gas_info = gas_info;
        }
        match target {
            TransactionState::Completed => self.completed_at = Some(now),
            TransactionState::Failed => self.failed_at = Some(now),
            TransactionState::Queued | TransactionState::IncludedInBlock => {}
        }

        tracing::info!(
            tx_hash = %self.hash,
            from = ?self.state,
            to = ?target,
            block = ?self.block_number,
            "Transaction state changed"
        );
        self.state = target;
        true
    }
}
