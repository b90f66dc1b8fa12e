//! Confirmation polling

use super::{ChainStatus, GasInfo, SubmittedTransaction};
use crate::error::ParseError;
use crate::network::{Network, NetworkRpcRoute};
use crate::request::methods;
use crate::telemetry::ErrorReporter;
use crate::transport::{AbortSignal, Aborted, HttpClient, RpcDispatcher, RpcError};
use crate::Error;
use alloy::primitives::{B256, U128, U256, U64};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub min_confirmations: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            min_confirmations: 1,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptFields {
    status: Option<U64>,
    block_number: U64,
    gas_used: U64,
    effective_gas_price: Option<U128>,
    #[serde(default)]
    l1_fee: Option<U256>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingFields {
    block_number: Option<U64>,
}

fn parse_result<T: for<'de> Deserialize<'de>>(method: &str, value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value)
        .map_err(|e| ParseError::RpcResponse(format!("{method} result: {e}")).into())
}

/// Observe `hash` once
///
/// Receipt first; without one, the transaction itself tells pending from
/// mined. A transaction the node has never seen counts as pending.
pub async fn fetch_status<C: HttpClient>(
    dispatcher: &RpcDispatcher<C>,
    network: &Network,
    route: &NetworkRpcRoute,
    hash: B256,
    signal: &AbortSignal,
) -> Result<ChainStatus, RpcError> {
    let receipt = dispatcher
        .call(
            network,
            route,
            methods::ETH_GET_TRANSACTION_RECEIPT,
            vec![json!(hash)],
            signal,
        )
        .await?;

    if receipt.is_null() {
        let transaction = dispatcher
            .call(
                network,
                route,
                methods::ETH_GET_TRANSACTION_BY_HASH,
                vec![json!(hash)],
                signal,
            )
            .await?;
        if transaction.is_null() {
            return Ok(ChainStatus::Pending);
        }
        let fields: PendingFields =
            parse_result(methods::ETH_GET_TRANSACTION_BY_HASH, transaction)?;
        return Ok(match fields.block_number {
            Some(block) => ChainStatus::Included {
                block_number: block.to::<u64>(),
            },
            None => ChainStatus::Pending,
        });
    }

    let receipt: ReceiptFields = parse_result(methods::ETH_GET_TRANSACTION_RECEIPT, receipt)?;
    let block_number = receipt.block_number.to::<u64>();
    let gas_info = GasInfo::new(
        receipt.gas_used.to::<u64>(),
        receipt
            .effective_gas_price
            .map(|p| p.to::<u128>())
            .unwrap_or_default(),
        receipt.l1_fee,
    );

    // Pre-Byzantium receipts have no status; treat them as successful
    if receipt.status.is_some_and(|s| s.is_zero()) {
        return Ok(ChainStatus::Reverted {
            block_number,
            gas_info,
        });
    }

    let latest: U64 = dispatcher
        .call_as(network, route, methods::ETH_BLOCK_NUMBER, vec![], signal)
        .await?;
    let confirmations = latest
        .to::<u64>()
        .saturating_sub(block_number)
        .saturating_add(1);
    Ok(ChainStatus::Succeeded {
        block_number,
        confirmations,
        gas_info,
    })
}

/// Poll until the transaction reaches a terminal state
///
/// Fetch failures are reported and retried at the next tick; only the abort
/// signal ends the loop early. `on_update` sees every state change.
#[allow(clippy::too_many_arguments)]
pub async fn poll_until_terminal<C, R, F>(
    dispatcher: &RpcDispatcher<C>,
    network: &Network,
    route: &NetworkRpcRoute,
    mut transaction: SubmittedTransaction,
    config: &PollConfig,
    reporter: &R,
    signal: &AbortSignal,
    mut on_update: F,
) -> Result<SubmittedTransaction, Aborted>
where
    C: HttpClient,
    R: ErrorReporter + ?Sized,
    F: FnMut(&SubmittedTransaction),
{
    tracing::info!(
        tx_hash = %transaction.hash,
        network = %network.display_name(),
        interval_ms = config.interval.as_millis() as u64,
        "Polling transaction status"
    );

    while !transaction.should_stop() {
        match fetch_status(dispatcher, network, route, transaction.hash, signal).await {
            Ok(status) => {
                if transaction.advance(&status, config.min_confirmations, Utc::now()) {
                    on_update(&transaction);
                }
            }
            Err(RpcError::Aborted) => return Err(Aborted),
            Err(e) => reporter.report(&Error::Rpc(e), "transaction status poll"),
        }

        if transaction.should_stop() {
            break;
        }
        signal.race(tokio::time::sleep(config.interval)).await?;
    }

    Ok(transaction)
}
