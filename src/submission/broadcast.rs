//! Fee preparation and broadcast

use super::SubmittedTransaction;
use crate::error::ParseError;
use crate::network::{Network, NetworkRpcRoute, TrxType};
use crate::request::builder::{FeeParams, TransactionPreparation};
use crate::request::{methods, RawRequest, TransactionParams};
use crate::signer::SignedTransaction;
use crate::telemetry::{report_unexpected, ErrorReporter};
use crate::transport::{AbortSignal, HttpClient, RpcDispatcher, RpcError};
use alloy::primitives::{B256, U128, U64};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

/// `maxFeePerGas = 2 * baseFee + tip`
const BASE_FEE_MULTIPLIER: u128 = 2;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlock {
    base_fee_per_gas: Option<U128>,
}

/// Fetch nonce, gas limit and fees for an `eth_sendTransaction` request
pub async fn prepare_transaction<C: HttpClient>(
    dispatcher: &RpcDispatcher<C>,
    network: &Network,
    route: &NetworkRpcRoute,
    request: &RawRequest,
    signal: &AbortSignal,
) -> Result<TransactionPreparation, RpcError> {
    let params = request.transaction_params()?;
    let call = TransactionParams {
        from: params.from,
        to: params.to,
        value: params.value,
        data: params.data.clone(),
        ..Default::default()
    };

    let nonce: U64 = dispatcher
        .call_as(
            network,
            route,
            methods::ETH_GET_TRANSACTION_COUNT,
            vec![json!(params.from), json!("pending")],
            signal,
        )
        .await?;
    let gas_limit: U64 = dispatcher
        .call_as(network, route, methods::ETH_ESTIMATE_GAS, vec![json!(call)], signal)
        .await?;

    let fee = match network.trx_type() {
        TrxType::Legacy => {
            let gas_price: U128 = dispatcher
                .call_as(network, route, methods::ETH_GAS_PRICE, vec![], signal)
                .await?;
            FeeParams::Legacy {
                gas_price: gas_price.to::<u128>(),
            }
        }
        TrxType::Eip1559 => {
            let priority: U128 = dispatcher
                .call_as(
                    network,
                    route,
                    methods::ETH_MAX_PRIORITY_FEE_PER_GAS,
                    vec![],
                    signal,
                )
                .await?;
            let block: LatestBlock = dispatcher
                .call_as(
                    network,
                    route,
                    methods::ETH_GET_BLOCK_BY_NUMBER,
                    vec![json!("latest"), json!(false)],
                    signal,
                )
                .await?;
            let base_fee = block
                .base_fee_per_gas
                .ok_or_else(|| ParseError::field("baseFeePerGas", "latest block has no base fee"))?
                .to::<u128>();
            let priority = priority.to::<u128>();
            FeeParams::Eip1559 {
                max_fee_per_gas: base_fee
                    .saturating_mul(BASE_FEE_MULTIPLIER)
                    .saturating_add(priority),
                max_priority_fee_per_gas: priority,
            }
        }
    };

    let preparation = TransactionPreparation {
        nonce: nonce.to::<u64>(),
        gas_limit: gas_limit.to::<u64>(),
        fee,
    };
    tracing::debug!(
        from = %params.from,
        nonce = preparation.nonce,
        gas_limit = preparation.gas_limit,
        fee = ?preparation.fee,
        "Prepared transaction"
    );
    Ok(preparation)
}

/// Broadcast a signed transaction. The result starts out queued.
///
/// The node's hash is tracked. If it differs from the locally computed one
/// the mismatch goes to `reporter`.
pub async fn submit<C: HttpClient, R: ErrorReporter + ?Sized>(
    dispatcher: &RpcDispatcher<C>,
    network: &Network,
    route: &NetworkRpcRoute,
    signed: &SignedTransaction,
    reporter: &R,
    signal: &AbortSignal,
) -> Result<SubmittedTransaction, RpcError> {
    let hash: B256 = dispatcher
        .call_as(
            network,
            route,
            methods::ETH_SEND_RAW_TRANSACTION,
            vec![json!(signed.raw)],
            signal,
        )
        .await?;

    if hash != signed.hash {
        report_unexpected(
            reporter,
            format!("node returned hash {hash} for signed transaction {}", signed.hash),
            "transaction broadcast",
        );
    }
    tracing::info!(tx_hash = %hash, network = %network.display_name(), "Transaction broadcast");
    Ok(SubmittedTransaction::queued(hash, Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::PredefinedNetworkName;
    use crate::request::builder;
    use crate::submission::TransactionState;
    use crate::telemetry::tests::CollectingReporter;
    use crate::transport::testing::MockHttpClient;
    use alloy::primitives::{address, Bytes, U256};

    const ALICE: alloy::primitives::Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    const BOB: alloy::primitives::Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");

    fn node() -> MockHttpClient {
        MockHttpClient::new(|method, _| match method {
            "eth_getTransactionCount" => json!({ "result": "0x7" }),
            "eth_estimateGas" => json!({ "result": "0x5208" }),
            "eth_gasPrice" => json!({ "result": "0x3b9aca00" }),
            "eth_maxPriorityFeePerGas" => json!({ "result": "0x3b9aca00" }),
            "eth_getBlockByNumber" => json!({ "result": { "number": "0x1", "baseFeePerGas": "0x77359400" } }),
            _ => json!({ "error": { "code": -32601, "message": "method not found" } }),
        })
    }

    fn dispatcher(http: MockHttpClient) -> RpcDispatcher<MockHttpClient> {
        RpcDispatcher::new(http, &"https://proxy.example".parse().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn eip1559_preparation() {
        let dispatcher = dispatcher(node());
        let request = builder::native_transfer(ALICE, BOB, U256::from(1));
        let preparation = prepare_transaction(
            &dispatcher,
            &Network::predefined(PredefinedNetworkName::Ethereum),
            &NetworkRpcRoute::default(),
            &request,
            &AbortSignal::never(),
        )
        .await
        .unwrap();

        assert_eq!(preparation.nonce, 7);
        assert_eq!(preparation.gas_limit, 21_000);
        assert_eq!(
            preparation.fee,
            FeeParams::Eip1559 {
                max_fee_per_gas: 2 * 2_000_000_000 + 1_000_000_000,
                max_priority_fee_per_gas: 1_000_000_000,
            }
        );

        let pending = &dispatcher.http().calls()[0];
        assert_eq!(pending.body["params"][1], "pending");
    }

    #[tokio::test]
    async fn legacy_preparation_uses_gas_price() {
        let dispatcher = dispatcher(node());
        let request = builder::native_transfer(ALICE, BOB, U256::from(1));
        let preparation = prepare_transaction(
            &dispatcher,
            &Network::predefined(PredefinedNetworkName::BSC),
            &NetworkRpcRoute::default(),
            &request,
            &AbortSignal::never(),
        )
        .await
        .unwrap();
        assert_eq!(
            preparation.fee,
            FeeParams::Legacy {
                gas_price: 1_000_000_000
            }
        );
        assert!(!dispatcher
            .http()
            .methods()
            .contains(&"eth_getBlockByNumber".to_string()));
    }

    #[tokio::test]
    async fn submit_creates_queued_transaction() {
        let hash = B256::repeat_byte(0x11);
        let dispatcher = dispatcher(MockHttpClient::with_result(json!(hash)));
        let signed = SignedTransaction {
            raw: Bytes::from_static(&[0x02, 0xf8, 0x6c]),
            hash,
        };

        let submitted = submit(
            &dispatcher,
            &Network::predefined(PredefinedNetworkName::Ethereum),
            &NetworkRpcRoute::default(),
            &signed,
            &CollectingReporter::default(),
            &AbortSignal::never(),
        )
        .await
        .unwrap();

        assert_eq!(submitted.hash, hash);
        assert_eq!(submitted.state, TransactionState::Queued);
        let call = &dispatcher.http().calls()[0];
        assert_eq!(call.method, "eth_sendRawTransaction");
        assert_eq!(call.body["params"][0], "0x02f86c");
    }

    #[tokio::test]
    async fn hash_mismatch_is_reported() {
        let node_hash = B256::repeat_byte(0x22);
        let dispatcher = dispatcher(MockHttpClient::with_result(json!(node_hash)));
        let signed = SignedTransaction {
            raw: Bytes::from_static(&[0x02]),
            hash: B256::repeat_byte(0x11),
        };
        let reporter = CollectingReporter::default();

        let submitted = submit(
            &dispatcher,
            &Network::predefined(PredefinedNetworkName::Ethereum),
            &NetworkRpcRoute::default(),
            &signed,
            &reporter,
            &AbortSignal::never(),
        )
        .await
        .unwrap();

        assert_eq!(submitted.hash, node_hash);
        let reports = reporter.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "transaction broadcast");
        assert!(reports[0].1.starts_with("Unexpected error"));
    }

    #[tokio::test]
    async fn rejected_broadcast_is_rpc_error() {
        let dispatcher = dispatcher(MockHttpClient::new(|_, _| {
            json!({ "error": { "code": -32000, "message": "nonce too low" } })
        }));
        let signed = SignedTransaction {
            raw: Bytes::from_static(&[0x02]),
            hash: B256::ZERO,
        };
        let err = submit(
            &dispatcher,
            &Network::predefined(PredefinedNetworkName::Ethereum),
            &NetworkRpcRoute::default(),
            &signed,
            &CollectingReporter::default(),
            &AbortSignal::never(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.rpc_message(), Some("nonce too low"));
    }
}
