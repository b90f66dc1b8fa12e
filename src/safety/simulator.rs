//! `eth_call`-based simulation
//!
//! Read-only: the simulator never signs or submits. It runs the pending
//! transaction against the latest block and inspects approvals and message
//! text locally.

use super::{CheckKind, SafetyCheck, Severity, SimulationProvider};
use crate::network::{Network, NetworkRpcRoute};
use crate::request::builder::approveCall;
use crate::request::{methods, RawRequest, SigningMethod, TransactionParams};
use crate::submission::failure::{clean_revert_text, decode_revert_reason};
use crate::transport::{AbortSignal, HttpClient, RpcDispatcher, RpcError};
use alloy::hex;
use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

const EXECUTION_REVERTED: &str = "execution reverted";

/// Bidi overrides and zero-width characters used to disguise text
const SUSPICIOUS_CHARS: &[char] = &[
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}', '\u{202A}', '\u{202B}', '\u{202C}',
    '\u{202D}', '\u{202E}', '\u{2066}', '\u{2067}', '\u{2068}', '\u{2069}',
];

pub struct EthCallSimulator<C> {
    dispatcher: Arc<RpcDispatcher<C>>,
}

impl<C: HttpClient> EthCallSimulator<C> {
    pub fn new(dispatcher: Arc<RpcDispatcher<C>>) -> Self {
        Self { dispatcher }
    }

    async fn simulate_transaction(
        &self,
        network: &Network,
        route: &NetworkRpcRoute,
        params: &TransactionParams,
        signal: &AbortSignal,
    ) -> Result<Vec<SafetyCheck>, RpcError> {
        // Fee and nonce fields would only make the call fail on balance
        let call = TransactionParams {
            from: params.from,
            to: params.to,
            value: params.value,
            data: params.data.clone(),
            ..Default::default()
        };

        let simulation = match self
            .dispatcher
            .call(
                network,
                route,
                methods::ETH_CALL,
                vec![json!(call), json!("latest")],
                signal,
            )
            .await
        {
            Ok(_) => SafetyCheck::passed(CheckKind::TransactionSimulationCheck, Severity::Danger),
            Err(RpcError::Rpc { payload, .. }) => {
                let reason = parse_revert_reason(&payload);
                tracing::debug!(reason = %reason, "Simulation reverted");
                SafetyCheck::failed(CheckKind::TransactionSimulationCheck, Severity::Danger)
                    .with_detail(reason)
            }
            Err(e) => return Err(e),
        };

        let mut checks = vec![simulation];
        if let Some(spender) = approval_spender(params) {
            checks.push(self.check_spender(network, route, spender, signal).await?);
        }
        Ok(checks)
    }

    /// Approving an account with no code is the classic drainer pattern
    async fn check_spender(
        &self,
        network: &Network,
        route: &NetworkRpcRoute,
        spender: Address,
        signal: &AbortSignal,
    ) -> Result<SafetyCheck, RpcError> {
        let code: String = self
            .dispatcher
            .call_as(
                network,
                route,
                methods::ETH_GET_CODE,
                vec![json!(spender), json!("latest")],
                signal,
            )
            .await?;

        let has_code = !matches!(code.as_str(), "" | "0x");
        Ok(if has_code {
            SafetyCheck::passed(CheckKind::ApprovalSpenderTypeCheck, Severity::Danger)
        } else {
            SafetyCheck::failed(CheckKind::ApprovalSpenderTypeCheck, Severity::Danger)
                .with_detail(format!("spender {spender} is not a contract"))
        })
    }
}

#[async_trait]
impl<C: HttpClient> SimulationProvider for EthCallSimulator<C> {
    async fn simulate(
        &self,
        network: &Network,
        route: &NetworkRpcRoute,
        request: &RawRequest,
        signal: &AbortSignal,
    ) -> Result<Vec<SafetyCheck>, RpcError> {
        match request.signing_method() {
            Some(SigningMethod::SendTransaction) => {
                let params = request.transaction_params()?;
                self.simulate_transaction(network, route, &params, signal)
                    .await
            }
            Some(SigningMethod::PersonalSign) => {
                let (message, _) = request.personal_message()?;
                Ok(vec![suspicious_characters_check(
                    &String::from_utf8_lossy(&message),
                )])
            }
            Some(SigningMethod::SignTypedDataV4) => {
                let (_, typed_data) = request.typed_data_params()?;
                Ok(vec![suspicious_characters_check(
                    &typed_data.message.to_string(),
                )])
            }
            None => Ok(Vec::new()),
        }
    }
}

fn approval_spender(params: &TransactionParams) -> Option<Address> {
    let input = params.input().ok()?;
    if !input.starts_with(&approveCall::SELECTOR) {
        return None;
    }
    approveCall::abi_decode(&input).ok().map(|call| call.spender)
}

fn suspicious_characters_check(text: &str) -> SafetyCheck {
    match text.chars().find(|c| SUSPICIOUS_CHARS.contains(c)) {
        Some(c) => SafetyCheck::failed(CheckKind::SuspiciousCharactersCheck, Severity::Caution)
            .with_detail(format!("contains U+{:04X}", c as u32)),
        None => SafetyCheck::passed(CheckKind::SuspiciousCharactersCheck, Severity::Caution),
    }
}

/// Revert reason from a JSON-RPC error object
///
/// Prefers the revert data in `error.data`, then the text after
/// `execution reverted: ` in `error.message`.
fn parse_revert_reason(payload: &Value) -> String {
    let from_data = payload
        .get("data")
        .and_then(Value::as_str)
        .and_then(|data| hex::decode(data.strip_prefix("0x").unwrap_or(data)).ok())
        .and_then(|bytes| decode_revert_reason(&bytes));
    if let Some(reason) = from_data {
        return reason;
    }

    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(EXECUTION_REVERTED);
    let message = message
        .strip_prefix("execution reverted: ")
        .unwrap_or(message);
    clean_revert_text(message.as_bytes()).unwrap_or_else(|| EXECUTION_REVERTED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::PredefinedNetworkName;
    use crate::request::builder;
    use crate::safety::{evaluate, run_safety_checks, CheckState};
    use crate::tokens::{addresses, CryptoCurrency, Money};
    use crate::transport::testing::MockHttpClient;
    use alloy::primitives::{address, U256};
    use alloy::sol_types::{Revert, SolError};

    const ALICE: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    const BOB: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");

    fn simulator(http: MockHttpClient) -> EthCallSimulator<MockHttpClient> {
        let dispatcher =
            RpcDispatcher::new(http, &"https://proxy.example".parse().unwrap()).unwrap();
        EthCallSimulator::new(Arc::new(dispatcher))
    }

    fn eth() -> Network {
        Network::predefined(PredefinedNetworkName::Ethereum)
    }

    #[test]
    fn test_parse_revert_reason() {
        let data = hex::encode_prefixed(
            Revert {
                reason: "Insufficient balance".to_string(),
            }
            .abi_encode(),
        );
        let payload = json!({ "code": 3, "message": "execution reverted", "data": data });
        assert_eq!(parse_revert_reason(&payload), "Insufficient balance");

        let payload = json!({ "code": -32000, "message": "execution reverted: Paused" });
        assert_eq!(parse_revert_reason(&payload), "Paused");

        let payload = json!({ "code": -32000, "message": "some other error" });
        assert_eq!(parse_revert_reason(&payload), "some other error");

        assert_eq!(parse_revert_reason(&json!({})), "execution reverted");
    }

    #[test]
    fn revert_reason_drops_control_characters() {
        let data = hex::encode_prefixed(
            Revert {
                reason: "Bad\u{7}thing\u{0}".to_string(),
            }
            .abi_encode(),
        );
        let payload = json!({ "code": 3, "message": "execution reverted", "data": data });
        assert_eq!(parse_revert_reason(&payload), "Badthing");

        let payload = json!({ "code": -32000, "message": "execution reverted: Paused\u{1b}[0m" });
        assert_eq!(parse_revert_reason(&payload), "Paused[0m");
    }

    #[tokio::test]
    async fn successful_call_passes() {
        let simulator = simulator(MockHttpClient::with_result(json!("0x")));
        let request = builder::native_transfer(ALICE, BOB, U256::from(1));

        let checks = simulator
            .simulate(&eth(), &NetworkRpcRoute::default(), &request, &AbortSignal::never())
            .await
            .unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].state, CheckState::Passed);
        assert_eq!(simulator.dispatcher.http().methods(), vec!["eth_call"]);
    }

    #[tokio::test]
    async fn revert_fails_simulation_check() {
        let simulator = simulator(MockHttpClient::new(|_, _| {
            json!({ "error": { "code": 3, "message": "execution reverted: Insufficient funds" } })
        }));
        let request = builder::native_transfer(ALICE, BOB, U256::from(1));

        let result = run_safety_checks(
            &simulator,
            &eth(),
            &NetworkRpcRoute::default(),
            &request,
            &AbortSignal::never(),
        )
        .await
        .unwrap();
        let worst = result.most_severe().unwrap();
        assert_eq!(worst.kind, CheckKind::TransactionSimulationCheck);
        assert_eq!(worst.detail.as_deref(), Some("Insufficient funds"));
    }

    #[tokio::test]
    async fn approval_to_account_without_code_is_flagged() {
        let simulator = simulator(MockHttpClient::new(|method, _| match method {
            "eth_getCode" => json!({ "result": "0x" }),
            _ => json!({ "result": "0x0000000000000000000000000000000000000000000000000000000000000001" }),
        }));
        let usdc = CryptoCurrency::token("USDC", 6, addresses::USDC_ETH);
        let request = builder::approve(ALICE, BOB, &Money::new(usdc, U256::MAX));

        let checks = simulator
            .simulate(&eth(), &NetworkRpcRoute::default(), &request, &AbortSignal::never())
            .await
            .unwrap();
        let result = evaluate(checks);
        assert_eq!(result.failed_checks().len(), 1);
        assert_eq!(
            result.failed_checks()[0].kind,
            CheckKind::ApprovalSpenderTypeCheck
        );
    }

    #[tokio::test]
    async fn personal_sign_checks_hidden_characters() {
        let simulator = simulator(MockHttpClient::with_result(json!(null)));
        let request = builder::personal_sign(ALICE, "Sign in to app\u{202E}moc.evil");

        let checks = simulator
            .simulate(&eth(), &NetworkRpcRoute::default(), &request, &AbortSignal::never())
            .await
            .unwrap();
        assert_eq!(checks[0].kind, CheckKind::SuspiciousCharactersCheck);
        assert!(checks[0].is_failed());
        assert!(simulator.dispatcher.http().calls().is_empty());
    }
}
