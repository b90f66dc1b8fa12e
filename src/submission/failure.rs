//! Failure classification from `debug_traceTransaction`

use crate::error::ParseError;
use crate::network::{Network, NetworkRpcRoute};
use crate::request::methods;
use crate::transport::{AbortSignal, HttpClient, RpcDispatcher, RpcError};
use alloy::hex;
use alloy::primitives::B256;
use alloy::sol_types::{Revert, SolError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const EXECUTION_REVERTED: &str = "execution reverted";
const OUT_OF_GAS: &str = "out of gas";
const SELECTOR_LEN: usize = 4;
const MAX_MESSAGE_BYTES: usize = 200;

/// Why a mined transaction failed. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureReason {
    OutOfGas,
    ExecutionReverted { message: String },
    ExecutionRevertedWithoutMessage,
}

/// Params for `debug_traceTransaction` with the call tracer
pub fn trace_params(hash: B256) -> Vec<Value> {
    vec![
        json!(hash),
        json!({
            "timeout": "1s",
            "tracer": "callTracer",
            "tracerConfig": {
                "enableMemory": true,
                "enableReturnData": true,
            },
        }),
    ]
}

pub async fn fetch_failure_reason<C: HttpClient>(
    dispatcher: &RpcDispatcher<C>,
    network: &Network,
    route: &NetworkRpcRoute,
    hash: B256,
    signal: &AbortSignal,
) -> Result<FailureReason, RpcError> {
    let trace = dispatcher
        .call(
            network,
            route,
            methods::DEBUG_TRACE_TRANSACTION,
            trace_params(hash),
            signal,
        )
        .await?;
    let reason = parse_failure_reason(&trace)?;
    tracing::info!(tx_hash = %hash, reason = ?reason, "Classified transaction failure");
    Ok(reason)
}

/// Classify the top frame of a call trace
pub fn parse_failure_reason(trace: &Value) -> Result<FailureReason, ParseError> {
    let error = trace.get("error").and_then(Value::as_str);
    match error {
        Some(EXECUTION_REVERTED) => {
            let output = trace
                .get("output")
                .and_then(Value::as_str)
                .filter(|o| !o.is_empty() && *o != "0x");
            let Some(output) = output else {
                return Ok(FailureReason::ExecutionRevertedWithoutMessage);
            };
            let bytes = hex::decode(output.strip_prefix("0x").unwrap_or(output))
                .map_err(|e| ParseError::FailureTrace(format!("output is not hex: {e}")))?;
            Ok(match decode_revert_reason(&bytes) {
                Some(message) => FailureReason::ExecutionReverted { message },
                None => FailureReason::ExecutionRevertedWithoutMessage,
            })
        }
        Some(OUT_OF_GAS) => Ok(FailureReason::OutOfGas),
        Some(other) => Err(ParseError::FailureTrace(format!("unknown error {other:?}"))),
        None => Err(ParseError::FailureTrace("trace has no error".to_string())),
    }
}

/// Human-readable text from revert data
///
/// Standard `Error(string)` payloads are ABI-decoded; anything else is read
/// as text after the selector. Either way the text goes through
/// [`clean_revert_text`].
pub fn decode_revert_reason(output: &[u8]) -> Option<String> {
    if let Ok(revert) = Revert::abi_decode(output) {
        return clean_revert_text(revert.reason.as_bytes());
    }
    clean_revert_text(output.get(SELECTOR_LEN..).unwrap_or_default())
}

/// At most 200 bytes, control characters and invalid sequences dropped,
/// whitespace trimmed. `None` if nothing is left.
pub fn clean_revert_text(bytes: &[u8]) -> Option<String> {
    let bytes = &bytes[..bytes.len().min(MAX_MESSAGE_BYTES)];
    let text: String = String::from_utf8_lossy(bytes)
        .chars()
        .filter(|c| !c.is_control() && *c != char::REPLACEMENT_CHARACTER)
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::PredefinedNetworkName;
    use crate::transport::testing::MockHttpClient;

    fn revert_output(reason: &str) -> String {
        hex::encode_prefixed(
            Revert {
                reason: reason.to_string(),
            }
            .abi_encode(),
        )
    }

    #[test]
    fn revert_reason_round_trip() {
        let trace = json!({
            "type": "CALL",
            "error": "execution reverted",
            "output": revert_output("Insufficient funds"),
        });
        assert_eq!(
            parse_failure_reason(&trace).unwrap(),
            FailureReason::ExecutionReverted {
                message: "Insufficient funds".to_string()
            }
        );
    }

    #[test]
    fn revert_without_output() {
        let trace = json!({ "error": "execution reverted" });
        assert_eq!(
            parse_failure_reason(&trace).unwrap(),
            FailureReason::ExecutionRevertedWithoutMessage
        );

        let trace = json!({ "error": "execution reverted", "output": "0x" });
        assert_eq!(
            parse_failure_reason(&trace).unwrap(),
            FailureReason::ExecutionRevertedWithoutMessage
        );
    }

    #[test]
    fn out_of_gas() {
        let trace = json!({ "error": "out of gas", "gasUsed": "0x5208" });
        assert_eq!(parse_failure_reason(&trace).unwrap(), FailureReason::OutOfGas);
    }

    #[test]
    fn unknown_error_is_parse_error() {
        let trace = json!({ "error": "invalid opcode: INVALID" });
        assert!(matches!(
            parse_failure_reason(&trace),
            Err(ParseError::FailureTrace(_))
        ));
        assert!(parse_failure_reason(&json!({ "type": "CALL" })).is_err());
    }

    #[test]
    fn abi_reason_is_cleaned() {
        let trace = json!({
            "error": "execution reverted",
            "output": revert_output("Insufficient\u{0}\u{7} funds\n"),
        });
        assert_eq!(
            parse_failure_reason(&trace).unwrap(),
            FailureReason::ExecutionReverted {
                message: "Insufficient funds".to_string()
            }
        );
    }

    #[test]
    fn long_abi_reason_is_capped() {
        let reason = "a".repeat(500);
        let output = hex::decode(revert_output(&reason).trim_start_matches("0x")).unwrap();
        let message = decode_revert_reason(&output).unwrap();
        assert_eq!(message.len(), MAX_MESSAGE_BYTES);
    }

    #[test]
    fn cap_never_splits_a_character() {
        let reason = format!("{}é", "a".repeat(MAX_MESSAGE_BYTES - 1));
        assert_eq!(
            clean_revert_text(reason.as_bytes()),
            Some("a".repeat(MAX_MESSAGE_BYTES - 1))
        );
    }

    #[test]
    fn whitespace_only_abi_reason_has_no_message() {
        let trace = json!({ "error": "execution reverted", "output": revert_output(" \n\t") });
        assert_eq!(
            parse_failure_reason(&trace).unwrap(),
            FailureReason::ExecutionRevertedWithoutMessage
        );
    }

    #[test]
    fn non_abi_output_is_read_as_text() {
        let mut output = vec![0xde, 0xad, 0xbe, 0xef];
        output.extend_from_slice(b"\x00\x01  Custom failure\n\x7f");
        assert_eq!(
            decode_revert_reason(&output),
            Some("Custom failure".to_string())
        );
    }

    #[test]
    fn long_text_is_capped() {
        let mut output = vec![0u8; SELECTOR_LEN];
        output.extend(std::iter::repeat(b'a').take(500));
        let message = decode_revert_reason(&output).unwrap();
        assert_eq!(message.len(), MAX_MESSAGE_BYTES);
    }

    #[test]
    fn unreadable_output_has_no_message() {
        let trace = json!({ "error": "execution reverted", "output": "0x4e487b71" });
        assert_eq!(
            parse_failure_reason(&trace).unwrap(),
            FailureReason::ExecutionRevertedWithoutMessage
        );
    }

    #[tokio::test]
    async fn fetch_sends_call_tracer_params() {
        let output = revert_output("Insufficient funds");
        let http = MockHttpClient::new(move |_, _| {
            json!({ "result": { "error": "execution reverted", "output": output.clone() } })
        });
        let dispatcher = RpcDispatcher::new(http, &"https://proxy.example".parse().unwrap()).unwrap();

        let reason = fetch_failure_reason(
            &dispatcher,
            &Network::predefined(PredefinedNetworkName::Ethereum),
            &NetworkRpcRoute::default(),
            B256::repeat_byte(0xab),
            &AbortSignal::never(),
        )
        .await
        .unwrap();
        assert!(matches!(reason, FailureReason::ExecutionReverted { .. }));

        let call = &dispatcher.http().calls()[0];
        assert_eq!(call.method, "debug_traceTransaction");
        assert_eq!(
            call.body["params"][1],
            json!({
                "timeout": "1s",
                "tracer": "callTracer",
                "tracerConfig": { "enableMemory": true, "enableReturnData": true }
            })
        );
    }
}
