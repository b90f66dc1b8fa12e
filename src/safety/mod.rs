//! Pre-signing safety checks
//!
//! A simulation provider returns a list of checks; [`evaluate`] folds them
//! into a [`SafetyResult`]. The result is advisory: it drives what the user
//! is shown, never whether signing is allowed.

pub mod simulator;

pub use simulator::EthCallSimulator;

use crate::network::{Network, NetworkRpcRoute};
use crate::request::RawRequest;
use crate::transport::{AbortSignal, RpcError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Ordered: `Danger` is worse than `Caution`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Caution,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckState {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckKind {
    TransactionSimulationCheck,
    SmartContractBlacklistCheck,
    ApprovalSpenderTypeCheck,
    ApprovalExpirationLimitCheck,
    TokenVerificationCheck,
    P2pReceiverTypeCheck,
    SuspiciousCharactersCheck,
    PrimaryTypeInSafeListCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyCheck {
    #[serde(rename = "type")]
    pub kind: CheckKind,
    pub severity: Severity,
    pub state: CheckState,
    /// Provider-supplied explanation, e.g. a revert reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SafetyCheck {
    pub fn passed(kind: CheckKind, severity: Severity) -> Self {
        Self {
            kind,
            severity,
            state: CheckState::Passed,
            detail: None,
        }
    }

    pub fn failed(kind: CheckKind, severity: Severity) -> Self {
        Self {
            kind,
            severity,
            state: CheckState::Failed,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        self.state == CheckState::Failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SafetyResult {
    Success,
    #[serde(rename_all = "camelCase")]
    Failure { failed_checks: Vec<SafetyCheck> },
}

impl SafetyResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SafetyResult::Success)
    }

    pub fn failed_checks(&self) -> &[SafetyCheck] {
        match self {
            SafetyResult::Success => &[],
            SafetyResult::Failure { failed_checks } => failed_checks,
        }
    }

    /// The failed check that should drive emphasis. Ties go to the one
    /// received first.
    pub fn most_severe(&self) -> Option<&SafetyCheck> {
        self.failed_checks().iter().fold(None, |worst, check| match worst {
            Some(w) if w.severity >= check.severity => Some(w),
            _ => Some(check),
        })
    }
}

/// `Success` iff no check failed; otherwise every failed check, in order
pub fn evaluate(checks: impl IntoIterator<Item = SafetyCheck>) -> SafetyResult {
    let failed_checks: Vec<_> = checks.into_iter().filter(SafetyCheck::is_failed).collect();
    if failed_checks.is_empty() {
        SafetyResult::Success
    } else {
        SafetyResult::Failure { failed_checks }
    }
}

/// Source of safety checks for a pending request
#[async_trait]
pub trait SimulationProvider: Send + Sync {
    async fn simulate(
        &self,
        network: &Network,
        route: &NetworkRpcRoute,
        request: &RawRequest,
        signal: &AbortSignal,
    ) -> Result<Vec<SafetyCheck>, RpcError>;
}

/// Run `provider` and fold its checks
pub async fn run_safety_checks<P: SimulationProvider + ?Sized>(
    provider: &P,
    network: &Network,
    route: &NetworkRpcRoute,
    request: &RawRequest,
    signal: &AbortSignal,
) -> Result<SafetyResult, RpcError> {
    let checks = provider.simulate(network, route, request, signal).await?;
    let result = evaluate(checks);
    if let Some(worst) = result.most_severe() {
        tracing::info!(
            method = %request.method,
            failed = result.failed_checks().len(),
            worst = ?worst.kind,
            severity = ?worst.severity,
            "Safety checks flagged request"
        );
    }
    Ok(result)
}
