//! Hardware wallet port
//!
//! The device driver lives outside the core. The dispatcher hands it a
//! derivation path and a payload, then waits for the user to confirm on the
//! device. That wait is the only unbounded suspension in the crate, so it is
//! always raced against the abort signal and a timeout.

use super::SigningError;
use crate::transport::{AbortSignal, Aborted};
use alloy::primitives::{Bytes, B256};
use alloy::signers::Signature;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HardwareDevice {
    Ledger,
    Trezor,
}

/// What the device is asked to sign
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HardwarePayload {
    /// RLP of the unsigned transaction
    #[serde(rename_all = "camelCase")]
    Transaction { chain_id: u64, unsigned: Bytes },
    /// Devices without a JSON parser sign the two hashes; the rest show the
    /// full typed data
    #[serde(rename_all = "camelCase")]
    TypedData {
        domain_separator: B256,
        struct_hash: B256,
        typed_data: Value,
    },
    Message { message: Bytes },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HardwareError {
    #[error("rejected on device")]
    Rejected,

    #[error("device disconnected")]
    Disconnected,

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait HardwareTransport: Send + Sync {
    /// Suspends until the user confirms or rejects on the device
    async fn request_signature(
        &self,
        device: HardwareDevice,
        hd_path: &str,
        payload: &HardwarePayload,
    ) -> Result<Signature, HardwareError>;
}

/// Transport for hosts with no device support
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableHardwareTransport;

#[async_trait]
impl HardwareTransport for UnavailableHardwareTransport {
    async fn request_signature(
        &self,
        _device: HardwareDevice,
        _hd_path: &str,
        _payload: &HardwarePayload,
    ) -> Result<Signature, HardwareError> {
        Err(HardwareError::Disconnected)
    }
}

/// Wait for a device signature, bounded by `timeout` and `signal`
pub async fn await_device_signature<H: HardwareTransport + ?Sized>(
    transport: &H,
    device: HardwareDevice,
    hd_path: &str,
    payload: &HardwarePayload,
    timeout: Duration,
    signal: &AbortSignal,
) -> Result<Signature, SigningError> {
    tracing::info!(device = ?device, hd_path, "Waiting for hardware confirmation");

    let wait = tokio::time::timeout(
        timeout,
        transport.request_signature(device, hd_path, payload),
    );
    match signal.race(wait).await {
        Err(Aborted) => Err(SigningError::Cancelled),
        Ok(Err(_elapsed)) => Err(SigningError::DeviceTimeout),
        Ok(Ok(Ok(signature))) => Ok(signature),
        Ok(Ok(Err(HardwareError::Rejected))) => Err(SigningError::DeviceRejected),
        Ok(Ok(Err(HardwareError::Disconnected))) => Err(SigningError::DeviceDisconnected),
        Ok(Ok(Err(HardwareError::Other(message)))) => Err(SigningError::Device(message)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::signer::local::tests::TEST_KEY;
    use crate::signer::local::LocalSigner;
    use crate::transport::AbortController;
    use alloy::primitives::keccak256;
    use std::sync::Mutex;

    /// Device that answers with a fixed outcome after `delay`, signing with
    /// the well-known test key
    pub(crate) struct FakeDevice {
        pub(crate) delay: Duration,
        pub(crate) outcome: Result<(), HardwareError>,
        pub(crate) requests: Mutex<Vec<(HardwareDevice, String, HardwarePayload)>>,
    }

    impl FakeDevice {
        pub(crate) fn approving() -> Self {
            Self::with(Duration::ZERO, Ok(()))
        }

        pub(crate) fn with(delay: Duration, outcome: Result<(), HardwareError>) -> Self {
            Self {
                delay,
                outcome,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HardwareTransport for FakeDevice {
        async fn request_signature(
            &self,
            device: HardwareDevice,
            hd_path: &str,
            payload: &HardwarePayload,
        ) -> Result<Signature, HardwareError> {
            self.requests
                .lock()
                .unwrap()
                .push((device, hd_path.to_string(), payload.clone()));
            tokio::time::sleep(self.delay).await;
            self.outcome.clone()?;

            let hash = match payload {
                HardwarePayload::Transaction { unsigned, .. } => keccak256(unsigned),
                HardwarePayload::TypedData {
                    domain_separator,
                    struct_hash,
                    ..
                } => {
                    let mut buf = Vec::with_capacity(66);
                    buf.extend_from_slice(&[0x19, 0x01]);
                    buf.extend_from_slice(domain_separator.as_slice());
                    buf.extend_from_slice(struct_hash.as_slice());
                    keccak256(buf)
                }
                HardwarePayload::Message { message } => {
                    alloy::primitives::eip191_hash_message(message)
                }
            };
            let signer = LocalSigner::from_hex(TEST_KEY)
                .map_err(|e| HardwareError::Other(e.to_string()))?;
            signer
                .sign_hash(&hash)
                .map_err(|e| HardwareError::Other(e.to_string()))
        }
    }

    fn message() -> HardwarePayload {
        HardwarePayload::Message {
            message: Bytes::from_static(b"hello"),
        }
    }

    #[tokio::test]
    async fn confirmed_signature_is_returned() {
        let device = FakeDevice::approving();
        let signature = await_device_signature(
            &device,
            HardwareDevice::Ledger,
            "m/44'/60'/0'/0/0",
            &message(),
            Duration::from_secs(5),
            &AbortSignal::never(),
        )
        .await
        .unwrap();
        let hash = alloy::primitives::eip191_hash_message(b"hello");
        assert_eq!(
            signature.recover_address_from_prehash(&hash).unwrap(),
            crate::signer::local::tests::TEST_ADDRESS
        );
    }

    #[tokio::test]
    async fn rejection_and_disconnect_are_distinct() {
        for (outcome, expected) in [
            (HardwareError::Rejected, SigningError::DeviceRejected),
            (HardwareError::Disconnected, SigningError::DeviceDisconnected),
        ] {
            let device = FakeDevice::with(Duration::ZERO, Err(outcome));
            let err = await_device_signature(
                &device,
                HardwareDevice::Trezor,
                "m/44'/60'/0'/0/0",
                &message(),
                Duration::from_secs(5),
                &AbortSignal::never(),
            )
            .await
            .unwrap_err();
            assert_eq!(err, expected);
        }
    }

    #[tokio::test]
    async fn slow_device_times_out() {
        let device = FakeDevice::with(Duration::from_secs(30), Ok(()));
        let err = await_device_signature(
            &device,
            HardwareDevice::Ledger,
            "m/44'/60'/0'/0/0",
            &message(),
            Duration::from_millis(20),
            &AbortSignal::never(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, SigningError::DeviceTimeout);
    }

    #[tokio::test]
    async fn abort_cancels_wait() {
        let device = FakeDevice::with(Duration::from_secs(30), Ok(()));
        let controller = AbortController::new();
        let signal = controller.signal();

        let aborter = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.abort();
        });
        let err = await_device_signature(
            &device,
            HardwareDevice::Ledger,
            "m/44'/60'/0'/0/0",
            &message(),
            Duration::from_secs(60),
            &signal,
        )
        .await
        .unwrap_err();
        aborter.await.unwrap();
        assert_eq!(err, SigningError::Cancelled);
    }

    #[tokio::test]
    async fn unavailable_transport_reports_disconnect() {
        let err = await_device_signature(
            &UnavailableHardwareTransport,
            HardwareDevice::Ledger,
            "m/44'/60'/0'/0/0",
            &message(),
            Duration::from_secs(1),
            &AbortSignal::never(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, SigningError::DeviceDisconnected);
    }
}
