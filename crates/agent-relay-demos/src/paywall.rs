use std::collections::BTreeMap;
use std::path::Path;

use agent_relay_paywall::{
    GatedRequestExecutor, GatedResponse, PaymentAmount, PaymentReceipt, PaywallError,
    VerifiedReceipt, find_receipt_in_log,
};
use serde_json::json;

/// Offline paywall: refuses the probe with 402 and settles the paid retry
/// with a canned receipt.
pub struct SimulatedPaywall {
    pub network: String,
    pub payer: String,
    /// Serve the receipt under the legacy `X-Payment-Response` header.
    pub legacy_header: bool,
}

#[async_trait::async_trait]
impl GatedRequestExecutor for SimulatedPaywall {
    async fn probe(&self, url: &str) -> Result<GatedResponse, PaywallError> {
        Ok(GatedResponse {
            status: 402,
            headers: BTreeMap::new(),
            body: json!({"error": "Payment Required", "resource": url}),
        })
    }

    async fn pay_and_retry(
        &self,
        url: &str,
        max_amount: PaymentAmount,
    ) -> Result<GatedResponse, PaywallError> {
        let receipt = PaymentReceipt::settled(
            self.network.clone(),
            format!("0x{:064x}", max_amount.atomic()),
            self.payer.clone(),
        );
        let token = receipt
            .encode()
            .map_err(|err| PaywallError::Executor(err.to_string()))?;
        let header = if self.legacy_header {
            "X-Payment-Response"
        } else {
            "Payment-Response"
        };
        Ok(GatedResponse {
            status: 200,
            headers: BTreeMap::from([(header.to_string(), token)]),
            body: json!({"resource": url, "title": "Unlocked track", "paid": max_amount.to_string()}),
        })
    }
}

/// Reads a JSON response log from disk and looks for a receipt.
pub fn verify_log_file(
    path: &Path,
    gated_call_name: &str,
) -> Result<Option<VerifiedReceipt>, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    Ok(find_receipt_in_log(&json, gated_call_name)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_relay_paywall::{DEFAULT_PAID_CALL, HeaderVersion, PaywallFlow};
    use std::io::Write as _;

    #[tokio::test]
    async fn simulated_flow_round_trips_through_a_log_file() {
        let paywall = SimulatedPaywall {
            network: "base-sepolia".into(),
            payer: "0xPayer".into(),
            legacy_header: true,
        };
        let outcome = PaywallFlow::default()
            .run(&paywall, "https://www.x402.org/protected", PaymentAmount::from_atomic(10_000))
            .await
            .expect("flow succeeds");
        let expected = outcome.receipt.clone().expect("receipt");
        assert_eq!(expected.header, HeaderVersion::V1);

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let log = serde_json::to_string(&outcome.records).expect("serialize log");
        file.write_all(log.as_bytes()).expect("write log");

        let found = verify_log_file(file.path(), DEFAULT_PAID_CALL)
            .expect("readable log")
            .expect("receipt");
        assert_eq!(found, expected);
    }

    #[test]
    fn invalid_log_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"{\"not\": \"a list\"}").expect("write log");
        assert!(verify_log_file(file.path(), DEFAULT_PAID_CALL).is_err());
    }
}
