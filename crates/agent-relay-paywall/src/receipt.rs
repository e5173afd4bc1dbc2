use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::errors::RecordError;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Settlement confirmation returned by a payment-gated endpoint.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    /// Whether the payment settled.
    pub success: bool,
    /// Settlement transaction hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    /// Network the payment settled on (for example `base-sepolia`).
    pub network: String,
    /// Paying address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

impl PaymentReceipt {
    /// Receipt for a settled payment.
    pub fn settled(
        network: impl Into<String>,
        transaction: impl Into<String>,
        payer: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            transaction: Some(transaction.into()),
            network: network.into(),
            payer: Some(payer.into()),
            error_reason: None,
        }
    }

    /// Encodes the receipt as the base64 JSON token carried in headers.
    pub fn encode(&self) -> Result<String, RecordError> {
        let json =
            serde_json::to_vec(self).map_err(|err| RecordError::ReceiptSchema(err.to_string()))?;
        Ok(STANDARD.encode(json))
    }

    /// Decodes and validates a header token.
    ///
    /// Accepts the standard and URL-safe alphabets, padded or not.
    pub fn decode(token: &str) -> Result<Self, RecordError> {
        let token = token.trim();
        let bytes = STANDARD_LENIENT
            .decode(token)
            .or_else(|_| URL_SAFE_LENIENT.decode(token))
            .map_err(|err| RecordError::ReceiptDecode(err.to_string()))?;
        let receipt: Self = serde_json::from_slice(&bytes)
            .map_err(|err| RecordError::ReceiptSchema(err.to_string()))?;
        receipt.validate()?;
        Ok(receipt)
    }

    /// Checks the rules the JSON shape alone cannot express.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.network.trim().is_empty() {
            return Err(RecordError::ReceiptSchema("network must not be empty".into()));
        }
        if self.success && blank(&self.transaction) {
            return Err(RecordError::ReceiptSchema(
                "settled receipt must carry a transaction".into(),
            ));
        }
        if !self.success && blank(&self.error_reason) {
            return Err(RecordError::ReceiptSchema(
                "failed receipt must carry an errorReason".into(),
            ));
        }
        Ok(())
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|text| text.trim().is_empty())
}
