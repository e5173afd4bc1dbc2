use tracing::{debug, info};

use crate::errors::{RecordError, VerifyError};
use crate::headers::HeaderVersion;
use crate::receipt::PaymentReceipt;
use crate::record::{ResponseRecord, TOOL_ROLE, load_records};

/// A receipt recovered from the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedReceipt {
    pub receipt: PaymentReceipt,
    /// Position of the record in the log (oldest is 0).
    pub record_index: usize,
    /// Header the token was read from.
    pub header: HeaderVersion,
}

/// Verifier settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Role tag a record must carry to be considered.
    pub role: String,
    /// Whether a valid receipt reporting a failed settlement counts.
    pub accept_failed_settlements: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            role: TOOL_ROLE.to_string(),
            accept_failed_settlements: false,
        }
    }
}

/// Recovers the most recent valid payment receipt from a response log.
#[derive(Clone, Debug, Default)]
pub struct ReceiptVerifier {
    config: VerifierConfig,
}

impl ReceiptVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Scans `records` newest first and returns the first receipt that
    /// decodes and validates for `gated_call_name`.
    ///
    /// Records that fail along the way are logged and skipped, so an older
    /// valid receipt is still found behind a newer broken one.
    pub fn find_receipt(
        &self,
        records: &[ResponseRecord],
        gated_call_name: &str,
    ) -> Option<VerifiedReceipt> {
        for (record_index, record) in records.iter().enumerate().rev() {
            if !record.matches(&self.config.role, gated_call_name) {
                continue;
            }
            match self.inspect(record) {
                Ok((header, receipt)) => {
                    info!(call = gated_call_name, record_index, %header, network = %receipt.network, "payment receipt verified");
                    return Some(VerifiedReceipt {
                        receipt,
                        record_index,
                        header,
                    });
                }
                Err(err) => {
                    debug!(call = gated_call_name, record_index, error = %err, "record skipped");
                }
            }
        }
        debug!(call = gated_call_name, records = records.len(), "no payment receipt found");
        None
    }

    /// Extracts and validates the receipt carried by one record.
    pub fn inspect(
        &self,
        record: &ResponseRecord,
    ) -> Result<(HeaderVersion, PaymentReceipt), RecordError> {
        let content = record.normalize()?;
        let (header, token) = content
            .headers
            .receipt_token()
            .ok_or(RecordError::MissingReceiptHeader)?;
        let receipt = PaymentReceipt::decode(token)?;
        if !receipt.success && !self.config.accept_failed_settlements {
            return Err(RecordError::SettlementFailed(
                receipt.error_reason.unwrap_or_default(),
            ));
        }
        Ok((header, receipt))
    }
}

/// `ReceiptVerifier::find_receipt` with default settings.
pub fn find_receipt(records: &[ResponseRecord], gated_call_name: &str) -> Option<VerifiedReceipt> {
    ReceiptVerifier::default().find_receipt(records, gated_call_name)
}

/// Parses a JSON response log and looks for a receipt in it.
///
/// Fails only when the log itself is not a JSON array of records.
pub fn find_receipt_in_log(
    json: &str,
    gated_call_name: &str,
) -> Result<Option<VerifiedReceipt>, VerifyError> {
    let records = load_records(json)?;
    Ok(find_receipt(&records, gated_call_name))
}
