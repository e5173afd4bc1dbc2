/// Why one log record did not yield a receipt.
///
/// These never abort a scan; the verifier logs them and moves on to the
/// next older record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The record has no content at all.
    #[error("record has no content")]
    EmptyContent,
    /// String content is not a JSON object.
    #[error("malformed content: {0}")]
    MalformedContent(String),
    /// `headers` is present but is not a mapping.
    #[error("headers field is not a mapping")]
    InvalidHeaders,
    /// Neither receipt header is present.
    #[error("no payment-response or x-payment-response header")]
    MissingReceiptHeader,
    /// The receipt token is not valid base64.
    #[error("receipt decode error: {0}")]
    ReceiptDecode(String),
    /// The decoded receipt does not match the receipt schema.
    #[error("receipt schema error: {0}")]
    ReceiptSchema(String),
    /// The receipt is valid but reports a failed settlement.
    #[error("settlement failed: {0}")]
    SettlementFailed(String),
}

/// Failure of the verifier as a whole.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// The log is not a JSON array of records.
    #[error("invalid response log: {0}")]
    InvalidLog(String),
}

/// Failure of the probe-then-pay flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaywallError {
    /// The probe was expected to answer 402 Payment Required.
    #[error("probe of {url} was not payment gated (status {status})")]
    ProbeNotGated { url: String, status: u16 },
    /// The paid retry did not succeed.
    #[error("paid request to {url} was rejected (status {status})")]
    PaymentRejected { url: String, status: u16 },
    /// The payment amount could not be used.
    #[error("invalid payment amount: {0}")]
    InvalidAmount(String),
    /// The request executor failed before producing a response.
    #[error("request executor error: {0}")]
    Executor(String),
}
