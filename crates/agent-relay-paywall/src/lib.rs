//! Payment-gated request verification.
//!
//! A gated endpoint first answers `402 Payment Required`; the paid retry
//! carries a base64 JSON settlement receipt in its `Payment-Response`
//! header (or `X-Payment-Response` on older servers). This crate runs that
//! exchange through a caller-supplied executor and recovers the receipt
//! from the request/response log afterward.
//!
//! ```
//! use agent_relay_paywall::{PaymentReceipt, RecordContent, ResponseRecord, find_receipt};
//!
//! let token = PaymentReceipt::settled("base-sepolia", "0xabc", "0xPayer")
//!     .encode()
//!     .expect("encode");
//! let content = format!(r#"{{"status": 200, "headers": {{"X-Payment-Response": "{token}"}}}}"#);
//! let log = vec![ResponseRecord::tool("x402_paywalled_request", RecordContent::Text(content))];
//!
//! let found = find_receipt(&log, "x402_paywalled_request").expect("receipt");
//! assert!(found.receipt.success);
//! ```

/// Error types.
pub mod errors;
/// Probe-then-pay exchange and payment amounts.
pub mod flow;
/// Case-insensitive header map and receipt header names.
pub mod headers;
/// Receipt schema and token codec.
pub mod receipt;
/// Logged request/response records and their normalization.
pub mod record;
/// Receipt lookup over a response log.
pub mod verifier;

pub use errors::{PaywallError, RecordError, VerifyError};
pub use flow::{
    DEFAULT_PAID_CALL, DEFAULT_PROBE_CALL, GatedRequestExecutor, GatedResponse, PAYMENT_REQUIRED,
    PaymentAmount, PaywallFlow, PaywallOutcome,
};
pub use headers::{HeaderMap, HeaderVersion, LEGACY_PAYMENT_RESPONSE_HEADER, PAYMENT_RESPONSE_HEADER};
pub use receipt::PaymentReceipt;
pub use record::{NormalizedContent, RecordContent, ResponseRecord, load_records};
pub use verifier::{
    ReceiptVerifier, VerifiedReceipt, VerifierConfig, find_receipt, find_receipt_in_log,
};
