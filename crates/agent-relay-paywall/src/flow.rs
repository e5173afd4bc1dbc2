use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::errors::PaywallError;
use crate::record::{RecordContent, ResponseRecord};
use crate::verifier::{ReceiptVerifier, VerifiedReceipt};

/// Status a gated endpoint answers before payment.
pub const PAYMENT_REQUIRED: u16 = 402;
/// Call name recorded for the unpaid probe.
pub const DEFAULT_PROBE_CALL: &str = "web_scraper";
/// Call name recorded for the paid retry.
pub const DEFAULT_PAID_CALL: &str = "x402_paywalled_request";
/// Decimal places of the settlement token (USDC).
pub const USDC_DECIMALS: u32 = 6;

const ATOMIC_PER_UNIT: u64 = 10_u64.pow(USDC_DECIMALS);

/// Payment amount in atomic token units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaymentAmount(u64);

impl PaymentAmount {
    pub const fn from_atomic(atomic: u64) -> Self {
        Self(atomic)
    }

    pub fn atomic(self) -> u64 {
        self.0
    }

    /// Parses a decimal USDC amount such as `0.01`.
    pub fn parse_usdc(text: &str) -> Result<Self, PaywallError> {
        let text = text.trim();
        let invalid = |reason: &str| PaywallError::InvalidAmount(format!("{text:?}: {reason}"));
        let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("empty amount"));
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a non-negative decimal number"));
        }
        if frac.len() > USDC_DECIMALS as usize {
            return Err(invalid("too many decimal places"));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("amount too large"))?
        };
        let frac: u64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<width$}", width = USDC_DECIMALS as usize);
            padded.parse().map_err(|_| invalid("bad fraction"))?
        };
        let atomic = whole
            .checked_mul(ATOMIC_PER_UNIT)
            .and_then(|units| units.checked_add(frac))
            .ok_or_else(|| invalid("amount too large"))?;
        if atomic == 0 {
            return Err(invalid("amount must be positive"));
        }
        Ok(Self(atomic))
    }

    /// The smaller of `self` and `cap`.
    pub fn capped(self, cap: PaymentAmount) -> Self {
        self.min(cap)
    }
}

impl fmt::Display for PaymentAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / ATOMIC_PER_UNIT;
        let frac = format!(
            "{:0width$}",
            self.0 % ATOMIC_PER_UNIT,
            width = USDC_DECIMALS as usize
        );
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            write!(f, "{whole}")
        } else {
            write!(f, "{whole}.{frac}")
        }
    }
}

/// One response from a gated endpoint, as the request layer returns it.
#[derive(Clone, Debug, PartialEq)]
pub struct GatedResponse {
    pub status: u16,
    /// Header names exactly as received.
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl GatedResponse {
    pub fn is_payment_required(&self) -> bool {
        self.status == PAYMENT_REQUIRED
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Logs the response as a tool record named `call_name`.
    pub fn to_record(&self, call_name: &str) -> ResponseRecord {
        let mut content = Map::new();
        content.insert("status".into(), json!(self.status));
        content.insert("headers".into(), json!(self.headers));
        content.insert("body".into(), self.body.clone());
        ResponseRecord::tool(call_name, RecordContent::Structured(content))
    }
}

/// Request layer able to probe a gated URL and retry it with payment.
#[async_trait::async_trait]
pub trait GatedRequestExecutor: Send + Sync {
    /// Issues the request without paying.
    async fn probe(&self, url: &str) -> Result<GatedResponse, PaywallError>;

    /// Pays at most `max_amount` and repeats the request.
    async fn pay_and_retry(
        &self,
        url: &str,
        max_amount: PaymentAmount,
    ) -> Result<GatedResponse, PaywallError>;
}

/// Result of a completed probe-then-pay exchange.
#[derive(Clone, Debug, PartialEq)]
pub struct PaywallOutcome {
    /// Probe and paid records, oldest first.
    pub records: Vec<ResponseRecord>,
    /// Unlocked body of the paid response.
    pub body: Value,
    /// Amount authorized for the paid retry.
    pub amount: PaymentAmount,
    /// Receipt recovered from the paid response, if it carried a valid one.
    pub receipt: Option<VerifiedReceipt>,
}

/// Probe a gated URL, pay, retry and recover the receipt.
#[derive(Clone, Debug)]
pub struct PaywallFlow {
    max_amount: PaymentAmount,
    verifier: ReceiptVerifier,
}

impl Default for PaywallFlow {
    fn default() -> Self {
        Self {
            max_amount: PaymentAmount::from_atomic(ATOMIC_PER_UNIT / 100),
            verifier: ReceiptVerifier::default(),
        }
    }
}

impl PaywallFlow {
    /// Caps every payment made by this flow.
    pub fn max_amount(mut self, max_amount: PaymentAmount) -> Self {
        self.max_amount = max_amount;
        self
    }

    /// Replaces the verifier used to recover the receipt.
    pub fn verifier(mut self, verifier: ReceiptVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Runs the exchange against `url`, paying at most `requested` (further
    /// capped by the flow's maximum).
    pub async fn run<X>(
        &self,
        executor: &X,
        url: &str,
        requested: PaymentAmount,
    ) -> Result<PaywallOutcome, PaywallError>
    where
        X: GatedRequestExecutor + ?Sized,
    {
        let amount = requested.capped(self.max_amount);
        let mut records = Vec::with_capacity(2);

        let probe = executor.probe(url).await?;
        info!(url, status = probe.status, "probe answered");
        records.push(probe.to_record(DEFAULT_PROBE_CALL));
        if !probe.is_payment_required() {
            return Err(PaywallError::ProbeNotGated {
                url: url.to_string(),
                status: probe.status,
            });
        }

        let paid = executor.pay_and_retry(url, amount).await?;
        info!(url, status = paid.status, %amount, "paid retry answered");
        records.push(paid.to_record(DEFAULT_PAID_CALL));
        if !paid.is_success() {
            return Err(PaywallError::PaymentRejected {
                url: url.to_string(),
                status: paid.status,
            });
        }

        let receipt = self.verifier.find_receipt(&records, DEFAULT_PAID_CALL);
        if receipt.is_none() {
            warn!(url, "paid response carried no valid receipt");
        }
        Ok(PaywallOutcome {
            records,
            body: paid.body,
            amount,
            receipt,
        })
    }
}
