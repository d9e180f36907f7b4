//! Payment records: charges and refunds captured against orders.
//!
//! The service does not talk to payment providers. The dashboard records
//! what the provider reported (provider name + reference), and the order's
//! payment status is derived from the recorded amounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{MAX_AMOUNT_CENTS, require_text},
};

string_enum! {
    pub enum PaymentKind {
        Charge => "charge",
        Refund => "refund",
    }
}

string_enum! {
    pub enum PaymentStatus {
        Unpaid => "unpaid",
        PartiallyPaid => "partially_paid",
        Paid => "paid",
        PartiallyRefunded => "partially_refunded",
        Refunded => "refunded",
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub kind: String,
    pub amount_cents: i64,
    pub currency: String,
    pub provider: String,
    pub provider_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// ```json
/// { "kind": "charge", "amount_cents": 62244, "currency": "USD", "provider": "stripe", "provider_reference": "pi_3Nx..." }
/// ```
#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    #[serde(default = "default_kind")]
    pub kind: PaymentKind,
    pub amount_cents: i64,
    pub currency: String,
    pub provider: String,
    pub provider_reference: Option<String>,
}

fn default_kind() -> PaymentKind {
    PaymentKind::Charge
}

impl RecordPaymentRequest {
    pub fn validate(&mut self) -> Result<(), AppError> {
        if !(1..=MAX_AMOUNT_CENTS).contains(&self.amount_cents) {
            return Err(AppError::invalid(format!(
                "amount_cents must be between 1 and {MAX_AMOUNT_CENTS}"
            )));
        }
        self.provider = require_text("provider", &self.provider)?.to_lowercase();
        self.currency = crate::models::normalize_currency(&self.currency)?;
        Ok(())
    }
}

/// Totals and derived status of an order's payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSummary {
    pub status: PaymentStatus,
    pub charged_cents: i64,
    pub refunded_cents: i64,
    pub net_paid_cents: i64,
    pub balance_due_cents: i64,
}

impl PaymentSummary {
    /// Derive the summary from an order total and its payment records.
    ///
    /// Fails only if the stored amounts do not fit in `i64`, which the
    /// per-payment and per-order caps rule out for rows written by this service.
    pub fn from_payments(total_cents: i64, payments: &[Payment]) -> Result<Self, AppError> {
        let sum = |kind: PaymentKind| -> Result<i64, AppError> {
            payments
                .iter()
                .filter(|p| p.kind == kind.as_str())
                .try_fold(0i64, |acc, p| acc.checked_add(p.amount_cents))
                .ok_or_else(|| AppError::internal(format!("{kind} total overflows")))
        };
        Ok(Self::from_totals(
            total_cents,
            sum(PaymentKind::Charge)?,
            sum(PaymentKind::Refund)?,
        ))
    }

    pub fn from_totals(total_cents: i64, charged_cents: i64, refunded_cents: i64) -> Self {
        let net_paid_cents = charged_cents.saturating_sub(refunded_cents);

        let status = if charged_cents == 0 {
            PaymentStatus::Unpaid
        } else if refunded_cents >= charged_cents {
            PaymentStatus::Refunded
        } else if refunded_cents > 0 {
            PaymentStatus::PartiallyRefunded
        } else if charged_cents >= total_cents {
            PaymentStatus::Paid
        } else {
            PaymentStatus::PartiallyPaid
        };

        Self {
            status,
            charged_cents,
            refunded_cents,
            net_paid_cents,
            balance_due_cents: total_cents.saturating_sub(net_paid_cents).max(0),
        }
    }
}

/// Response to recording a payment: the new record plus the order's totals.
#[derive(Debug, Serialize)]
pub struct RecordedPayment {
    pub payment: Payment,
    pub summary: PaymentSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(kind: PaymentKind, amount_cents: i64) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            order_id: Uuid::nil(),
            kind: kind.to_string(),
            amount_cents,
            currency: "USD".to_string(),
            provider: "stripe".to_string(),
            provider_reference: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn status_branches() {
        assert_eq!(PaymentSummary::from_totals(1_000, 0, 0).status, PaymentStatus::Unpaid);
        assert_eq!(
            PaymentSummary::from_totals(1_000, 400, 0).status,
            PaymentStatus::PartiallyPaid
        );
        assert_eq!(PaymentSummary::from_totals(1_000, 1_000, 0).status, PaymentStatus::Paid);
        assert_eq!(
            PaymentSummary::from_totals(1_000, 1_000, 200).status,
            PaymentStatus::PartiallyRefunded
        );
        assert_eq!(
            PaymentSummary::from_totals(1_000, 1_000, 1_000).status,
            PaymentStatus::Refunded
        );
        // A free order nobody paid for is still unpaid, not paid.
        assert_eq!(PaymentSummary::from_totals(0, 0, 0).status, PaymentStatus::Unpaid);
    }

    #[test]
    fn summary_from_records() {
        let payments = vec![
            payment(PaymentKind::Charge, 600),
            payment(PaymentKind::Charge, 400),
            payment(PaymentKind::Refund, 250),
        ];
        let summary = PaymentSummary::from_payments(1_000, &payments).unwrap();
        assert_eq!(summary.charged_cents, 1_000);
        assert_eq!(summary.refunded_cents, 250);
        assert_eq!(summary.net_paid_cents, 750);
        assert_eq!(summary.balance_due_cents, 250);
        assert_eq!(summary.status, PaymentStatus::PartiallyRefunded);
    }

    #[test]
    fn request_validation() {
        let mut request = RecordPaymentRequest {
            kind: PaymentKind::Charge,
            amount_cents: 0,
            currency: "usd".to_string(),
            provider: "Stripe".to_string(),
            provider_reference: None,
        };
        assert!(request.validate().is_err());

        request.amount_cents = 100;
        request.validate().unwrap();
        assert_eq!(request.provider, "stripe");
        assert_eq!(request.currency, "USD");

        request.amount_cents = MAX_AMOUNT_CENTS;
        assert!(request.validate().is_ok());
        request.amount_cents = MAX_AMOUNT_CENTS + 1;
        assert!(matches!(request.validate(), Err(AppError::InvalidRequest(_))));
        request.amount_cents = i64::MAX;
        assert!(request.validate().is_err());
    }

    #[test]
    fn overflowing_records_are_an_error() {
        let payments = vec![
            payment(PaymentKind::Charge, i64::MAX),
            payment(PaymentKind::Charge, 1),
        ];
        assert!(matches!(
            PaymentSummary::from_payments(100, &payments),
            Err(AppError::Internal(_))
        ));

        let summary = PaymentSummary::from_totals(100, i64::MAX, 0);
        assert_eq!(summary.balance_due_cents, 0);
        assert_eq!(summary.status, PaymentStatus::Paid);
    }
}
