//! Ledger row types read by the reconciliation engine.
//!
//! These mirror the SQLite schema in [`crate::db`]. Amounts stay f64 at this
//! boundary (REAL columns); the engine converts to `Decimal` before doing any
//! arithmetic. Enum-like TEXT columns parse strictly: an unknown stored value
//! means the snapshot is corrupt and the whole computation aborts.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    Held,
    Paid,
    Refunded,
    Cancelled,
    Voided,
}

impl OrderStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "held" => Some(Self::Held),
            "paid" => Some(Self::Paid),
            "refunded" => Some(Self::Refunded),
            "cancelled" => Some(Self::Cancelled),
            "voided" => Some(Self::Voided),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Held => "held",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
            Self::Voided => "voided",
        }
    }

    /// Fiscally completed — participates in the report.
    pub fn is_counted(self) -> bool {
        matches!(self, Self::Paid | Self::Refunded)
    }

    /// Counted under `cancelledOrders` in the report.
    pub fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled | Self::Voided)
    }
}

/// How an order's discount_value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// discount_value is a percentage of the subtotal.
    Percentage,
    /// discount_value is an absolute amount.
    Fixed,
    None,
}

impl DiscountType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(Self::Percentage),
            "fixed" => Some(Self::Fixed),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
            Self::None => "none",
        }
    }
}

/// Manual drawer movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashTxKind {
    CashIn,
    CashOut,
}

impl CashTxKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash_in" => Some(Self::CashIn),
            "cash_out" => Some(Self::CashOut),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CashIn => "cash_in",
            Self::CashOut => "cash_out",
        }
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A till session bounded by open/close timestamps and cash counts.
/// `closed_at`/`closing_cash` are null while the shift is still open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub opened_at: String,
    pub closed_at: Option<String>,
    pub opening_cash: f64,
    pub closing_cash: Option<f64>,
}

impl Shift {
    /// Status is implicit: closed once `closed_at` is recorded.
    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }
}

/// One order with its payments, in recorded order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub shift_id: String,
    pub status: OrderStatus,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub service_charge: f64,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub total: f64,
    pub payments: Vec<Payment>,
}

/// A settled payment belonging to exactly one order. The method is a free
/// string identifier ("cash", "visa", wallet names); bucketing happens in
/// [`crate::buckets`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub method: String,
    pub amount: f64,
}

/// A refund against one order. No payment-method link is stored — attribution
/// back to buckets is the allocator's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub order_id: String,
    pub amount: f64,
    pub reason: Option<String>,
}

/// Manual drawer adjustment unrelated to sales (paid-outs, float top-ups).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashTransaction {
    pub id: String,
    pub shift_id: String,
    pub kind: CashTxKind,
    pub amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_parse_roundtrip() {
        for s in ["open", "held", "paid", "refunded", "cancelled", "voided"] {
            let parsed = OrderStatus::parse(s).expect("known status");
            assert_eq!(parsed.as_str(), s);
        }
        assert!(OrderStatus::parse("canceled").is_none()); // US spelling is not in the schema
        assert!(OrderStatus::parse("").is_none());
    }

    #[test]
    fn test_counted_statuses() {
        assert!(OrderStatus::Paid.is_counted());
        assert!(OrderStatus::Refunded.is_counted());
        for s in [
            OrderStatus::Open,
            OrderStatus::Held,
            OrderStatus::Cancelled,
            OrderStatus::Voided,
        ] {
            assert!(!s.is_counted(), "{} must not be counted", s.as_str());
        }
    }

    #[test]
    fn test_cancelled_covers_voided() {
        assert!(OrderStatus::Cancelled.is_cancelled());
        assert!(OrderStatus::Voided.is_cancelled());
        assert!(!OrderStatus::Paid.is_cancelled());
        assert!(!OrderStatus::Open.is_cancelled());
    }

    #[test]
    fn test_discount_type_parse() {
        assert_eq!(DiscountType::parse("percentage"), Some(DiscountType::Percentage));
        assert_eq!(DiscountType::parse("fixed"), Some(DiscountType::Fixed));
        assert_eq!(DiscountType::parse("none"), Some(DiscountType::None));
        assert!(DiscountType::parse("percent").is_none());
    }

    #[test]
    fn test_cash_tx_kind_parse() {
        assert_eq!(CashTxKind::parse("cash_in"), Some(CashTxKind::CashIn));
        assert_eq!(CashTxKind::parse("cash_out"), Some(CashTxKind::CashOut));
        assert!(CashTxKind::parse("drop").is_none());
    }

    #[test]
    fn test_shift_implicit_status() {
        let mut shift = Shift {
            id: "sh-1".into(),
            opened_at: "2025-06-01T08:00:00Z".into(),
            closed_at: None,
            opening_cash: 50.0,
            closing_cash: None,
        };
        assert!(!shift.is_closed());
        shift.closed_at = Some("2025-06-01T16:00:00Z".into());
        assert!(shift.is_closed());
    }
}
