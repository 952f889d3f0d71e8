//! Z-Report (end-of-shift) reconciliation engine.
//!
//! Produces the financial snapshot for one till session: gross figures over
//! fiscally completed orders, per-bucket payment breakdowns, refund
//! attribution across split payments, net ("adjusted") figures, and the cash
//! drawer variance.
//!
//! Two policies are load-bearing and must not be "improved" without an
//! explicit product decision:
//!
//! - **No clamping.** Adjusted and net figures may go negative. A negative
//!   value means the ledger disagrees with itself (e.g. a refund attributed
//!   to a bucket that never received that much payment) and the auditor needs
//!   to see it.
//! - **Refund composition is an estimate.** Refund rows carry no line-item or
//!   payment-method detail, so tax/service/subtotal composition is a linear
//!   ratio against the original order totals, and an unattributable refund is
//!   charged to the cash drawer (worst case for the variance).
//!
//! The computation is a pure fold over one immutable ledger snapshot; the
//! same snapshot always reconciles to the same report.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::MutexGuard;
use tracing::{info, warn};
use uuid::Uuid;

use crate::buckets::{BucketConfig, PaymentBucket};
use crate::db::DbState;
use crate::error::ReportError;
use crate::ledger::{self, ShiftLedger};
use crate::models::{CashTxKind, DiscountType, Order, Refund};
use crate::money::{to_decimal, to_f64};

// ---------------------------------------------------------------------------
// Report record
// ---------------------------------------------------------------------------

/// The reconciled end-of-shift report. All monetary fields are rounded to
/// 2 decimal places at assembly; `cashDifference` and the closing fields are
/// null while the shift is still open (preview report).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftReport {
    pub shift_id: String,
    pub opened_at: String,
    pub closed_at: Option<String>,
    pub opening_cash: f64,
    pub closing_cash: Option<f64>,

    pub total_orders: i64,
    pub cancelled_orders: i64,
    pub refund_count: i64,

    pub gross_sales: f64,
    pub gross_net_sales: f64,
    pub gross_tax: f64,
    pub gross_service_charge: f64,
    pub total_discounts: f64,
    pub gross_cash_payments: f64,
    pub gross_card_payments: f64,
    pub gross_mobile_payments: f64,

    pub refunds_total: f64,
    pub refund_tax: f64,
    pub refund_service_charge: f64,
    pub refund_subtotal: f64,
    pub cash_refunds: f64,
    pub card_refunds: f64,
    pub mobile_refunds: f64,

    pub adjusted_sales: f64,
    pub adjusted_net_sales: f64,
    pub adjusted_tax: f64,
    pub adjusted_service_charge: f64,
    pub net_cash_payments: f64,
    pub net_card_payments: f64,
    pub net_mobile_payments: f64,

    pub cash_in: f64,
    pub cash_out: f64,
    pub expected_cash: f64,
    pub cash_difference: Option<f64>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Compute the Z-report for a shift.
///
/// Returns `Ok(None)` when the shift does not exist. Any ledger fetch
/// failure aborts the whole computation — a partial report is never
/// returned. Idempotent for a closed shift: unchanged ledger data yields a
/// byte-identical serialized report.
pub fn compute_shift_report(
    db: &DbState,
    shift_id: &str,
) -> Result<Option<ShiftReport>, ReportError> {
    let conn = lock(db)?;
    let cfg = BucketConfig::load(&conn);

    let Some(ledger) = ledger::load_shift_ledger(&conn, shift_id)? else {
        info!(shift_id = %shift_id, "Shift not found — no report");
        return Ok(None);
    };

    Ok(Some(build_report(&ledger, &cfg)))
}

/// Reconcile an already-loaded ledger snapshot. Pure; no I/O.
pub fn build_report(ledger: &ShiftLedger, cfg: &BucketConfig) -> ShiftReport {
    let gross = ledger
        .orders
        .iter()
        .filter(|o| o.status.is_counted())
        .fold(GrossTally::default(), |tally, order| tally.add(order, cfg));

    let cancelled_orders = ledger
        .orders
        .iter()
        .filter(|o| o.status.is_cancelled())
        .count() as i64;

    let counted: HashMap<&str, &Order> = ledger
        .orders
        .iter()
        .filter(|o| o.status.is_counted())
        .map(|o| (o.id.as_str(), o))
        .collect();

    let refunds = ledger
        .refunds
        .iter()
        .fold(RefundTally::default(), |tally, refund| {
            tally.add(refund, &counted, cfg)
        });

    let (cash_in, cash_out) = ledger.cash_transactions.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(cin, cout), tx| match tx.kind {
            CashTxKind::CashIn => (cin + to_decimal(tx.amount), cout),
            CashTxKind::CashOut => (cin, cout + to_decimal(tx.amount)),
        },
    );

    // Net figures: gross minus attributed refunds, never clamped.
    let net_cash = gross.cash - refunds.cash;
    let net_card = gross.card - refunds.card;
    let net_mobile = gross.mobile - refunds.mobile;

    let expected_cash = to_decimal(ledger.shift.opening_cash) + net_cash + cash_in - cash_out;
    let cash_difference = ledger
        .shift
        .closing_cash
        .map(|closing| to_decimal(closing) - expected_cash);

    ShiftReport {
        shift_id: ledger.shift.id.clone(),
        opened_at: ledger.shift.opened_at.clone(),
        closed_at: ledger.shift.closed_at.clone(),
        opening_cash: to_f64(to_decimal(ledger.shift.opening_cash)),
        closing_cash: ledger.shift.closing_cash.map(|c| to_f64(to_decimal(c))),

        total_orders: gross.orders,
        cancelled_orders,
        refund_count: refunds.count,

        gross_sales: to_f64(gross.sales),
        gross_net_sales: to_f64(gross.net_sales),
        gross_tax: to_f64(gross.tax),
        gross_service_charge: to_f64(gross.service_charge),
        total_discounts: to_f64(gross.discounts),
        gross_cash_payments: to_f64(gross.cash),
        gross_card_payments: to_f64(gross.card),
        gross_mobile_payments: to_f64(gross.mobile),

        refunds_total: to_f64(refunds.total),
        refund_tax: to_f64(refunds.tax),
        refund_service_charge: to_f64(refunds.service_charge),
        refund_subtotal: to_f64(refunds.subtotal),
        cash_refunds: to_f64(refunds.cash),
        card_refunds: to_f64(refunds.card),
        mobile_refunds: to_f64(refunds.mobile),

        adjusted_sales: to_f64(gross.sales - refunds.total),
        adjusted_net_sales: to_f64(gross.net_sales - refunds.subtotal),
        adjusted_tax: to_f64(gross.tax - refunds.tax),
        adjusted_service_charge: to_f64(gross.service_charge - refunds.service_charge),
        net_cash_payments: to_f64(net_cash),
        net_card_payments: to_f64(net_card),
        net_mobile_payments: to_f64(net_mobile),

        cash_in: to_f64(cash_in),
        cash_out: to_f64(cash_out),
        expected_cash: to_f64(expected_cash),
        cash_difference: cash_difference.map(to_f64),
    }
}

// ---------------------------------------------------------------------------
// Gross aggregation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct GrossTally {
    orders: i64,
    sales: Decimal,
    net_sales: Decimal,
    tax: Decimal,
    service_charge: Decimal,
    discounts: Decimal,
    cash: Decimal,
    card: Decimal,
    mobile: Decimal,
}

impl GrossTally {
    fn add(mut self, order: &Order, cfg: &BucketConfig) -> Self {
        let subtotal = to_decimal(order.subtotal);

        self.orders += 1;
        self.sales += to_decimal(order.total);
        self.net_sales += subtotal;
        self.tax += to_decimal(order.tax_amount);
        self.service_charge += to_decimal(order.service_charge);
        self.discounts += match order.discount_type {
            DiscountType::Percentage => {
                subtotal * to_decimal(order.discount_value) / Decimal::ONE_HUNDRED
            }
            DiscountType::Fixed => to_decimal(order.discount_value),
            DiscountType::None => Decimal::ZERO,
        };

        // Unsupported methods fall out of the bucketed sums; the order's
        // total has already been counted above.
        for payment in &order.payments {
            match cfg.bucket(&payment.method) {
                Some(PaymentBucket::Cash) => self.cash += to_decimal(payment.amount),
                Some(PaymentBucket::Card) => self.card += to_decimal(payment.amount),
                Some(PaymentBucket::Mobile) => self.mobile += to_decimal(payment.amount),
                None => {}
            }
        }

        self
    }
}

// ---------------------------------------------------------------------------
// Refund allocation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RefundTally {
    count: i64,
    total: Decimal,
    cash: Decimal,
    card: Decimal,
    mobile: Decimal,
    tax: Decimal,
    service_charge: Decimal,
    subtotal: Decimal,
}

impl RefundTally {
    /// Attribute one refund to payment buckets and estimate its composition.
    ///
    /// A refund whose order is not among the counted orders is skipped
    /// entirely — it contributes to no aggregate, including `count`.
    fn add(
        mut self,
        refund: &Refund,
        counted: &HashMap<&str, &Order>,
        cfg: &BucketConfig,
    ) -> Self {
        let Some(order) = counted.get(refund.order_id.as_str()) else {
            warn!(
                refund_id = %refund.id,
                order_id = %refund.order_id,
                "Refund references no counted order — skipped"
            );
            return self;
        };

        let amount = to_decimal(refund.amount);

        let supported: Vec<(PaymentBucket, Decimal)> = order
            .payments
            .iter()
            .filter_map(|p| cfg.bucket(&p.method).map(|b| (b, to_decimal(p.amount))))
            .collect();
        let attributable: Decimal = supported.iter().map(|(_, paid)| *paid).sum();

        if attributable.is_zero() {
            // No attributable payment: charge the drawer (worst case for the
            // cash variance). Deliberate accounting choice, not a guess at
            // the likely bucket.
            self.cash += amount;
        } else if supported.len() == 1 {
            self.bucket_add(supported[0].0, amount);
        } else {
            // Split payment: allocate pro rata to each funding bucket.
            for (bucket, paid) in &supported {
                self.bucket_add(*bucket, amount * *paid / attributable);
            }
        }

        // Composition estimate: linear ratio against the original order
        // totals. Nothing records which line items were returned, so this
        // diverges when a refund is not proportional to the order's
        // tax/service mix.
        let order_total = to_decimal(order.total);
        if !order_total.is_zero() {
            let ratio = amount / order_total;
            self.tax += to_decimal(order.tax_amount) * ratio;
            self.service_charge += to_decimal(order.service_charge) * ratio;
            self.subtotal += to_decimal(order.subtotal) * ratio;
        }

        self.total += amount;
        self.count += 1;
        self
    }

    fn bucket_add(&mut self, bucket: PaymentBucket, amount: Decimal) {
        match bucket {
            PaymentBucket::Cash => self.cash += amount,
            PaymentBucket::Card => self.card += amount,
            PaymentBucket::Mobile => self.mobile += amount,
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted snapshots
// ---------------------------------------------------------------------------

/// A committed Z-report snapshot from the `z_reports` table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedReport {
    pub id: String,
    pub shift_id: String,
    pub generated_at: String,
    /// True when an already-committed snapshot was returned instead of
    /// writing a new row.
    pub existing: bool,
    pub report: ShiftReport,
}

/// Persist a computed report.
///
/// **Idempotent:** if a snapshot already exists for this shift, it is
/// returned unchanged and nothing is written.
pub fn save_report(db: &DbState, report: &ShiftReport) -> Result<SavedReport, ReportError> {
    let conn = lock(db)?;

    if let Some(saved) = fetch_saved(&conn, &report.shift_id)? {
        info!(
            z_report_id = %saved.id,
            shift_id = %saved.shift_id,
            "Z-report snapshot already committed — returning existing"
        );
        return Ok(saved);
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let report_json = serde_json::to_string(report)
        .map_err(|e| ReportError::InvalidData(format!("serialize report: {e}")))?;

    conn.execute(
        "INSERT INTO z_reports (
            id, shift_id, generated_at,
            gross_sales, refunds_total, adjusted_sales,
            expected_cash, cash_difference, report_json
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            report.shift_id,
            now,
            report.gross_sales,
            report.refunds_total,
            report.adjusted_sales,
            report.expected_cash,
            report.cash_difference,
            report_json,
        ],
    )?;

    info!(
        z_report_id = %id,
        shift_id = %report.shift_id,
        gross_sales = %report.gross_sales,
        adjusted_sales = %report.adjusted_sales,
        "Z-report snapshot committed"
    );

    Ok(SavedReport {
        id,
        shift_id: report.shift_id.clone(),
        generated_at: now,
        existing: false,
        report: report.clone(),
    })
}

/// Fetch the committed snapshot for a shift, if any.
pub fn get_saved_report(
    db: &DbState,
    shift_id: &str,
) -> Result<Option<SavedReport>, ReportError> {
    let conn = lock(db)?;
    fetch_saved(&conn, shift_id)
}

fn fetch_saved(conn: &Connection, shift_id: &str) -> Result<Option<SavedReport>, ReportError> {
    let row = conn
        .query_row(
            "SELECT id, generated_at, report_json FROM z_reports WHERE shift_id = ?1",
            params![shift_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((id, generated_at, report_json)) = row else {
        return Ok(None);
    };

    let report: ShiftReport = serde_json::from_str(&report_json)
        .map_err(|e| ReportError::InvalidData(format!("stored z_report {id}: {e}")))?;

    Ok(Some(SavedReport {
        id,
        shift_id: shift_id.to_string(),
        generated_at,
        existing: true,
        report,
    }))
}

fn lock(db: &DbState) -> Result<MutexGuard<'_, Connection>, ReportError> {
    db.conn.lock().map_err(|_| ReportError::LockPoisoned)
}

// ===========================================================================
// Tests
// ===========================================================================
