//! Ledger Reader — loads one shift's complete ledger snapshot.
//!
//! Four reads against the same connection (shift, orders with payments,
//! refunds, cash transactions), taken as one point-in-time snapshot. The
//! loader is read-only and all-or-nothing: any SQL failure or uninterpretable
//! stored value aborts the load, so the engine never computes over a partial
//! or corrupt snapshot. A missing shift is not a failure — it yields `None`.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;

use crate::error::ReportError;
use crate::models::{CashTransaction, CashTxKind, DiscountType, Order, OrderStatus, Payment, Refund, Shift};

/// Everything the engine needs to reconcile one shift.
#[derive(Debug, Clone)]
pub struct ShiftLedger {
    pub shift: Shift,
    pub orders: Vec<Order>,
    pub refunds: Vec<Refund>,
    pub cash_transactions: Vec<CashTransaction>,
}

/// Load the full ledger snapshot for `shift_id`, or `None` if no such shift.
pub fn load_shift_ledger(
    conn: &Connection,
    shift_id: &str,
) -> Result<Option<ShiftLedger>, ReportError> {
    let shift = match load_shift(conn, shift_id)? {
        Some(s) => s,
        None => return Ok(None),
    };

    let orders = load_orders(conn, shift_id)?;
    let refunds = load_refunds(conn, shift_id)?;
    let cash_transactions = load_cash_transactions(conn, shift_id)?;

    Ok(Some(ShiftLedger {
        shift,
        orders,
        refunds,
        cash_transactions,
    }))
}

fn load_shift(conn: &Connection, shift_id: &str) -> Result<Option<Shift>, ReportError> {
    let row = conn
        .query_row(
            "SELECT id, opened_at, closed_at, opening_cash_amount, closing_cash_amount
             FROM shifts WHERE id = ?1",
            params![shift_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((id, opened_at, closed_at, opening_cash, closing_cash)) = row else {
        return Ok(None);
    };

    Ok(Some(Shift {
        opening_cash: finite(opening_cash, "shifts.opening_cash_amount", &id)?,
        closing_cash: closing_cash
            .map(|v| finite(v, "shifts.closing_cash_amount", &id))
            .transpose()?,
        id,
        opened_at,
        closed_at,
    }))
}

fn load_orders(conn: &Connection, shift_id: &str) -> Result<Vec<Order>, ReportError> {
    let mut stmt = conn.prepare(
        "SELECT id, shift_id, status, subtotal, tax_amount, service_charge,
                discount_type, discount_value, total_amount
         FROM orders WHERE shift_id = ?1
         ORDER BY created_at ASC, id ASC",
    )?;

    let raw: Vec<(String, String, String, f64, f64, f64, String, f64, f64)> = stmt
        .query_map(params![shift_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
            ))
        })?
        .collect::<Result<_, _>>()?;

    let mut orders = Vec::with_capacity(raw.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(raw.len());

    for (id, shift_id, status, subtotal, tax, service, dtype, dvalue, total) in raw {
        let status = OrderStatus::parse(&status).ok_or_else(|| {
            ReportError::InvalidData(format!("unknown order status '{status}' on order {id}"))
        })?;
        let discount_type = DiscountType::parse(&dtype).ok_or_else(|| {
            ReportError::InvalidData(format!("unknown discount type '{dtype}' on order {id}"))
        })?;

        index.insert(id.clone(), orders.len());
        orders.push(Order {
            subtotal: finite(subtotal, "orders.subtotal", &id)?,
            tax_amount: finite(tax, "orders.tax_amount", &id)?,
            service_charge: finite(service, "orders.service_charge", &id)?,
            discount_value: finite(dvalue, "orders.discount_value", &id)?,
            total: finite(total, "orders.total_amount", &id)?,
            id,
            shift_id,
            status,
            discount_type,
            payments: Vec::new(),
        });
    }

    // Attach payments in recorded order, one pass over the shift's payments.
    let mut pay_stmt = conn.prepare(
        "SELECT p.id, p.order_id, p.method, p.amount
         FROM order_payments p
         JOIN orders o ON o.id = p.order_id
         WHERE o.shift_id = ?1
         ORDER BY p.created_at ASC, p.id ASC",
    )?;

    let payments: Vec<(String, String, String, f64)> = pay_stmt
        .query_map(params![shift_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<Result<_, _>>()?;

    for (id, order_id, method, amount) in payments {
        let amount = finite(amount, "order_payments.amount", &id)?;
        if let Some(&idx) = index.get(&order_id) {
            orders[idx].payments.push(Payment {
                id,
                order_id,
                method,
                amount,
            });
        }
    }

    Ok(orders)
}

fn load_refunds(conn: &Connection, shift_id: &str) -> Result<Vec<Refund>, ReportError> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.order_id, r.amount, r.reason
         FROM order_refunds r
         JOIN orders o ON o.id = r.order_id
         WHERE o.shift_id = ?1
         ORDER BY r.created_at ASC, r.id ASC",
    )?;

    let raw: Vec<(String, String, f64, Option<String>)> = stmt
        .query_map(params![shift_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<Result<_, _>>()?;

    raw.into_iter()
        .map(|(id, order_id, amount, reason)| {
            Ok(Refund {
                amount: finite(amount, "order_refunds.amount", &id)?,
                id,
                order_id,
                reason,
            })
        })
        .collect()
}

fn load_cash_transactions(
    conn: &Connection,
    shift_id: &str,
) -> Result<Vec<CashTransaction>, ReportError> {
    let mut stmt = conn.prepare(
        "SELECT id, shift_id, tx_type, amount
         FROM cash_transactions
         WHERE shift_id = ?1
         ORDER BY created_at ASC, id ASC",
    )?;

    let raw: Vec<(String, String, String, f64)> = stmt
        .query_map(params![shift_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<Result<_, _>>()?;

    raw.into_iter()
        .map(|(id, shift_id, tx_type, amount)| {
            let kind = CashTxKind::parse(&tx_type).ok_or_else(|| {
                ReportError::InvalidData(format!(
                    "unknown cash transaction type '{tx_type}' on {id}"
                ))
            })?;
            Ok(CashTransaction {
                amount: finite(amount, "cash_transactions.amount", &id)?,
                id,
                shift_id,
                kind,
            })
        })
        .collect()
}

/// Reject non-finite amounts at the boundary so the engine's decimal
/// conversion never silently zeroes a corrupt value.
fn finite(value: f64, column: &str, row_id: &str) -> Result<f64, ReportError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ReportError::InvalidData(format!(
            "non-finite {column} ({value}) on {row_id}"
        )))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
