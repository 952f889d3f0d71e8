//! shift-recon — end-of-shift (Z-report) reconciliation engine.
//!
//! Reads one shift's ledger (orders with payments, refunds, manual drawer
//! movements) from the terminal's local SQLite store and reconciles it into a
//! single immutable report: gross and adjusted sales, per-bucket payment
//! breakdowns, refund attribution, and the cash drawer variance.
//!
//! Entry point: [`compute_shift_report`]. A committed snapshot can be
//! persisted idempotently with [`save_report`].

use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod buckets;
pub mod db;
pub mod error;
pub mod ledger;
pub mod models;
pub mod money;
pub mod zreport;

pub use buckets::{bucket, BucketConfig, PaymentBucket};
pub use error::ReportError;
pub use ledger::{load_shift_ledger, ShiftLedger};
pub use zreport::{
    build_report, compute_shift_report, get_saved_report, save_report, SavedReport, ShiftReport,
};

/// Initialize structured logging (console, plus a daily rolling file when a
/// log directory is given).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(log_dir: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shift_recon=debug"));

    let file_layer = log_dir.map(|dir| {
        std::fs::create_dir_all(dir).ok();
        let file_appender = tracing_appender::rolling::daily(dir, "recon");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Keep the guard alive for the lifetime of the process — dropping it
        // flushes and closes the log file. Leaked intentionally.
        std::mem::forget(guard);
        fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
    });
    let console_layer = fmt::layer().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
