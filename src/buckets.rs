//! Payment-method bucketing.
//!
//! Raw payment methods are free strings recorded at checkout; the report only
//! speaks three settlement channels: cash, card, mobile. The mapping is an
//! explicit allow-list — nothing is inferred from the method string. A method
//! outside the list buckets to `None` and is excluded from every bucketed
//! aggregate (its order still counts toward gross sales).

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db;

/// Method identifier that settles to the cash drawer.
const CASH_METHOD: &str = "cash";

/// Method identifier for card-terminal settlements.
const CARD_METHOD: &str = "card";

/// Default mobile-wallet identifiers. Overridable via local_settings
/// (category `reconciliation`, key `mobile_wallet_methods`, comma-separated).
const DEFAULT_MOBILE_WALLETS: &[&str] =
    &["stc_pay", "apple_pay", "google_pay", "mada_pay", "urpay"];

const SETTINGS_CATEGORY: &str = "reconciliation";
const MOBILE_WALLETS_KEY: &str = "mobile_wallet_methods";

/// One of the three canonical settlement channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentBucket {
    Cash,
    Card,
    Mobile,
}

impl PaymentBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Mobile => "mobile",
        }
    }
}

/// Bucketing allow-list. `Default` uses the compiled-in wallet set; `load`
/// reads the settings override when present.
#[derive(Debug, Clone)]
pub struct BucketConfig {
    mobile_wallets: Vec<String>,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            mobile_wallets: DEFAULT_MOBILE_WALLETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BucketConfig {
    /// Load the allow-list, honoring the local_settings override if set.
    pub fn load(conn: &Connection) -> Self {
        match db::get_setting(conn, SETTINGS_CATEGORY, MOBILE_WALLETS_KEY) {
            Some(raw) => {
                let wallets: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                if wallets.is_empty() {
                    Self::default()
                } else {
                    Self { mobile_wallets: wallets }
                }
            }
            None => Self::default(),
        }
    }

    /// Map a raw method identifier to its settlement bucket, or `None` when
    /// the method is not in the allow-list.
    pub fn bucket(&self, method: &str) -> Option<PaymentBucket> {
        if method == CASH_METHOD {
            Some(PaymentBucket::Cash)
        } else if method == CARD_METHOD {
            Some(PaymentBucket::Card)
        } else if self.mobile_wallets.iter().any(|w| w == method) {
            Some(PaymentBucket::Mobile)
        } else {
            None
        }
    }
}

/// Bucket a method against the compiled-in defaults.
pub fn bucket(method: &str) -> Option<PaymentBucket> {
    BucketConfig::default().bucket(method)
}
