//! Budget pacing scan of one account

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{Account, Campaign, EntitySource, SourceError};
use crate::report::{AccountReport, ReportData, ReportRow, COLUMNS};
use crate::scheduler::{AccountHandler, WorkUnit};

/// Whole percent of budget spent, rounded down
///
/// `None` when the budget is zero (pacing undefined).
pub fn pacing_percent(spend: Decimal, budget: Decimal) -> Option<i64> {
    if budget.is_zero() {
        return None;
    }
    let ratio = spend.checked_div(budget)?.checked_mul(Decimal::ONE_HUNDRED)?;
    ratio.floor().to_i64()
}

/// Decimal as a JSON number, keeping integral values integral
fn money(value: Decimal) -> Value {
    serde_json::from_str(&value.normalize().to_string()).unwrap_or_else(|_| Value::String(value.to_string()))
}

/// Report row for `campaign`, or `None` when it does not exceed the threshold
pub fn campaign_row(account: &Account, campaign: &Campaign, threshold: u32) -> Option<ReportRow> {
    let pacing = pacing_percent(campaign.spend_today, campaign.budget_amount)?;
    if pacing <= i64::from(threshold) {
        return None;
    }

    let values = [
        Value::from(account.name.clone()),
        Value::from(account.account_number.clone()),
        Value::from(campaign.name.clone()),
        Value::from(campaign.id.clone()),
        money(campaign.budget_amount),
        money(campaign.spend_today),
        Value::from(format!("{pacing}%")),
        Value::from(campaign.impressions),
        Value::from(campaign.clicks),
    ];

    Some(COLUMNS.iter().map(|c| c.to_string()).zip(values).collect())
}

/// Per-account handler flagging campaigns whose spend exceeds the threshold
pub struct PacingScanner {
    source: Arc<dyn EntitySource>,
    threshold: u32,
}

impl PacingScanner {
    /// Scanner over `source` keeping rows strictly above `threshold` percent
    pub fn new(source: Arc<dyn EntitySource>, threshold: u32) -> Self {
        Self { source, threshold }
    }
}

#[async_trait]
impl AccountHandler for PacingScanner {
    type Output = AccountReport;
    type Error = SourceError;

    async fn process(&self, unit: WorkUnit) -> Result<AccountReport, SourceError> {
        let account = self.source.account(&unit.account_id).await?;
        info!(
            account_id = %account.id,
            account_name = %account.name,
            account_number = %account.account_number,
            "Processing account"
        );

        let rows: Vec<ReportRow> = self
            .source
            .campaigns(&account.id)
            .await?
            .filter_map(|campaign| campaign_row(&account, &campaign, self.threshold))
            .collect();

        info!(account_id = %account.id, rows = rows.len(), "Account scan found rows");

        Ok(AccountReport {
            customer_id: account.customer_id,
            account_id: account.id,
            account_number: account.account_number,
            account_name: account.name,
            row_count: rows.len(),
            report_data: ReportData { rows },
        })
    }
}
