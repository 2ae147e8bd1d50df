use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Accounting totals for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    /// First day of the month
    pub month: NaiveDate,
    pub inflows: Decimal,
    pub outflows: Decimal,
    pub transaction_count: i64,
}

impl MonthlyAggregate {
    pub fn net_flow(&self) -> Decimal {
        self.inflows - self.outflows
    }
}

/// Static business facts used as ML context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessContext {
    pub sector: Option<String>,
    pub years_in_operation: Option<f64>,
    pub employee_count: Option<i64>,
}

/// Aggregated accounting activity of a company over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub company_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_inflows: Decimal,
    pub total_outflows: Decimal,
    pub transaction_count: i64,
    pub avg_balance: Decimal,
    /// Oldest month first
    pub monthly: Vec<MonthlyAggregate>,
    /// Operation type (e.g. "sale", "purchase", "payroll") to occurrences
    pub operation_counts: BTreeMap<String, i64>,
    pub business: BusinessContext,
}

impl ActivitySummary {
    /// Window with no recorded activity
    pub fn empty(company_id: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            company_id: company_id.into(),
            period_start: start,
            period_end: end,
            total_inflows: Decimal::ZERO,
            total_outflows: Decimal::ZERO,
            transaction_count: 0,
            avg_balance: Decimal::ZERO,
            monthly: Vec::new(),
            operation_counts: BTreeMap::new(),
            business: BusinessContext::default(),
        }
    }

    pub fn net_cash_flow(&self) -> Decimal {
        self.total_inflows - self.total_outflows
    }

    pub fn avg_transaction_size(&self) -> Decimal {
        if self.transaction_count > 0 {
            ((self.total_inflows + self.total_outflows) / Decimal::from(self.transaction_count))
                .round_dp(2)
        } else {
            Decimal::ZERO
        }
    }

    /// Net flow as a share of inflows, 0 when there were no inflows
    pub fn net_margin(&self) -> f64 {
        let inflows = decimal_to_f64(self.total_inflows);
        if inflows > 0.0 {
            decimal_to_f64(self.net_cash_flow()) / inflows
        } else {
            0.0
        }
    }
}

pub(crate) fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
