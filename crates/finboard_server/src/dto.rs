//! JSON request and response bodies.
//!
//! Amounts leave the server in major units: plain integers in integer mode,
//! two-decimal numbers in decimal mode.

use finboard_core::{
    AmountMode, BucketSnapshot, HistoryRecord, LedgerSnapshot, LedgerUpdateRequest,
    NewTransactionRequest, RawAmount, TransactionRecord, DAY_LABELS, MONTH_LABELS,
};
use serde::{Deserialize, Serialize, Serializer};

/// Minor-unit value rendered according to the deployment amount mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Money {
    minor: i64,
    mode: AmountMode,
}

impl Money {
    pub fn new(minor: i64, mode: AmountMode) -> Self {
        Self { minor, mode }
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.mode {
            AmountMode::Integer => serializer.serialize_i64(self.minor),
            AmountMode::Decimal => serializer.serialize_f64(self.mode.to_major(self.minor)),
        }
    }
}

fn money_series(values: &[i64], mode: AmountMode) -> Vec<Money> {
    values.iter().map(|value| Money::new(*value, mode)).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardsBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: RawAmount,
    #[serde(default)]
    pub is_incremental: bool,
}

impl From<UpdateCardsBody> for LedgerUpdateRequest {
    fn from(body: UpdateCardsBody) -> Self {
        Self {
            kind: body.kind,
            value: body.value,
            is_incremental: body.is_incremental,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: RawAmount,
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl From<TransactionBody> for NewTransactionRequest {
    fn from(body: TransactionBody) -> Self {
        Self {
            kind: body.kind,
            amount: body.amount,
            timestamp: body.timestamp,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CardsResponse {
    pub savings: Money,
    pub income: Money,
    pub expenses: Money,
    pub balance: Money,
}

impl CardsResponse {
    pub fn from_snapshot(snapshot: &LedgerSnapshot, mode: AmountMode) -> Self {
        Self {
            savings: Money::new(snapshot.savings, mode),
            income: Money::new(snapshot.income, mode),
            expenses: Money::new(snapshot.expenses, mode),
            balance: Money::new(snapshot.balance(), mode),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChartsResponse {
    pub months: [&'static str; 12],
    pub income: Vec<Money>,
    pub expenses: Vec<Money>,
    pub days: [&'static str; 7],
    pub earning: Vec<Money>,
    pub spent: Vec<Money>,
}

impl ChartsResponse {
    pub fn from_buckets(buckets: &BucketSnapshot, mode: AmountMode) -> Self {
        Self {
            months: MONTH_LABELS,
            income: money_series(&buckets.monthly.income, mode),
            expenses: money_series(&buckets.monthly.expenses, mode),
            days: DAY_LABELS,
            earning: money_series(&buckets.weekly.earning, mode),
            spent: money_series(&buckets.weekly.spent, mode),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryResponse {
    pub id: i64,
    pub operation_type: &'static str,
    pub amount: Money,
    pub is_incremental: bool,
    pub timestamp: i64,
}

impl HistoryEntryResponse {
    pub fn from_record(record: &HistoryRecord, mode: AmountMode) -> Self {
        Self {
            id: record.id,
            operation_type: record.kind.as_str(),
            amount: Money::new(record.amount.minor(), mode),
            is_incremental: record.is_incremental,
            timestamp: record.recorded_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub amount: Money,
    pub timestamp: i64,
    pub created_at: i64,
}

impl TransactionResponse {
    pub fn from_record(record: &TransactionRecord, mode: AmountMode) -> Self {
        Self {
            id: record.id,
            kind: record.kind.as_db(),
            amount: Money::new(record.amount.minor(), mode),
            timestamp: record.occurred_at,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::{CardsResponse, Money, UpdateCardsBody};
    use finboard_core::{AmountMode, LedgerSnapshot, RawAmount};

    #[test]
    fn money_renders_by_mode() {
        assert_eq!(
            serde_json::to_string(&Money::new(1250, AmountMode::Integer)).unwrap(),
            "1250"
        );
        assert_eq!(
            serde_json::to_string(&Money::new(1250, AmountMode::Decimal)).unwrap(),
            "12.5"
        );
    }

    #[test]
    fn update_body_defaults_incremental_to_false() {
        let body: UpdateCardsBody =
            serde_json::from_str(r#"{"type":"savings","value":500}"#).unwrap();
        assert_eq!(body.kind, "savings");
        assert_eq!(body.value, RawAmount::from(500));
        assert!(!body.is_incremental);
    }

    #[test]
    fn cards_response_includes_derived_balance() {
        let cards = CardsResponse::from_snapshot(&LedgerSnapshot::new(100, 500, 200), AmountMode::Integer);
        let json = serde_json::to_value(&cards).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"savings": 100, "income": 500, "expenses": 200, "balance": 300})
        );
    }
}
