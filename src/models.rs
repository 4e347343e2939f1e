use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Raw item as typed into the sale form, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub name: String,
    pub price: Decimal,
    pub quantity: i64,
}

impl CandidateItem {
    pub fn new(name: impl Into<String>, price: Decimal, quantity: i64) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
        }
    }

    /// Returns the validated line item, or `None` for an empty name,
    /// a non-positive price or a non-positive quantity.
    pub fn accept(&self) -> Option<LineItem> {
        let name = self.name.trim();
        if name.is_empty() || self.price <= Decimal::ZERO || self.quantity < 1 {
            return None;
        }
        let quantity = u32::try_from(self.quantity).ok()?;
        Some(LineItem {
            name: name.to_string(),
            unit_price: self.price,
            quantity,
        })
    }
}

/// Parses `NAME:PRICE` or `NAME:PRICExQTY`, e.g. `Tea:20x3`.
impl FromStr for CandidateItem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, rest) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected NAME:PRICE[xQTY], got '{}'", s))?;

        let (price, quantity) = match rest.split_once(|c| c == 'x' || c == 'X') {
            Some((price, qty)) => {
                let qty = qty
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| format!("invalid quantity '{}': {}", qty, e))?;
                (price, qty)
            }
            None => (rest, 1),
        };

        let price = Decimal::from_str(price.trim())
            .map_err(|e| format!("invalid price '{}': {}", price, e))?;

        Ok(CandidateItem::new(name, price, quantity))
    }
}

/// A validated sale line. Serialized as `{name, price, quantity}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    /// `None` when the product does not fit a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesTransaction {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub sale_date: NaiveDate,
    pub items: Vec<LineItem>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSalesTransaction {
    pub sale_date: NaiveDate,
    pub items: Vec<LineItem>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One row per calendar date holding that date's running sales total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub date: NaiveDate,
    pub total_amount: Decimal,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDailyAggregate {
    pub date: NaiveDate,
    pub total_amount: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_amount: Decimal,
    pub transaction_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub total_amount: Decimal,
}

/// Ids are uuids on the hosted backend but may be integers on older schemas.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
