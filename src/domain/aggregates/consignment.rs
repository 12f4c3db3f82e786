//! Consignments: stock placed with a partner shop for resale.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsignmentStatus { #[default] Open, Settled, Cancelled }

impl ConsignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Open => "OPEN", Self::Settled => "SETTLED", Self::Cancelled => "CANCELLED" }
    }
}

impl TryFrom<String> for ConsignmentStatus {
    type Error = ConsignmentError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "OPEN" => Ok(Self::Open),
            "SETTLED" => Ok(Self::Settled),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(ConsignmentError::UnknownStatus(value)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Consignment {
    pub id: Uuid,
    pub reference: String,
    pub partner_name: String,
    pub partner_contact: Option<String>,
    pub commission_rate: Decimal,
    #[sqlx(try_from = "String")]
    pub status: ConsignmentStatus,
    pub notes: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConsignmentItem {
    pub id: Uuid,
    pub consignment_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub sku: String,
    pub quantity_sent: i32,
    pub quantity_sold: i32,
    pub quantity_returned: i32,
    pub unit_price: Decimal,
}

impl ConsignmentItem {
    /// Units still sitting at the partner.
    pub fn outstanding(&self) -> i32 { self.quantity_sent - self.quantity_sold - self.quantity_returned }

    pub fn record_sold(&mut self, qty: i32) -> Result<(), ConsignmentError> {
        self.check_outstanding(qty)?;
        self.quantity_sold += qty;
        Ok(())
    }

    pub fn record_returned(&mut self, qty: i32) -> Result<(), ConsignmentError> {
        self.check_outstanding(qty)?;
        self.quantity_returned += qty;
        Ok(())
    }

    fn check_outstanding(&self, qty: i32) -> Result<(), ConsignmentError> {
        if qty <= 0 { return Err(ConsignmentError::InvalidQuantity); }
        if qty > self.outstanding() {
            return Err(ConsignmentError::ExceedsOutstanding { sku: self.sku.clone(), outstanding: self.outstanding(), requested: qty });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ConsignmentDetail {
    #[serde(flatten)]
    pub consignment: Consignment,
    pub items: Vec<ConsignmentItem>,
    pub settlement: Settlement,
}

/// Money owed by the partner for what it has sold so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub units_sold: i32,
    pub gross: Decimal,
    pub commission: Decimal,
    pub net_payable: Decimal,
}

impl Settlement {
    pub fn compute(items: &[ConsignmentItem], commission_rate: Decimal) -> Self {
        let units_sold = items.iter().map(|i| i.quantity_sold).sum();
        let gross: Decimal = items.iter().map(|i| i.unit_price * Decimal::from(i.quantity_sold)).sum();
        let commission = (gross * commission_rate).round_dp(2);
        Self { units_sold, gross, commission, net_payable: gross - commission }
    }
}

impl Consignment {
    pub fn ensure_open(&self) -> Result<(), ConsignmentError> {
        if self.status == ConsignmentStatus::Open { Ok(()) } else { Err(ConsignmentError::Closed(self.status)) }
    }
}

pub fn validate_commission_rate(rate: Decimal) -> Result<(), ConsignmentError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE { Err(ConsignmentError::InvalidCommission) } else { Ok(()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsignmentError {
    InvalidQuantity,
    InvalidCommission,
    ExceedsOutstanding { sku: String, outstanding: i32, requested: i32 },
    Closed(ConsignmentStatus),
    UnknownStatus(String),
}
impl std::error::Error for ConsignmentError {}
impl std::fmt::Display for ConsignmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity => write!(f, "Quantity must be positive"),
            Self::InvalidCommission => write!(f, "Commission rate must be between 0 and 1"),
            Self::ExceedsOutstanding { sku, outstanding, requested } => {
                write!(f, "{sku}: only {outstanding} units outstanding, {requested} requested")
            }
            Self::Closed(status) => write!(f, "Consignment is {}", status.as_str()),
            Self::UnknownStatus(s) => write!(f, "Unknown consignment status: {s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sent: i32, price: i64) -> ConsignmentItem {
        ConsignmentItem {
            id: Uuid::now_v7(), consignment_id: Uuid::now_v7(), product_id: Uuid::now_v7(), variant_id: None,
            sku: "HEADLAMP-300".into(), quantity_sent: sent, quantity_sold: 0, quantity_returned: 0, unit_price: Decimal::new(price, 2),
        }
    }

    #[test]
    fn test_sold_and_returned_never_exceed_sent() {
        let mut i = item(10, 8900);
        i.record_sold(6).unwrap();
        i.record_returned(3).unwrap();
        assert_eq!(i.outstanding(), 1);
        assert_eq!(
            i.record_sold(2),
            Err(ConsignmentError::ExceedsOutstanding { sku: "HEADLAMP-300".into(), outstanding: 1, requested: 2 })
        );
        assert_eq!(i.record_returned(0), Err(ConsignmentError::InvalidQuantity));
    }

    #[test]
    fn test_settlement_applies_commission() {
        let mut a = item(10, 10000);
        let mut b = item(5, 2550);
        a.record_sold(3).unwrap();
        b.record_sold(2).unwrap();
        let s = Settlement::compute(&[a, b], Decimal::new(25, 2));
        assert_eq!(s.units_sold, 5);
        assert_eq!(s.gross, Decimal::new(35100, 2));
        assert_eq!(s.commission, Decimal::new(8775, 2));
        assert_eq!(s.net_payable, Decimal::new(26325, 2));
    }

    #[test]
    fn test_commission_bounds() {
        assert!(validate_commission_rate(Decimal::new(15, 2)).is_ok());
        assert!(validate_commission_rate(Decimal::new(11, 1)).is_err());
        assert!(validate_commission_rate(Decimal::new(-1, 2)).is_err());
    }
}
