//! Promo codes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromoKind { Percentage, FixedAmount, FreeShipping }

impl PromoKind {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Percentage => "PERCENTAGE", Self::FixedAmount => "FIXED_AMOUNT", Self::FreeShipping => "FREE_SHIPPING" }
    }
}

impl TryFrom<String> for PromoKind {
    type Error = PromoError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "PERCENTAGE" => Ok(Self::Percentage),
            "FIXED_AMOUNT" => Ok(Self::FixedAmount),
            "FREE_SHIPPING" => Ok(Self::FreeShipping),
            _ => Err(PromoError::UnknownKind(value)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Promo {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub kind: PromoKind,
    pub value: Decimal,
    pub min_spend: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a promo is worth against one order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PromoDiscount {
    pub amount: Decimal,
    pub free_shipping: bool,
}

pub fn normalize_code(code: &str) -> String { code.trim().to_uppercase() }

/// Rejects values that make no sense for the promo kind.
pub fn validate_value(kind: PromoKind, value: Decimal) -> Result<(), PromoError> {
    match kind {
        PromoKind::Percentage if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED => Err(PromoError::InvalidValue),
        PromoKind::FixedAmount if value <= Decimal::ZERO => Err(PromoError::InvalidValue),
        _ => Ok(()),
    }
}

impl Promo {
    pub fn is_exhausted(&self) -> bool { self.max_uses.is_some_and(|max| self.used_count >= max) }

    pub fn evaluate(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<PromoDiscount, PromoError> {
        if !self.is_active { return Err(PromoError::Inactive); }
        if self.starts_at.is_some_and(|s| now < s) { return Err(PromoError::NotStarted); }
        if self.ends_at.is_some_and(|e| now >= e) { return Err(PromoError::Expired); }
        if self.is_exhausted() { return Err(PromoError::UsageLimitReached); }
        if let Some(min) = self.min_spend {
            if subtotal < min { return Err(PromoError::MinSpendNotMet(min)); }
        }
        let discount = match self.kind {
            PromoKind::Percentage => PromoDiscount {
                amount: (subtotal * self.value / Decimal::ONE_HUNDRED).round_dp(2),
                free_shipping: false,
            },
            PromoKind::FixedAmount => PromoDiscount { amount: self.value, free_shipping: false },
            PromoKind::FreeShipping => PromoDiscount { amount: Decimal::ZERO, free_shipping: true },
        };
        Ok(PromoDiscount { amount: discount.amount.min(subtotal), ..discount })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoError { Inactive, NotStarted, Expired, UsageLimitReached, MinSpendNotMet(Decimal), InvalidValue, UnknownKind(String) }
impl std::error::Error for PromoError {}
impl std::fmt::Display for PromoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inactive => write!(f, "Promo code is not active"),
            Self::NotStarted => write!(f, "Promo code is not valid yet"),
            Self::Expired => write!(f, "Promo code has expired"),
            Self::UsageLimitReached => write!(f, "Promo code has been fully redeemed"),
            Self::MinSpendNotMet(min) => write!(f, "Promo code needs a minimum spend of {min}"),
            Self::InvalidValue => write!(f, "Promo value out of range"),
            Self::UnknownKind(k) => write!(f, "Unknown promo kind: {k}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promo(kind: PromoKind, value: Decimal) -> Promo {
        let now = Utc::now();
        Promo {
            id: Uuid::now_v7(), code: "TRAIL10".into(), description: None, kind, value, min_spend: None,
            max_uses: None, used_count: 0, starts_at: None, ends_at: None, is_active: true, created_at: now, updated_at: now,
        }
    }

    #[test]
    fn test_percentage_discount_rounds_to_cents() {
        let p = promo(PromoKind::Percentage, Decimal::new(15, 0));
        let d = p.evaluate(Decimal::new(9999, 2), Utc::now()).unwrap();
        assert_eq!(d.amount, Decimal::new(1500, 2));
        assert!(!d.free_shipping);
    }

    #[test]
    fn test_fixed_discount_clamped_to_subtotal() {
        let p = promo(PromoKind::FixedAmount, Decimal::new(50, 0));
        assert_eq!(p.evaluate(Decimal::new(30, 0), Utc::now()).unwrap().amount, Decimal::new(30, 0));
    }

    #[test]
    fn test_window_and_limits() {
        let now = Utc::now();
        let mut p = promo(PromoKind::FreeShipping, Decimal::ZERO);
        assert!(p.evaluate(Decimal::ONE, now).unwrap().free_shipping);

        p.starts_at = Some(now + Duration::hours(1));
        assert_eq!(p.evaluate(Decimal::ONE, now), Err(PromoError::NotStarted));
        p.starts_at = None;
        p.ends_at = Some(now);
        assert_eq!(p.evaluate(Decimal::ONE, now), Err(PromoError::Expired));
        p.ends_at = None;
        p.max_uses = Some(3);
        p.used_count = 3;
        assert_eq!(p.evaluate(Decimal::ONE, now), Err(PromoError::UsageLimitReached));
        p.max_uses = None;
        p.min_spend = Some(Decimal::new(100, 0));
        assert_eq!(p.evaluate(Decimal::ONE, now), Err(PromoError::MinSpendNotMet(Decimal::new(100, 0))));
        p.is_active = false;
        assert_eq!(p.evaluate(Decimal::new(500, 0), now), Err(PromoError::Inactive));
    }

    #[test]
    fn test_value_validation() {
        assert!(validate_value(PromoKind::Percentage, Decimal::new(101, 0)).is_err());
        assert!(validate_value(PromoKind::Percentage, Decimal::new(100, 0)).is_ok());
        assert!(validate_value(PromoKind::FixedAmount, Decimal::ZERO).is_err());
        assert!(validate_value(PromoKind::FreeShipping, Decimal::ZERO).is_ok());
        assert_eq!(normalize_code(" trail10 "), "TRAIL10");
    }
}
