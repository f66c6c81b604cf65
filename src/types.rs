// 1.0: all the primitives live here. nothing in the engine works without these types.
// IDs, money, prices, share counts, timestamps. each is a newtype so the compiler
// catches type mixups (a UserId can never be handed to a stock lookup).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.1: which way the trade goes. Buy settles at the ask, Sell at the bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(ValidationError::InvalidSide(s.to_string())),
        }
    }
}

// 1.2: trigger direction for conditional orders. Long waits for the price to fall
// to or below the limit, Short for it to rise to or above. The side only decides
// which quoted price (bid or ask) gets compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Long,
    Short,
}

impl TriggerKind {
    /// The trigger decision table, as an exhaustive match.
    pub fn is_met(&self, limit: Price, current: Price) -> bool {
        match self {
            TriggerKind::Short => current >= limit,
            TriggerKind::Long => current <= limit,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Long => "long",
            TriggerKind::Short => "short",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "long" => Ok(TriggerKind::Long),
            "short" => Ok(TriggerKind::Short),
            _ => Err(ValidationError::InvalidKind(s.to_string())),
        }
    }
}

// 1.3: price in cash per share. must be positive and no larger than Price::MAX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    /// Largest accepted price, 99_999_999.99: ten digits, two of them decimals.
    pub const MAX: Price = Price(Decimal::from_parts(1_410_065_407, 2, 0, false, 2));

    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO && value <= Self::MAX.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO && value <= Self::MAX.0);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.4: cash amount. balances, settlement totals, deposits all use this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cash(Decimal);

impl Cash {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn add(&self, other: Cash) -> Self {
        Self(self.0 + other.0)
    }

    pub fn sub(&self, other: Cash) -> Self {
        Self(self.0 - other.0)
    }
}

impl fmt::Display for Cash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for Cash {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cash {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl Sum for Cash {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, c| acc.add(c))
    }
}

impl<'a> Sum<&'a Cash> for Cash {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, c| acc.add(*c))
    }
}

// 1.5: share count on an order. whole shares only, and never zero.
// supply and inventory rows hold plain u32 because zero is legal there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    #[must_use]
    pub fn new(value: u32) -> Option<Self> {
        if value > 0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Total cash moved when this many shares trade at `price`.
    pub fn notional(&self, price: Price) -> Cash {
        Cash::new(Decimal::from(self.0) * price.value())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.6: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn elapsed_millis(&self, other: Timestamp) -> i64 {
        (other.0 - self.0).abs()
    }
}

// 1.7: request-boundary rejections. raised before anything is persisted, with a
// reason string the client can show as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("field side is not \"buy\" or \"sell\": got {0:?}")]
    InvalidSide(String),

    #[error("field kind is not \"long\" or \"short\": got {0:?}")]
    InvalidKind(String),

    #[error("conditional order requires a kind")]
    MissingKind,

    #[error("conditional order requires a price limit")]
    MissingPriceLimit,

    #[error("quantity must be a positive integer")]
    ZeroQuantity,

    #[error("price limit must be positive: got {0}")]
    InvalidPriceLimit(Decimal),

    #[error("price limit must not exceed {max}: got {0}", max = Price::MAX)]
    PriceLimitOutOfRange(Decimal),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn side_round_trips_through_strings() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!("SELL".parse::<Side>().unwrap(), Side::Sell);
        assert_eq!(Side::Buy.to_string(), "buy");

        let err = "hold".parse::<Side>().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidSide(_)));
    }

    #[test]
    fn kind_round_trips_through_strings() {
        assert_eq!("long".parse::<TriggerKind>().unwrap(), TriggerKind::Long);
        assert_eq!("Short".parse::<TriggerKind>().unwrap(), TriggerKind::Short);

        let err = "medium".parse::<TriggerKind>().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidKind(_)));
    }

    #[test]
    fn trigger_table() {
        let limit = Price::new_unchecked(dec!(100));

        // short fires at or above the limit
        assert!(TriggerKind::Short.is_met(limit, Price::new_unchecked(dec!(100))));
        assert!(TriggerKind::Short.is_met(limit, Price::new_unchecked(dec!(130))));
        assert!(!TriggerKind::Short.is_met(limit, Price::new_unchecked(dec!(80))));

        // long fires at or below the limit
        assert!(TriggerKind::Long.is_met(limit, Price::new_unchecked(dec!(100))));
        assert!(TriggerKind::Long.is_met(limit, Price::new_unchecked(dec!(80))));
        assert!(!TriggerKind::Long.is_met(limit, Price::new_unchecked(dec!(130))));
    }

    #[test]
    fn price_must_be_positive() {
        assert!(Price::new(dec!(0.01)).is_some());
        assert!(Price::new(Decimal::ZERO).is_none());
        assert!(Price::new(dec!(-5)).is_none());
    }

    #[test]
    fn price_is_capped_at_ten_digits() {
        assert_eq!(Price::MAX.value(), dec!(99_999_999.99));
        assert_eq!(Price::new(Price::MAX.value()), Some(Price::MAX));
        assert!(Price::new(Price::MAX.value() + dec!(0.01)).is_none());
        assert!(Price::new(dec!(100_000_000)).is_none());
    }

    #[test]
    fn quantity_rejects_zero() {
        assert!(Quantity::new(1).is_some());
        assert!(Quantity::new(0).is_none());
    }

    #[test]
    fn notional_is_quantity_times_price() {
        let qty = Quantity::new(3).unwrap();
        let price = Price::new_unchecked(dec!(110));
        assert_eq!(qty.notional(price).value(), dec!(330));
    }

    #[test]
    fn notional_at_the_caps_is_exact() {
        // Worst case the constructors admit: every share that fits a u32
        // at the highest accepted price.
        let qty = Quantity::new(u32::MAX).unwrap();
        let total = qty.notional(Price::MAX);
        assert_eq!(total.value(), dec!(429_496_729_457_050_327.05));
    }

    #[test]
    fn cash_arithmetic() {
        let a = Cash::new(dec!(200));
        let b = Cash::new(dec!(110));

        assert_eq!(a.sub(b).value(), dec!(90));
        assert_eq!(a.add(b).value(), dec!(310));
        assert!(b.sub(a).is_negative());

        let total: Cash = [a, b].iter().sum();
        assert_eq!(total.value(), dec!(310));
    }
}
