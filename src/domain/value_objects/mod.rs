//! Value Objects for the drop shop domain

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// URL slug for a drop shop (`summer-tour-2025`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let value = value.into().trim().to_lowercase();
        if value.is_empty() { return Err(ValueError::Empty("slug")); }
        if value.len() > 64 { return Err(ValueError::TooLong("slug")); }
        if !value.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') || value.starts_with('-') || value.ends_with('-') {
            return Err(ValueError::Invalid("slug", value));
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
impl TryFrom<String> for Slug { type Error = ValueError; fn try_from(v: String) -> Result<Self, ValueError> { Self::new(v) } }
impl From<Slug> for String { fn from(s: Slug) -> String { s.0 } }

/// Theme color, normalized to lower-case `#rrggbb`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValueError> {
        let raw = value.as_ref().trim();
        let digits = raw.strip_prefix('#').unwrap_or(raw).to_lowercase();
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) { return Err(ValueError::Invalid("color", raw.to_string())); }
        let digits = match digits.len() {
            6 => digits,
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            _ => return Err(ValueError::Invalid("color", raw.to_string())),
        };
        Ok(Self(format!("#{digits}")))
    }
    pub fn as_str(&self) -> &str { &self.0 }

    pub fn rgb(&self) -> (u8, u8, u8) {
        let channel = |i: usize| u8::from_str_radix(&self.0[i..i + 2], 16).unwrap_or(0);
        (channel(1), channel(3), channel(5))
    }

    /// WCAG relative luminance in `0.0..=1.0`
    pub fn luminance(&self) -> f64 {
        let lin = |c: u8| {
            let c = f64::from(c) / 255.0;
            if c <= 0.03928 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
        };
        let (r, g, b) = self.rgb();
        0.2126 * lin(r) + 0.7152 * lin(g) + 0.0722 * lin(b)
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
impl TryFrom<String> for HexColor { type Error = ValueError; fn try_from(v: String) -> Result<Self, ValueError> { Self::new(v) } }
impl From<HexColor> for String { fn from(c: HexColor) -> String { c.0 } }

/// A customer's name as stored: first and last are kept apart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName { pub first: String, pub last: String }

impl PersonName {
    /// Splits on the first whitespace run. "Cher" has an empty last name.
    pub fn parse(full: &str) -> Result<Self, ValueError> {
        let full = full.trim();
        if full.is_empty() { return Err(ValueError::Empty("name")); }
        let (first, last) = match full.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim()),
            None => (full, ""),
        };
        Ok(Self { first: first.to_string(), last: last.to_string() })
    }
    pub fn full(&self) -> String {
        if self.last.is_empty() { self.first.clone() } else { format!("{} {}", self.first, self.last) }
    }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn usd(amount: Decimal) -> Self { Self::new(amount, "USD") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, ValueError> {
        if self.currency != other.currency { return Err(ValueError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }
}

impl Default for Money { fn default() -> Self { Self::zero("USD") } }

/// Line quantity; always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: i32) -> Result<Self, ValueError> {
        if value <= 0 { return Err(ValueError::Invalid("quantity", value.to_string())); }
        Ok(Self(value as u32))
    }
    pub fn value(&self) -> u32 { self.0 }
}

impl TryFrom<i32> for Quantity { type Error = ValueError; fn try_from(v: i32) -> Result<Self, ValueError> { Self::new(v) } }
impl From<Quantity> for i32 { fn from(q: Quantity) -> i32 { q.0 as i32 } }

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError { Empty(&'static str), TooLong(&'static str), Invalid(&'static str, String), CurrencyMismatch }
impl std::error::Error for ValueError {}
impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty(field) => write!(f, "{field} must not be empty"),
            Self::TooLong(field) => write!(f, "{field} too long"),
            Self::Invalid(field, v) => write!(f, "invalid {field}: {v:?}"),
            Self::CurrencyMismatch => write!(f, "Currency mismatch"),
        }
    }
}
