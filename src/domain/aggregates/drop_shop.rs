//! Drop Shop Aggregate

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{HexColor, Slug};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode { #[default] Light, Dark }

impl ThemeMode {
    pub fn as_str(&self) -> &'static str { match self { Self::Light => "light", Self::Dark => "dark" } }
    pub fn parse(s: &str) -> Option<Self> { match s { "light" => Some(Self::Light), "dark" => Some(Self::Dark), _ => None } }
}

/// A themed storefront scoped to one Shopify collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DropShop {
    pub id: Uuid,
    pub slug: Slug,
    pub title: String,
    pub collection_id: String,
    pub collection_handle: String,
    pub theme_color: HexColor,
    pub theme_mode: ThemeMode,
    /// Length of a batch period. `None` disables scheduled batching.
    pub batch_cadence_days: Option<i32>,
    pub next_batch_due: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DropShop {
    pub fn create(slug: Slug, title: impl Into<String>, collection_id: impl Into<String>, collection_handle: impl Into<String>, theme_color: HexColor, theme_mode: ThemeMode) -> Result<Self, DropShopError> {
        let title = title.into().trim().to_string();
        if title.is_empty() { return Err(DropShopError::MissingTitle); }
        let collection_id = collection_id.into();
        if collection_id.trim().is_empty() { return Err(DropShopError::MissingCollection); }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), slug, title, collection_id, collection_handle: collection_handle.into(),
            theme_color, theme_mode, batch_cadence_days: None, next_batch_due: None, created_at: now, updated_at: now,
        })
    }

    pub fn set_cadence(&mut self, days: Option<i32>) -> Result<(), DropShopError> {
        if let Some(d) = days { if !(1..=365).contains(&d) { return Err(DropShopError::InvalidCadence(d)); } }
        if days != self.batch_cadence_days { self.next_batch_due = None; }
        self.batch_cadence_days = days;
        self.touch();
        Ok(())
    }

    pub fn cadence(&self) -> Option<Duration> { self.batch_cadence_days.map(|d| Duration::days(i64::from(d))) }

    /// Scheduled, and either never scheduled before or past its due date.
    pub fn is_batch_due(&self, now: DateTime<Utc>) -> bool {
        self.batch_cadence_days.is_some() && self.next_batch_due.map_or(true, |due| due <= now)
    }

    pub fn advance_schedule(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let next = now + self.cadence()?;
        self.next_batch_due = Some(next);
        self.touch();
        Some(next)
    }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum DropShopError { MissingTitle, MissingCollection, InvalidCadence(i32) }
impl std::error::Error for DropShopError {}
impl std::fmt::Display for DropShopError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTitle => write!(f, "Drop shop title is required"),
            Self::MissingCollection => write!(f, "Drop shop collection is required"),
            Self::InvalidCadence(d) => write!(f, "Batch cadence must be 1-365 days, got {d}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop() -> DropShop {
        DropShop::create(Slug::new("tour").unwrap(), "Tour", "gid://shopify/Collection/1", "tour", HexColor::new("#112233").unwrap(), ThemeMode::Dark).unwrap()
    }

    #[test]
    fn test_schedule() {
        let mut s = shop();
        let now = Utc::now();
        assert!(!s.is_batch_due(now));
        s.set_cadence(Some(7)).unwrap();
        assert!(s.is_batch_due(now));
        let next = s.advance_schedule(now).unwrap();
        assert_eq!(next, now + Duration::days(7));
        assert!(!s.is_batch_due(now + Duration::days(6)));
        assert!(s.is_batch_due(now + Duration::days(7)));
    }

    #[test]
    fn test_cadence_validation() {
        let mut s = shop();
        assert_eq!(s.set_cadence(Some(0)), Err(DropShopError::InvalidCadence(0)));
        s.set_cadence(Some(14)).unwrap();
        s.advance_schedule(Utc::now());
        s.set_cadence(Some(7)).unwrap();
        assert_eq!(s.next_batch_due, None);
        s.set_cadence(None).unwrap();
        assert_eq!(s.advance_schedule(Utc::now()), None);
    }

    #[test]
    fn test_create_requires_title() {
        let r = DropShop::create(Slug::new("x").unwrap(), " ", "c", "h", HexColor::new("#fff").unwrap(), ThemeMode::Light);
        assert_eq!(r.unwrap_err(), DropShopError::MissingTitle);
    }
}
