//! Customer Aggregate

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{PersonName, ValueError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer { pub id: Uuid, pub first_name: String, pub last_name: String, pub email: String, pub created_at: DateTime<Utc> }

impl Customer {
    pub fn create(name: &str, email: &str) -> Result<Self, ValueError> {
        let name = PersonName::parse(name)?;
        let email = email.trim().to_lowercase();
        if email.is_empty() { return Err(ValueError::Empty("email")); }
        Ok(Self { id: Uuid::now_v7(), first_name: name.first, last_name: name.last, email, created_at: Utc::now() })
    }
    pub fn full_name(&self) -> String {
        PersonName { first: self.first_name.clone(), last: self.last_name.clone() }.full()
    }
}

/// Portal session minted for a customer by the auth provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session { pub token: String, pub customer_id: Uuid, pub expires_at: DateTime<Utc> }

impl Session {
    pub fn issue(customer_id: Uuid, ttl: Duration) -> Self {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        Self { token, customer_id, expires_at: Utc::now() + ttl }
    }
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_customer_create() {
        let c = Customer::create("Grace Brewster Hopper", " Grace@Example.COM ").unwrap();
        assert_eq!(c.first_name, "Grace");
        assert_eq!(c.last_name, "Brewster Hopper");
        assert_eq!(c.email, "grace@example.com");
        assert_eq!(c.full_name(), "Grace Brewster Hopper");
        assert!(Customer::create("Grace", "").is_err());
    }
    #[test]
    fn test_session_expiry() {
        let s = Session::issue(Uuid::now_v7(), Duration::hours(1));
        assert_eq!(s.token.len(), 64);
        assert!(!s.is_expired(Utc::now()));
        assert!(s.is_expired(Utc::now() + Duration::hours(2)));
    }
}
