//! Profile Replica Entity
//!
//! The replicated user profile. Built entirely from identity events: a
//! CREATED or UPDATED event either seeds a record or merges into one, and
//! absent event fields leave the stored value untouched.

use chrono::{DateTime, Utc};
use gk_common::{IdentityEvent, RoleName};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileReplica {
    /// The authority's principal id
    #[serde(rename = "_id")]
    pub id: String,

    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub role: Option<RoleName>,
    pub enabled: Option<bool>,

    /// Producer-side timestamp of the last applied event
    pub updated_at: DateTime<Utc>,

    /// Local time the record was last written by the consumer. Always moves
    /// forward, even when a replayed event carries an old `updated_at`.
    pub synced_at: DateTime<Utc>,
}

impl ProfileReplica {
    /// Seed a record from the first event seen for a user.
    pub fn from_event(event: &IdentityEvent) -> Self {
        let mut replica = Self {
            id: event.user_id.clone(),
            username: None,
            email: None,
            first_name: None,
            last_name: None,
            phone_number: None,
            date_of_birth: None,
            address: None,
            city: None,
            state: None,
            country: None,
            postal_code: None,
            role: None,
            enabled: None,
            updated_at: event.timestamp,
            synced_at: Utc::now(),
        };
        replica.merge_from(event);
        replica
    }

    /// Merge an event into the record. `None` fields in the event never
    /// clobber stored values; partial updates are the common case.
    pub fn merge_from(&mut self, event: &IdentityEvent) {
        fn merge<T: Clone>(slot: &mut Option<T>, incoming: &Option<T>) {
            if incoming.is_some() {
                *slot = incoming.clone();
            }
        }

        merge(&mut self.username, &event.username);
        merge(&mut self.email, &event.email);
        merge(&mut self.first_name, &event.first_name);
        merge(&mut self.last_name, &event.last_name);
        merge(&mut self.phone_number, &event.phone_number);
        merge(&mut self.date_of_birth, &event.date_of_birth);
        merge(&mut self.address, &event.address);
        merge(&mut self.city, &event.city);
        merge(&mut self.state, &event.state);
        merge(&mut self.country, &event.country);
        merge(&mut self.postal_code, &event.postal_code);
        merge(&mut self.role, &event.role);
        merge(&mut self.enabled, &event.enabled);
        self.updated_at = event.timestamp;
        self.synced_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gk_common::IdentityEventType;

    fn created(user_id: &str) -> IdentityEvent {
        let mut event = IdentityEvent::bare(user_id, IdentityEventType::Created);
        event.username = Some("alice".to_string());
        event.email = Some("alice@example.com".to_string());
        event.first_name = Some("Alice".to_string());
        event.city = Some("Lisbon".to_string());
        event
    }

    #[test]
    fn seeded_from_created_event() {
        let replica = ProfileReplica::from_event(&created("42"));
        assert_eq!(replica.id, "42");
        assert_eq!(replica.username.as_deref(), Some("alice"));
        assert_eq!(replica.city.as_deref(), Some("Lisbon"));
        assert!(replica.last_name.is_none());
    }

    #[test]
    fn merge_keeps_fields_the_update_omits() {
        let mut replica = ProfileReplica::from_event(&created("42"));

        let mut update = IdentityEvent::bare("42", IdentityEventType::Updated);
        update.city = Some("Porto".to_string());

        replica.merge_from(&update);
        assert_eq!(replica.city.as_deref(), Some("Porto"));
        // Fields absent from the update survive
        assert_eq!(replica.username.as_deref(), Some("alice"));
        assert_eq!(replica.first_name.as_deref(), Some("Alice"));
    }
}
