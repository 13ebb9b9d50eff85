use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldops_core::{is_present, require_fields, ClientId, DomainResult, Entity};

/// A client of the business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(id: ClientId, fields: ClientFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            first_name: fields.first_name,
            last_name: fields.last_name,
            email: fields.email,
            phone: fields.phone,
            address: fields.address,
            city: fields.city,
            postal_code: fields.postal_code,
            notes: fields.notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every editable field (PUT semantics).
    pub fn apply(&mut self, fields: ClientFields, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::new(self.id, fields, now);
        self.created_at = created_at;
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for Client {
    type Id = ClientId;

    fn id(&self) -> ClientId {
        self.id
    }
}

/// A client row in the directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    #[serde(flatten)]
    pub client: Client,
    pub intervention_count: i64,
}

/// Raw client payload as submitted by the office.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientDetails {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub notes: Option<String>,
}

/// Validated client fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFields {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub notes: Option<String>,
}

impl ClientDetails {
    /// Name, phone and address are mandatory; blank optional fields become `None`.
    pub fn validate(self) -> DomainResult<ClientFields> {
        require_fields(&[
            ("first_name", is_present(&self.first_name)),
            ("last_name", is_present(&self.last_name)),
            ("phone", is_present(&self.phone)),
            ("address", is_present(&self.address)),
        ])?;

        Ok(ClientFields {
            first_name: required(self.first_name),
            last_name: required(self.last_name),
            email: optional(self.email),
            phone: required(self.phone),
            address: required(self.address),
            city: optional(self.city),
            postal_code: optional(self.postal_code),
            notes: optional(self.notes),
        })
    }
}

fn required(value: Option<String>) -> String {
    value.unwrap_or_default().trim().to_string()
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Directory search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientFilter {
    pub search: Option<String>,
}

impl ClientFilter {
    /// Case-insensitive substring match on names, email and phone.
    pub fn matches(&self, client: &Client) -> bool {
        let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        [
            Some(client.first_name.as_str()),
            Some(client.last_name.as_str()),
            client.email.as_deref(),
            Some(client.phone.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    /// SQL `ILIKE` pattern for the search term, if any.
    pub fn like_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"))
    }
}

/// Directory order: last name, then first name.
pub fn directory_order(a: &Client, b: &Client) -> core::cmp::Ordering {
    a.last_name
        .cmp(&b.last_name)
        .then_with(|| a.first_name.cmp(&b.first_name))
}
