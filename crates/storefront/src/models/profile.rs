//! User profile domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beanvoyage_core::{Email, UserId};

use super::Identity;

/// A user's profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same id as the identity that owns it.
    pub id: UserId,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub avatar_url: Option<String>,
    /// Grants access to the admin product list.
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// A fresh, non-admin profile seeded from identity metadata.
    #[must_use]
    pub fn for_identity(identity: &Identity) -> Self {
        let now = Utc::now();
        Self {
            id: identity.id,
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            phone: None,
            address: None,
            city: None,
            postal_code: None,
            avatar_url: None,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Editable profile fields submitted from the account page.
///
/// Blank values clear the stored field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl ProfileUpdate {
    /// Copy the submitted fields onto `profile` and bump `updated_at`.
    pub fn apply_to(self, profile: &mut Profile) {
        profile.first_name = non_blank(self.first_name);
        profile.last_name = non_blank(self.last_name);
        profile.phone = non_blank(self.phone);
        profile.address = non_blank(self.address);
        profile.city = non_blank(self.city);
        profile.postal_code = non_blank(self.postal_code);
        profile.updated_at = Utc::now();
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
