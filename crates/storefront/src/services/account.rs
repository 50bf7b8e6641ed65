//! Account page services: profile and order history.
//!
//! Both degrade instead of failing when the backing tables are missing: the
//! profile falls back to identity metadata and the order list comes back
//! empty.

use std::sync::Arc;

use beanvoyage_core::OrderStatus;

use crate::db::{OrderRepository, ProfileRepository, RepositoryError};
use crate::models::{Identity, Order, Profile, ProfileUpdate};

/// Profile reads and edits.
#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
    persistence_enabled: bool,
}

impl ProfileService {
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileRepository>, persistence_enabled: bool) -> Self {
        Self {
            profiles,
            persistence_enabled,
        }
    }

    /// The stored profile, or one built from identity metadata.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` for failures other than a missing table.
    pub async fn load(&self, identity: &Identity) -> Result<Profile, RepositoryError> {
        if !self.persistence_enabled {
            return Ok(Profile::for_identity(identity));
        }
        match self.profiles.get_profile(identity.id).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => Ok(Profile::for_identity(identity)),
            Err(RepositoryError::MissingSchema { table }) => {
                tracing::warn!(table = %table, "Profile table missing, using identity metadata");
                Ok(Profile::for_identity(identity))
            }
            Err(e) => Err(e),
        }
    }

    /// Apply `update` and store the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` for failures other than a missing table.
    pub async fn save(
        &self,
        identity: &Identity,
        update: ProfileUpdate,
    ) -> Result<Profile, RepositoryError> {
        let mut profile = self.load(identity).await?;
        update.apply_to(&mut profile);

        if !self.persistence_enabled {
            tracing::info!(user_id = %identity.id, "Profile not saved: persistence disabled");
            return Ok(profile);
        }
        match self.profiles.upsert_profile(&profile).await {
            Ok(()) => {
                tracing::info!(user_id = %identity.id, "Profile updated");
                Ok(profile)
            }
            Err(RepositoryError::MissingSchema { table }) => {
                tracing::warn!(table = %table, "Profile not saved: backing table missing");
                Ok(profile)
            }
            Err(e) => Err(e),
        }
    }

    /// Whether `identity` may use the admin pages.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` for failures other than a missing table.
    pub async fn is_admin(&self, identity: &Identity) -> Result<bool, RepositoryError> {
        Ok(self.load(identity).await?.is_admin)
    }
}

/// Order history.
#[derive(Clone)]
pub struct OrderHistory {
    orders: Arc<dyn OrderRepository>,
    persistence_enabled: bool,
}

impl OrderHistory {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderRepository>, persistence_enabled: bool) -> Self {
        Self {
            orders,
            persistence_enabled,
        }
    }

    /// Orders for `identity`, newest first, optionally narrowed to `status`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` for failures other than a missing table.
    pub async fn list(
        &self,
        identity: &Identity,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        if !self.persistence_enabled {
            return Ok(Vec::new());
        }
        let orders = match self.orders.list_orders(identity.id).await {
            Ok(orders) => orders,
            Err(RepositoryError::MissingSchema { table }) => {
                tracing::warn!(table = %table, "Order history unavailable: backing table missing");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        Ok(orders
            .into_iter()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use beanvoyage_core::{CheckoutPolicy, Email, OrderId, OrderSummary, Price, UserId};

    use super::*;
    use crate::db::MemoryBackend;
    use crate::models::{NewOrder, ShippingDetails};

    fn identity() -> Identity {
        Identity {
            id: UserId::generate(),
            email: Email::parse("ada@beanvoyage.coffee").unwrap(),
            first_name: Some("Ada".to_owned()),
            last_name: Some("Byron".to_owned()),
        }
    }

    #[tokio::test]
    async fn test_load_falls_back_to_identity() {
        let backend = Arc::new(MemoryBackend::new());
        let service = ProfileService::new(backend, true);
        let who = identity();
        let profile = service.load(&who).await.unwrap();
        assert_eq!(profile.id, who.id);
        assert_eq!(profile.last_name.as_deref(), Some("Byron"));
    }

    #[tokio::test]
    async fn test_save_round_trip_preserves_admin_flag() {
        let backend = Arc::new(MemoryBackend::new());
        let who = identity();
        backend.put_profile(Profile {
            is_admin: true,
            ..Profile::for_identity(&who)
        });
        let service = ProfileService::new(backend.clone(), true);

        let saved = service
            .save(
                &who,
                ProfileUpdate {
                    city: Some("Portland".to_owned()),
                    first_name: Some("Ada".to_owned()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(saved.city.as_deref(), Some("Portland"));
        assert_eq!(saved.last_name, None);
        assert!(service.is_admin(&who).await.unwrap());
        assert_eq!(
            backend.stored_profile(who.id).unwrap().city.as_deref(),
            Some("Portland")
        );
    }

    #[tokio::test]
    async fn test_missing_profile_table_is_tolerated() {
        let backend = Arc::new(MemoryBackend::new());
        backend.drop_table("profiles");
        let service = ProfileService::new(backend, true);
        let who = identity();
        let saved = service
            .save(
                &who,
                ProfileUpdate {
                    phone: Some("555-0100".to_owned()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(saved.phone.as_deref(), Some("555-0100"));
        assert!(!service.is_admin(&who).await.unwrap());
    }

    #[tokio::test]
    async fn test_other_failures_surface() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_fail_writes(true);
        let service = ProfileService::new(backend, true);
        assert!(
            service
                .save(&identity(), ProfileUpdate::default())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_order_history_filters_by_status() {
        let backend = Arc::new(MemoryBackend::new());
        let who = identity();
        let order = NewOrder {
            id: OrderId::generate(),
            user_id: who.id,
            summary: OrderSummary::compute(Price::from_cents(1000), &CheckoutPolicy::default()),
            shipping: ShippingDetails {
                first_name: "Ada".to_owned(),
                last_name: "Byron".to_owned(),
                email: "ada@beanvoyage.coffee".to_owned(),
                phone: None,
                address: "12 Roastery Lane".to_owned(),
                city: "Portland".to_owned(),
                state: "OR".to_owned(),
                zip_code: "97201".to_owned(),
                country: "United States".to_owned(),
            },
            items: Vec::new(),
        };
        backend.create_order(&order).await.unwrap();

        let history = OrderHistory::new(backend.clone(), true);
        assert_eq!(history.list(&who, None).await.unwrap().len(), 1);
        assert_eq!(
            history
                .list(&who, Some(OrderStatus::Pending))
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(
            history
                .list(&who, Some(OrderStatus::Shipped))
                .await
                .unwrap()
                .is_empty()
        );

        backend.drop_table("orders");
        assert!(history.list(&who, None).await.unwrap().is_empty());
    }
}
