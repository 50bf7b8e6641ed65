//! Newtype IDs for type-safe entity references.
//!
//! Users and orders are keyed by UUIDs issued by the hosted backend, so the
//! `define_id!` macro wraps [`uuid::Uuid`]. Products use human-readable string keys
//! (`"1"`, `"espresso-blend"`) and get their own [`ProductId`] type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe UUID wrapper.
///
/// Creates a newtype wrapper around `Uuid` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `generate()`, `as_uuid()`
/// - `From<Uuid>` and `Into<Uuid>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use beanvoyage_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::generate();
/// let order_id = OrderId::new(user_id.as_uuid());
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn new(id: ::uuid::Uuid) -> Self {
                Self(id)
            }

            /// Generate a fresh random (v4) ID.
            #[must_use]
            pub fn generate() -> Self {
                Self(::uuid::Uuid::new_v4())
            }

            /// Get the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> ::uuid::Uuid {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                ::uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl From<::uuid::Uuid> for $name {
            fn from(id: ::uuid::Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for ::uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <::uuid::Uuid as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <::uuid::Uuid as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <::uuid::Uuid as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <::uuid::Uuid as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(UserId);
define_id!(OrderId);

/// Catalog product identifier.
///
/// Product keys are opaque strings chosen by whoever maintains the catalog.
/// They are compared byte-for-byte; no normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a product ID from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_roundtrips_through_string() {
        let id = UserId::generate();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_user_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<UserId>().is_err());
    }

    #[test]
    fn test_product_id_serializes_as_plain_string() {
        let id = ProductId::new("8");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"8\"");
    }

    #[test]
    fn test_product_id_equality_is_exact() {
        assert_ne!(ProductId::new("Dark"), ProductId::new("dark"));
    }
}
