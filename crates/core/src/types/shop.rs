//! Shop domain type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopDomainError {
    /// The input string is empty.
    #[error("shop domain cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("shop domain must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not end with `.myshopify.com`.
    #[error("shop domain must end with .myshopify.com")]
    WrongSuffix,
    /// The store handle (before the suffix) is empty or has invalid characters.
    #[error("shop handle must be non-empty and contain only a-z, 0-9 and '-'")]
    InvalidHandle,
}

/// A Shopify shop domain, e.g. `acme-goods.myshopify.com`.
///
/// The shop is the tenant boundary for every quota, lockout and batch run, so
/// the domain is normalized to lowercase on parse and compared verbatim after.
///
/// ## Constraints
///
/// - Length: 1-255 characters
/// - Must end with `.myshopify.com`
/// - Handle (before the suffix) contains only `a-z`, `0-9` and `-`
///
/// ## Examples
///
/// ```
/// use shelfwise_core::ShopDomain;
///
/// assert!(ShopDomain::parse("acme-goods.myshopify.com").is_ok());
/// assert!(ShopDomain::parse("ACME.myshopify.com").is_ok());
///
/// assert!(ShopDomain::parse("").is_err());
/// assert!(ShopDomain::parse("acme.com").is_err());
/// assert!(ShopDomain::parse(".myshopify.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Maximum length of a shop domain.
    pub const MAX_LENGTH: usize = 255;

    /// Domain suffix shared by every Shopify store.
    pub const SUFFIX: &'static str = ".myshopify.com";

    /// Parse a `ShopDomain` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, lacks the
    /// `.myshopify.com` suffix, or has an invalid store handle.
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        let s = s.trim().to_ascii_lowercase();

        if s.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(ShopDomainError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let handle = s
            .strip_suffix(Self::SUFFIX)
            .ok_or(ShopDomainError::WrongSuffix)?;

        if handle.is_empty()
            || !handle
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ShopDomainError::InvalidHandle);
        }

        Ok(Self(s))
    }

    /// Returns the shop domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ShopDomain` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the store handle (the part before `.myshopify.com`).
    #[must_use]
    pub fn handle(&self) -> &str {
        self.0.strip_suffix(Self::SUFFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = ShopDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShopDomain> for String {
    fn from(shop: ShopDomain) -> Self {
        shop.0
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ShopDomain {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ShopDomain {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ShopDomain {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
