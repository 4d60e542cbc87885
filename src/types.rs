use std::fmt;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::error::Error;

/// Backend user identifier.
///
/// The backend sends either a string or an integer; both are held as text so
/// the snapshot in durable storage round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Display, From, Into)]
#[serde(transparent)]
pub struct UserId(pub String);

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Number(n) => Self(n.to_string()),
        })
    }
}

/// Opaque bearer token issued at login or registration.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Account role. Fixed set; drives route authorization and menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Seller,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            other => Err(Error::InvalidRole(other.to_owned())),
        }
    }
}

/// Seller subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellerPackage {
    Basic,
    Premium,
    Professional,
}

impl SellerPackage {
    pub const ALL: [Self; 3] = [Self::Basic, Self::Premium, Self::Professional];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Professional => "professional",
        }
    }

    /// Display name shown on the registration form.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Premium => "Premium",
            Self::Professional => "Professional",
        }
    }

    /// Price in Kenyan shillings.
    #[must_use]
    pub fn price_kes(self) -> u64 {
        match self {
            Self::Basic => 2_000,
            Self::Premium => 5_000,
            Self::Professional => 8_000,
        }
    }

    /// Maximum number of listed services; `None` is unlimited.
    #[must_use]
    pub fn service_limit(self) -> Option<u32> {
        match self {
            Self::Basic => Some(3),
            Self::Premium => Some(10),
            Self::Professional => None,
        }
    }

    /// Feature bullets shown on the package picker.
    #[must_use]
    pub fn features(self) -> &'static [&'static str] {
        match self {
            Self::Basic => &["Up to 3 services", "Basic profile", "Email support"],
            Self::Premium => &[
                "Up to 10 services",
                "Enhanced profile",
                "Priority support",
                "Analytics",
            ],
            Self::Professional => &[
                "Unlimited services",
                "Premium profile",
                "24/7 support",
                "Advanced analytics",
                "Featured listing",
            ],
        }
    }
}

impl fmt::Display for SellerPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SellerPackage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::InvalidPackage(s.to_owned()))
    }
}

/// Identity record of the authenticated principal, as known to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: Role,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub email_verified_at: Option<OffsetDateTime>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub phone_verified_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_package: Option<SellerPackage>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub package_expires_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

impl User {
    /// Create a record with only the required fields.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: UserId(id.into()),
            name: name.into(),
            email: email.into(),
            phone: String::new(),
            role,
            email_verified_at: None,
            phone_verified_at: None,
            seller_package: None,
            package_expires_at: None,
            avatar: None,
            location: None,
            bio: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    #[must_use]
    pub fn with_seller_package(mut self, package: SellerPackage) -> Self {
        self.seller_package = Some(package);
        self
    }

    #[must_use]
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    #[must_use]
    pub fn with_email_verified_at(mut self, at: OffsetDateTime) -> Self {
        self.email_verified_at = Some(at);
        self
    }

    #[must_use]
    pub fn is_email_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    #[must_use]
    pub fn is_phone_verified(&self) -> bool {
        self.phone_verified_at.is_some()
    }

    /// Whether the seller's package has lapsed as of `now`.
    ///
    /// Sellers without an expiry date, and non-sellers, are never expired.
    #[must_use]
    pub fn package_expired(&self, now: OffsetDateTime) -> bool {
        self.role == Role::Seller && self.package_expires_at.is_some_and(|at| at <= now)
    }
}

/// Successful login or registration payload.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct AuthResponse {
    pub token: Credential,
    pub user: User,
}

/// Pagination block the backend attaches to list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl PageMeta {
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// Generic `{ data, message?, meta? }` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}
