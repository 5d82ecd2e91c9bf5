//! [`Contract`] definitions.

pub mod otp;
pub mod tenant;
pub mod terms;

use std::{net::IpAddr, sync::LazyLock};

use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use common::DateTime;

use crate::domain::{property, user};
#[cfg(doc)]
use crate::domain::{Property, User};

pub use self::{tenant::Tenant, terms::Terms};

/// Rental contract between a tenant and a [`Property`] owner, signed through
/// an OTP challenge.
#[derive(Clone, Debug)]
pub struct Contract {
    /// ID of this [`Contract`].
    pub id: Id,

    /// Human-readable [`Number`] of this [`Contract`].
    pub number: Number,

    /// ID of the [`Property`] this [`Contract`] is about.
    pub property_id: property::Id,

    /// ID of the [`User`] brokering this [`Contract`].
    pub agent_id: user::Id,

    /// ID of the [`User`] owning the [`Property`], resolved at creation time.
    pub owner_id: user::Id,

    /// [`Tenant`] identity of this [`Contract`].
    pub tenant: Tenant,

    /// Rental [`Terms`] of this [`Contract`].
    pub terms: Terms,

    /// [`Status`] of this [`Contract`].
    pub status: Status,

    /// URL of the generated unsigned document, if generated already.
    pub pdf_url: Option<DocumentUrl>,

    /// URL of the signed document artifact.
    ///
    /// Nothing produces it yet: signing only records the metadata below.
    pub signed_pdf_url: Option<DocumentUrl>,

    /// Active OTP [`otp::Code`] of this [`Contract`], if any.
    pub otp_code: Option<otp::Code>,

    /// [`DateTime`] when the active OTP expires, if any.
    pub otp_expires_at: Option<otp::ExpirationDateTime>,

    /// Number of failed verification [`otp::Attempts`] against the active
    /// OTP.
    pub otp_attempts: otp::Attempts,

    /// [`DateTime`] when this [`Contract`] was signed, if it was.
    pub signed_at: Option<SigningDateTime>,

    /// [`Ip`] address this [`Contract`] was signed from, if it was.
    pub signed_ip: Option<Ip>,

    /// [`DateTime`] when this [`Contract`] was created.
    pub created_at: CreationDateTime,
}

impl Contract {
    /// Returns whether this [`Contract`] is signed already.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        matches!(self.status, Status::Signed)
    }
}

/// ID of a [`Contract`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Human-readable sequential number of a [`Contract`], distinct from its
/// [`Id`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Number(String);

impl Number {
    /// Creates a new [`Number`] out of the provided `year` and `sequence`.
    ///
    /// The `sequence` is zero-padded to 5 digits.
    #[must_use]
    pub fn compose(year: i32, sequence: i64) -> Self {
        Self(format!("DAR-{year}-{sequence:05}"))
    }

    /// Creates a new [`Number`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `number` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Creates a new [`Number`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        Self::check(&number).then_some(Self(number))
    }

    /// Checks whether the given `number` is a valid [`Number`].
    fn check(number: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Number`] format:
        /// `DAR-<year>-<zero-padded sequence>`.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^DAR-\d{4}-\d{5,}$").expect("valid regex")
        });

        REGEX.is_match(number.as_ref())
    }
}

impl FromStr for Number {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Number`")
    }
}

/// URL of a generated [`Contract`] document.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct DocumentUrl(String);

impl DocumentUrl {
    /// Creates a new [`DocumentUrl`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `url` is not empty.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Creates a new [`DocumentUrl`] if the given `url` is valid.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        Self::check(&url).then_some(Self(url))
    }

    /// Checks whether the given `url` is a valid [`DocumentUrl`].
    fn check(url: impl AsRef<str>) -> bool {
        let url = url.as_ref();
        url.trim() == url && !url.is_empty() && url.len() <= 2048
    }
}

impl FromStr for DocumentUrl {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `DocumentUrl`")
    }
}

/// IP address a [`Contract`] was signed from.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, FromStr, Hash, Into, PartialEq,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Ip(IpAddr);

define_kind! {
    #[doc = "Status of a [`Contract`]."]
    enum Status {
        #[doc = "The [`Contract`] is drafted and not yet sent for signing."]
        Draft = 1,

        #[doc = "An OTP was issued and the [`Contract`] awaits the tenant's \
                 signature."]
        PendingSignature = 2,

        #[doc = "The [`Contract`] was signed by the tenant."]
        Signed = 3,

        #[doc = "The [`Contract`] term is running."]
        Active = 4,

        #[doc = "The [`Contract`] term has elapsed."]
        Expired = 5,

        #[doc = "The [`Contract`] was terminated before its end date."]
        Terminated = 6,
    }
}

/// [`DateTime`] when a [`Contract`] was created.
pub type CreationDateTime = DateTimeOf<(Contract, unit::Creation)>;

/// Marker type indicating [`Contract`] signing.
#[derive(Clone, Copy, Debug)]
pub struct Signing;

/// [`DateTime`] when a [`Contract`] was signed.
pub type SigningDateTime = DateTimeOf<(Contract, Signing)>;

#[cfg(test)]
mod spec {
    use super::Number;

    #[test]
    fn composes_zero_padded_number() {
        assert_eq!(Number::compose(2025, 1).to_string(), "DAR-2025-00001");
        assert_eq!(Number::compose(2025, 42).to_string(), "DAR-2025-00042");
        assert_eq!(Number::compose(2026, 99999).to_string(), "DAR-2026-99999");
        // Sequences beyond 5 digits widen instead of truncating.
        assert_eq!(Number::compose(2026, 123456).to_string(), "DAR-2026-123456");
    }

    #[test]
    fn validates_format() {
        assert!(Number::new("DAR-2025-00001").is_some());
        assert!(Number::new("DAR-2026-123456").is_some());

        assert!(Number::new("DAR-25-00001").is_none());
        assert!(Number::new("DAR-2025-001").is_none());
        assert!(Number::new("XYZ-2025-00001").is_none());
        assert!(Number::new("DAR-2025-00001 ").is_none());
    }
}
