//! [`Tenant`] definitions.

use std::str::FromStr;

use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

use crate::domain::user;
#[cfg(doc)]
use crate::domain::Contract;

/// Free-text identity of the tenant party of a [`Contract`].
///
/// Tenants are not platform users, so their identity is carried on the
/// [`Contract`] itself.
#[derive(Clone, Debug)]
pub struct Tenant {
    /// Full [`Name`] of the tenant.
    pub name: Name,

    /// [`user::Phone`] of the tenant the OTP is delivered to.
    pub phone: user::Phone,

    /// [`user::Email`] of the tenant.
    pub email: user::Email,

    /// [`EmiratesId`] of the tenant.
    pub emirates_id: EmiratesId,
}

/// Name of a [`Tenant`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` is not empty.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Emirates ID of a [`Tenant`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct EmiratesId(String);

impl EmiratesId {
    /// Creates a new [`EmiratesId`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `id` is not empty.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a new [`EmiratesId`] if the given `id` is valid.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        Self::check(&id).then_some(Self(id))
    }

    /// Checks whether the given `id` is a valid [`EmiratesId`].
    fn check(id: impl AsRef<str>) -> bool {
        let id = id.as_ref();
        id.trim() == id && !id.is_empty() && id.len() <= 64
    }
}

impl FromStr for EmiratesId {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `EmiratesId`")
    }
}
