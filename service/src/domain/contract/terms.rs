//! Rental [`Terms`] definitions.

use std::str::FromStr;

use common::{DateTimeOf, Money};
use derive_more::{AsRef, Display, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

#[cfg(doc)]
use common::DateTime;

use super::Contract;

/// Rental terms of a [`Contract`].
#[derive(Clone, Debug)]
pub struct Terms {
    /// [`DateTime`] when the rental period starts.
    pub starts_on: StartDateTime,

    /// [`DateTime`] when the rental period ends.
    pub ends_on: EndDateTime,

    /// Yearly rent amount.
    pub rent: Money,

    /// Deposit to be paid at the beginning of the rental period.
    pub deposit: Money,

    /// Number of [`Cheques`] the rent is paid with.
    pub cheques: Cheques,

    /// Free-text payment terms, if any.
    pub payment_terms: Option<PaymentTerms>,
}

/// Number of cheques a yearly rent is split into.
#[derive(Clone, Copy, Debug, Display, Eq, Into, PartialEq)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Cheques(i16);

impl Cheques {
    /// A single cheque for the whole rental period.
    pub const ONE: Self = Self(1);

    /// Creates a new [`Cheques`] if the given `num` is within the `1..=12`
    /// range.
    #[must_use]
    pub fn new(num: i16) -> Option<Self> {
        (1..=12).contains(&num).then_some(Self(num))
    }
}

impl Default for Cheques {
    fn default() -> Self {
        Self::ONE
    }
}

impl FromStr for Cheques {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse()
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `Cheques`")
    }
}

/// Free-text payment terms of a [`Contract`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PaymentTerms(String);

impl PaymentTerms {
    /// Creates a new [`PaymentTerms`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `terms` are not empty.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(terms: impl Into<String>) -> Self {
        Self(terms.into())
    }

    /// Creates a new [`PaymentTerms`] if the given `terms` are valid.
    #[must_use]
    pub fn new(terms: impl Into<String>) -> Option<Self> {
        let terms = terms.into();
        Self::check(&terms).then_some(Self(terms))
    }

    /// Checks whether the given `terms` are valid [`PaymentTerms`].
    fn check(terms: impl AsRef<str>) -> bool {
        let terms = terms.as_ref();
        terms.trim() == terms && !terms.is_empty() && terms.len() <= 1024
    }
}

impl FromStr for PaymentTerms {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `PaymentTerms`")
    }
}

/// Marker type indicating a rental period start.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// [`DateTime`] when a rental period starts.
pub type StartDateTime = DateTimeOf<(Contract, Start)>;

/// Marker type indicating a rental period end.
#[derive(Clone, Copy, Debug)]
pub struct End;

/// [`DateTime`] when a rental period ends.
pub type EndDateTime = DateTimeOf<(Contract, End)>;

#[cfg(test)]
mod spec {
    use super::Cheques;

    #[test]
    fn cheques_bounds() {
        assert!(Cheques::new(1).is_some());
        assert!(Cheques::new(12).is_some());

        assert!(Cheques::new(0).is_none());
        assert!(Cheques::new(13).is_none());
        assert!(Cheques::new(-1).is_none());
    }
}
