//! One-time password definitions for [`Contract`] signing.
//!
//! [`Contract`]: super::Contract

use std::str::FromStr;

use common::DateTimeOf;
use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rand::Rng as _;

#[cfg(doc)]
use common::DateTime;

/// One-time password authenticating a tenant's intent to sign.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Code(String);

impl Code {
    /// Number of digits in a [`Code`].
    pub const LENGTH: usize = 6;

    /// Generates a new random [`Code`], drawn uniformly from
    /// `[100000, 999999]`.
    #[must_use]
    pub fn generate() -> Self {
        Self(rand::thread_rng().gen_range(100_000..=999_999).to_string())
    }

    /// Creates a new [`Code`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `code` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Creates a new [`Code`] if the given `code` is valid.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        Self::check(&code).then_some(Self(code))
    }

    /// Checks whether the given `code` is a valid [`Code`].
    fn check(code: impl AsRef<str>) -> bool {
        let code = code.as_ref();
        code.len() == Self::LENGTH
            && code.bytes().all(|b| b.is_ascii_digit())
    }
}

impl FromStr for Code {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Code`")
    }
}

/// Counter of failed verification attempts against a [`Code`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Attempts(i32);

impl Attempts {
    /// No failed attempts yet.
    pub const ZERO: Self = Self(0);

    /// Returns this [`Attempts`] counter incremented by one.
    #[must_use]
    pub fn incremented(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Indicates whether the lockout `limit` is reached by this [`Attempts`]
    /// counter.
    #[must_use]
    pub fn is_exhausted(self, limit: u8) -> bool {
        self.0 >= i32::from(limit)
    }
}

/// Marker type indicating [`Code`] expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// [`DateTime`] when a [`Code`] expires.
pub type ExpirationDateTime = DateTimeOf<(Code, Expiration)>;

#[cfg(test)]
mod spec {
    use super::{Attempts, Code};

    #[test]
    fn generates_six_digits_in_range() {
        for _ in 0..100 {
            let code = Code::generate().to_string();
            assert_eq!(code.len(), Code::LENGTH);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n), "{n} out of range");
        }
    }

    #[test]
    fn validates_format() {
        assert!(Code::new("123456").is_some());
        assert!(Code::new("000000").is_some());

        assert!(Code::new("12345").is_none());
        assert!(Code::new("1234567").is_none());
        assert!(Code::new("12345a").is_none());
        assert!(Code::new("12 456").is_none());
    }

    #[test]
    fn counts_towards_lockout() {
        let mut attempts = Attempts::ZERO;
        for _ in 0..5 {
            assert!(!attempts.is_exhausted(5));
            attempts = attempts.incremented();
        }
        assert!(attempts.is_exhausted(5));
    }
}
