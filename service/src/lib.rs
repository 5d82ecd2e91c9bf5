//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
#[cfg(test)]
pub(crate) mod stub;

use std::time;

use smart_default::SmartDefault;

#[cfg(doc)]
use crate::{
    domain::Contract,
    infra::{notifier::Notifier, storage::Storage, Database},
};

pub use self::{command::Command, query::Query};

/// [`Service`] configuration.
#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    /// OTP issuance and verification configuration.
    pub otp: Otp,

    /// Base URL of the tenant-facing contract signing page.
    #[default("http://127.0.0.1:8080/sign".to_owned())]
    pub signing_base_url: String,
}

/// OTP configuration of a [`Service`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Otp {
    /// Time a freshly issued OTP stays valid for.
    #[default(time::Duration::from_secs(10 * 60))]
    pub ttl: time::Duration,

    /// Number of failed verification attempts exhausting an OTP.
    #[default(5)]
    pub attempt_limit: u8,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Gen, Store, Ntf> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// Document [`Generator`] of this [`Service`].
    ///
    /// [`Generator`]: infra::document::Generator
    generator: Gen,

    /// Object [`Storage`] of this [`Service`].
    storage: Store,

    /// [`Notifier`] of this [`Service`].
    notifier: Ntf,
}

impl<Db, Gen, Store, Ntf> Service<Db, Gen, Store, Ntf> {
    /// Creates a new [`Service`] with the provided parameters.
    pub fn new(
        config: Config,
        database: Db,
        generator: Gen,
        storage: Store,
        notifier: Ntf,
    ) -> Self {
        Self {
            config,
            database,
            generator,
            storage,
            notifier,
        }
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns the document [`Generator`] of this [`Service`].
    ///
    /// [`Generator`]: infra::document::Generator
    #[must_use]
    pub fn generator(&self) -> &Gen {
        &self.generator
    }

    /// Returns the object [`Storage`] of this [`Service`].
    #[must_use]
    pub fn storage(&self) -> &Store {
        &self.storage
    }

    /// Returns the [`Notifier`] of this [`Service`].
    #[must_use]
    pub fn notifier(&self) -> &Ntf {
        &self.notifier
    }

    /// Returns the URL of the tenant-facing signing page of the [`Contract`]
    /// with the provided ID.
    #[must_use]
    pub fn signing_url(&self, id: domain::contract::Id) -> String {
        format!("{}/{id}", self.config.signing_base_url.trim_end_matches('/'))
    }
}
