//! Object storage definitions.

use std::{io, path::PathBuf};

use common::operations::Upload;
use derive_more::{AsRef, Display, Error as StdError, From, Into};
use tracerr::Traced;

use crate::domain::contract;

/// Object storage operation.
pub use common::Handler as Storage;

/// Binary object to be stored.
#[derive(Clone, Debug)]
pub struct Object {
    /// [`Key`] to store this [`Object`] under.
    pub key: Key,

    /// Raw bytes of this [`Object`].
    pub bytes: Vec<u8>,

    /// MIME content type of this [`Object`].
    pub content_type: String,
}

/// Key a stored [`Object`] is addressed by.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
pub struct Key(String);

impl Key {
    /// Returns the [`Key`] of the unsigned document of the [`Contract`] with
    /// the provided ID.
    ///
    /// [`Contract`]: crate::domain::Contract
    #[must_use]
    pub fn contract_unsigned(id: contract::Id) -> Self {
        Self(format!("contracts/{id}/contract-unsigned.pdf"))
    }
}

/// URL a stored [`Object`] is retrievable at.
#[derive(AsRef, Clone, Debug, Display, Eq, From, Into, PartialEq)]
#[as_ref(str, String)]
pub struct Url(String);

impl From<Url> for contract::DocumentUrl {
    fn from(url: Url) -> Self {
        #[expect(unsafe_code, reason = "`Url` is never empty")]
        unsafe {
            Self::new_unchecked(url.0)
        }
    }
}

/// [`Storage`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Underlying I/O operation failed.
    #[display("I/O operation failed: {_0}")]
    Io(io::Error),
}

/// Filesystem-backed [`Storage`] serving stored [`Object`]s under a base URL.
///
/// Stands in for a real object storage backend, which lives outside this
/// service.
#[derive(Clone, Debug)]
pub struct Local {
    /// Root directory the [`Object`]s are stored under.
    root: PathBuf,

    /// Base URL the stored [`Object`]s are served under.
    base_url: String,
}

impl Local {
    /// Creates a new [`Local`] storage with the provided parameters.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

impl Storage<Upload<Object>> for Local {
    type Ok = Url;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Upload(object): Upload<Object>,
    ) -> Result<Self::Ok, Self::Err> {
        let Object {
            key,
            bytes,
            content_type: _,
        } = object;

        let path = self.root.join(AsRef::<str>::as_ref(&key));
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(tracerr::from_and_wrap!(=> Error))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        Ok(Url(format!("{}/{key}", self.base_url)))
    }
}
