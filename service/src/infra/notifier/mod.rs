//! [`Notifier`]-related definitions.

use common::{define_kind, operations::Dispatch, DateTime};
use derive_more::{Display, Error as StdError};
use tracerr::Traced;
use tracing as log;

use crate::domain::user;

/// Notifier operation.
pub use common::Handler as Notifier;

/// SMS message to be delivered to a phone number.
#[derive(Clone, Debug)]
pub struct Sms {
    /// [`user::Phone`] number to deliver this [`Sms`] to.
    pub to: user::Phone,

    /// Text of this [`Sms`].
    pub body: String,

    /// [`Kind`] of this [`Sms`].
    pub kind: Kind,
}

define_kind! {
    #[doc = "Kind of an [`Sms`]."]
    enum Kind {
        #[doc = "OTP challenge for signing a contract."]
        ContractSigningOtp = 1,

        #[doc = "Confirmation to the tenant that a contract was signed."]
        ContractSignedTenant = 2,

        #[doc = "Confirmation to the agent that a contract was signed."]
        ContractSignedAgent = 3,

        #[doc = "Confirmation to the owner that a contract was signed."]
        ContractSignedOwner = 4,
    }
}

/// Record of a performed delivery attempt.
#[derive(Clone, Debug)]
pub struct Delivery {
    /// [`Kind`] of the delivered [`Sms`].
    pub kind: Kind,

    /// [`user::Phone`] number the [`Sms`] was delivered to.
    pub to: user::Phone,

    /// [`DateTime`] when the delivery was attempted.
    pub at: DateTime,
}

/// [`Notifier`] error.
#[derive(Debug, Display, StdError)]
pub enum Error {
    /// SMS gateway failed to accept the message.
    #[display("SMS gateway failed: {_0}")]
    Gateway(#[error(not(source))] String),
}

/// Outcome of a best-effort [`broadcast()`].
#[derive(Debug, Default)]
pub struct Broadcast {
    /// Successfully performed deliveries, in dispatch order.
    pub delivered: Vec<Delivery>,

    /// [`Kind`]s of the messages that failed to dispatch.
    pub failed: Vec<Kind>,
}

impl Broadcast {
    /// Indicates whether every dispatched message was delivered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Dispatches every provided [`Sms`] independently, collecting per-message
/// outcomes.
///
/// A failed dispatch is logged and recorded, and never short-circuits the
/// remaining ones.
pub async fn broadcast<N>(
    notifier: &N,
    messages: impl IntoIterator<Item = Sms>,
) -> Broadcast
where
    N: Notifier<Dispatch<Sms>, Ok = Delivery, Err = Traced<Error>>,
{
    let mut outcome = Broadcast::default();
    for sms in messages {
        let kind = sms.kind;
        match notifier.execute(Dispatch(sms)).await {
            Ok(delivery) => outcome.delivered.push(delivery),
            Err(e) => {
                log::warn!("failed to dispatch `{kind}` SMS: {e}");
                outcome.failed.push(kind);
            }
        }
    }
    outcome
}

/// [`Notifier`] recording every attempt in the log instead of talking to a
/// real SMS gateway.
#[derive(Clone, Copy, Debug, Default)]
pub struct Log;

impl Notifier<Dispatch<Sms>> for Log {
    type Ok = Delivery;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Dispatch(sms): Dispatch<Sms>,
    ) -> Result<Self::Ok, Self::Err> {
        let Sms { to, body, kind } = sms;
        log::info!(%kind, %to, len = body.len(), "SMS dispatched");
        Ok(Delivery {
            kind,
            to,
            at: DateTime::now(),
        })
    }
}
