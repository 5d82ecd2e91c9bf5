//! GraphQL [`Mutation`]s definitions.

use common::{DateTime, Money};
use juniper::graphql_object;
use service::{command, domain::contract::terms, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Creates a new `Contract` draft with the provided details.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` with the provided ID does not
    ///                           exist;
    /// - `INVALID_CHEQUES` - the provided number of cheques is out of the
    ///                       `1..=12` range.
    #[tracing::instrument(
        skip_all,
        fields(
            agent_id = %agent_id,
            cheques = ?cheques,
            ends_on = %ends_on.to_rfc3339(),
            gql.name = "createContract",
            otel.name = Self::SPAN_NAME,
            property_id = %property_id,
            rent = %rent,
            starts_on = %starts_on.to_rfc3339(),
            tenant_name = %tenant_name,
        ),
    )]
    #[expect(clippy::too_many_arguments, reason = "still readable")]
    pub async fn create_contract(
        property_id: api::property::Id,
        agent_id: api::user::Id,
        tenant_name: api::contract::TenantName,
        tenant_phone: api::user::Phone,
        tenant_email: api::user::Email,
        tenant_emirates_id: api::contract::TenantEmiratesId,
        starts_on: DateTime,
        ends_on: DateTime,
        rent: Money,
        deposit: Money,
        cheques: Option<i32>,
        payment_terms: Option<api::contract::PaymentTerms>,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        let cheques = cheques
            .map(|num| {
                i16::try_from(num)
                    .ok()
                    .and_then(terms::Cheques::new)
                    .ok_or_else(|| Error::from(InputError::InvalidCheques))
            })
            .transpose()
            .map_err(ctx.error())?
            .unwrap_or_default();

        ctx.service()
            .execute(command::CreateContract {
                property_id: property_id.into(),
                agent_id: agent_id.into(),
                tenant: service::domain::contract::Tenant {
                    name: tenant_name.into(),
                    phone: tenant_phone.into(),
                    email: tenant_email.into(),
                    emirates_id: tenant_emirates_id.into(),
                },
                terms: terms::Terms {
                    starts_on: starts_on.coerce(),
                    ends_on: ends_on.coerce(),
                    rent,
                    deposit,
                    cheques,
                    payment_terms: payment_terms.map(Into::into),
                },
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Partially updates the `Contract` with the provided ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` with the provided ID does not
    ///                           exist;
    /// - `INVALID_CHEQUES` - the provided number of cheques is out of the
    ///                       `1..=12` range.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateContract",
            id = %id,
            otel.name = Self::SPAN_NAME,
            status = ?status,
        ),
    )]
    #[expect(clippy::too_many_arguments, reason = "still readable")]
    pub async fn update_contract(
        id: api::contract::Id,
        agent_id: Option<api::user::Id>,
        tenant_name: Option<api::contract::TenantName>,
        tenant_phone: Option<api::user::Phone>,
        tenant_email: Option<api::user::Email>,
        tenant_emirates_id: Option<api::contract::TenantEmiratesId>,
        starts_on: Option<DateTime>,
        ends_on: Option<DateTime>,
        rent: Option<Money>,
        deposit: Option<Money>,
        cheques: Option<i32>,
        payment_terms: Option<api::contract::PaymentTerms>,
        status: Option<api::contract::Status>,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        let cheques = cheques
            .map(|num| {
                i16::try_from(num)
                    .ok()
                    .and_then(terms::Cheques::new)
                    .ok_or_else(|| Error::from(InputError::InvalidCheques))
            })
            .transpose()
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::UpdateContract {
                contract_id: id.into(),
                agent_id: agent_id.map(Into::into),
                tenant_name: tenant_name.map(Into::into),
                tenant_phone: tenant_phone.map(Into::into),
                tenant_email: tenant_email.map(Into::into),
                tenant_emirates_id: tenant_emirates_id.map(Into::into),
                starts_on: starts_on.map(DateTime::coerce),
                ends_on: ends_on.map(DateTime::coerce),
                rent,
                deposit,
                cheques,
                payment_terms: payment_terms.map(Into::into),
                status: status.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Renders the unsigned document of the `Contract` with the provided ID
    /// and stores it.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` with the provided ID does not
    ///                           exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "generateContractPdf",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn generate_contract_pdf(
        id: api::contract::Id,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        ctx.service()
            .execute(command::GenerateContractPdf {
                contract_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Issues a fresh signing OTP to the tenant of the `Contract` with the
    /// provided ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` with the provided ID does not
    ///                           exist;
    /// - `PDF_NOT_GENERATED` - the `Contract` document is not generated yet;
    /// - `CONTRACT_ALREADY_SIGNED` - the `Contract` is signed already;
    /// - `OTP_DELIVERY_FAILED` - the OTP was stored, but its SMS delivery
    ///                           failed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "sendContractOtp",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn send_contract_otp(
        id: api::contract::Id,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        ctx.service()
            .execute(command::SendSigningOtp {
                contract_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Verifies the submitted OTP code and signs the `Contract` with the
    /// provided ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` with the provided ID does not
    ///                           exist;
    /// - `CONTRACT_NOT_PENDING` - the `Contract` is not pending signature;
    /// - `OTP_ATTEMPTS_EXCEEDED` - too many failed attempts, a new OTP must
    ///                             be requested;
    /// - `OTP_EXPIRED` - the OTP has expired, a new one must be requested;
    /// - `OTP_INVALID` - the submitted OTP does not match;
    /// - `CLIENT_IP_UNRESOLVED` - the client IP address could not be
    ///                            resolved.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "verifyContractOtpAndSign",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn verify_contract_otp_and_sign(
        id: api::contract::Id,
        otp: api::contract::OtpCode,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        let ip = ctx
            .client_ip()
            .ok_or_else(|| Error::from(InputError::ClientIpUnresolved))
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::VerifyOtpAndSign {
                contract_id: id.into(),
                code: otp.into(),
                ip: ip.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum InputError {
        #[code = "INVALID_CHEQUES"]
        #[status = BAD_REQUEST]
        #[message = "Number of cheques must be within the 1..=12 range"]
        InvalidCheques,

        #[code = "CLIENT_IP_UNRESOLVED"]
        #[status = BAD_REQUEST]
        #[message = "Client IP address could not be resolved"]
        ClientIpUnresolved,
    }
}

impl AsError for command::create_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "PROPERTY_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Property` with the provided ID does not exist"]
                PropertyNotExists,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::PropertyNotExists(_) => Some(Error::PropertyNotExists.into()),
        }
    }
}

impl AsError for command::update_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CONTRACT_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Contract` with the provided ID does not exist"]
                ContractNotExists,
            }
        }

        match self {
            Self::ContractNotExists(_) => Some(Error::ContractNotExists.into()),
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::generate_contract_pdf::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CONTRACT_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Contract` with the provided ID does not exist"]
                ContractNotExists,

                #[code = "PROPERTY_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Property` with the provided ID does not exist"]
                PropertyNotExists,
            }
        }

        match self {
            Self::ContractNotExists(_) => Some(Error::ContractNotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::PropertyNotExists(_) => Some(Error::PropertyNotExists.into()),
            Self::Render(_) | Self::Upload(_) | Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::send_signing_otp::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CONTRACT_ALREADY_SIGNED"]
                #[status = CONFLICT]
                #[message = "Contract already signed"]
                AlreadySigned,

                #[code = "CONTRACT_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Contract` with the provided ID does not exist"]
                ContractNotExists,

                #[code = "PDF_NOT_GENERATED"]
                #[status = PRECONDITION_FAILED]
                #[message = "PDF must be generated first"]
                DocumentNotGenerated,

                #[code = "OTP_DELIVERY_FAILED"]
                #[status = BAD_GATEWAY]
                #[message = "OTP stored, but its SMS delivery failed"]
                Undelivered,
            }
        }

        Some(match self {
            Self::AlreadySigned(_) => Error::AlreadySigned.into(),
            Self::ContractNotExists(_) => Error::ContractNotExists.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::DocumentNotGenerated(_) => {
                Error::DocumentNotGenerated.into()
            }
            Self::Undelivered(_) => Error::Undelivered.into(),
        })
    }
}

impl AsError for command::verify_otp_and_sign::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "OTP_ATTEMPTS_EXCEEDED"]
                #[status = TOO_MANY_REQUESTS]
                #[message = "Too many attempts. Please request a new OTP."]
                AttemptsExceeded,

                #[code = "CONTRACT_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Contract` with the provided ID does not exist"]
                ContractNotExists,

                #[code = "CONTRACT_NOT_PENDING"]
                #[status = CONFLICT]
                #[message = "Contract is not pending signature"]
                ContractNotPending,

                #[code = "OTP_EXPIRED"]
                #[status = GONE]
                #[message = "OTP has expired. Please request a new one."]
                OtpExpired,

                #[code = "OTP_INVALID"]
                #[status = FORBIDDEN]
                #[message = "Invalid OTP"]
                OtpMismatch,
            }
        }

        Some(match self {
            Self::AttemptsExceeded(_) => Error::AttemptsExceeded.into(),
            Self::ContractNotExists(_) => Error::ContractNotExists.into(),
            Self::ContractNotPending(_) => Error::ContractNotPending.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::OtpExpired(_) => Error::OtpExpired.into(),
            Self::OtpMismatch(_) => Error::OtpMismatch.into(),
        })
    }
}
