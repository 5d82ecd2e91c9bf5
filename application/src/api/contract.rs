//! [`Contract`]-related definitions.

use common::{DateTime, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query, Query as _};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// Rental contract between a tenant and a property owner, signed through an
/// OTP challenge.
#[derive(Clone, Debug)]
pub struct Contract {
    /// ID of this [`Contract`].
    id: Id,

    /// Underlying [`domain::Contract`].
    contract: OnceCell<domain::Contract>,

    /// [`Property`] this [`Contract`] is about.
    ///
    /// [`Property`]: api::Property
    property: OnceCell<api::Property>,

    /// [`User`] brokering this [`Contract`].
    ///
    /// [`User`]: api::User
    agent: OnceCell<api::User>,

    /// [`User`] owning the property of this [`Contract`].
    ///
    /// [`User`]: api::User
    owner: OnceCell<api::User>,
}

impl From<domain::Contract> for Contract {
    fn from(contract: domain::Contract) -> Self {
        Self {
            id: contract.id.into(),
            contract: OnceCell::new_with(Some(contract)),
            property: OnceCell::new(),
            agent: OnceCell::new(),
            owner: OnceCell::new(),
        }
    }
}

impl Contract {
    /// Creates a new [`Contract`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that the provided ID relates to an existing
    /// [`domain::Contract`].
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            contract: OnceCell::new(),
            property: OnceCell::new(),
            agent: OnceCell::new(),
            owner: OnceCell::new(),
        }
    }

    /// Returns the [`domain::Contract`] representing this [`Contract`].
    ///
    /// # Errors
    ///
    /// Returns an error if the [`domain::Contract`] does not exist.
    async fn contract(
        &self,
        ctx: &Context,
    ) -> Result<&domain::Contract, Error> {
        self.contract
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::contract::ById::by(self.id.into()))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|c| {
                        futures::future::ready(c.ok_or_else(|| {
                            api::query::ContractError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// Rental contract between a tenant and a property owner.
#[graphql_object(context = Context)]
impl Contract {
    /// Unique identifier of this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Human-readable sequential number of this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.number",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn number(&self, ctx: &Context) -> Result<Number, Error> {
        Ok(self.contract(ctx).await?.number.clone().into())
    }

    /// Status of this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn status(&self, ctx: &Context) -> Result<Status, Error> {
        Ok(self.contract(ctx).await?.status.into())
    }

    /// `Property` this `Contract` is about.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.property",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn property(
        &self,
        ctx: &Context,
    ) -> Result<&api::Property, Error> {
        let id = self.contract(ctx).await?.property_id;
        self.property
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::property::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|p| {
                        futures::future::ready(p.map_or_else(
                            || {
                                Err(api::query::PropertyError::NotExists
                                    .into())
                            },
                            |p| Ok(p.into()),
                        ))
                    })
            })
            .await
    }

    /// `User` brokering this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.agent",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn agent(&self, ctx: &Context) -> Result<&api::User, Error> {
        let id = self.contract(ctx).await?.agent_id;
        self.agent
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::user::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|u| {
                        futures::future::ready(u.map_or_else(
                            || Err(api::query::UserError::NotExists.into()),
                            |u| Ok(u.into()),
                        ))
                    })
            })
            .await
    }

    /// `User` owning the property of this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.owner",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn owner(&self, ctx: &Context) -> Result<&api::User, Error> {
        let id = self.contract(ctx).await?.owner_id;
        self.owner
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::user::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|u| {
                        futures::future::ready(u.map_or_else(
                            || Err(api::query::UserError::NotExists.into()),
                            |u| Ok(u.into()),
                        ))
                    })
            })
            .await
    }

    /// Name of the tenant of this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.tenantName",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn tenant_name(&self, ctx: &Context) -> Result<TenantName, Error> {
        Ok(self.contract(ctx).await?.tenant.name.clone().into())
    }

    /// Phone of the tenant of this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.tenantPhone",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn tenant_phone(
        &self,
        ctx: &Context,
    ) -> Result<api::user::Phone, Error> {
        Ok(self.contract(ctx).await?.tenant.phone.clone().into())
    }

    /// Email of the tenant of this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.tenantEmail",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn tenant_email(
        &self,
        ctx: &Context,
    ) -> Result<api::user::Email, Error> {
        Ok(self.contract(ctx).await?.tenant.email.clone().into())
    }

    /// Emirates ID of the tenant of this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.tenantEmiratesId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn tenant_emirates_id(
        &self,
        ctx: &Context,
    ) -> Result<TenantEmiratesId, Error> {
        Ok(self.contract(ctx).await?.tenant.emirates_id.clone().into())
    }

    /// `DateTime` when the rental period of this `Contract` starts.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.startsOn",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn starts_on(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.contract(ctx).await?.terms.starts_on.coerce())
    }

    /// `DateTime` when the rental period of this `Contract` ends.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.endsOn",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn ends_on(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.contract(ctx).await?.terms.ends_on.coerce())
    }

    /// Yearly rent amount of this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.rent",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn rent(&self, ctx: &Context) -> Result<Money, Error> {
        Ok(self.contract(ctx).await?.terms.rent)
    }

    /// Deposit amount of this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.deposit",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn deposit(&self, ctx: &Context) -> Result<Money, Error> {
        Ok(self.contract(ctx).await?.terms.deposit)
    }

    /// Number of cheques the rent of this `Contract` is paid with.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.cheques",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn cheques(&self, ctx: &Context) -> Result<i32, Error> {
        Ok(i32::from(i16::from(self.contract(ctx).await?.terms.cheques)))
    }

    /// Payment terms of this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.paymentTerms",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn payment_terms(
        &self,
        ctx: &Context,
    ) -> Result<Option<PaymentTerms>, Error> {
        Ok(self
            .contract(ctx)
            .await?
            .terms
            .payment_terms
            .clone()
            .map(Into::into))
    }

    /// URL of the generated unsigned document of this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.pdfUrl",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn pdf_url(
        &self,
        ctx: &Context,
    ) -> Result<Option<DocumentUrl>, Error> {
        Ok(self.contract(ctx).await?.pdf_url.clone().map(Into::into))
    }

    /// URL of the signed document artifact of this `Contract`, once one is
    /// produced.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.signedPdfUrl",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn signed_pdf_url(
        &self,
        ctx: &Context,
    ) -> Result<Option<DocumentUrl>, Error> {
        Ok(self
            .contract(ctx)
            .await?
            .signed_pdf_url
            .clone()
            .map(Into::into))
    }

    /// `DateTime` when this `Contract` was signed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.signedAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn signed_at(
        &self,
        ctx: &Context,
    ) -> Result<Option<DateTime>, Error> {
        Ok(self.contract(ctx).await?.signed_at.map(DateTimeOf::coerce))
    }

    /// IP address this `Contract` was signed from.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.signedIp",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn signed_ip(
        &self,
        ctx: &Context,
    ) -> Result<Option<String>, Error> {
        Ok(self
            .contract(ctx)
            .await?
            .signed_ip
            .map(|ip| ip.to_string()))
    }

    /// `DateTime` when this `Contract` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.contract(ctx).await?.created_at.coerce())
    }
}

/// Unique identifier of a `Contract`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::contract::Id)]
#[into(domain::contract::Id)]
#[graphql(name = "ContractId", transparent)]
pub struct Id(Uuid);

/// Human-readable sequential number of a `Contract`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ContractNumber",
    with = scalar::Via::<domain::contract::Number>,
)]
pub struct Number(domain::contract::Number);

/// Name of a `Contract` tenant.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "TenantName",
    with = scalar::Via::<domain::contract::tenant::Name>,
)]
pub struct TenantName(domain::contract::tenant::Name);

/// Emirates ID of a `Contract` tenant.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "TenantEmiratesId",
    with = scalar::Via::<domain::contract::tenant::EmiratesId>,
)]
pub struct TenantEmiratesId(domain::contract::tenant::EmiratesId);

/// Payment terms of a `Contract`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ContractPaymentTerms",
    with = scalar::Via::<domain::contract::terms::PaymentTerms>,
)]
pub struct PaymentTerms(domain::contract::terms::PaymentTerms);

/// URL of a generated `Contract` document.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ContractDocumentUrl",
    with = scalar::Via::<domain::contract::DocumentUrl>,
)]
pub struct DocumentUrl(domain::contract::DocumentUrl);

/// One-time password code signing a `Contract`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ContractOtpCode",
    with = scalar::Via::<domain::contract::otp::Code>,
)]
pub struct OtpCode(domain::contract::otp::Code);

/// Status of a `Contract`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ContractStatus")]
pub enum Status {
    /// The `Contract` is drafted and not yet sent for signing.
    Draft,

    /// An OTP was issued and the `Contract` awaits the tenant's signature.
    PendingSignature,

    /// The `Contract` was signed by the tenant.
    Signed,

    /// The `Contract` term is running.
    Active,

    /// The `Contract` term has elapsed.
    Expired,

    /// The `Contract` was terminated before its end date.
    Terminated,
}

impl From<domain::contract::Status> for Status {
    fn from(status: domain::contract::Status) -> Self {
        use domain::contract::Status as S;
        match status {
            S::Draft => Self::Draft,
            S::PendingSignature => Self::PendingSignature,
            S::Signed => Self::Signed,
            S::Active => Self::Active,
            S::Expired => Self::Expired,
            S::Terminated => Self::Terminated,
        }
    }
}

impl From<Status> for domain::contract::Status {
    fn from(status: Status) -> Self {
        use Status as S;
        match status {
            S::Draft => Self::Draft,
            S::PendingSignature => Self::PendingSignature,
            S::Signed => Self::Signed,
            S::Active => Self::Active,
            S::Expired => Self::Expired,
            S::Terminated => Self::Terminated,
        }
    }
}

pub mod list {
    //! Definitions related to the [`Contract`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::{query, read, Query as _};

    #[cfg(doc)]
    use crate::api::Contract;
    use crate::{api::scalar, AsError, Context, Error};

    use super::Id;

    /// Cursor for the `Contract` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::contract::list::Cursor)]
    #[graphql(
        name = "ContractListCursor",
        with = scalar::Via::<read::contract::list::Cursor>,
    )]
    pub struct Cursor(pub read::contract::list::Cursor);

    /// Edge in the [`Contract`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct Edge(read::contract::list::Edge);

    /// Edge in the `Contract` list.
    #[graphql_object(name = "ContractListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `ContractListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `ContractListEdge`.
        #[must_use]
        pub fn node(&self) -> super::Contract {
            #[expect(
                unsafe_code,
                reason = "`Edge` loaded from repository guarantees `Contract`\
                          existence"
            )]
            unsafe {
                super::Contract::new_unchecked(self.0.node)
            }
        }
    }

    /// Connection of the [`Contract`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Connection(read::contract::list::Connection);

    /// Connection of the `Contract` list.
    #[graphql_object(name = "ContractListConnection", context = Context)]
    impl Connection {
        /// Edges in this `ContractListConnection`.
        #[must_use]
        pub fn edges(&self) -> Vec<Edge> {
            self.0.edges.iter().copied().map(Into::into).collect()
        }

        /// Information about the page.
        #[must_use]
        pub fn page_info(&self) -> PageInfo {
            PageInfo {
                info: self.0.page_info(),
                start_cursor: self.0.edges.first().map(|e| e.cursor.into()),
                end_cursor: self.0.edges.last().map(|e| e.cursor.into()),
            }
        }
    }

    /// Information about a [`Connection`] page.
    #[derive(Clone, Copy, Debug)]
    pub struct PageInfo {
        /// Underlying [`read::contract::list::PageInfo`].
        info: read::contract::list::PageInfo,

        /// Start cursor of the page.
        start_cursor: Option<Cursor>,

        /// End cursor of the page.
        end_cursor: Option<Cursor>,
    }

    /// Information about a `ContractListConnection` page.
    #[graphql_object(name = "ContractListPageInfo", context = Context)]
    impl PageInfo {
        /// Indicator whether there is a next page.
        #[must_use]
        pub fn has_next_page(&self) -> bool {
            self.info.has_next_page
        }

        /// Indicator whether there is a previous page.
        #[must_use]
        pub fn has_previous_page(&self) -> bool {
            self.info.has_previous_page
        }

        /// Start cursor of the page.
        #[must_use]
        pub fn start_cursor(&self) -> &Option<Cursor> {
            &self.start_cursor
        }

        /// End cursor of the page.
        #[must_use]
        pub fn end_cursor(&self) -> &Option<Cursor> {
            &self.end_cursor
        }

        /// Total `Contract`s count.
        pub async fn total_count(&self, ctx: &Context) -> Result<i32, Error> {
            ctx.service()
                .execute(query::contracts::TotalCount::by(()))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())
                .map(Into::into)
        }
    }
}
