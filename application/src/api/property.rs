//! [`Property`]-related definitions.

use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLScalar};
use service::{domain, query, Query as _};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// Property a `Contract` is concluded about.
#[derive(Clone, Debug)]
pub struct Property {
    /// ID of this [`Property`].
    id: Id,

    /// Underlying [`domain::Property`].
    property: OnceCell<domain::Property>,

    /// [`User`] owning this [`Property`].
    ///
    /// [`User`]: api::User
    owner: OnceCell<api::User>,
}

impl From<domain::Property> for Property {
    fn from(property: domain::Property) -> Self {
        Self {
            id: property.id.into(),
            property: OnceCell::new_with(Some(property)),
            owner: OnceCell::new(),
        }
    }
}

impl Property {
    /// Creates a new [`Property`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that the provided ID relates to an existing
    /// [`domain::Property`].
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            property: OnceCell::new(),
            owner: OnceCell::new(),
        }
    }

    /// Returns the [`domain::Property`] representing this [`Property`].
    ///
    /// # Errors
    ///
    /// Returns an error if the [`domain::Property`] does not exist.
    async fn property(
        &self,
        ctx: &Context,
    ) -> Result<&domain::Property, Error> {
        self.property
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::property::ById::by(self.id.into()))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|p| {
                        futures::future::ready(p.ok_or_else(|| {
                            api::query::PropertyError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// Property a `Contract` is concluded about.
#[graphql_object(context = Context)]
impl Property {
    /// Unique identifier of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Title of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.title",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn title(&self, ctx: &Context) -> Result<Title, Error> {
        Ok(self.property(ctx).await?.title.clone().into())
    }

    /// Address line of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.addressLine",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn address_line(
        &self,
        ctx: &Context,
    ) -> Result<AddressLine, Error> {
        Ok(self.property(ctx).await?.address_line.clone().into())
    }

    /// City this `Property` is located in.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.city",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn city(&self, ctx: &Context) -> Result<City, Error> {
        Ok(self.property(ctx).await?.city.clone().into())
    }

    /// `User` owning this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.owner",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn owner(&self, ctx: &Context) -> Result<&api::User, Error> {
        let id = self.property(ctx).await?.owner_id;
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
}

/// Unique identifier of a `Property`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::property::Id)]
#[into(domain::property::Id)]
#[graphql(name = "PropertyId", transparent)]
pub struct Id(Uuid);

/// Title of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyTitle",
    with = scalar::Via::<domain::property::Title>,
)]
pub struct Title(domain::property::Title);

/// Address line of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyAddressLine",
    with = scalar::Via::<domain::property::AddressLine>,
)]
pub struct AddressLine(domain::property::AddressLine);

/// City of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyCity",
    with = scalar::Via::<domain::property::City>,
)]
pub struct City(domain::property::City);
