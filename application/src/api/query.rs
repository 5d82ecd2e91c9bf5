//! GraphQL [`Query`]s definitions.

use itertools::Itertools as _;
use juniper::graphql_object;
use service::{query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Contract` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` with the specified ID does not
    ///                           exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "contract",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn contract(
        id: api::contract::Id,
        ctx: &Context,
    ) -> Result<api::contract::list::Edge, Error> {
        Self::contracts(
            None,
            Some(id.into()),
            None,
            Some(id.into()),
            None,
            None,
            None,
            None,
            None,
            ctx,
        )
        .await?
        .edges()
        .into_iter()
        .exactly_one()
        .map_err(|_| ContractError::NotExists.into())
        .map_err(ctx.error())
    }

    /// Fetches the page of `Contract`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            agent_id = ?agent_id.as_ref().map(ToString::to_string),
            before = ?before,
            first = ?first,
            gql.name = "contracts",
            last = ?last,
            otel.name = Self::SPAN_NAME,
            owner_id = ?owner_id.as_ref().map(ToString::to_string),
            property_id = ?property_id.as_ref().map(ToString::to_string),
            status = ?status,
            tenant_name = ?tenant_name.as_ref().map(ToString::to_string),
        ),
    )]
    #[expect(clippy::too_many_arguments, reason = "still readable")]
    pub async fn contracts(
        first: Option<i32>,
        after: Option<api::contract::list::Cursor>,
        last: Option<i32>,
        before: Option<api::contract::list::Cursor>,
        status: Option<api::contract::Status>,
        property_id: Option<api::property::Id>,
        agent_id: Option<api::user::Id>,
        owner_id: Option<api::user::Id>,
        tenant_name: Option<api::contract::TenantName>,
        ctx: &Context,
    ) -> Result<api::contract::list::Connection, Error> {
        const DEFAULT_PAGE_SIZE: i32 = 10;

        ctx.service()
            .execute(query::contracts::List::by(
                read::contract::list::Selector {
                    arguments: read::contract::list::Arguments::new(
                        first,
                        after.map(Into::into),
                        last,
                        before.map(Into::into),
                        DEFAULT_PAGE_SIZE,
                    )
                    .ok_or_else(|| api::PaginationError::Ambiguous.into())
                    .map_err(ctx.error())?,
                    filter: read::contract::list::Filter {
                        status: status.map(Into::into),
                        property_id: property_id.map(Into::into),
                        agent_id: agent_id.map(Into::into),
                        owner_id: owner_id.map(Into::into),
                        tenant_name: tenant_name.map(Into::into),
                    },
                },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum ContractError {
        #[code = "CONTRACT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Contract` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum PropertyError {
        #[code = "PROPERTY_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Property` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the specified ID does not exist"]
        NotExists,
    }
}
