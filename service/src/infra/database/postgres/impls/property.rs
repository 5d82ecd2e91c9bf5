//! [`Property`]-related [`Database`] implementations.

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{property, Property},
    infra::{
        database,
        database::postgres::{Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<Property>, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, owner_id, title, address_line, city, created_at \
            FROM properties \
            WHERE id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Property {
                id: row.get("id"),
                owner_id: row.get("owner_id"),
                title: row.get("title"),
                address_line: row.get("address_line"),
                city: row.get("city"),
                created_at: row.get("created_at"),
            }))
    }
}
