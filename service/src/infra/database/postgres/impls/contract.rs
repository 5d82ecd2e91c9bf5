//! [`Contract`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    money,
    operations::{Allocate, By, Insert, Lock, Select, Update},
    Money,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    domain::{
        contract,
        contract::{otp, tenant, terms, Tenant, Terms},
        property, user, Contract,
    },
    infra::{
        database,
        database::postgres::{Connection, FuzzPattern, Postgres},
        Database,
    },
    read,
};

impl<C, IDs> Database<Select<By<HashMap<contract::Id, Contract>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[contract::Id]>,
{
    type Ok = HashMap<contract::Id, Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<contract::Id, Contract>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[contract::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = i32::try_from(ids.len()).unwrap();

        #[expect(clippy::items_after_statements, reason = "more readable")]
        const SQL: &str = "\
            SELECT id, number, \
                   property_id, agent_id, owner_id, \
                   tenant_name, tenant_phone, tenant_email, \
                   tenant_emirates_id, \
                   starts_on, ends_on, \
                   rent, rent_currency, \
                   deposit, deposit_currency, \
                   cheques, payment_terms, \
                   status, pdf_url, signed_pdf_url, \
                   otp_code, otp_expires_at, otp_attempts, \
                   signed_at, signed_ip, \
                   created_at \
            FROM contracts \
            WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT4) \
            LIMIT $2::INT4";
        Ok(self
            .query(SQL, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                let contract = Contract {
                    id,
                    number: row.get("number"),
                    property_id: row.get("property_id"),
                    agent_id: row.get("agent_id"),
                    owner_id: row.get("owner_id"),
                    tenant: Tenant {
                        name: row.get("tenant_name"),
                        phone: row.get("tenant_phone"),
                        email: row.get("tenant_email"),
                        emirates_id: row.get("tenant_emirates_id"),
                    },
                    terms: Terms {
                        starts_on: row.get("starts_on"),
                        ends_on: row.get("ends_on"),
                        rent: Money {
                            amount: row.get("rent"),
                            currency: row.get("rent_currency"),
                        },
                        deposit: Money {
                            amount: row.get("deposit"),
                            currency: row.get("deposit_currency"),
                        },
                        cheques: row.get("cheques"),
                        payment_terms: row.get("payment_terms"),
                    },
                    status: row.get("status"),
                    pdf_url: row.get("pdf_url"),
                    signed_pdf_url: row.get("signed_pdf_url"),
                    otp_code: row.get("otp_code"),
                    otp_expires_at: row.get("otp_expires_at"),
                    otp_attempts: row.get("otp_attempts"),
                    signed_at: row.get("signed_at"),
                    signed_ip: row.get("signed_ip"),
                    created_at: row.get("created_at"),
                };
                (id, contract)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Contract>, contract::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<contract::Id, Contract>, [contract::Id; 1]>>,
        Ok = HashMap<contract::Id, Contract>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Insert<Contract>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Contract>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(contract): Insert<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(contract))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Contract>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(contract): Update<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        #[expect(clippy::type_complexity, reason = "still readable")]
        let (
            id,
            number,
            property_id,
            agent_id,
            owner_id,
            tenant_name,
            tenant_phone,
            tenant_email,
            tenant_emirates_id,
            starts_on,
            ends_on,
            rent,
            rent_currency,
            deposit,
            deposit_currency,
            cheques,
            payment_terms,
            status,
            pdf_url,
            signed_pdf_url,
            otp_code,
            otp_expires_at,
            otp_attempts,
            signed_at,
            signed_ip,
            created_at,
        ): (
            contract::Id,
            contract::Number,
            property::Id,
            user::Id,
            user::Id,
            tenant::Name,
            user::Phone,
            user::Email,
            tenant::EmiratesId,
            terms::StartDateTime,
            terms::EndDateTime,
            Decimal,
            money::Currency,
            Decimal,
            money::Currency,
            terms::Cheques,
            Option<terms::PaymentTerms>,
            contract::Status,
            Option<contract::DocumentUrl>,
            Option<contract::DocumentUrl>,
            Option<otp::Code>,
            Option<otp::ExpirationDateTime>,
            otp::Attempts,
            Option<contract::SigningDateTime>,
            Option<contract::Ip>,
            contract::CreationDateTime,
        ) = (
            contract.id,
            contract.number,
            contract.property_id,
            contract.agent_id,
            contract.owner_id,
            contract.tenant.name,
            contract.tenant.phone,
            contract.tenant.email,
            contract.tenant.emirates_id,
            contract.terms.starts_on,
            contract.terms.ends_on,
            contract.terms.rent.amount,
            contract.terms.rent.currency,
            contract.terms.deposit.amount,
            contract.terms.deposit.currency,
            contract.terms.cheques,
            contract.terms.payment_terms,
            contract.status,
            contract.pdf_url,
            contract.signed_pdf_url,
            contract.otp_code,
            contract.otp_expires_at,
            contract.otp_attempts,
            contract.signed_at,
            contract.signed_ip,
            contract.created_at,
        );

        const SQL: &str = "\
            INSERT INTO contracts (\
                id, number, \
                property_id, agent_id, owner_id, \
                tenant_name, tenant_phone, tenant_email, tenant_emirates_id, \
                starts_on, ends_on, \
                rent, rent_currency, \
                deposit, deposit_currency, \
                cheques, payment_terms, \
                status, pdf_url, signed_pdf_url, \
                otp_code, otp_expires_at, otp_attempts, \
                signed_at, signed_ip, \
                created_at\
            ) VALUES (\
                $1::UUID, $2::VARCHAR, \
                $3::UUID, $4::UUID, $5::UUID, \
                $6::VARCHAR, $7::VARCHAR, $8::VARCHAR, $9::VARCHAR, \
                $10::TIMESTAMPTZ, $11::TIMESTAMPTZ, \
                $12::NUMERIC, $13::INT2, \
                $14::NUMERIC, $15::INT2, \
                $16::INT2, $17::VARCHAR, \
                $18::INT2, $19::VARCHAR, $20::VARCHAR, \
                $21::VARCHAR, $22::TIMESTAMPTZ, $23::INT4, \
                $24::TIMESTAMPTZ, $25::INET, \
                $26::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET number = EXCLUDED.number, \
                property_id = EXCLUDED.property_id, \
                agent_id = EXCLUDED.agent_id, \
                owner_id = EXCLUDED.owner_id, \
                tenant_name = EXCLUDED.tenant_name, \
                tenant_phone = EXCLUDED.tenant_phone, \
                tenant_email = EXCLUDED.tenant_email, \
                tenant_emirates_id = EXCLUDED.tenant_emirates_id, \
                starts_on = EXCLUDED.starts_on, \
                ends_on = EXCLUDED.ends_on, \
                rent = EXCLUDED.rent, \
                rent_currency = EXCLUDED.rent_currency, \
                deposit = EXCLUDED.deposit, \
                deposit_currency = EXCLUDED.deposit_currency, \
                cheques = EXCLUDED.cheques, \
                payment_terms = EXCLUDED.payment_terms, \
                status = EXCLUDED.status, \
                pdf_url = EXCLUDED.pdf_url, \
                signed_pdf_url = EXCLUDED.signed_pdf_url, \
                otp_code = EXCLUDED.otp_code, \
                otp_expires_at = EXCLUDED.otp_expires_at, \
                otp_attempts = EXCLUDED.otp_attempts, \
                signed_at = EXCLUDED.signed_at, \
                signed_ip = EXCLUDED.signed_ip, \
                created_at = EXCLUDED.created_at";
        self.exec(
            SQL,
            &[
                &id,
                &number,
                &property_id,
                &agent_id,
                &owner_id,
                &tenant_name,
                &tenant_phone,
                &tenant_email,
                &tenant_emirates_id,
                &starts_on,
                &ends_on,
                &rent,
                &rent_currency,
                &deposit,
                &deposit_currency,
                &cheques,
                &payment_terms,
                &status,
                &pdf_url,
                &signed_pdf_url,
                &otp_code,
                &otp_expires_at,
                &otp_attempts,
                &signed_at,
                &signed_ip,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Contract, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Contract, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: contract::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO contracts_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO NOTHING";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Allocate<By<contract::Number, i32>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = contract::Number;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Allocate(by): Allocate<By<contract::Number, i32>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let year: i32 = by.into_inner();

        // Atomic per-year counter, so concurrent allocations never collide.
        const SQL: &str = "\
            INSERT INTO contract_numbers (year, counter) \
            VALUES ($1::INT4, 1) \
            ON CONFLICT (year) DO UPDATE \
            SET counter = contract_numbers.counter + 1 \
            RETURNING counter";
        self.query_opt(SQL, &[&year])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| {
                let counter =
                    row.expect("always returns").get::<_, i64>("counter");
                contract::Number::compose(year, counter)
            })
    }
}

impl<C>
    Database<
        Select<By<read::contract::list::Page, read::contract::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::contract::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::contract::list::Page, read::contract::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::contract::list::Selector {
            arguments,
            filter:
                read::contract::list::Filter {
                    status,
                    property_id,
                    agent_id,
                    owner_id,
                    tenant_name,
                },
        } = by.into_inner();

        let limit = i32::try_from(arguments.limit()).unwrap() + 1;

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let status_idx = status.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });
        let property_idx = property_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let agent_idx = agent_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let owner_idx = owner_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let tenant_name_idx = tenant_name.as_ref().map(|n| {
            ps.push(n);
            ps.len()
        });

        let tenant_name_pattern =
            tenant_name.as_ref().map(|n| FuzzPattern::new(n.as_ref()));
        let tenant_name_pattern_idx = tenant_name_pattern.as_ref().map(|n| {
            ps.push(n);
            ps.len()
        });

        let sql = format!(
            "SELECT id \
             FROM contracts \
             WHERE true \
                   {cursor} \
                   {status_filtering} \
                   {property_filtering} \
                   {agent_filtering} \
                   {owner_filtering} \
                   {tenant_name_filtering} \
             ORDER BY {tenant_name_ordering} \
                      id ASC \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = arguments.kind().operator();
                f(&format_args!("AND id {op} ${idx}::UUID"))
            }),
            status_filtering =
                status_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND status = ${idx}::INT2"))
                }),
            property_filtering =
                property_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND property_id = ${idx}::UUID"))
                }),
            agent_filtering = agent_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND agent_id = ${idx}::UUID"))
            }),
            owner_filtering = owner_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND owner_id = ${idx}::UUID"))
            }),
            tenant_name_filtering = tenant_name_pattern_idx
                .into_iter()
                .format_with("", |idx, f| {
                    f(&format_args!(
                        "AND LOWER(tenant_name) SIMILAR TO \
                         LOWER(${idx}::VARCHAR)"
                    ))
                }),
            tenant_name_ordering =
                tenant_name_idx.into_iter().format_with("", |idx, f| {
                    let order = arguments.kind().order().sql();
                    f(&format_args!(
                        "LEVENSHTEIN(tenant_name, ${idx}::VARCHAR, 1, 1, 0) \
                         {order},"
                    ))
                }),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        let has_more = rows.len() > arguments.limit();
        let edges = rows
            .into_iter()
            .take(arguments.limit())
            .map(|row| {
                let id = row.get::<_, contract::Id>("id");
                (id, id)
            })
            .collect::<Vec<_>>();

        Ok(read::contract::list::Page::new(&arguments, edges, has_more))
    }
}

impl<C> Database<Select<By<read::contract::list::TotalCount, ()>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::contract::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(_): Select<By<read::contract::list::TotalCount, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT COUNT(*)::INT4 \
            FROM contracts";
        self.query_opt(SQL, &[])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.expect("always exists").get::<_, i32>(0).into())
    }
}
