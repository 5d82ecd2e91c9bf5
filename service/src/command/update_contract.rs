//! [`Command`] for updating a [`Contract`].

use common::{
    operations::{By, Select, Update},
    Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        contract,
        contract::{tenant, terms},
        user, Contract,
    },
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::User;

use super::Command;

/// [`Command`] for partially updating a [`Contract`].
///
/// Absent fields are left unchanged. This is also the path external lifecycle
/// management drives the `ACTIVE`/`EXPIRED`/`TERMINATED` statuses through.
#[derive(Clone, Debug, Default)]
pub struct UpdateContract {
    /// ID of the [`Contract`] to update.
    pub contract_id: contract::Id,

    /// New ID of the [`User`] brokering the [`Contract`].
    pub agent_id: Option<user::Id>,

    /// New name of the tenant.
    pub tenant_name: Option<tenant::Name>,

    /// New phone of the tenant.
    pub tenant_phone: Option<user::Phone>,

    /// New email of the tenant.
    pub tenant_email: Option<user::Email>,

    /// New Emirates ID of the tenant.
    pub tenant_emirates_id: Option<tenant::EmiratesId>,

    /// New start of the rental period.
    pub starts_on: Option<terms::StartDateTime>,

    /// New end of the rental period.
    pub ends_on: Option<terms::EndDateTime>,

    /// New yearly rent amount.
    pub rent: Option<Money>,

    /// New deposit amount.
    pub deposit: Option<Money>,

    /// New number of cheques.
    pub cheques: Option<terms::Cheques>,

    /// New payment terms.
    pub payment_terms: Option<terms::PaymentTerms>,

    /// New [`contract::Status`].
    pub status: Option<contract::Status>,
}

impl UpdateContract {
    /// Creates a new empty [`UpdateContract`] of the [`Contract`] with the
    /// provided ID.
    #[must_use]
    pub fn of(contract_id: contract::Id) -> Self {
        Self {
            contract_id,
            ..Self::default()
        }
    }
}

impl<Db, Gen, Store, Ntf> Command<UpdateContract>
    for Service<Db, Gen, Store, Ntf>
where
    Db: Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<Update<Contract>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateContract {
            contract_id,
            agent_id,
            tenant_name,
            tenant_phone,
            tenant_email,
            tenant_emirates_id,
            starts_on,
            ends_on,
            rent,
            deposit,
            cheques,
            payment_terms,
            status,
        } = cmd;

        let mut contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;

        if let Some(id) = agent_id {
            contract.agent_id = id;
        }
        if let Some(name) = tenant_name {
            contract.tenant.name = name;
        }
        if let Some(phone) = tenant_phone {
            contract.tenant.phone = phone;
        }
        if let Some(email) = tenant_email {
            contract.tenant.email = email;
        }
        if let Some(id) = tenant_emirates_id {
            contract.tenant.emirates_id = id;
        }
        if let Some(at) = starts_on {
            contract.terms.starts_on = at;
        }
        if let Some(at) = ends_on {
            contract.terms.ends_on = at;
        }
        if let Some(rent) = rent {
            contract.terms.rent = rent;
        }
        if let Some(deposit) = deposit {
            contract.terms.deposit = deposit;
        }
        if let Some(cheques) = cheques {
            contract.terms.cheques = cheques;
        }
        if let Some(terms) = payment_terms {
            contract.terms.payment_terms = Some(terms);
        }
        if let Some(status) = status {
            contract.status = status;
        }

        self.database()
            .execute(Update(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(contract)
    }
}

/// Error of [`UpdateContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{contract, contract::tenant},
        stub, Command as _,
    };

    use super::{ExecutionError, UpdateContract};

    #[tokio::test]
    async fn applies_only_provided_fields() {
        let svc = stub::service();
        let draft = stub::seed_draft(&svc, None, None).await;

        let updated = svc
            .execute(UpdateContract {
                tenant_name: Some(tenant::Name::new("Ayesha Khan").unwrap()),
                status: Some(contract::Status::Active),
                ..UpdateContract::of(draft.id)
            })
            .await
            .unwrap();

        assert_eq!(updated.tenant.name.to_string(), "Ayesha Khan");
        assert_eq!(updated.status, contract::Status::Active);
        // Untouched fields stay as they were.
        assert_eq!(updated.tenant.phone, draft.tenant.phone);
        assert_eq!(updated.number, draft.number);
        assert_eq!(updated.terms.rent, draft.terms.rent);
    }

    #[tokio::test]
    async fn fails_on_unknown_contract() {
        let svc = stub::service();

        let err = svc
            .execute(UpdateContract::of(contract::Id::new()))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ContractNotExists(_)
        ));
    }
}
