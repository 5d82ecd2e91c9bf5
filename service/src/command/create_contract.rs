//! [`Command`] for creating a new [`Contract`].

use common::{
    operations::{Allocate, By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{contract, property, user, Contract, Property},
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::User;

use super::Command;

/// [`Command`] for creating a new [`Contract`] draft.
#[derive(Clone, Debug)]
pub struct CreateContract {
    /// ID of the [`Property`] the new [`Contract`] is about.
    pub property_id: property::Id,

    /// ID of the [`User`] brokering the new [`Contract`].
    pub agent_id: user::Id,

    /// [`contract::Tenant`] identity of the new [`Contract`].
    pub tenant: contract::Tenant,

    /// Rental [`contract::Terms`] of the new [`Contract`].
    pub terms: contract::Terms,
}

impl<Db, Gen, Store, Ntf> Command<CreateContract>
    for Service<Db, Gen, Store, Ntf>
where
    Db: Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Allocate<By<contract::Number, i32>>,
            Ok = contract::Number,
            Err = Traced<database::Error>,
        > + Database<Insert<Contract>, Err = Traced<database::Error>>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateContract {
            property_id,
            agent_id,
            tenant,
            terms,
        } = cmd;

        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        let number = self
            .database()
            .execute(Allocate(By::<contract::Number, _>::new(now.year())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let contract = Contract {
            id: contract::Id::new(),
            number,
            property_id: property.id,
            agent_id,
            // Owner is resolved from the `Property` at creation time.
            owner_id: property.owner_id,
            tenant,
            terms,
            status: contract::Status::Draft,
            pdf_url: None,
            signed_pdf_url: None,
            otp_code: None,
            otp_expires_at: None,
            otp_attempts: contract::otp::Attempts::ZERO,
            signed_at: None,
            signed_ip: None,
            created_at: now.coerce(),
        };
        self.database()
            .execute(Insert(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(contract)
    }
}

/// Error of [`CreateContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Property`] with the provided ID does not exist.
    #[display("`Property(id: {_0})` does not exist")]
    PropertyNotExists(#[error(not(source))] property::Id),
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        domain::{contract, contract::otp, property},
        stub, Command as _,
    };

    use super::{CreateContract, ExecutionError};

    #[tokio::test]
    async fn assigns_sequential_numbers_within_year() {
        let svc = stub::service();

        let first = stub::seed_draft(&svc, None, None).await;
        let second = stub::seed_draft(&svc, None, None).await;

        let year = DateTime::now().year();
        assert_eq!(first.number.to_string(), format!("DAR-{year}-00001"));
        assert_eq!(second.number.to_string(), format!("DAR-{year}-00002"));
    }

    #[tokio::test]
    async fn creates_draft_with_clean_signing_state() {
        let svc = stub::service();

        let contract = stub::seed_draft(&svc, None, None).await;

        assert_eq!(contract.status, contract::Status::Draft);
        assert_eq!(contract.otp_attempts, otp::Attempts::ZERO);
        assert!(contract.pdf_url.is_none());
        assert!(contract.signed_pdf_url.is_none());
        assert!(contract.otp_code.is_none());
        assert!(contract.signed_at.is_none());
        assert!(contract.signed_ip.is_none());
    }

    #[tokio::test]
    async fn derives_owner_from_property() {
        let svc = stub::service();

        let agent = stub::user("Sara Aziz", None);
        let owner = stub::user("Omar Haddad", None);
        let property = stub::property("Palm Vista 7", owner.id);
        svc.database().put_user(agent.clone());
        svc.database().put_user(owner.clone());
        svc.database().put_property(property.clone());

        let contract = svc
            .execute(CreateContract {
                property_id: property.id,
                agent_id: agent.id,
                tenant: stub::tenant(),
                terms: stub::terms(),
            })
            .await
            .unwrap();

        assert_eq!(contract.owner_id, owner.id);
        assert_eq!(contract.agent_id, agent.id);
        assert_eq!(contract.property_id, property.id);
    }

    #[tokio::test]
    async fn fails_on_unknown_property() {
        let svc = stub::service();

        let agent = stub::user("Sara Aziz", None);
        svc.database().put_user(agent.clone());

        let err = svc
            .execute(CreateContract {
                property_id: property::Id::new(),
                agent_id: agent.id,
                tenant: stub::tenant(),
                terms: stub::terms(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::PropertyNotExists(_)
        ));
    }
}
