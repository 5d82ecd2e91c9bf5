//! [`Command`] for generating the unsigned document of a [`Contract`].

use std::collections::HashMap;

use common::operations::{By, Render, Select, Update, Upload};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{contract, property, user, Contract, Property, User},
    infra::{
        database, document,
        document::Generator,
        storage,
        storage::Storage,
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for rendering the unsigned document of a [`Contract`] and
/// storing it.
///
/// Repeatable: every execution re-renders and overwrites the same storage
/// key.
#[derive(Clone, Copy, Debug)]
pub struct GenerateContractPdf {
    /// ID of the [`Contract`] to generate the document for.
    pub contract_id: contract::Id,
}

impl<Db, Gen, Store, Ntf> Command<GenerateContractPdf>
    for Service<Db, Gen, Store, Ntf>
where
    Db: Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<user::Id, User>, [user::Id; 2]>>,
            Ok = HashMap<user::Id, User>,
            Err = Traced<database::Error>,
        > + Database<Update<Contract>, Ok = (), Err = Traced<database::Error>>,
    Gen: Generator<
            Render<document::Document>,
            Ok = document::Rendered,
            Err = Traced<document::Error>,
        >,
    Store: Storage<
            Upload<storage::Object>,
            Ok = storage::Url,
            Err = Traced<storage::Error>,
        >,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: GenerateContractPdf,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let GenerateContractPdf { contract_id } = cmd;

        let mut contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;

        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(
                contract.property_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(contract.property_id))
            .map_err(tracerr::wrap!())?;

        let users = self
            .database()
            .execute(Select(By::new([contract.agent_id, contract.owner_id])))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let agent = users
            .get(&contract.agent_id)
            .ok_or(E::UserNotExists(contract.agent_id))
            .map_err(tracerr::wrap!())?;
        let owner = users
            .get(&contract.owner_id)
            .ok_or(E::UserNotExists(contract.owner_id))
            .map_err(tracerr::wrap!())?;

        let rendered = self
            .generator()
            .execute(Render(document::Document {
                template: document::Template::ContractUnsigned,
                contract: contract.clone(),
                property,
                agent: agent.clone(),
                owner: owner.clone(),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let url = self
            .storage()
            .execute(Upload(storage::Object {
                key: storage::Key::contract_unsigned(contract.id),
                bytes: rendered.bytes,
                content_type: rendered.content_type,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        contract.pdf_url = Some(url.into());
        self.database()
            .execute(Update(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(contract)
    }
}

/// Error of [`GenerateContractPdf`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Property`] with the provided ID does not exist.
    #[display("`Property(id: {_0})` does not exist")]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// Document [`Generator`] error.
    #[display("document rendering failed: {_0}")]
    #[from]
    Render(document::Error),

    /// Object [`Storage`] error.
    #[display("document upload failed: {_0}")]
    #[from]
    Upload(storage::Error),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{contract, contract::Status},
        stub, Command as _,
    };

    use super::{ExecutionError, GenerateContractPdf};

    #[tokio::test]
    async fn stores_document_under_deterministic_key() {
        let svc = stub::service();
        let draft = stub::seed_draft(&svc, None, None).await;

        let contract = svc
            .execute(GenerateContractPdf {
                contract_id: draft.id,
            })
            .await
            .unwrap();

        let url = contract.pdf_url.expect("URL is set");
        assert!(!url.to_string().is_empty());
        assert_eq!(
            svc.storage().keys(),
            vec![format!("contracts/{}/contract-unsigned.pdf", draft.id)],
        );
        assert_eq!(contract.status, Status::Draft);
    }

    #[tokio::test]
    async fn re_renders_and_overwrites_on_repeat() {
        let svc = stub::service();
        let draft = stub::seed_draft(&svc, None, None).await;

        let first = svc
            .execute(GenerateContractPdf {
                contract_id: draft.id,
            })
            .await
            .unwrap();
        let second = svc
            .execute(GenerateContractPdf {
                contract_id: draft.id,
            })
            .await
            .unwrap();

        assert!(first.pdf_url.is_some());
        assert!(second.pdf_url.is_some());
        assert_eq!(svc.generator().renders(), 2);
        assert_eq!(svc.storage().keys().len(), 1);
        assert_eq!(second.status, Status::Draft);
    }

    #[tokio::test]
    async fn fails_on_unknown_contract() {
        let svc = stub::service();

        let err = svc
            .execute(GenerateContractPdf {
                contract_id: contract::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ContractNotExists(_)
        ));
    }
}
