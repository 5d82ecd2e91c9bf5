//! [`Command`] for issuing a signing OTP to the tenant of a [`Contract`].

use common::{
    operations::{By, Dispatch, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{contract, contract::otp, Contract},
    infra::{
        database, notifier,
        notifier::{Notifier, Sms},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for issuing a fresh signing OTP to the tenant of a
/// [`Contract`].
///
/// Repeatable: every execution replaces the previous code and resets the
/// attempt counter.
#[derive(Clone, Copy, Debug)]
pub struct SendSigningOtp {
    /// ID of the [`Contract`] to issue the OTP for.
    pub contract_id: contract::Id,
}

impl<Db, Gen, Store, Ntf> Command<SendSigningOtp>
    for Service<Db, Gen, Store, Ntf>
where
    Db: Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<Update<Contract>, Ok = (), Err = Traced<database::Error>>,
    Ntf: Notifier<
            Dispatch<Sms>,
            Ok = notifier::Delivery,
            Err = Traced<notifier::Error>,
        >,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SendSigningOtp,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SendSigningOtp { contract_id } = cmd;

        let mut contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;

        if contract.pdf_url.is_none() {
            return Err(tracerr::new!(E::DocumentNotGenerated(contract_id)));
        }
        if contract.is_signed() {
            return Err(tracerr::new!(E::AlreadySigned(contract_id)));
        }

        let code = otp::Code::generate();
        let ttl = self.config().otp.ttl;

        contract.otp_code = Some(code.clone());
        contract.otp_expires_at = Some((DateTime::now() + ttl).coerce());
        contract.otp_attempts = otp::Attempts::ZERO;
        contract.status = contract::Status::PendingSignature;

        // The OTP is persisted before the dispatch: a failed SMS surfaces as
        // an error, yet leaves a valid, usable OTP behind.
        self.database()
            .execute(Update(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let minutes = ttl.as_secs() / 60;
        let body = format!(
            "Your Dar360 contract signing code is: {code}. \
             Valid for {minutes} minutes. Sign here: {url}",
            url = self.signing_url(contract.id),
        );
        self.notifier()
            .execute(Dispatch(Sms {
                to: contract.tenant.phone.clone(),
                body,
                kind: notifier::Kind::ContractSigningOtp,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(contract)
    }
}

/// Error of [`SendSigningOtp`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Contract`] is signed already.
    #[display("`Contract(id: {_0})` is signed already")]
    AlreadySigned(#[error(not(source))] contract::Id),

    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Contract`] document is not generated yet.
    #[display("`Contract(id: {_0})` document is not generated yet")]
    DocumentNotGenerated(#[error(not(source))] contract::Id),

    /// OTP was stored, but its SMS delivery failed.
    #[display("OTP stored, but its SMS delivery failed: {_0}")]
    #[from]
    Undelivered(notifier::Error),
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::{GenerateContractPdf, VerifyOtpAndSign},
        domain::contract::{otp, Status},
        infra::notifier::Kind,
        stub, Command as _,
    };

    use super::{ExecutionError, SendSigningOtp};

    #[tokio::test]
    async fn requires_generated_document_first() {
        let svc = stub::service();
        let draft = stub::seed_draft(&svc, None, None).await;

        let err = svc
            .execute(SendSigningOtp {
                contract_id: draft.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::DocumentNotGenerated(_)
        ));
        assert!(svc.notifier().attempts().is_empty());
    }

    #[tokio::test]
    async fn issues_otp_and_texts_the_tenant() {
        let svc = stub::service();
        let draft = stub::seed_draft(&svc, None, None).await;
        let _ = svc
            .execute(GenerateContractPdf {
                contract_id: draft.id,
            })
            .await
            .unwrap();

        let before = DateTime::now();
        let contract = svc
            .execute(SendSigningOtp {
                contract_id: draft.id,
            })
            .await
            .unwrap();
        let after = DateTime::now();

        assert_eq!(contract.status, Status::PendingSignature);
        assert_eq!(contract.otp_attempts, otp::Attempts::ZERO);
        let code =
            contract.otp_code.as_ref().expect("code is set").to_string();
        assert_eq!(code.len(), otp::Code::LENGTH);

        let ttl = svc.config().otp.ttl;
        let expires_at = contract.otp_expires_at.expect("expiry is set");
        assert!((before + ttl).coerce() <= expires_at);
        assert!(expires_at <= (after + ttl).coerce());

        let attempts = svc.notifier().attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].kind, Kind::ContractSigningOtp);
        assert_eq!(attempts[0].to, contract.tenant.phone);
        assert!(attempts[0].body.contains(&code));
        assert!(attempts[0]
            .body
            .contains(&svc.signing_url(contract.id)));
    }

    #[tokio::test]
    async fn rejects_signed_contract() {
        let svc = stub::service();
        let draft = stub::seed_draft(&svc, None, None).await;
        let _ = svc
            .execute(GenerateContractPdf {
                contract_id: draft.id,
            })
            .await
            .unwrap();
        let _ = svc
            .execute(SendSigningOtp {
                contract_id: draft.id,
            })
            .await
            .unwrap();
        let code = svc
            .database()
            .contract(draft.id)
            .otp_code
            .expect("code is set");
        let _ = svc
            .execute(VerifyOtpAndSign {
                contract_id: draft.id,
                code,
                ip: "1.2.3.4".parse().unwrap(),
            })
            .await
            .unwrap();

        let err = svc
            .execute(SendSigningOtp {
                contract_id: draft.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::AlreadySigned(_)));
    }

    #[tokio::test]
    async fn reissue_replaces_code_and_resets_attempts() {
        let svc = stub::service();
        let draft = stub::seed_draft(&svc, None, None).await;
        let _ = svc
            .execute(GenerateContractPdf {
                contract_id: draft.id,
            })
            .await
            .unwrap();
        let _ = svc
            .execute(SendSigningOtp {
                contract_id: draft.id,
            })
            .await
            .unwrap();

        // Burn the whole attempt budget.
        let stored = svc.database().contract(draft.id);
        let wrong = stub_wrong_code(stored.otp_code.as_ref().unwrap());
        for _ in 0..5 {
            let _ = svc
                .execute(VerifyOtpAndSign {
                    contract_id: draft.id,
                    code: wrong.clone(),
                    ip: "1.2.3.4".parse().unwrap(),
                })
                .await
                .unwrap_err();
        }
        assert!(svc
            .database()
            .contract(draft.id)
            .otp_attempts
            .is_exhausted(svc.config().otp.attempt_limit));

        let contract = svc
            .execute(SendSigningOtp {
                contract_id: draft.id,
            })
            .await
            .unwrap();

        assert_eq!(contract.otp_attempts, otp::Attempts::ZERO);
        assert_eq!(contract.status, Status::PendingSignature);
        assert!(contract.otp_code.is_some());
    }

    #[tokio::test]
    async fn keeps_stored_otp_on_delivery_failure() {
        let svc = stub::service();
        let draft = stub::seed_draft(&svc, None, None).await;
        let _ = svc
            .execute(GenerateContractPdf {
                contract_id: draft.id,
            })
            .await
            .unwrap();

        svc.notifier().set_failing(true);
        let err = svc
            .execute(SendSigningOtp {
                contract_id: draft.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Undelivered(_)));
        let stored = svc.database().contract(draft.id);
        assert_eq!(stored.status, Status::PendingSignature);
        assert!(stored.otp_code.is_some());
    }

    /// Returns a valid code differing from the provided one.
    fn stub_wrong_code(code: &otp::Code) -> otp::Code {
        let wrong = if code.to_string() == "111111" {
            "222222"
        } else {
            "111111"
        };
        otp::Code::new(wrong).unwrap()
    }
}
