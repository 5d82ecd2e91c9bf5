//! [`Command`] for verifying a submitted OTP and signing a [`Contract`].

use std::collections::HashMap;

use common::{
    operations::{
        By, Commit, Dispatch, Lock, Select, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{contract, contract::otp, property, user, Contract, Property, User},
    infra::{
        database, notifier,
        notifier::{Notifier, Sms},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for verifying a submitted OTP [`otp::Code`] and transitioning
/// a [`Contract`] into the signed state.
///
/// The checks run strictly in order, first failure wins. On success the
/// status change, signature metadata and OTP clearing land in a single
/// persisted update, committed before any confirmation is dispatched.
#[derive(Clone, Debug)]
pub struct VerifyOtpAndSign {
    /// ID of the [`Contract`] to sign.
    pub contract_id: contract::Id,

    /// OTP [`otp::Code`] submitted by the tenant.
    pub code: otp::Code,

    /// [`contract::Ip`] address the submission came from.
    pub ip: contract::Ip,
}

impl<Db, Gen, Store, Ntf> Command<VerifyOtpAndSign>
    for Service<Db, Gen, Store, Ntf>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
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
        >,
    Transacted<Db>: Database<
            Lock<By<Contract, contract::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<Update<Contract>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
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
        cmd: VerifyOtpAndSign,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let VerifyOtpAndSign {
            contract_id,
            code,
            ip,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serialize concurrent signing attempts upon the same `Contract`.
        tx.execute(Lock(By::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut contract = tx
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;

        if contract.status != contract::Status::PendingSignature {
            return Err(tracerr::new!(E::ContractNotPending(contract_id)));
        }

        if contract
            .otp_attempts
            .is_exhausted(self.config().otp.attempt_limit)
        {
            return Err(tracerr::new!(E::AttemptsExceeded(contract_id)));
        }

        let now = DateTime::now();
        if !contract
            .otp_expires_at
            .is_some_and(|at| now.coerce::<(otp::Code, otp::Expiration)>() <= at)
        {
            return Err(tracerr::new!(E::OtpExpired(contract_id)));
        }

        if contract.otp_code.as_ref() != Some(&code) {
            // The attempt cap is deliberately not re-checked after this
            // increment: it applies starting from the next submission.
            contract.otp_attempts = contract.otp_attempts.incremented();
            tx.execute(Update(contract))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            return Err(tracerr::new!(E::OtpMismatch(contract_id)));
        }

        // TODO: Render a signed document with a signature stamp and store it
        //       into `signed_pdf_url`.
        contract.status = contract::Status::Signed;
        contract.signed_at = Some(now.coerce());
        contract.signed_ip = Some(ip);
        contract.otp_code = None;
        contract.otp_expires_at = None;
        // `otp_attempts` is left untouched.
        tx.execute(Update(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // Everything below is best-effort: the signature is recorded already,
        // so a failed confirmation must never surface to the caller.
        let mut messages = vec![Sms {
            to: contract.tenant.phone.clone(),
            body: format!(
                "Contract {} has been successfully signed.",
                contract.number,
            ),
            kind: notifier::Kind::ContractSignedTenant,
        }];

        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(
                contract.property_id,
            )))
            .await
            .map_err(|e| {
                log::warn!("failed to load `Property` for confirmations: {e}");
            })
            .ok()
            .flatten();
        let users = self
            .database()
            .execute(Select(By::new([contract.agent_id, contract.owner_id])))
            .await
            .map_err(|e| {
                log::warn!("failed to load `User`s for confirmations: {e}");
            })
            .unwrap_or_default();

        if let Some(property) = property {
            if let Some(phone) =
                users.get(&contract.agent_id).and_then(|u| u.phone.clone())
            {
                messages.push(Sms {
                    to: phone,
                    body: format!(
                        "Contract {} for {} has been signed by the tenant.",
                        contract.number, property.title,
                    ),
                    kind: notifier::Kind::ContractSignedAgent,
                });
            }
            if let Some(phone) =
                users.get(&contract.owner_id).and_then(|u| u.phone.clone())
            {
                messages.push(Sms {
                    to: phone,
                    body: format!(
                        "Contract {} for your property {} has been signed.",
                        contract.number, property.title,
                    ),
                    kind: notifier::Kind::ContractSignedOwner,
                });
            }
        }

        let outcome = notifier::broadcast(self.notifier(), messages).await;
        if !outcome.is_complete() {
            log::warn!(
                "`Contract(id: {contract_id})` signed, but {} confirmation(s) \
                 failed to dispatch",
                outcome.failed.len(),
            );
        }

        Ok(contract)
    }
}

/// Error of [`VerifyOtpAndSign`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// OTP attempt budget of the [`Contract`] is exhausted.
    #[display(
        "`Contract(id: {_0})` OTP attempts are exhausted, a new OTP must be \
         requested"
    )]
    AttemptsExceeded(#[error(not(source))] contract::Id),

    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Contract`] is not awaiting a signature.
    #[display("`Contract(id: {_0})` is not pending signature")]
    ContractNotPending(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// OTP of the [`Contract`] is expired.
    #[display("`Contract(id: {_0})` OTP is expired, a new OTP must be \
               requested")]
    OtpExpired(#[error(not(source))] contract::Id),

    /// Submitted OTP code does not match the stored one.
    #[display("submitted OTP does not match for `Contract(id: {_0})`")]
    OtpMismatch(#[error(not(source))] contract::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{GenerateContractPdf, SendSigningOtp},
        domain::{
            contract,
            contract::{otp, Contract, Status},
        },
        infra::notifier::Kind,
        stub,
        stub::StubService,
        Command as _,
    };

    use super::{ExecutionError, VerifyOtpAndSign};

    /// Drives a freshly seeded contract up to the pending-signature state and
    /// returns it with an active OTP.
    async fn pending(
        svc: &StubService,
        agent_phone: Option<&str>,
        owner_phone: Option<&str>,
    ) -> Contract {
        let draft = stub::seed_draft(svc, agent_phone, owner_phone).await;
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
        svc.database().contract(draft.id)
    }

    /// Returns a valid code differing from the stored one.
    fn wrong_code(contract: &Contract) -> otp::Code {
        let stored = contract.otp_code.as_ref().unwrap().to_string();
        let wrong = if stored == "111111" { "222222" } else { "111111" };
        otp::Code::new(wrong).unwrap()
    }

    #[tokio::test]
    async fn signs_end_to_end_with_correct_code() {
        let svc = stub::service();
        let contract =
            pending(&svc, Some("+971501112233"), Some("+971504445566")).await;
        let code = contract.otp_code.clone().unwrap();

        let signed = svc
            .execute(VerifyOtpAndSign {
                contract_id: contract.id,
                code,
                ip: "1.2.3.4".parse().unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(signed.status, Status::Signed);
        assert_eq!(signed.signed_ip, Some("1.2.3.4".parse().unwrap()));
        assert!(signed.signed_at.is_some());
        assert!(signed.otp_code.is_none());
        assert!(signed.otp_expires_at.is_none());

        let stored = svc.database().contract(contract.id);
        assert_eq!(stored.status, Status::Signed);
        assert!(stored.otp_code.is_none());
    }

    #[tokio::test]
    async fn fans_out_to_tenant_agent_and_owner() {
        let svc = stub::service();
        let contract =
            pending(&svc, Some("+971501112233"), Some("+971504445566")).await;
        let code = contract.otp_code.clone().unwrap();

        let _ = svc
            .execute(VerifyOtpAndSign {
                contract_id: contract.id,
                code,
                ip: "1.2.3.4".parse().unwrap(),
            })
            .await
            .unwrap();

        let kinds = svc
            .notifier()
            .attempts()
            .into_iter()
            .map(|sms| sms.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                Kind::ContractSigningOtp,
                Kind::ContractSignedTenant,
                Kind::ContractSignedAgent,
                Kind::ContractSignedOwner,
            ],
        );
    }

    #[tokio::test]
    async fn skips_confirmations_without_phones() {
        let svc = stub::service();
        let contract = pending(&svc, None, None).await;
        let code = contract.otp_code.clone().unwrap();

        let _ = svc
            .execute(VerifyOtpAndSign {
                contract_id: contract.id,
                code,
                ip: "1.2.3.4".parse().unwrap(),
            })
            .await
            .unwrap();

        let kinds = svc
            .notifier()
            .attempts()
            .into_iter()
            .map(|sms| sms.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![Kind::ContractSigningOtp, Kind::ContractSignedTenant],
        );
    }

    #[tokio::test]
    async fn confirmation_failure_never_undoes_the_signature() {
        let svc = stub::service();
        let contract =
            pending(&svc, Some("+971501112233"), Some("+971504445566")).await;
        let code = contract.otp_code.clone().unwrap();

        svc.notifier().set_failing(true);
        let signed = svc
            .execute(VerifyOtpAndSign {
                contract_id: contract.id,
                code,
                ip: "1.2.3.4".parse().unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(signed.status, Status::Signed);
        // All three confirmations were still attempted.
        assert_eq!(svc.notifier().attempts().len(), 1 + 3);
    }

    #[tokio::test]
    async fn second_call_conflicts() {
        let svc = stub::service();
        let contract = pending(&svc, None, None).await;
        let code = contract.otp_code.clone().unwrap();

        let _ = svc
            .execute(VerifyOtpAndSign {
                contract_id: contract.id,
                code: code.clone(),
                ip: "1.2.3.4".parse().unwrap(),
            })
            .await
            .unwrap();

        let err = svc
            .execute(VerifyOtpAndSign {
                contract_id: contract.id,
                code,
                ip: "1.2.3.4".parse().unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ContractNotPending(_)
        ));
    }

    #[tokio::test]
    async fn five_wrong_codes_then_rate_limited() {
        let svc = stub::service();
        let contract = pending(&svc, None, None).await;
        let wrong = wrong_code(&contract);

        for expected_attempts in 1..=5 {
            let err = svc
                .execute(VerifyOtpAndSign {
                    contract_id: contract.id,
                    code: wrong.clone(),
                    ip: "1.2.3.4".parse().unwrap(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err.as_ref(), ExecutionError::OtpMismatch(_)));
            assert_eq!(
                svc.database().contract(contract.id).otp_attempts,
                otp::Attempts::from(expected_attempts),
            );
        }

        // The sixth submission is rejected up front, even with the correct
        // code, and does not consume an attempt.
        let correct = contract.otp_code.clone().unwrap();
        let err = svc
            .execute(VerifyOtpAndSign {
                contract_id: contract.id,
                code: correct,
                ip: "1.2.3.4".parse().unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::AttemptsExceeded(_)
        ));
        assert_eq!(
            svc.database().contract(contract.id).otp_attempts,
            otp::Attempts::from(5),
        );
    }

    #[tokio::test]
    async fn expired_code_fails_even_when_correct() {
        let svc = stub::service();
        let contract = pending(&svc, None, None).await;
        let code = contract.otp_code.clone().unwrap();

        svc.database().expire_otp(contract.id);

        let err = svc
            .execute(VerifyOtpAndSign {
                contract_id: contract.id,
                code,
                ip: "1.2.3.4".parse().unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::OtpExpired(_)));
        assert_eq!(
            svc.database().contract(contract.id).otp_attempts,
            otp::Attempts::ZERO,
        );
    }

    #[tokio::test]
    async fn fresh_otp_recovers_an_exhausted_contract() {
        let svc = stub::service();
        let contract = pending(&svc, None, None).await;
        let wrong = wrong_code(&contract);

        for _ in 0..5 {
            let _ = svc
                .execute(VerifyOtpAndSign {
                    contract_id: contract.id,
                    code: wrong.clone(),
                    ip: "1.2.3.4".parse().unwrap(),
                })
                .await
                .unwrap_err();
        }

        let _ = svc
            .execute(SendSigningOtp {
                contract_id: contract.id,
            })
            .await
            .unwrap();
        let code = svc
            .database()
            .contract(contract.id)
            .otp_code
            .expect("fresh code is set");

        let signed = svc
            .execute(VerifyOtpAndSign {
                contract_id: contract.id,
                code,
                ip: "5.6.7.8".parse().unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(signed.status, Status::Signed);
        assert_eq!(signed.signed_ip, Some("5.6.7.8".parse().unwrap()));
    }

    #[tokio::test]
    async fn rejects_contract_not_pending_signature() {
        let svc = stub::service();
        let draft = stub::seed_draft(&svc, None, None).await;

        let err = svc
            .execute(VerifyOtpAndSign {
                contract_id: draft.id,
                code: otp::Code::new("123456").unwrap(),
                ip: "1.2.3.4".parse().unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ContractNotPending(_)
        ));
    }

    #[tokio::test]
    async fn fails_on_unknown_contract() {
        let svc = stub::service();

        let err = svc
            .execute(VerifyOtpAndSign {
                contract_id: contract::Id::new(),
                code: otp::Code::new("123456").unwrap(),
                ip: "1.2.3.4".parse().unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ContractNotExists(_)
        ));
    }
}
