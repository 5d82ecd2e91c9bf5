//! [`Command`] definition.

pub mod create_contract;
pub mod generate_contract_pdf;
pub mod send_signing_otp;
pub mod update_contract;
pub mod verify_otp_and_sign;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    create_contract::CreateContract,
    generate_contract_pdf::GenerateContractPdf,
    send_signing_otp::SendSigningOtp, update_contract::UpdateContract,
    verify_otp_and_sign::VerifyOtpAndSign,
};
