//! Document generator definitions.

use common::operations::Render;
use derive_more::{Display, Error as StdError};
use tracerr::Traced;

use crate::domain::{Contract, Property, User};

/// Document generator operation.
pub use common::Handler as Generator;

/// Identifier of a document template.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Template {
    /// Unsigned contract document.
    #[display("contract-unsigned")]
    ContractUnsigned,
}

/// Payload to render a [`Contract`] document from.
#[derive(Clone, Debug)]
pub struct Document {
    /// [`Template`] to render with.
    pub template: Template,

    /// [`Contract`] being rendered.
    pub contract: Contract,

    /// [`Property`] the [`Contract`] is about.
    pub property: Property,

    /// [`User`] brokering the [`Contract`].
    pub agent: User,

    /// [`User`] owning the [`Property`].
    pub owner: User,
}

/// Rendered document bytes along with their content type.
#[derive(Clone, Debug)]
pub struct Rendered {
    /// Raw bytes of the rendered document.
    pub bytes: Vec<u8>,

    /// MIME content type of the rendered document.
    pub content_type: String,
}

/// [`Generator`] error.
#[derive(Debug, Display, StdError)]
pub enum Error {
    /// Rendering engine failed to produce a document.
    #[display("rendering failed: {_0}")]
    Failed(#[error(not(source))] String),
}

/// [`Generator`] rendering documents as self-contained HTML.
///
/// Stands in for a real PDF rendering engine, which lives outside this
/// service.
#[derive(Clone, Copy, Debug, Default)]
pub struct Html;

impl Generator<Render<Document>> for Html {
    type Ok = Rendered;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Render(doc): Render<Document>,
    ) -> Result<Self::Ok, Self::Err> {
        let html = match doc.template {
            Template::ContractUnsigned => render_contract_unsigned(&doc),
        };
        Ok(Rendered {
            bytes: html.into_bytes(),
            content_type: "text/html; charset=utf-8".to_owned(),
        })
    }
}

/// Renders the [`Template::ContractUnsigned`] document.
fn render_contract_unsigned(doc: &Document) -> String {
    let Document {
        template: _,
        contract,
        property,
        agent,
        owner,
    } = doc;

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head><meta charset=\"utf-8\"><title>{number}</title></head>\n\
         <body>\n\
         <h1>Tenancy Contract {number}</h1>\n\
         <p>Property: {title}, {address}, {city}</p>\n\
         <p>Owner: {owner}</p>\n\
         <p>Agent: {agent}</p>\n\
         <p>Tenant: {tenant} (Emirates ID: {emirates_id})</p>\n\
         <p>Period: {starts_on} &ndash; {ends_on}</p>\n\
         <p>Rent: {rent}, deposit: {deposit}, cheques: {cheques}</p>\n\
         {payment_terms}\
         </body>\n\
         </html>\n",
        number = contract.number,
        title = property.title,
        address = property.address_line,
        city = property.city,
        owner = owner.name,
        agent = agent.name,
        tenant = contract.tenant.name,
        emirates_id = contract.tenant.emirates_id,
        starts_on = contract.terms.starts_on.to_rfc3339(),
        ends_on = contract.terms.ends_on.to_rfc3339(),
        rent = contract.terms.rent,
        deposit = contract.terms.deposit,
        cheques = contract.terms.cheques,
        payment_terms = contract
            .terms
            .payment_terms
            .as_ref()
            .map(|t| format!("<p>Payment terms: {t}</p>\n"))
            .unwrap_or_default(),
    )
}
