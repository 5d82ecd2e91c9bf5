//! In-memory stand-ins for the infrastructure, backing the command tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time,
};

use common::{
    operations::{
        Allocate, By, Commit, Dispatch, Insert, Lock, Render, Select,
        Transact, Update, Upload,
    },
    DateTime, Money,
};
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    command::CreateContract,
    domain::{
        contract,
        contract::{tenant, terms, Tenant, Terms},
        property, user, Contract, Property, User,
    },
    infra::{database, document, notifier, notifier::Sms, storage},
    Command as _, Config, Service,
};

/// [`Service`] wired with in-memory infrastructure.
pub(crate) type StubService = Service<Db, Renderer, Store, SmsGateway>;

/// Creates a new [`StubService`] with the default [`Config`].
pub(crate) fn service() -> StubService {
    Service::new(
        Config::default(),
        Db::default(),
        Renderer::default(),
        Store::default(),
        SmsGateway::default(),
    )
}

/// Seeds an agent, an owner and a property, then creates a draft contract
/// through the real [`CreateContract`] command.
pub(crate) async fn seed_draft(
    svc: &StubService,
    agent_phone: Option<&str>,
    owner_phone: Option<&str>,
) -> Contract {
    let agent = user("Sara Aziz", agent_phone);
    let owner = user("Omar Haddad", owner_phone);
    let property = property("Marina Heights 1204", owner.id);

    let db = svc.database();
    db.put_user(agent.clone());
    db.put_user(owner);
    db.put_property(property.clone());

    svc.execute(CreateContract {
        property_id: property.id,
        agent_id: agent.id,
        tenant: tenant(),
        terms: terms(),
    })
    .await
    .expect("draft creation")
}

/// Creates a [`User`] fixture.
pub(crate) fn user(name: &str, phone: Option<&str>) -> User {
    User {
        id: user::Id::new(),
        name: user::Name::new(name).unwrap(),
        email: user::Email::new(format!(
            "{}@dar360.test",
            name.to_lowercase().replace(' ', "."),
        )),
        phone: phone.map(|p| user::Phone::new(p).unwrap()),
        created_at: DateTime::now().coerce(),
        deleted_at: None,
    }
}

/// Creates a [`Property`] fixture owned by the provided [`User`].
pub(crate) fn property(title: &str, owner_id: user::Id) -> Property {
    Property {
        id: property::Id::new(),
        owner_id,
        title: property::Title::new(title).unwrap(),
        address_line: property::AddressLine::new("Al Marsa Street 23")
            .unwrap(),
        city: property::City::new("Dubai").unwrap(),
        created_at: DateTime::now().coerce(),
    }
}

/// Creates a [`Tenant`] fixture.
pub(crate) fn tenant() -> Tenant {
    Tenant {
        name: tenant::Name::new("Imran Qureshi").unwrap(),
        phone: user::Phone::new("+971507778899").unwrap(),
        email: user::Email::new("imran.qureshi@example.com").unwrap(),
        emirates_id: tenant::EmiratesId::new("784-1990-1234567-1").unwrap(),
    }
}

/// Creates a yearly rental [`Terms`] fixture.
pub(crate) fn terms() -> Terms {
    let now = DateTime::now();
    Terms {
        starts_on: now.coerce(),
        ends_on: (now + time::Duration::from_secs(365 * 24 * 60 * 60))
            .coerce(),
        rent: Money {
            amount: Decimal::from(85_000_i64),
            currency: common::money::Currency::Aed,
        },
        deposit: Money {
            amount: Decimal::from(8_500_i64),
            currency: common::money::Currency::Aed,
        },
        cheques: terms::Cheques::new(4).unwrap(),
        payment_terms: None,
    }
}

/// In-memory [`Database`] stub.
///
/// [`Database`]: crate::infra::Database
#[derive(Clone, Debug, Default)]
pub(crate) struct Db(Arc<Mutex<State>>);

/// State of a [`Db`] stub.
#[derive(Debug, Default)]
struct State {
    /// Stored [`Contract`]s.
    contracts: HashMap<contract::Id, Contract>,

    /// Stored [`Property`]s.
    properties: HashMap<property::Id, Property>,

    /// Stored [`User`]s.
    users: HashMap<user::Id, User>,

    /// Per-year [`contract::Number`] counters.
    numbers: HashMap<i32, i64>,
}

impl Db {
    /// Stores the provided [`User`].
    pub(crate) fn put_user(&self, user: User) {
        drop(self.0.lock().unwrap().users.insert(user.id, user));
    }

    /// Stores the provided [`Property`].
    pub(crate) fn put_property(&self, property: Property) {
        drop(
            self.0
                .lock()
                .unwrap()
                .properties
                .insert(property.id, property),
        );
    }

    /// Returns the stored [`Contract`] with the provided ID.
    ///
    /// # Panics
    ///
    /// If no such [`Contract`] is stored.
    pub(crate) fn contract(&self, id: contract::Id) -> Contract {
        self.0
            .lock()
            .unwrap()
            .contracts
            .get(&id)
            .cloned()
            .expect("contract is stored")
    }

    /// Rewinds the OTP expiry of the stored [`Contract`] into the past.
    pub(crate) fn expire_otp(&self, id: contract::Id) {
        let mut state = self.0.lock().unwrap();
        let contract = state.contracts.get_mut(&id).expect("contract stored");
        contract.otp_expires_at =
            Some((DateTime::now() - time::Duration::from_secs(1)).coerce());
    }
}

impl database::Database<Select<By<Option<Contract>, contract::Id>>> for Db {
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .contracts
            .get(&by.into_inner())
            .cloned())
    }
}

impl database::Database<Select<By<Option<Property>, property::Id>>> for Db {
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .properties
            .get(&by.into_inner())
            .cloned())
    }
}

impl<IDs> database::Database<Select<By<HashMap<user::Id, User>, IDs>>> for Db
where
    IDs: AsRef<[user::Id]>,
{
    type Ok = HashMap<user::Id, User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<user::Id, User>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let state = self.0.lock().unwrap();
        Ok(by
            .into_inner()
            .as_ref()
            .iter()
            .filter_map(|id| state.users.get(id).map(|u| (*id, u.clone())))
            .collect())
    }
}

impl database::Database<Insert<Contract>> for Db {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(contract): Insert<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(
            self.0
                .lock()
                .unwrap()
                .contracts
                .insert(contract.id, contract),
        );
        Ok(())
    }
}

impl database::Database<Update<Contract>> for Db {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(contract): Update<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(
            self.0
                .lock()
                .unwrap()
                .contracts
                .insert(contract.id, contract),
        );
        Ok(())
    }
}

impl database::Database<Allocate<By<contract::Number, i32>>> for Db {
    type Ok = contract::Number;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Allocate(by): Allocate<By<contract::Number, i32>>,
    ) -> Result<Self::Ok, Self::Err> {
        let year = by.into_inner();
        let mut state = self.0.lock().unwrap();
        let counter = state.numbers.entry(year).or_insert(0);
        *counter += 1;
        Ok(contract::Number::compose(year, *counter))
    }
}

impl database::Database<Transact> for Db {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl database::Database<Lock<By<Contract, contract::Id>>> for Db {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Contract, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl database::Database<Commit> for Db {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

/// Document [`Generator`] stub counting performed renders.
///
/// [`Generator`]: document::Generator
#[derive(Clone, Debug, Default)]
pub(crate) struct Renderer(Arc<Mutex<usize>>);

impl Renderer {
    /// Returns the number of performed renders.
    pub(crate) fn renders(&self) -> usize {
        *self.0.lock().unwrap()
    }
}

impl document::Generator<Render<document::Document>> for Renderer {
    type Ok = document::Rendered;
    type Err = Traced<document::Error>;

    async fn execute(
        &self,
        Render(_): Render<document::Document>,
    ) -> Result<Self::Ok, Self::Err> {
        *self.0.lock().unwrap() += 1;
        Ok(document::Rendered {
            bytes: b"%PDF-stub".to_vec(),
            content_type: "application/pdf".to_owned(),
        })
    }
}

/// Object [`Storage`] stub keeping uploads in memory.
///
/// [`Storage`]: storage::Storage
#[derive(Clone, Debug, Default)]
pub(crate) struct Store(Arc<Mutex<HashMap<String, Vec<u8>>>>);

impl Store {
    /// Returns the keys of all stored objects.
    pub(crate) fn keys(&self) -> Vec<String> {
        self.0.lock().unwrap().keys().cloned().collect()
    }
}

impl storage::Storage<Upload<storage::Object>> for Store {
    type Ok = storage::Url;
    type Err = Traced<storage::Error>;

    async fn execute(
        &self,
        Upload(object): Upload<storage::Object>,
    ) -> Result<Self::Ok, Self::Err> {
        let key = object.key.to_string();
        drop(self.0.lock().unwrap().insert(key.clone(), object.bytes));
        Ok(storage::Url::from(format!("mem://{key}")))
    }
}

/// SMS gateway stub recording every dispatch attempt.
#[derive(Clone, Debug, Default)]
pub(crate) struct SmsGateway {
    /// All dispatch attempts, successful or not.
    attempts: Arc<Mutex<Vec<Sms>>>,

    /// Whether further dispatches fail.
    failing: Arc<AtomicBool>,
}

impl SmsGateway {
    /// Returns all dispatch attempts recorded so far.
    pub(crate) fn attempts(&self) -> Vec<Sms> {
        self.attempts.lock().unwrap().clone()
    }

    /// Makes all further dispatches fail (or succeed again).
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl notifier::Notifier<Dispatch<Sms>> for SmsGateway {
    type Ok = notifier::Delivery;
    type Err = Traced<notifier::Error>;

    async fn execute(
        &self,
        Dispatch(sms): Dispatch<Sms>,
    ) -> Result<Self::Ok, Self::Err> {
        let delivery = notifier::Delivery {
            kind: sms.kind,
            to: sms.to.clone(),
            at: DateTime::now(),
        };
        self.attempts.lock().unwrap().push(sms);
        if self.failing.load(Ordering::SeqCst) {
            return Err(tracerr::new!(notifier::Error::Gateway(
                "stubbed outage".into(),
            )));
        }
        Ok(delivery)
    }
}
