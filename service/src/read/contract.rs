//! [`Contract`] read model definition.

#[cfg(doc)]
use crate::domain::Contract;

pub mod list {
    //! [`Contract`]s list definitions.

    use common::define_pagination;
    use derive_more::{From, Into};

    use crate::domain::{
        contract, contract::tenant, property, user,
    };
    #[cfg(doc)]
    use crate::domain::Contract;

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = contract::Id;

    /// Cursor pointing to a specific [`Contract`] in a list.
    pub type Cursor = contract::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`contract::Status`] to filter by.
        pub status: Option<contract::Status>,

        /// ID of the property to filter by.
        pub property_id: Option<property::Id>,

        /// ID of the brokering agent to filter by.
        pub agent_id: Option<user::Id>,

        /// ID of the property owner to filter by.
        pub owner_id: Option<user::Id>,

        /// Tenant name (or its part) to fuzzy search for.
        pub tenant_name: Option<tenant::Name>,
    }

    /// Total count of [`Contract`]s.
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}
