//! Read models of the service.

pub mod contract;
