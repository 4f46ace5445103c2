//! Repository layer.
//!
//! Each repository borrows any [`sea_orm::ConnectionTrait`] implementor, so
//! the same queries run against the pool or inside a transaction.

pub mod catalog;
pub mod contract;
pub mod property;
pub mod sequence;
pub mod user;
pub mod visit;

pub use catalog::{
    CharacteristicInput, CharacteristicRepository, PropertyTypeInput, PropertyTypeRepository,
};
pub use contract::{ContractFilter, ContractRepository};
pub use property::{Page, PropertyFilter, PropertyRepository, PropertyStats};
pub use user::{NewUser, UserChanges, UserRepository};
pub use visit::{VisitFilter, VisitRepository};
