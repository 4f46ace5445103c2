//! # Data Models
//!
//! SeaORM entities for the realty schema, plus the service info payload.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod characteristic;
pub mod contract;
pub mod property;
pub mod property_characteristic;
pub mod property_type;
pub mod sequence;
pub mod user;
pub mod visit;

pub use characteristic::{CharacteristicCategory, Entity as Characteristic};
pub use contract::{ContractStatus, Entity as Contract};
pub use property::{Entity as Property, PropertyCondition, PropertyStatus};
pub use property_characteristic::Entity as PropertyCharacteristic;
pub use property_type::Entity as PropertyType;
pub use sequence::Entity as Sequence;
pub use user::{Entity as User, Role, UserStatus};
pub use visit::{Entity as Visit, VisitOutcome, VisitStatus};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "realty-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
