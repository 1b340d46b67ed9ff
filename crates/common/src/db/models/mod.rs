//! SeaORM entity models
//!
//! Database entities for SupplyBook

mod enterprise;
mod product;
mod supply;

pub use enterprise::{
    Entity as EnterpriseEntity,
    Model as Enterprise,
    ActiveModel as EnterpriseActiveModel,
    Column as EnterpriseColumn,
};

pub use product::{
    Entity as ProductEntity,
    Model as Product,
    ActiveModel as ProductActiveModel,
    Column as ProductColumn,
};

pub use supply::{
    Entity as SupplyEntity,
    Model as Supply,
    ActiveModel as SupplyActiveModel,
    Column as SupplyColumn,
};
