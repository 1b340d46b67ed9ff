//! Supply entity
//!
//! Links one enterprise and one product. Both references are required and
//! restrict deletion of the referenced rows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "supply")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub enterprise_id: i32,

    pub product_id: i32,

    pub quantity: Option<i32>,

    pub supply_date: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::enterprise::Entity",
        from = "Column::EnterpriseId",
        to = "super::enterprise::Column::Id",
        on_update = "Restrict",
        on_delete = "Restrict"
    )]
    Enterprise,

    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_update = "Restrict",
        on_delete = "Restrict"
    )]
    Product,
}

impl Related<super::enterprise::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enterprise.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
