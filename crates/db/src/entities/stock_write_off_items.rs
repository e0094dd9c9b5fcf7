//! `SeaORM` Entity for stock_write_off_items table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_write_off_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub write_off_id: Uuid,
    pub position: i32,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub unit_cost: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_write_offs::Entity",
        from = "Column::WriteOffId",
        to = "super::stock_write_offs::Column::Id",
        on_delete = "Cascade"
    )]
    StockWriteOffs,
}

impl Related<super::stock_write_offs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockWriteOffs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
