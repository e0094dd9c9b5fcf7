//! `SeaORM` Entity for stock_take_lines table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_take_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub stock_take_id: Uuid,
    pub position: i32,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))")]
    pub expected_quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))")]
    pub counted_quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub unit_cost: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_takes::Entity",
        from = "Column::StockTakeId",
        to = "super::stock_takes::Column::Id",
        on_delete = "Cascade"
    )]
    StockTakes,
}

impl Related<super::stock_takes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTakes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
