//! `SeaORM` Entity for accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub kind: String,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub balance: Decimal,
    pub owner_id: Option<Uuid>,
    pub is_primary: bool,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub expense_category: Option<String>,
    pub write_off_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))", nullable)]
    pub written_off_amount: Option<Decimal>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_write_offs::Entity",
        from = "Column::WriteOffId",
        to = "super::stock_write_offs::Column::Id"
    )]
    StockWriteOffs,
}

impl Related<super::stock_write_offs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockWriteOffs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
