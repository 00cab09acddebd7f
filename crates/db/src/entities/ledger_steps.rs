//! `SeaORM` Entity for ledger_steps table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger_steps")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub transaction_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub step_index: i32,
    pub value_id: String,
    pub contact_id: Option<String>,
    pub code: Option<String>,
    pub balance_before: Option<i64>,
    pub balance_after: Option<i64>,
    pub balance_change: Option<i64>,
    pub uses_remaining_before: Option<i64>,
    pub uses_remaining_after: Option<i64>,
    pub uses_remaining_change: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
