//! `SeaORM` Entity for processor_steps table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "processor_steps")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub transaction_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub step_index: i32,
    /// `charge`, `refund` or `capture`.
    pub kind: String,
    /// Serialized operation.
    pub action: String,
    pub amount: i64,
    pub idempotency_key: Option<String>,
    pub charge_id: Option<String>,
    pub object_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
