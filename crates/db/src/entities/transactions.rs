//! `SeaORM` Entity for transactions table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub transaction_type: String,
    pub currency: String,
    pub line_items: Option<String>,
    pub totals: Option<String>,
    pub metadata: Option<String>,
    pub pending: bool,
    pub root_transaction_id: String,
    pub previous_transaction_id: Option<String>,
    pub next_transaction_id: Option<String>,
    pub created_date: DateTimeUtc,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
