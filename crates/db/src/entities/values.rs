//! `SeaORM` Entity for values table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "values")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub currency: String,
    pub balance: Option<i64>,
    pub uses_remaining: Option<i64>,
    pub program_id: Option<String>,
    pub contact_id: Option<String>,
    pub code: Option<String>,
    pub is_generic_code: bool,
    pub generic_code_options: Option<String>,
    pub attached_from_value_id: Option<String>,
    pub pretax: bool,
    pub active: bool,
    pub frozen: bool,
    pub canceled: bool,
    pub discount: bool,
    pub discount_seller_liability: Option<String>,
    pub discount_seller_liability_rule: Option<String>,
    pub redemption_rule: Option<String>,
    pub balance_rule: Option<String>,
    pub start_date: Option<DateTimeUtc>,
    pub end_date: Option<DateTimeUtc>,
    pub metadata: String,
    pub created_date: DateTimeUtc,
    pub updated_date: DateTimeUtc,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
