//! Value repository: snapshot loading and row conversion.

use std::str::FromStr;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tessera_core::value::Value;
use tessera_shared::types::{ContactId, TenantId, ValueId};

use super::error::RepositoryError;
use crate::entities::values;

const TABLE: &str = "values";

/// Read access to values.
#[derive(Debug, Clone)]
pub struct ValueRepository {
    db: DatabaseConnection,
}

impl ValueRepository {
    /// Creates a new value repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a value by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded.
    pub async fn find(&self, tenant_id: &TenantId, id: &ValueId) -> Result<Option<Value>, RepositoryError> {
        find(&self.db, tenant_id, id).await
    }

    /// Finds a value by its redemption code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded.
    pub async fn find_by_code(&self, tenant_id: &TenantId, code: &str) -> Result<Option<Value>, RepositoryError> {
        values::Entity::find()
            .filter(values::Column::TenantId.eq(tenant_id.as_str()))
            .filter(values::Column::Code.eq(code))
            .one(&self.db)
            .await?
            .map(Value::try_from_model)
            .transpose()
    }

    /// Lists the values owned by a contact, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn list_by_contact(
        &self,
        tenant_id: &TenantId,
        contact_id: &ContactId,
    ) -> Result<Vec<Value>, RepositoryError> {
        values::Entity::find()
            .filter(values::Column::TenantId.eq(tenant_id.as_str()))
            .filter(values::Column::ContactId.eq(contact_id.as_str()))
            .order_by_asc(values::Column::CreatedDate)
            .order_by_asc(values::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Value::try_from_model)
            .collect()
    }

    /// Loads several values by id. Missing ids are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn find_many(&self, tenant_id: &TenantId, ids: &[ValueId]) -> Result<Vec<Value>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        values::Entity::find()
            .filter(values::Column::TenantId.eq(tenant_id.as_str()))
            .filter(values::Column::Id.is_in(ids.iter().map(ValueId::as_str)))
            .all(&self.db)
            .await?
            .into_iter()
            .map(Value::try_from_model)
            .collect()
    }
}

/// Loads one value on any connection, including an open transaction.
pub(crate) async fn find<C: ConnectionTrait>(
    conn: &C,
    tenant_id: &TenantId,
    id: &ValueId,
) -> Result<Option<Value>, RepositoryError> {
    values::Entity::find_by_id((tenant_id.to_string(), id.to_string()))
        .one(conn)
        .await?
        .map(Value::try_from_model)
        .transpose()
}

/// Conversion between the domain value and its row.
pub(crate) trait ValueRow: Sized {
    fn try_from_model(model: values::Model) -> Result<Self, RepositoryError>;
    fn to_active_model(&self) -> Result<values::ActiveModel, RepositoryError>;
}

impl ValueRow for Value {
    fn try_from_model(model: values::Model) -> Result<Self, RepositoryError> {
        let corrupt = |e: &dyn std::fmt::Display| RepositoryError::corrupt(TABLE, format!("{}: {e}", model.id));

        Ok(Self {
            tenant_id: TenantId::parse(model.tenant_id.as_str()).map_err(|e| corrupt(&e))?,
            id: ValueId::parse(model.id.as_str()).map_err(|e| corrupt(&e))?,
            currency: model.currency.clone(),
            balance: model.balance,
            uses_remaining: model.uses_remaining,
            program_id: model.program_id.as_deref().map(str::parse).transpose().map_err(|e| corrupt(&e))?,
            contact_id: model.contact_id.as_deref().map(str::parse).transpose().map_err(|e| corrupt(&e))?,
            code: model.code.clone(),
            is_generic_code: model.is_generic_code,
            generic_code_options: decode_json(model.generic_code_options.as_deref())?,
            attached_from_value_id: model
                .attached_from_value_id
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(|e| corrupt(&e))?,
            pretax: model.pretax,
            active: model.active,
            frozen: model.frozen,
            canceled: model.canceled,
            discount: model.discount,
            discount_seller_liability: model
                .discount_seller_liability
                .as_deref()
                .map(Decimal::from_str)
                .transpose()
                .map_err(|e| corrupt(&e))?,
            discount_seller_liability_rule: decode_json(model.discount_seller_liability_rule.as_deref())?,
            redemption_rule: decode_json(model.redemption_rule.as_deref())?,
            balance_rule: decode_json(model.balance_rule.as_deref())?,
            start_date: model.start_date,
            end_date: model.end_date,
            metadata: serde_json::from_str(&model.metadata).map_err(|e| corrupt(&e))?,
            created_date: model.created_date,
            updated_date: model.updated_date,
            created_by: model.created_by.clone(),
        })
    }

    fn to_active_model(&self) -> Result<values::ActiveModel, RepositoryError> {
        Ok(values::ActiveModel {
            tenant_id: Set(self.tenant_id.to_string()),
            id: Set(self.id.to_string()),
            currency: Set(self.currency.clone()),
            balance: Set(self.balance),
            uses_remaining: Set(self.uses_remaining),
            program_id: Set(self.program_id.as_ref().map(ToString::to_string)),
            contact_id: Set(self.contact_id.as_ref().map(ToString::to_string)),
            code: Set(self.code.clone()),
            is_generic_code: Set(self.is_generic_code),
            generic_code_options: Set(encode_json(self.generic_code_options.as_ref())?),
            attached_from_value_id: Set(self.attached_from_value_id.as_ref().map(ToString::to_string)),
            pretax: Set(self.pretax),
            active: Set(self.active),
            frozen: Set(self.frozen),
            canceled: Set(self.canceled),
            discount: Set(self.discount),
            discount_seller_liability: Set(self.discount_seller_liability.map(|d| d.to_string())),
            discount_seller_liability_rule: Set(encode_json(self.discount_seller_liability_rule.as_ref())?),
            redemption_rule: Set(encode_json(self.redemption_rule.as_ref())?),
            balance_rule: Set(encode_json(self.balance_rule.as_ref())?),
            start_date: Set(self.start_date),
            end_date: Set(self.end_date),
            metadata: Set(serde_json::to_string(&self.metadata)?),
            created_date: Set(self.created_date),
            updated_date: Set(self.updated_date),
            created_by: Set(self.created_by.clone()),
        })
    }
}

pub(crate) fn encode_json<T: Serialize>(value: Option<&T>) -> Result<Option<String>, RepositoryError> {
    Ok(value.map(serde_json::to_string).transpose()?)
}

pub(crate) fn decode_json<T: DeserializeOwned>(raw: Option<&str>) -> Result<Option<T>, RepositoryError> {
    Ok(raw.map(serde_json::from_str).transpose()?)
}
