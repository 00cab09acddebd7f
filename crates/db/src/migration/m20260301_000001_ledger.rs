//! Ledger schema: values, transactions and their steps.
//!
//! Built with the schema builder rather than raw SQL so that the same
//! migration runs on PostgreSQL and on the SQLite databases used in tests.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Values::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Values::TenantId).string_len(64).not_null())
                    .col(ColumnDef::new(Values::Id).string_len(64).not_null())
                    .col(ColumnDef::new(Values::Currency).string_len(16).not_null())
                    .col(ColumnDef::new(Values::Balance).big_integer().null())
                    .col(ColumnDef::new(Values::UsesRemaining).big_integer().null())
                    .col(ColumnDef::new(Values::ProgramId).string_len(64).null())
                    .col(ColumnDef::new(Values::ContactId).string_len(64).null())
                    .col(ColumnDef::new(Values::Code).string().null())
                    .col(ColumnDef::new(Values::IsGenericCode).boolean().not_null())
                    .col(ColumnDef::new(Values::GenericCodeOptions).text().null())
                    .col(ColumnDef::new(Values::AttachedFromValueId).string_len(64).null())
                    .col(ColumnDef::new(Values::Pretax).boolean().not_null())
                    .col(ColumnDef::new(Values::Active).boolean().not_null())
                    .col(ColumnDef::new(Values::Frozen).boolean().not_null())
                    .col(ColumnDef::new(Values::Canceled).boolean().not_null())
                    .col(ColumnDef::new(Values::Discount).boolean().not_null())
                    .col(ColumnDef::new(Values::DiscountSellerLiability).string_len(32).null())
                    .col(ColumnDef::new(Values::DiscountSellerLiabilityRule).text().null())
                    .col(ColumnDef::new(Values::RedemptionRule).text().null())
                    .col(ColumnDef::new(Values::BalanceRule).text().null())
                    .col(ColumnDef::new(Values::StartDate).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Values::EndDate).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Values::Metadata).text().not_null())
                    .col(ColumnDef::new(Values::CreatedDate).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Values::UpdatedDate).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Values::CreatedBy).string().not_null())
                    .primary_key(Index::create().col(Values::TenantId).col(Values::Id))
                    .check(Expr::col(Values::Balance).gte(0).or(Expr::col(Values::Balance).is_null()))
                    .check(
                        Expr::col(Values::UsesRemaining)
                            .gte(0)
                            .or(Expr::col(Values::UsesRemaining).is_null()),
                    )
                    .to_owned(),
            )
            .await?;

        // Codes are unique per tenant; NULL codes never collide
        manager
            .create_index(
                Index::create()
                    .name("idx_values_tenant_code")
                    .table(Values::Table)
                    .col(Values::TenantId)
                    .col(Values::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Contact wallet lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_values_tenant_contact")
                    .table(Values::Table)
                    .col(Values::TenantId)
                    .col(Values::ContactId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Transactions::TenantId).string_len(64).not_null())
                    .col(ColumnDef::new(Transactions::Id).string_len(64).not_null())
                    .col(ColumnDef::new(Transactions::TransactionType).string_len(32).not_null())
                    .col(ColumnDef::new(Transactions::Currency).string_len(16).not_null())
                    .col(ColumnDef::new(Transactions::LineItems).text().null())
                    .col(ColumnDef::new(Transactions::Totals).text().null())
                    .col(ColumnDef::new(Transactions::Metadata).text().null())
                    .col(ColumnDef::new(Transactions::Pending).boolean().not_null())
                    .col(ColumnDef::new(Transactions::RootTransactionId).string_len(64).not_null())
                    .col(ColumnDef::new(Transactions::PreviousTransactionId).string_len(64).null())
                    .col(ColumnDef::new(Transactions::NextTransactionId).string_len(64).null())
                    .col(ColumnDef::new(Transactions::CreatedDate).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Transactions::CreatedBy).string().not_null())
                    .primary_key(Index::create().col(Transactions::TenantId).col(Transactions::Id))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LedgerSteps::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(LedgerSteps::TenantId).string_len(64).not_null())
                    .col(ColumnDef::new(LedgerSteps::TransactionId).string_len(64).not_null())
                    .col(ColumnDef::new(LedgerSteps::StepIndex).integer().not_null())
                    .col(ColumnDef::new(LedgerSteps::ValueId).string_len(64).not_null())
                    .col(ColumnDef::new(LedgerSteps::ContactId).string_len(64).null())
                    .col(ColumnDef::new(LedgerSteps::Code).string().null())
                    .col(ColumnDef::new(LedgerSteps::BalanceBefore).big_integer().null())
                    .col(ColumnDef::new(LedgerSteps::BalanceAfter).big_integer().null())
                    .col(ColumnDef::new(LedgerSteps::BalanceChange).big_integer().null())
                    .col(ColumnDef::new(LedgerSteps::UsesRemainingBefore).big_integer().null())
                    .col(ColumnDef::new(LedgerSteps::UsesRemainingAfter).big_integer().null())
                    .col(ColumnDef::new(LedgerSteps::UsesRemainingChange).big_integer().null())
                    .primary_key(
                        Index::create()
                            .col(LedgerSteps::TenantId)
                            .col(LedgerSteps::TransactionId)
                            .col(LedgerSteps::StepIndex),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ledger_steps_transaction")
                            .from(LedgerSteps::Table, (LedgerSteps::TenantId, LedgerSteps::TransactionId))
                            .to(Transactions::Table, (Transactions::TenantId, Transactions::Id)),
                    )
                    .to_owned(),
            )
            .await?;

        // Value history lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_steps_value")
                    .table(LedgerSteps::Table)
                    .col(LedgerSteps::TenantId)
                    .col(LedgerSteps::ValueId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProcessorSteps::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ProcessorSteps::TenantId).string_len(64).not_null())
                    .col(ColumnDef::new(ProcessorSteps::TransactionId).string_len(64).not_null())
                    .col(ColumnDef::new(ProcessorSteps::StepIndex).integer().not_null())
                    .col(ColumnDef::new(ProcessorSteps::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(ProcessorSteps::Action).text().not_null())
                    .col(ColumnDef::new(ProcessorSteps::Amount).big_integer().not_null())
                    .col(ColumnDef::new(ProcessorSteps::IdempotencyKey).string().null())
                    .col(ColumnDef::new(ProcessorSteps::ChargeId).string().null())
                    .col(ColumnDef::new(ProcessorSteps::ObjectId).string().null())
                    .primary_key(
                        Index::create()
                            .col(ProcessorSteps::TenantId)
                            .col(ProcessorSteps::TransactionId)
                            .col(ProcessorSteps::StepIndex),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_processor_steps_transaction")
                            .from(
                                ProcessorSteps::Table,
                                (ProcessorSteps::TenantId, ProcessorSteps::TransactionId),
                            )
                            .to(Transactions::Table, (Transactions::TenantId, Transactions::Id)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InternalSteps::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(InternalSteps::TenantId).string_len(64).not_null())
                    .col(ColumnDef::new(InternalSteps::TransactionId).string_len(64).not_null())
                    .col(ColumnDef::new(InternalSteps::StepIndex).integer().not_null())
                    .col(ColumnDef::new(InternalSteps::InternalId).string().not_null())
                    .col(ColumnDef::new(InternalSteps::BalanceBefore).big_integer().not_null())
                    .col(ColumnDef::new(InternalSteps::BalanceAfter).big_integer().not_null())
                    .col(ColumnDef::new(InternalSteps::BalanceChange).big_integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(InternalSteps::TenantId)
                            .col(InternalSteps::TransactionId)
                            .col(InternalSteps::StepIndex),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_internal_steps_transaction")
                            .from(
                                InternalSteps::Table,
                                (InternalSteps::TenantId, InternalSteps::TransactionId),
                            )
                            .to(Transactions::Table, (Transactions::TenantId, Transactions::Id)),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InternalSteps::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProcessorSteps::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerSteps::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Values::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Values {
    Table,
    TenantId,
    Id,
    Currency,
    Balance,
    UsesRemaining,
    ProgramId,
    ContactId,
    Code,
    IsGenericCode,
    GenericCodeOptions,
    AttachedFromValueId,
    Pretax,
    Active,
    Frozen,
    Canceled,
    Discount,
    DiscountSellerLiability,
    DiscountSellerLiabilityRule,
    RedemptionRule,
    BalanceRule,
    StartDate,
    EndDate,
    Metadata,
    CreatedDate,
    UpdatedDate,
    CreatedBy,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    TenantId,
    Id,
    TransactionType,
    Currency,
    LineItems,
    Totals,
    Metadata,
    Pending,
    RootTransactionId,
    PreviousTransactionId,
    NextTransactionId,
    CreatedDate,
    CreatedBy,
}

#[derive(DeriveIden)]
enum LedgerSteps {
    Table,
    TenantId,
    TransactionId,
    StepIndex,
    ValueId,
    ContactId,
    Code,
    BalanceBefore,
    BalanceAfter,
    BalanceChange,
    UsesRemainingBefore,
    UsesRemainingAfter,
    UsesRemainingChange,
}

#[derive(DeriveIden)]
enum ProcessorSteps {
    Table,
    TenantId,
    TransactionId,
    StepIndex,
    Kind,
    Action,
    Amount,
    IdempotencyKey,
    ChargeId,
    ObjectId,
}

#[derive(DeriveIden)]
enum InternalSteps {
    Table,
    TenantId,
    TransactionId,
    StepIndex,
    InternalId,
    BalanceBefore,
    BalanceAfter,
    BalanceChange,
}
