//! Database seeder for Tessera development and testing.
//!
//! Seeds a demo tenant with a gift card, a pre-tax promotion and a generic
//! welcome code. Values that already exist are skipped, so the seeder can be
//! re-run safely.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use tessera_core::execution::ExecutionError;
use tessera_core::plan::PlanError;
use tessera_core::rules::RuleCache;
use tessera_core::value::{CreateValueInput, GenericCodeOptions, PerContactOptions, Rule};
use tessera_db::TransactionService;
use tessera_db::migration::{Migrator, MigratorTrait};
use tessera_processor::StripeProcessor;
use tessera_shared::AppConfig;
use tessera_shared::types::{TenantId, ValueId};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_TENANT: &str = "tenant-demo";
const SEEDED_BY: &str = "seeder";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tessera=debug,seeder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    info!("Connecting to database...");
    let db = tessera_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    Migrator::up(&db, None).await.context("failed to run migrations")?;

    let mut service = TransactionService::new(db, Arc::new(RuleCache::new()), &config.engine);
    if let Some(processor) = StripeProcessor::from_config(&config.processor)? {
        info!(api_base = %config.processor.api_base, "card processor enabled");
        service = service.with_processor(Arc::new(processor));
    }
    let tenant = TenantId::parse(DEMO_TENANT)?;

    for input in demo_values()? {
        seed_value(&service, &tenant, &input).await?;
    }

    info!("Seeding complete!");
    Ok(())
}

fn demo_values() -> anyhow::Result<Vec<CreateValueInput>> {
    let gift_card = CreateValueInput {
        code: Some("DEMO-GIFT-5000".to_string()),
        balance: Some(5000),
        ..CreateValueInput::new(ValueId::parse("demo-gift-card")?, "USD")
    };

    let promotion = CreateValueInput {
        pretax: true,
        discount: true,
        balance_rule: Some(Rule::new(
            "currentLineItem.lineTotal.subtotal * 0.1",
            "10% off every item",
        )),
        redemption_rule: Some(Rule::new(
            "totals.subtotal >= 2000",
            "Orders of $20 or more",
        )),
        ..CreateValueInput::new(ValueId::parse("demo-promotion")?, "USD")
    };

    let welcome = CreateValueInput {
        code: Some("WELCOME".to_string()),
        is_generic_code: true,
        discount: true,
        balance: Some(50_000),
        generic_code_options: Some(GenericCodeOptions {
            per_contact: Some(PerContactOptions {
                balance: Some(500),
                uses_remaining: Some(1),
            }),
        }),
        ..CreateValueInput::new(ValueId::parse("demo-welcome")?, "USD")
    };

    Ok(vec![gift_card, promotion, welcome])
}

async fn seed_value(
    service: &TransactionService,
    tenant: &TenantId,
    input: &CreateValueInput,
) -> anyhow::Result<()> {
    match service.get_value(tenant, &input.id).await {
        Ok(_) => {
            info!(value_id = %input.id, "value already exists, skipping");
            return Ok(());
        }
        Err(ExecutionError::Plan(PlanError::ValueNotFound(_))) => {}
        Err(e) => return Err(e.into()),
    }

    let value = service.create_value(tenant, input, SEEDED_BY).await?;
    info!(value_id = %value.id, balance = ?value.balance, "created value");
    Ok(())
}
