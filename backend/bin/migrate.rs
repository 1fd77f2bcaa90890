use party_match::db::{self, DatabaseConfig};
use party_match::{get_db_pool, utils};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    println!("Migrating document store...");
    db::migrations::run_migrations(&pool).await?;
    println!("Document store ready.");

    Ok(())
}
