use crate::config::AppConfig;

/// `PgStore::connect` runs the embedded migrations; this only reports the outcome
pub async fn handle() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    super::connect(&config).await?;
    println!("Migrations applied");
    Ok(())
}
