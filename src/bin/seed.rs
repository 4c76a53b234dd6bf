//! Reset the configured database to the sample study plan.

use hufflepuff_todo::config::ServerConfig;
use hufflepuff_todo::seed;
use hufflepuff_todo::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    let db = LibSqlBackend::new_local(&config.db_path).await?;

    let todos = seed::seed(&db).await?;
    for todo in &todos {
        tracing::info!(
            id = todo.id,
            title = %todo.title,
            subtasks = todo.subtasks.len(),
            "Seeded todo"
        );
    }

    db.close().await?;
    Ok(())
}
