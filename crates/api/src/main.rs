use groundwork_infra::{Repo, RepoConfig, Scope};
use groundwork_observability::Logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    groundwork_observability::init();
    let logger = Logger::current();

    let config = RepoConfig::from_env()?;
    let repo = Repo::connect(&config).await?;
    groundwork_api::app::migrate(&repo, &Scope::new(logger.clone())).await?;

    let app = groundwork_api::app::build_app(repo, logger);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
