use quire_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Initialize the application (database, storage, services, routes)
    let (_state, router) = quire_api::setup::initialize_app(config.clone()).await?;

    quire_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
