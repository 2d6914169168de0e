use pedalpoint::config::LoaderConfig;
use pedalpoint::make_reqwest_client;
use pedalpoint::pipeline::Pipeline;
use pedalpoint::storage::MemorySiteStore;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = LoaderConfig::from_env();
    let store = MemorySiteStore::new();
    let pipeline = Pipeline::new(config, make_reqwest_client(), &store);

    let report = pipeline.run().await?;

    info!(
        "Run complete: {} site(s) loaded, {} url(s) unprocessed, {} site(s) without admin area",
        store.len(),
        report.unprocessed_urls.len(),
        report.no_admin_site_ids.len()
    );

    Ok(())
}
