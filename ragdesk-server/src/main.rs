use ragdesk_server::{Settings, logging, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let settings = Settings::from_env()?;
    run_server(settings).await
}
