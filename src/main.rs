use tracing::info;
use turf_crm::application::{init_state, Application};
use turf_crm::config::config::get_configuration;
use turf_crm::telemetry::init_subscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  let level = std::env::var("RUST_LOG").unwrap_or("info".to_string());
  println!("Turf CRM notification relay with RUST_LOG={}", level);
  let filters = vec![
    format!("turf_crm={}", level),
    format!("database={}", level),
    format!("gotrue_entity={}", level),
  ];
  let conf =
    get_configuration().map_err(|e| anyhow::anyhow!("Failed to read configuration: {}", e))?;
  init_subscriber(&conf.app_env, filters)?;
  info!("environment: {}", conf.app_env.as_str());

  let state = init_state(&conf)
    .await
    .map_err(|e| anyhow::anyhow!("Failed to initialize application state: {}", e))?;
  let application = Application::build(conf, state).await?;
  application.run_until_stopped().await?;

  Ok(())
}
