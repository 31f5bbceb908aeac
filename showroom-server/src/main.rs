use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = showroom_server::config::load();
    let ax = showroom_server::build(&config).await?;

    let host = config.get("http.host").unwrap_or("127.0.0.1");
    let port = config.get("http.port").unwrap_or("3030");
    let addr = format!("{host}:{port}");

    ax.listen(addr).await?;

    Ok(())
}
