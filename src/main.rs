use anyhow::{Context, Result};
use mrp_discovery::{MdnsAdvertiser, ServiceRecord};
use mrp_relay::{ProxyConfig, ProxyContext, RelayServer, UpstreamConnection, USAGE};
use std::sync::Arc;
use tokio::runtime::Builder;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match ProxyConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Usage: {}", USAGE);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(config)) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: ProxyConfig) -> Result<()> {
    info!(device = %config.device_addr, "connecting to device");
    let upstream = UpstreamConnection::connect(
        config.device_addr,
        config.credentials.clone(),
        &config.name,
        config.max_frame_len,
    )
    .await
    .context("device leg setup failed")?;
    let (handle, relay) = upstream.spawn();

    let context = Arc::new(ProxyContext::from_config(&config));
    let server = RelayServer::bind(config.listen_addr, context, handle)
        .await
        .context("could not bind listener")?;
    let port = server.local_addr()?.port();

    let record = ServiceRecord::new(config.local_ip, port)
        .with_name(config.name.clone())
        .with_unique_identifier(config.advertised_id.clone())
        .with_build(config.build.clone());
    let advertiser = MdnsAdvertiser::publish(&record).context("could not advertise proxy")?;

    let result = tokio::select! {
        served = server.run() => served.context("listener stopped"),
        relayed = relay => match relayed {
            Ok(inner) => inner.context("device leg closed"),
            Err(e) => Err(e).context("device relay task failed"),
        },
    };

    advertiser.shutdown()?;
    result
}
