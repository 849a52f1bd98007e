use std::{
    env,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use binding::{DeviceBindingStore, SqliteBindingStore};
use config::{CONFIG_PATH_ENV, Config, DEFAULT_CONFIG_PATH, ResolverConfig, load_config};
use futures::FutureExt;
use global::Global;
use local::Local;
use middleware::{blackhole::BlackholeMiddleware, enforcement::EnforcementMiddleware};
use pfdns_dns::helpers;
use pfdns_resolver::forwarder::{ForwardResolver, Limits};
use pfdns_server::{DnsServer, ServerState};
use policy::{BlackholeTarget, EnforcementPolicy};
use tokio::signal;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking;
use tracing_subscriber::{Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod binding;
mod config;
mod evaluator;
mod global;
mod local;
mod middleware;
mod policy;
mod query;
mod records;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (nb, _guard) = non_blocking(std::io::stdout());

    let config_path = env::var(CONFIG_PATH_ENV).unwrap_or(DEFAULT_CONFIG_PATH.to_string());

    let config = load_config(&config_path)?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(nb)
                .with_target(false)
                .with_filter(LevelFilter::from(config.server.log_level)),
        )
        .init();

    let policy = EnforcementPolicy::from_config(config.pfdns.as_ref())?;
    let standalone_blackhole = BlackholeTarget::from_config(&config.blackhole)?;

    let store = open_binding_store(&config, &policy).await?;

    let global = Arc::new(Global::new(policy, store));

    let policy = global.evaluator.policy();
    tracing::info!(
        "enforcement {}, redirecting to {}, blackhole {}",
        if policy.enforcement_enabled { "enabled" } else { "disabled" },
        policy.redirect_address,
        policy
            .blackhole
            .as_ref()
            .map_or("disabled".to_string(), |t| format!("{} ({})", t.name.to_fqdn(), t.address)),
    );

    #[allow(irrefutable_let_patterns)]
    let upstreams = if let ResolverConfig::Forwarder { upstreams } = &config.resolver {
        upstreams.clone()
    } else {
        return Err(anyhow::anyhow!("Unsupported resolver configuration"));
    };

    let resolver = Arc::new(ForwardResolver::new(&upstreams, Limits::default()).await?);
    let mut state = ServerState::<Global, Local>::new(
        resolver,
        global,
        Duration::from_millis(config.server.timeout_ms),
    );

    state.set_success_handler(|ctx, _resp| {
        async move {
            let (outcome, elapsed) = {
                let local = ctx.local();
                (local.outcome_label(), local.time_elapsed())
            };
            tracing::debug!(client = %ctx.client(), "answered ({}) in {:?}", outcome, elapsed);
            Ok(())
        }
        .boxed()
    });

    state.set_error_handler(|ctx, err| {
        async move {
            let id = helpers::extract_transaction_id(&ctx.raw()).unwrap_or_default();
            tracing::error!("Error processing request: {}, error: {}", id, err);
            Ok(())
        }
        .boxed()
    });

    state.add_middleware(Arc::new(EnforcementMiddleware));
    if let Some(target) = standalone_blackhole {
        tracing::info!("standalone blackhole answering with {} ({})", target.name.to_fqdn(), target.address);
        state.add_middleware(Arc::new(BlackholeMiddleware::new(target)));
    }

    let server_addr = SocketAddr::new(config.server.ip.parse::<IpAddr>()?, config.server.port);
    let server = DnsServer::new(server_addr, state);

    tracing::info!("listening on {}", server_addr);

    tokio::select! {
        r = server.run() => {
            if let Err(e) = r {
                tracing::error!("DNS server exited with error: {}", e);
            }
        },
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down DNS server...");
        },
    }

    Ok(())
}

/// The device binding database is only opened when enforcement needs it.
async fn open_binding_store(
    config: &Config,
    policy: &EnforcementPolicy,
) -> anyhow::Result<Option<Arc<dyn DeviceBindingStore>>> {
    if !policy.enforcement_enabled {
        return Ok(None);
    }

    let db = pfdns_database::connect(&config.database.path, config.database.pool_size).await?;
    tracing::info!("opened {} with up to {} connections", config.database.path, db.max_size());

    Ok(Some(Arc::new(SqliteBindingStore::new(db))))
}
