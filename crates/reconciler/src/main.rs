use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use croft_cluster::{ClusterBackend, InMemoryBackend};
use croft_core::status::{Intent, ResourceKind};
use croft_events::listeners::{
    CreateListener, DeleteListener, StartListener, StatusCheckListener, StopListener,
};
use croft_events::{EventBus, EventPersistence, ListenerHub, TransitionListener};
use croft_reconciler::{ReconcileScheduler, ReconcilerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "croft=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ReconcilerConfig::from_env()?;

    let pool = croft_db::create_pool(&config.database_url).await?;
    croft_db::MIGRATOR.run(&pool).await?;

    // The control plane client is selected here once one exists; until then
    // the simulated backend lets the whole engine run end to end.
    let backend: Arc<dyn ClusterBackend> = Arc::new(InMemoryBackend::default());
    tracing::warn!("Using the in-memory cluster backend, workloads are simulated");

    let bus = Arc::new(EventBus::default());

    tokio::spawn(EventPersistence::run(pool.clone(), bus.subscribe()));

    let mut hub = ListenerHub::new(config.dispatch_concurrency);
    for kind in ResourceKind::ALL {
        let routes: [(Intent, Arc<dyn TransitionListener>); 5] = [
            (
                Intent::Create,
                Arc::new(CreateListener::new(pool.clone(), Arc::clone(&backend))),
            ),
            (
                Intent::Start,
                Arc::new(StartListener::new(pool.clone(), Arc::clone(&backend))),
            ),
            (
                Intent::Stop,
                Arc::new(StopListener::new(pool.clone(), Arc::clone(&backend))),
            ),
            (
                Intent::Delete,
                Arc::new(DeleteListener::new(pool.clone(), Arc::clone(&backend))),
            ),
            (
                Intent::StatusCheck,
                Arc::new(StatusCheckListener::new(pool.clone(), Arc::clone(&backend))),
            ),
        ];
        for (intent, listener) in routes {
            hub.register(kind, intent, listener);
        }
    }
    tokio::spawn(Arc::new(hub).run(bus.subscribe()));

    let scheduler = Arc::new(ReconcileScheduler::new(
        pool.clone(),
        Arc::clone(&bus),
        &config,
    ));
    for kind in ResourceKind::ALL {
        tokio::spawn(Arc::clone(&scheduler).run(kind));
    }

    tracing::info!(
        tick_secs = config.tick_interval.as_secs(),
        batch_size = config.claim_batch_size,
        "Reconciler started"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, reconciler exiting");
    Ok(())
}
