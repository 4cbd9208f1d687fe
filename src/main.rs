//! Billing Reconciler service
//!
//! ## Endpoints
//!
//! - `GET /api/organizations/:org_id/billing/subscription` - Subscription view
//! - `POST /api/organizations/:org_id/billing/checkout` - Open checkout
//! - `POST /api/organizations/:org_id/billing/checkout/success` - Reconcile checkout
//! - `POST /api/organizations/:org_id/billing/cancel` - Cancel at period end
//! - `POST /api/organizations/:org_id/billing/resume` - Undo a scheduled cancel
//! - `POST /api/organizations/:org_id/billing/change-plan` - Change plan
//! - `POST /api/webhooks/billing` - Provider webhooks

use std::error::Error;
use std::sync::Arc;

use axum::Router;
use billing_reconciler::adapters::http::{billing_router, BillingAppState};
use billing_reconciler::adapters::notifications::SlackNotifier;
use billing_reconciler::adapters::postgres::{
    self, PostgresOrganizationRepository, PostgresPlanCatalog, PostgresSubscriptionReader,
    PostgresSubscriptionRepository,
};
use billing_reconciler::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use billing_reconciler::adapters::webhook::{WebhookQueue, WebhookWorker};
use billing_reconciler::application::billing::DispatchWebhookEventHandler;
use billing_reconciler::config::AppConfig;
use billing_reconciler::domain::webhook::WebhookVerifier;
use tokio::signal;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Load and validate configuration
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);
    tracing::info!(
        environment = ?config.server.environment,
        database = config.database.redacted_url(),
        test_mode = config.payment.is_test_mode(),
        "Starting billing reconciler"
    );
    if !config.payment.has_webhook_secret() {
        tracing::warn!("No webhook secret configured; webhook requests will be rejected");
    }

    // Database
    let pool = postgres::connect(&config.database).await?;
    if config.database.run_migrations {
        postgres::run_migrations(&pool).await?;
    }

    // Adapters
    let subscriptions = Arc::new(PostgresSubscriptionRepository::new(pool.clone()));
    let catalog = Arc::new(PostgresPlanCatalog::new(pool.clone()));
    let provider = Arc::new(StripePaymentAdapter::new(
        StripeConfig::new(
            config.payment.stripe_api_key.clone(),
            config.payment.checkout_return_url.clone(),
        )
        .with_base_url(config.payment.api_base_url.clone()),
    ));

    // Webhook worker
    let (webhook_queue, receiver) = WebhookQueue::bounded(config.webhook.queue_capacity);
    let dispatcher = Arc::new(DispatchWebhookEventHandler::new(
        subscriptions.clone(),
        provider.clone(),
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(WebhookWorker::new(receiver, dispatcher).run(shutdown_rx));

    let state = BillingAppState {
        subscriptions,
        subscription_reader: Arc::new(PostgresSubscriptionReader::new(pool.clone())),
        organizations: Arc::new(PostgresOrganizationRepository::new(pool)),
        catalog,
        provider,
        notifier: Arc::new(SlackNotifier::new(
            config.notifications.slack_webhook_url.clone(),
        )),
        webhook_verifier: Arc::new(WebhookVerifier::new(config.payment.webhook_secret.clone())),
        webhook_queue,
    };

    let app = build_router(state, &config);

    // Serve
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and its queue sender) is gone; let the worker drain.
    let _ = shutdown_tx.send(true);
    worker.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_router(state: BillingAppState, config: &AppConfig) -> Router {
    // Outermost first
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::new(config.server.request_timeout()));

    Router::new()
        .nest("/api", billing_router())
        .layer(middleware)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
