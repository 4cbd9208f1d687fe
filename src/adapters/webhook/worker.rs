//! WebhookWorker - Background consumer of verified webhook events.
//!
//! ## Flow
//!
//! 1. Ingress pushes a classified [`SubscriptionEvent`] onto a bounded queue
//! 2. **The worker pops it and runs the dispatcher** ← This module
//! 3. The result is logged and, when a completion channel is attached, sent
//!    as a [`WebhookOutcome`]
//!
//! Failed events are not retried. The provider already received its 200 and
//! will redeliver on its own schedule only if the event is resent.
//!
//! ## Graceful Shutdown
//!
//! On shutdown the worker processes whatever is already queued, then stops.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::application::billing::{DispatchWebhookEventHandler, DispatchWebhookEventResult};
use crate::domain::subscription::BillingError;
use crate::domain::webhook::{SubscriptionEvent, SubscriptionEventKind, WebhookError};

/// Queue capacity used when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Sending half of the webhook queue, held by the HTTP layer.
#[derive(Debug, Clone)]
pub struct WebhookQueue {
    sender: mpsc::Sender<SubscriptionEvent>,
}

impl WebhookQueue {
    /// Creates a queue holding at most `capacity` pending events.
    ///
    /// A zero capacity is raised to one.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<SubscriptionEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Hands an event to the worker.
    ///
    /// Waits only while the queue is full.
    ///
    /// # Errors
    ///
    /// - `QueueUnavailable` - the worker has stopped
    pub async fn enqueue(&self, event: SubscriptionEvent) -> Result<(), WebhookError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| WebhookError::QueueUnavailable)
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.sender.capacity()
    }
}

/// Result of processing one event.
#[derive(Debug, Clone)]
pub struct WebhookOutcome {
    pub event_id: String,
    pub kind: SubscriptionEventKind,
    pub provider_subscription_id: String,
    pub result: Result<DispatchWebhookEventResult, BillingError>,
}

impl WebhookOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Background service that applies queued events.
pub struct WebhookWorker {
    receiver: mpsc::Receiver<SubscriptionEvent>,
    dispatcher: Arc<DispatchWebhookEventHandler>,
    outcomes: Option<mpsc::UnboundedSender<WebhookOutcome>>,
}

impl WebhookWorker {
    pub fn new(
        receiver: mpsc::Receiver<SubscriptionEvent>,
        dispatcher: Arc<DispatchWebhookEventHandler>,
    ) -> Self {
        Self {
            receiver,
            dispatcher,
            outcomes: None,
        }
    }

    /// Attaches a completion channel that receives every outcome.
    pub fn with_outcomes(mut self, outcomes: mpsc::UnboundedSender<WebhookOutcome>) -> Self {
        self.outcomes = Some(outcomes);
        self
    }

    /// Runs until shutdown is signalled or every queue sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Webhook worker started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.drain().await;
                        break;
                    }
                }

                next = self.receiver.recv() => {
                    match next {
                        Some(event) => self.process(event).await,
                        None => break,
                    }
                }
            }
        }

        tracing::info!("Webhook worker stopped");
    }

    /// Processes events already queued, without waiting for more.
    async fn drain(&mut self) {
        self.receiver.close();
        while let Some(event) = self.receiver.recv().await {
            self.process(event).await;
        }
    }

    async fn process(&self, event: SubscriptionEvent) {
        let event_id = event.event_id.clone();
        let kind = event.kind;
        let provider_subscription_id = event.subscription.id.clone();

        let result = self.dispatcher.handle(event).await;

        match &result {
            Ok(applied) => tracing::info!(
                event_id = %event_id,
                event_kind = kind.as_str(),
                provider_subscription_id = %provider_subscription_id,
                status = %applied.subscription.status,
                written = applied.written,
                "Webhook event processed"
            ),
            Err(e) => tracing::error!(
                event_id = %event_id,
                event_kind = kind.as_str(),
                provider_subscription_id = %provider_subscription_id,
                error = %e,
                "Webhook event failed"
            ),
        }

        if let Some(outcomes) = &self.outcomes {
            // A dropped listener is not the worker's concern.
            let _ = outcomes.send(WebhookOutcome {
                event_id,
                kind,
                provider_subscription_id,
                result,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::billing::{BillingCycle, PlanPrice};
    use crate::domain::foundation::{OrganizationId, PlanId};
    use crate::domain::subscription::{Subscription, SubscriptionStatus};
    use crate::domain::webhook::SubscriptionObject;
    use crate::ports::SubscriptionRepository;

    fn event(id: &str, kind: SubscriptionEventKind, provider_id: &str) -> SubscriptionEvent {
        SubscriptionEvent {
            event_id: id.to_string(),
            kind,
            subscription: SubscriptionObject {
                id: provider_id.to_string(),
                customer: Some("cus_1".to_string()),
                status: "active".to_string(),
                canceled_at: None,
                cancel_at: None,
                current_period_start: Some(1_700_000_000),
                current_period_end: Some(1_702_592_000),
                trial_end: None,
            },
        }
    }

    async fn repo_with_pending(provider_id: &str) -> (Arc<InMemorySubscriptionRepository>, Subscription) {
        let price = PlanPrice::new(PlanId::new(), "Pro", 2_900, BillingCycle::Monthly).unwrap();
        let mut row = Subscription::pending(OrganizationId::new(), &price, None);
        row.claim_provider_subscription(provider_id);
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        repo.insert(&row).await.unwrap();
        (repo, row)
    }

    fn spawn_worker(
        repo: Arc<InMemorySubscriptionRepository>,
        capacity: usize,
    ) -> (
        WebhookQueue,
        mpsc::UnboundedReceiver<WebhookOutcome>,
        watch::Sender<bool>,
        tokio::task::JoinHandle<()>,
    ) {
        let dispatcher = Arc::new(DispatchWebhookEventHandler::new(
            repo,
            Arc::new(MockPaymentProvider::new()),
        ));
        let (queue, receiver) = WebhookQueue::bounded(capacity);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = WebhookWorker::new(receiver, dispatcher).with_outcomes(outcome_tx);
        let handle = tokio::spawn(worker.run(shutdown_rx));
        (queue, outcome_rx, shutdown_tx, handle)
    }

    #[tokio::test]
    async fn queued_event_is_applied_and_reported() {
        let (repo, row) = repo_with_pending("sub_1").await;
        let (queue, mut outcomes, _shutdown, _handle) = spawn_worker(repo.clone(), 8);

        queue
            .enqueue(event("evt_1", SubscriptionEventKind::Active, "sub_1"))
            .await
            .unwrap();

        let outcome = outcomes.recv().await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.event_id, "evt_1");
        let stored = repo.find_by_id(&row.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn unknown_subscription_is_reported_as_not_found() {
        let (repo, _) = repo_with_pending("sub_1").await;
        let (queue, mut outcomes, _shutdown, _handle) = spawn_worker(repo, 8);

        queue
            .enqueue(event("evt_2", SubscriptionEventKind::Canceled, "sub_123"))
            .await
            .unwrap();

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.provider_subscription_id, "sub_123");
        assert!(matches!(outcome.result, Err(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn events_are_processed_in_order() {
        let (repo, row) = repo_with_pending("sub_1").await;
        let (queue, mut outcomes, _shutdown, _handle) = spawn_worker(repo.clone(), 8);

        queue
            .enqueue(event("evt_1", SubscriptionEventKind::Active, "sub_1"))
            .await
            .unwrap();
        queue
            .enqueue(event("evt_2", SubscriptionEventKind::Canceled, "sub_1"))
            .await
            .unwrap();

        assert_eq!(outcomes.recv().await.unwrap().event_id, "evt_1");
        assert_eq!(outcomes.recv().await.unwrap().event_id, "evt_2");
        let stored = repo.find_by_id(&row.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Cancelled);
    }

    #[tokio::test]
    async fn shutdown_drains_queued_events() {
        let (repo, row) = repo_with_pending("sub_1").await;
        let dispatcher = Arc::new(DispatchWebhookEventHandler::new(
            repo.clone(),
            Arc::new(MockPaymentProvider::new()),
        ));
        let (queue, receiver) = WebhookQueue::bounded(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Queue before the worker starts so the event is pending at shutdown.
        queue
            .enqueue(event("evt_1", SubscriptionEventKind::Active, "sub_1"))
            .await
            .unwrap();
        shutdown_tx.send(true).unwrap();

        WebhookWorker::new(receiver, dispatcher)
            .run(shutdown_rx)
            .await;

        let stored = repo.find_by_id(&row.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn enqueue_after_worker_stops_is_unavailable() {
        let (repo, _) = repo_with_pending("sub_1").await;
        let (queue, _outcomes, shutdown, handle) = spawn_worker(repo, 4);

        shutdown.send(true).unwrap();
        handle.await.unwrap();

        let err = queue
            .enqueue(event("evt_1", SubscriptionEventKind::Active, "sub_1"))
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::QueueUnavailable));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let (queue, _receiver) = WebhookQueue::bounded(0);
        assert_eq!(queue.available(), 1);
    }
}
