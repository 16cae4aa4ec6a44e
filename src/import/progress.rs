use crate::import::types::ImportProgress;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc as tokio_mpsc;
use tracing::debug;

type SubscriptionId = u64;

/// Filter criteria for progress subscriptions
#[derive(Debug, Clone)]
enum SubscriptionFilter {
    All,
    Owner { user_id: i64 },
}

impl SubscriptionFilter {
    fn matches(&self, progress: &ImportProgress) -> bool {
        match self {
            SubscriptionFilter::All => true,
            SubscriptionFilter::Owner { user_id } => progress.owner_id() == *user_id,
        }
    }
}

struct Subscription {
    filter: SubscriptionFilter,
    tx: tokio_mpsc::UnboundedSender<ImportProgress>,
}

/// Handle for subscribing to import progress updates
#[derive(Clone)]
pub struct ImportProgressHandle {
    subscriptions: Arc<Mutex<HashMap<SubscriptionId, Subscription>>>,
    next_id: Arc<AtomicU64>,
}

impl ImportProgressHandle {
    /// Create a new progress handle and spawn background task to process progress updates
    pub fn new(
        mut progress_rx: tokio_mpsc::UnboundedReceiver<ImportProgress>,
        runtime_handle: tokio::runtime::Handle,
    ) -> Self {
        let subscriptions: Arc<Mutex<HashMap<SubscriptionId, Subscription>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let subscriptions_clone = subscriptions.clone();

        runtime_handle.spawn(async move {
            while let Some(progress) = progress_rx.recv().await {
                let mut subs = subscriptions_clone.lock();
                // A failed send means the receiver was dropped
                subs.retain(|_, subscription| {
                    !subscription.filter.matches(&progress)
                        || subscription.tx.send(progress.clone()).is_ok()
                });
            }
            debug!("Import progress channel closed, exiting");
        });

        Self {
            subscriptions,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn subscribe(
        &self,
        filter: SubscriptionFilter,
    ) -> tokio_mpsc::UnboundedReceiver<ImportProgress> {
        let (tx, rx) = tokio_mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscriptions
            .lock()
            .insert(id, Subscription { filter, tx });
        rx
    }

    /// Subscribe to every import progress update
    /// Subscription is automatically removed when receiver is dropped
    pub fn subscribe_all(&self) -> tokio_mpsc::UnboundedReceiver<ImportProgress> {
        self.subscribe(SubscriptionFilter::All)
    }

    /// Subscribe to progress of imports into one user's library
    /// Subscription is automatically removed when receiver is dropped
    pub fn subscribe_owner(
        &self,
        user_id: i64,
    ) -> tokio_mpsc::UnboundedReceiver<ImportProgress> {
        self.subscribe(SubscriptionFilter::Owner { user_id })
    }
}
