//! The worker registry: the service's control plane.
//!
//! Holds the only mutable global state of the core, the mapping from
//! subscription name to running worker, together with the shared HTTP
//! client, the shared broker client, and a coarse readiness status string.
//! Activations arrive from the RPC surface; removals arrive from the RPC
//! surface and from the deactivation channel workers report cancelable
//! errors on. On startup the registry reconstructs its worker population
//! from the broker's subscription catalog.

use std::{collections::HashMap, sync::Arc, time::Duration};

use pushgate_ams::{AmsClient, Subscription as AmsSubscription};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{error, info, warn};
use url::Url;

use crate::{
    consumer::{AmsConsumer, CancelableError, Consumer},
    error::RegistryError,
    sender::new_sender,
    subscription::{Subscription, MATTERMOST_TYPE},
    worker::{PushWorker, WorkerHandle},
};

/// Status value that marks the registry ready to serve.
pub const STATUS_OK: &str = "ok";

const STATUS_LOADING: &str = "loading push worker user";
const STATUS_USER_FETCH_FAILED: &str = "Could not retrieve push worker user";

/// Delay between attempts of the bootstrap user fetch loop.
const USER_FETCH_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Capacity of the deactivation channel. Kept small: a worker about to
/// retire itself blocks on the send, racing it against its own
/// cancellation.
const DEACTIVATION_CHANNEL_CAPACITY: usize = 1;

/// The long-lived service object owning the push worker population.
pub struct PushRegistry {
    http: reqwest::Client,
    ams: Arc<AmsClient>,
    token: String,
    skip_subs_load: bool,
    workers: RwLock<HashMap<String, WorkerHandle>>,
    deactivate_tx: mpsc::Sender<CancelableError>,
    deactivate_rx: Mutex<Option<mpsc::Receiver<CancelableError>>>,
    status: RwLock<String>,
}

impl PushRegistry {
    /// Creates a registry over the given broker client and shared HTTP
    /// client. Call [`PushRegistry::start`] afterwards to launch the
    /// background tasks.
    pub fn new(
        ams: Arc<AmsClient>,
        http: reqwest::Client,
        token: impl Into<String>,
        skip_subs_load: bool,
    ) -> Arc<Self> {
        let (deactivate_tx, deactivate_rx) = mpsc::channel(DEACTIVATION_CHANNEL_CAPACITY);

        // without a loader run nothing else would ever mark the registry
        // ready
        let status = if skip_subs_load { STATUS_OK } else { STATUS_LOADING };

        Arc::new(Self {
            http,
            ams,
            token: token.into(),
            skip_subs_load,
            workers: RwLock::new(HashMap::new()),
            deactivate_tx,
            deactivate_rx: Mutex::new(Some(deactivate_rx)),
            status: RwLock::new(status.to_string()),
        })
    }

    /// Spawns the deactivation-channel listener and, unless disabled by
    /// configuration, the subscription loader.
    pub async fn start(self: &Arc<Self>) {
        if let Some(rx) = self.deactivate_rx.lock().await.take() {
            let registry = Arc::clone(self);
            tokio::spawn(async move { registry.handle_deactivate_channel(rx).await });
        }

        if !self.skip_subs_load {
            let registry = Arc::clone(self);
            tokio::spawn(async move { registry.load_subscriptions().await });
        }
    }

    /// The registry's readiness status. Free-form text; only [`STATUS_OK`]
    /// means ready.
    pub async fn status(&self) -> String {
        self.status.read().await.clone()
    }

    /// Whether a worker for the subscription name is currently registered.
    pub async fn is_sub_active(&self, name: &str) -> bool {
        self.workers.read().await.contains_key(name)
    }

    /// Activates a subscription: builds its consumer, sender and worker,
    /// registers it, and starts its cycle loop on a dedicated task.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for missing push or retry configuration, an
    /// unparseable HTTP endpoint, or an unknown destination or policy
    /// variant; `AlreadyExists` when a worker for the name is registered.
    pub async fn activate_subscription(&self, sub: Subscription) -> Result<String, RegistryError> {
        let push_cfg = sub
            .push_config
            .as_ref()
            .filter(|cfg| cfg.retry_policy.is_some())
            .ok_or_else(|| RegistryError::InvalidArgument("Empty subscription".to_string()))?
            .clone();

        let mut workers = self.workers.write().await;

        if workers.contains_key(&sub.full_name) {
            return Err(RegistryError::AlreadyExists(format!(
                "Subscription {} is already activated",
                sub.full_name
            )));
        }

        if push_cfg.push_type != MATTERMOST_TYPE {
            Url::parse(&push_cfg.push_endpoint).map_err(|err| {
                RegistryError::InvalidArgument(format!("Invalid push endpoint, {err}"))
            })?;
        }

        let sub = Arc::new(sub);
        let consumer: Arc<dyn Consumer> =
            Arc::new(AmsConsumer::new(Arc::clone(&self.ams), sub.full_name.clone()));
        let sender = new_sender(&push_cfg, self.http.clone())
            .map_err(|err| RegistryError::InvalidArgument(format!("Invalid argument, {err}")))?;

        let worker = PushWorker::new(
            Arc::clone(&sub),
            consumer,
            sender,
            self.deactivate_tx.clone(),
        )
        .map_err(|err| RegistryError::InvalidArgument(format!("Invalid argument, {err}")))?;

        let handle = worker.handle();
        workers.insert(sub.full_name.clone(), handle);
        tokio::spawn(worker.run());

        Ok(format!("Subscription {} activated", sub.full_name))
    }

    /// Stops a subscription's worker and removes it from the registry.
    ///
    /// # Errors
    ///
    /// `NotFound` when no worker for the name is registered.
    pub async fn deactivate_subscription(&self, name: &str) -> Result<String, RegistryError> {
        self.remove_worker(name).await?;
        Ok(format!("Subscription {name} deactivated"))
    }

    /// The status string of a subscription's worker.
    ///
    /// # Errors
    ///
    /// `NotFound` when no worker for the name is registered.
    pub async fn subscription_status(&self, name: &str) -> Result<String, RegistryError> {
        let handle = self.workers.read().await.get(name).cloned();
        match handle {
            Some(handle) => Ok(handle.status().await),
            None => Err(RegistryError::NotFound(format!(
                "Subscription {name} is not active"
            ))),
        }
    }

    async fn remove_worker(&self, name: &str) -> Result<(), RegistryError> {
        let mut workers = self.workers.write().await;
        let handle = workers.remove(name).ok_or_else(|| {
            RegistryError::NotFound(format!("Subscription {name} is not active"))
        })?;
        handle.stop();
        Ok(())
    }

    /// Listens on the deactivation channel and retires each worker that
    /// reported a cancelable error. A missing entry only warrants a
    /// warning: a concurrent explicit deactivation may have won the race.
    async fn handle_deactivate_channel(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<CancelableError>,
    ) {
        while let Some(cancel_err) = rx.recv().await {
            match self.remove_worker(&cancel_err.resource).await {
                Ok(()) => info!(
                    subscription = %cancel_err.resource,
                    error = %cancel_err.err_msg,
                    "deactivated malfunctioning subscription"
                ),
                Err(_) => warn!(
                    subscription = %cancel_err.resource,
                    "tried to deactivate malfunctioning subscription but was not active"
                ),
            }
        }
    }

    /// Bootstraps the worker population from the broker's catalog:
    /// activates every push enabled subscription assigned to the push
    /// worker user. One bad subscription never aborts the fleet.
    async fn load_subscriptions(self: Arc<Self>) {
        let user = loop {
            match self.ams.get_user_by_token(&self.token).await {
                Ok(user) => break user,
                Err(err) => {
                    self.set_status(STATUS_USER_FETCH_FAILED).await;
                    error!(error = %err, "could not retrieve push worker user");
                    tokio::time::sleep(USER_FETCH_RETRY_DELAY).await;
                }
            }
        };

        info!(user = %user.name, "push worker user retrieved successfully");
        self.set_status(STATUS_OK).await;

        for project in &user.projects {
            for sub_name in &project.subscriptions {
                let full_sub = format!(
                    "/projects/{}/subscriptions/{}",
                    project.project, sub_name
                );

                let sub: AmsSubscription = match self.ams.get_subscription(&full_sub).await {
                    Ok(sub) => sub,
                    Err(err) => {
                        error!(
                            subscription = %full_sub,
                            error = %err,
                            "could not retrieve subscription"
                        );
                        continue;
                    }
                };

                if !sub.is_push_enabled() {
                    error!(subscription = %full_sub, "subscription is not push enabled");
                    continue;
                }

                match self.activate_subscription(Subscription::from(sub)).await {
                    Ok(_) => {
                        info!(subscription = %full_sub, "subscription activated successfully");
                    }
                    Err(err) => {
                        error!(
                            subscription = %full_sub,
                            error = %err,
                            "could not activate subscription"
                        );
                    }
                }
            }
        }
    }

    async fn set_status(&self, status: &str) {
        *self.status.write().await = status.to_string();
    }
}
