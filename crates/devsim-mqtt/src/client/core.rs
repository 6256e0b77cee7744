/*
 * SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

// src/client/core.rs
// SimClient: a callback-driven wrapper around the rumqttc AsyncClient.
//
// connect() spawns two tasks:
//  - the event loop task, which polls rumqttc, (re)subscribes on every
//    CONNACK, runs connect/publish hooks and pushes matched PUBLISHes
//    onto a bounded local queue.
//  - the processing task, which drains that queue and runs the typed
//    handler for each message, at most max_concurrency at a time.
//
// Dropping the queue sender (event loop exit) is what stops the
// processing task, after it has drained everything already queued.

use std::any::TypeId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rumqttc::{
    AsyncClient, ConnAck, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions,
    Outgoing, Packet, Publish, QoS, Transport,
};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, RwLock, Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::handlers::{
    ClosureAdapter, ConnectHook, ErasedHandler, HandlerFuture, PublishHook,
};
use crate::client::messages::ReceivedMessage;
use crate::client::options::{
    ClientOptions, ClientSettings, DEFAULT_KEEP_ALIVE, DEFAULT_MESSAGE_CHANNEL_CAPACITY,
};
use crate::errors::SimClientError;
use crate::registry::MqttRegistry;
use crate::stats::{PublishStats, PublishStatsTracker, QueueStats, QueueStatsTracker};
use crate::topics::{validate_topic_filter, validate_topic_name};
use crate::traits::{MessageHandler, MqttRecipient};

type ConnectResult = Result<(), SimClientError>;

pub struct SimClient {
    client: AsyncClient,
    client_id: String,
    broker: String,
    // event_loop is taken by connect(); None afterwards.
    event_loop: Mutex<Option<EventLoop>>,
    pub(crate) registry: Arc<RwLock<MqttRegistry>>,
    handlers: RwLock<HashMap<TypeId, Arc<ErasedHandler>>>,
    connect_hooks: RwLock<Vec<ConnectHook>>,
    publish_hooks: RwLock<Vec<PublishHook>>,
    // subscriptions are replayed on every CONNACK, so a reconnect
    // (or a clean session broker) never loses them.
    subscriptions: RwLock<Vec<(String, QoS)>>,
    queue_stats: QueueStatsTracker,
    publish_stats: PublishStatsTracker,
    connected: AtomicBool,
    shutdown: CancellationToken,
    // tasks holds [event loop, processor] once connected.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    settings: ClientSettings,
}

impl SimClient {
    // new builds the client without touching the network.
    pub fn new(
        host: &str,
        port: u16,
        client_id: &str,
        options: Option<ClientOptions>,
    ) -> Result<Arc<Self>, SimClientError> {
        // rumqttc panics on these, so reject them up front.
        if client_id.is_empty() || client_id.starts_with(char::is_whitespace) {
            return Err(SimClientError::InvalidClientId(client_id.to_string()));
        }

        let options = options.unwrap_or_default();
        let settings = ClientSettings::from(&options);

        let mut mqtt_options = MqttOptions::new(client_id, host, port);
        mqtt_options.set_keep_alive(options.keep_alive.unwrap_or(DEFAULT_KEEP_ALIVE));
        mqtt_options.set_clean_session(options.clean_session.unwrap_or(true));
        if let Some(credentials) = &options.credentials {
            mqtt_options.set_credentials(&credentials.username, &credentials.password);
        }
        if let Some(tls_config) = &options.tls_config {
            let client_auth = tls_config
                .client_identity
                .as_ref()
                .map(|identity| (identity.certificate.clone(), identity.private_key.clone()));
            mqtt_options.set_transport(Transport::tls(
                tls_config.ca_certificate.clone(),
                client_auth,
                None,
            ));
        }

        let capacity = options
            .message_channel_capacity
            .unwrap_or(DEFAULT_MESSAGE_CHANNEL_CAPACITY)
            .max(1);
        let (client, event_loop) = AsyncClient::new(mqtt_options, capacity);

        Ok(Arc::new(Self {
            client,
            client_id: client_id.to_string(),
            broker: format!("{host}:{port}"),
            event_loop: Mutex::new(Some(event_loop)),
            registry: Arc::new(RwLock::new(MqttRegistry::new())),
            handlers: RwLock::new(HashMap::new()),
            connect_hooks: RwLock::new(Vec::new()),
            publish_hooks: RwLock::new(Vec::new()),
            subscriptions: RwLock::new(Vec::new()),
            queue_stats: QueueStatsTracker::new(),
            publish_stats: PublishStatsTracker::new(),
            connected: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            settings,
        }))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn broker(&self) -> &str {
        &self.broker
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue_stats.to_stats()
    }

    pub fn publish_stats(&self) -> PublishStats {
        self.publish_stats.to_stats()
    }

    // connect starts the background tasks and waits for the first
    // CONNACK. It can only be called once per client.
    pub async fn connect(self: &Arc<Self>) -> Result<(), SimClientError> {
        let event_loop = self
            .event_loop
            .lock()
            .await
            .take()
            .ok_or(SimClientError::AlreadyConnected)?;

        info!(
            "Connecting to MQTT broker {} as '{}'",
            self.broker, self.client_id
        );

        let (queue_tx, queue_rx) = mpsc::channel(self.settings.client_queue_size);
        let (ready_tx, ready_rx) = oneshot::channel::<ConnectResult>();

        let event_loop_task = tokio::spawn(Arc::clone(self).run_event_loop(
            event_loop, queue_tx, ready_tx,
        ));
        let processor_task = tokio::spawn(Arc::clone(self).run_message_processor(queue_rx));
        self.tasks
            .lock()
            .await
            .extend([event_loop_task, processor_task]);

        match tokio::time::timeout(self.settings.connect_timeout, ready_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SimClientError::event_loop_error(
                "event loop exited before the broker answered",
            )),
            Err(_) => {
                self.shutdown.cancel();
                Err(SimClientError::ConnectTimeout(self.settings.connect_timeout))
            }
        }
    }

    // disconnect sends DISCONNECT after everything already queued,
    // then waits for both background tasks to finish.
    pub async fn disconnect(&self) -> Result<(), SimClientError> {
        let timeout = self.settings.disconnect_timeout;
        match tokio::time::timeout(timeout, self.client.disconnect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("DISCONNECT not sent (event loop already stopped?): {e}"),
            Err(_) => warn!("Timed out queueing DISCONNECT after {timeout:?}"),
        }

        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for mut task in tasks {
            if tokio::time::timeout(timeout, &mut task).await.is_err() {
                warn!("MQTT client task did not stop within {timeout:?}, cancelling");
                self.shutdown.cancel();
                if tokio::time::timeout(timeout, &mut task).await.is_err() {
                    task.abort();
                }
            }
        }
        self.shutdown.cancel();
        self.connected.store(false, Ordering::Release);
        info!("Disconnected from MQTT broker {}", self.broker);
        Ok(())
    }

    // subscribe remembers the filter and subscribes now if the client
    // is connected. Remembered filters are replayed on every CONNACK.
    pub async fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), SimClientError> {
        validate_topic_filter(filter)?;
        {
            let mut subscriptions = self.subscriptions.write().await;
            match subscriptions.iter_mut().find(|(f, _)| f == filter) {
                Some(existing) => existing.1 = qos,
                None => subscriptions.push((filter.to_string(), qos)),
            }
        }
        if self.is_connected() {
            self.client.subscribe(filter, qos).await?;
        }
        debug!("Subscribed to '{}' with {:?}", filter, qos);
        Ok(())
    }

    pub async fn subscriptions(&self) -> Vec<(String, QoS)> {
        self.subscriptions.read().await.clone()
    }

    // publish sends a raw payload with the client-wide QoS and retain.
    pub async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SimClientError> {
        self.publish_with(topic, payload, self.settings.qos, self.settings.retain)
            .await
    }

    pub async fn publish_with(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), SimClientError> {
        if let Err(e) = validate_topic_name(topic) {
            self.publish_stats.increment_failed();
            return Err(e);
        }

        let size = payload.len();
        match self.client.publish(topic, qos, retain, payload).await {
            Ok(()) => {
                self.publish_stats.increment_published(size);
                debug!("Queued {} byte publish to '{}'", size, topic);
                Ok(())
            }
            Err(e) => {
                self.publish_stats.increment_failed();
                Err(e.into())
            }
        }
    }

    // send_message serializes a registered type and publishes it to
    // the recipient's topic, honoring the type's publish overrides.
    pub async fn send_message<T, R>(&self, recipient: R, message: &T) -> Result<(), SimClientError>
    where
        T: Send + Sync + 'static,
        R: MqttRecipient,
    {
        let topic = recipient.to_mqtt_topic();
        let (payload, qos, retain) = {
            let registry = self.registry.read().await;
            let info = registry
                .get_type_info::<T>()
                .ok_or_else(|| SimClientError::unregistered_type(std::any::type_name::<T>()))?;
            let qos = info.effective_qos(self.settings.qos);
            let retain = info.effective_retain(self.settings.retain);
            (registry.serialize_message(message)?, qos, retain)
        };
        self.publish_with(&topic, payload, qos, retain).await
    }

    // on_message registers a closure for every message routed to T.
    pub async fn on_message<T, F, Fut>(&self, closure: F)
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<SimClient>, T, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register_handler::<T, _>(ClosureAdapter::new(closure))
            .await;
    }

    // register_handler installs the handler for T, replacing any
    // previous one.
    pub async fn register_handler<T, H>(&self, handler: H)
    where
        T: Send + Sync + 'static,
        H: MessageHandler<T> + 'static,
    {
        let handler = Arc::new(handler);
        let erased: ErasedHandler = Box::new(
            move |client: Arc<SimClient>, payload: Vec<u8>, topic: String| -> HandlerFuture {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let message = {
                        let registry = client.registry.read().await;
                        registry.deserialize_message::<T>(&payload)?
                    };
                    handler.handle(client, message, topic).await;
                    Ok::<(), SimClientError>(())
                })
            },
        );
        self.handlers
            .write()
            .await
            .insert(TypeId::of::<T>(), Arc::new(erased));
    }

    // on_connect registers a hook that runs for every CONNACK.
    pub async fn on_connect<F>(&self, hook: F)
    where
        F: Fn(&ConnAck) + Send + Sync + 'static,
    {
        self.connect_hooks.write().await.push(Box::new(hook));
    }

    // on_publish registers a hook that runs every time a PUBLISH is
    // written to the broker connection.
    pub async fn on_publish<F>(&self, hook: F)
    where
        F: Fn(u16) + Send + Sync + 'static,
    {
        self.publish_hooks.write().await.push(Box::new(hook));
    }

    async fn run_event_loop(
        self: Arc<Self>,
        mut event_loop: EventLoop,
        queue_tx: mpsc::Sender<ReceivedMessage>,
        ready_tx: oneshot::Sender<ConnectResult>,
    ) {
        let mut ready_tx = Some(ready_tx);
        loop {
            let event = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Event loop for '{}' cancelled", self.client_id);
                    break;
                }
                event = event_loop.poll() => event,
            };

            match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    self.handle_connack(&ack).await;
                    if let Some(ready) = ready_tx.take() {
                        let _ = ready.send(Ok(()));
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.enqueue_publish(&publish, &queue_tx).await;
                }
                Ok(Event::Outgoing(Outgoing::Publish(pkid))) => {
                    self.publish_stats.increment_written();
                    for hook in self.publish_hooks.read().await.iter() {
                        hook(pkid);
                    }
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    info!("Sent DISCONNECT to {}", self.broker);
                    break;
                }
                Ok(event) => {
                    debug!("MQTT event: {:?}", event);
                }
                Err(e) => {
                    self.connected.store(false, Ordering::Release);
                    self.queue_stats.increment_event_loop_errors();

                    let refused = match e {
                        ConnectionError::ConnectionRefused(code) => Some(code),
                        _ => None,
                    };
                    if let Some(code) = refused {
                        let ack = ConnAck {
                            session_present: false,
                            code,
                        };
                        self.run_connect_hooks(&ack).await;
                    }

                    // Failing before the first CONNACK is fatal; the
                    // caller of connect() gets the error.
                    if let Some(ready) = ready_tx.take() {
                        let err = match refused {
                            Some(code) => SimClientError::ConnectionRefused(code),
                            None => SimClientError::event_loop_error(e.to_string()),
                        };
                        error!("Failed to connect to MQTT broker {}: {}", self.broker, err);
                        let _ = ready.send(Err(err));
                        break;
                    }

                    warn!(
                        "MQTT connection to {} failed: {}. Reconnecting in {:?}",
                        self.broker, e, self.settings.reconnect_interval
                    );
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.settings.reconnect_interval) => {}
                    }
                }
            }
        }
        self.connected.store(false, Ordering::Release);
        debug!("Event loop for '{}' stopped", self.client_id);
    }

    async fn handle_connack(&self, ack: &ConnAck) {
        if ack.code == ConnectReturnCode::Success {
            self.connected.store(true, Ordering::Release);
            self.queue_stats.increment_connects();
            info!(
                "Connected to MQTT broker {} (session_present={})",
                self.broker, ack.session_present
            );
            self.resubscribe().await;
        }
        self.run_connect_hooks(ack).await;
    }

    async fn run_connect_hooks(&self, ack: &ConnAck) {
        for hook in self.connect_hooks.read().await.iter() {
            hook(ack);
        }
    }

    // resubscribe runs on the event loop task, so it must not wait
    // on the request channel the event loop itself drains.
    async fn resubscribe(&self) {
        for (filter, qos) in self.subscriptions.read().await.iter() {
            match self.client.try_subscribe(filter.as_str(), *qos) {
                Ok(()) => debug!("Subscribing to '{}' with {:?}", filter, qos),
                Err(e) => warn!("Failed to subscribe to '{}': {}", filter, e),
            }
        }
    }

    async fn enqueue_publish(&self, publish: &Publish, queue_tx: &mpsc::Sender<ReceivedMessage>) {
        let Some(message) = ReceivedMessage::from_publish(publish, &self.registry).await else {
            self.queue_stats.increment_unmatched_topics();
            if self.settings.warn_on_unmatched_topic {
                warn!(
                    "No registered message type for topic '{}', dropping {} bytes",
                    publish.topic,
                    publish.payload.len()
                );
            }
            return;
        };

        // Count before sending so the processor can never decrement
        // below zero.
        let size = message.payload_size;
        self.queue_stats.increment_pending(size);
        match queue_tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                self.queue_stats.decrement_pending_increment_dropped(size);
                warn!(
                    "Message queue full ({} slots), dropping message on '{}'",
                    self.settings.client_queue_size, message.topic
                );
            }
            Err(TrySendError::Closed(message)) => {
                self.queue_stats.decrement_pending_increment_failed(size);
                error!(
                    "Message processor is gone, dropping message on '{}'",
                    message.topic
                );
            }
        }
    }

    async fn run_message_processor(self: Arc<Self>, mut queue_rx: mpsc::Receiver<ReceivedMessage>) {
        let permits = self.settings.max_concurrency;
        let semaphore = Arc::new(Semaphore::new(permits));

        while let Some(message) = queue_rx.recv().await {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let client = Arc::clone(&self);
            tokio::spawn(async move {
                client.dispatch(message).await;
                drop(permit);
            });
        }

        // Wait for in-flight handlers before reporting the processor done.
        let _ = semaphore.acquire_many(permits as u32).await;
        debug!("Message processor for '{}' stopped", self.client_id);
    }

    async fn dispatch(self: Arc<Self>, message: ReceivedMessage) {
        let size = message.payload_size;
        let handler = self.handlers.read().await.get(&message.type_id).cloned();
        let Some(handler) = handler else {
            warn!(
                "No handler registered for '{}' (topic '{}')",
                message.type_name, message.topic
            );
            self.queue_stats.decrement_pending_increment_failed(size);
            return;
        };

        let topic = message.topic.clone();
        match handler(Arc::clone(&self), message.payload, message.topic).await {
            Ok(()) => self.queue_stats.decrement_pending_increment_processed(size),
            Err(e) => {
                warn!("Failed to handle message on '{}': {}", topic, e);
                self.queue_stats.decrement_pending_increment_failed(size);
            }
        }
    }
}
