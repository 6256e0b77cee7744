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

// src/client/options.rs
// Configuration options for the SimClient.
use std::time::Duration;

use rumqttc::QoS;

use crate::registry::types::PublishOptions;

// Keep-alive used by the simulated devices, matching what the
// original test rig asked the broker for.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);
pub const DEFAULT_MESSAGE_CHANNEL_CAPACITY: usize = 10;
pub const DEFAULT_CLIENT_QUEUE_SIZE: usize = 1024;
pub const DEFAULT_QOS: QoS = QoS::AtMostOnce;
pub const DEFAULT_RETAIN: bool = false;
pub const DEFAULT_MAX_CONCURRENCY: usize = 1;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ClientOptions are optional parameters that can be passed to the
// client. Anything left as None falls back to the DEFAULT_* consts.
#[derive(Clone, Debug, Default)]
pub struct ClientOptions {
    // keep_alive is the MQTT keep-alive interval sent in CONNECT.
    pub keep_alive: Option<Duration>,
    // message_channel_capacity is the number of requests the
    // rumqttc AsyncClient buffers before publish() starts waiting.
    pub message_channel_capacity: Option<usize>,
    // publish_options are the client-wide QoS / retain defaults.
    pub publish_options: Option<PublishOptions>,
    // client_queue_size bounds the local queue between the event
    // loop and message processing. Messages beyond it are dropped.
    pub client_queue_size: Option<usize>,
    // warn_on_unmatched_topic logs a warning for every message whose
    // topic matches no registered filter. Defaults to true.
    pub warn_on_unmatched_topic: Option<bool>,
    pub credentials: Option<ClientCredentials>,
    pub tls_config: Option<ClientTlsConfig>,
    // max_concurrency is how many messages are handled at once.
    // 1 (the default) keeps handlers in arrival order.
    pub max_concurrency: Option<usize>,
    pub clean_session: Option<bool>,
    // connect_timeout bounds how long connect() waits for the
    // first CONNACK.
    pub connect_timeout: Option<Duration>,
    // reconnect_interval is the pause between reconnect attempts
    // after the connection drops.
    pub reconnect_interval: Option<Duration>,
    // disconnect_timeout bounds how long disconnect() waits for
    // the event loop to flush and exit.
    pub disconnect_timeout: Option<Duration>,
}

impl ClientOptions {
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    pub fn with_message_channel_capacity(mut self, capacity: usize) -> Self {
        self.message_channel_capacity = Some(capacity);
        self
    }

    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.publish_options = Some(self.publish_options.unwrap_or_default().with_qos(qos));
        self
    }

    pub fn with_retain(mut self, retain: bool) -> Self {
        self.publish_options = Some(self.publish_options.unwrap_or_default().with_retain(retain));
        self
    }

    pub fn with_client_queue_size(mut self, size: usize) -> Self {
        self.client_queue_size = Some(size);
        self
    }

    pub fn with_warn_on_unmatched_topic(mut self, warn: bool) -> Self {
        self.warn_on_unmatched_topic = Some(warn);
        self
    }

    pub fn with_credentials(mut self, credentials: ClientCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_tls_config(mut self, tls_config: ClientTlsConfig) -> Self {
        self.tls_config = Some(tls_config);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    pub fn with_clean_session(mut self, clean_session: bool) -> Self {
        self.clean_session = Some(clean_session);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = Some(interval);
        self
    }

    pub fn with_disconnect_timeout(mut self, timeout: Duration) -> Self {
        self.disconnect_timeout = Some(timeout);
        self
    }
}

// ClientCredentials are the username and password sent in CONNECT.
#[derive(Clone, Debug)]
pub struct ClientCredentials {
    pub username: String,
    pub password: String,
}

// ClientTlsConfig switches the transport from plain TCP to TLS.
#[derive(Clone, Debug)]
pub struct ClientTlsConfig {
    // ca_certificate is PEM bytes for the CA (or bundle) used to
    // verify the broker.
    pub ca_certificate: Vec<u8>,
    // client_identity enables mTLS when set.
    pub client_identity: Option<ClientTlsIdentity>,
}

#[derive(Clone, Debug)]
pub struct ClientTlsIdentity {
    // certificate is PEM bytes for the client certificate.
    pub certificate: Vec<u8>,
    // private_key is PEM bytes for the matching key.
    pub private_key: Vec<u8>,
}

// ClientSettings are ClientOptions with every default resolved.
#[derive(Clone, Debug)]
pub(crate) struct ClientSettings {
    pub qos: QoS,
    pub retain: bool,
    pub client_queue_size: usize,
    pub warn_on_unmatched_topic: bool,
    pub max_concurrency: usize,
    pub connect_timeout: Duration,
    pub reconnect_interval: Duration,
    pub disconnect_timeout: Duration,
}

impl From<&ClientOptions> for ClientSettings {
    fn from(options: &ClientOptions) -> Self {
        let publish_options = options.publish_options.unwrap_or_default();
        Self {
            qos: publish_options.qos.unwrap_or(DEFAULT_QOS),
            retain: publish_options.retain.unwrap_or(DEFAULT_RETAIN),
            client_queue_size: options
                .client_queue_size
                .unwrap_or(DEFAULT_CLIENT_QUEUE_SIZE)
                .max(1),
            warn_on_unmatched_topic: options.warn_on_unmatched_topic.unwrap_or(true),
            max_concurrency: options
                .max_concurrency
                .unwrap_or(DEFAULT_MAX_CONCURRENCY)
                .max(1),
            connect_timeout: options.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            reconnect_interval: options
                .reconnect_interval
                .unwrap_or(DEFAULT_RECONNECT_INTERVAL),
            disconnect_timeout: options
                .disconnect_timeout
                .unwrap_or(DEFAULT_DISCONNECT_TIMEOUT),
        }
    }
}
