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

use std::default::Default;
use std::path::{Path, PathBuf};
use std::time::Duration;

use devsim_mqtt::QoS;
use devsim_mqtt::client::{ClientCredentials, ClientOptions, ClientTlsConfig, ClientTlsIdentity};
use devsim_mqtt::topics::{validate_topic_filter, validate_topic_name};
use duration_str::{deserialize_duration, deserialize_option_duration};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
/// Configuration for devsim. Fields are documented as comments in the output of [`Config::into_annotated_config_file`].
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub subscriber: SubscriberConfig,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BrokerConfig {
    #[serde(default = "Defaults::host")]
    pub host: String,
    #[serde(default = "Defaults::port")]
    pub port: u16,
    #[serde(
        default = "Defaults::keep_alive",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub keep_alive: Duration,
    #[serde(
        default = "Defaults::connect_timeout",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub connect_timeout: Duration,
    #[serde(
        default = "Defaults::reconnect_interval",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub reconnect_interval: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TlsConfig {
    pub ca_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key_path: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PublisherConfig {
    #[serde(default = "Defaults::publisher_client_id")]
    pub client_id: String,
    #[serde(default = "Defaults::topic")]
    pub topic: String,
    #[serde(default = "Defaults::device_name")]
    pub device_name: String,
    #[serde(default = "Defaults::message_count")]
    pub message_count: u32,
    #[serde(default = "Defaults::min_delay_secs")]
    pub min_delay_secs: u64,
    #[serde(default = "Defaults::max_delay_secs")]
    pub max_delay_secs: u64,
    #[serde(default)]
    pub qos: u8,
    #[serde(default)]
    pub retain: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SubscriberConfig {
    /// Generated per run when unset, see [`generate_client_id`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default = "Defaults::topics")]
    pub topics: Vec<String>,
    #[serde(default)]
    pub qos: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_messages: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_duration",
        deserialize_with = "deserialize_option_duration"
    )]
    pub stats_interval: Option<Duration>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = std::fs::read_to_string(path).map_err(|error| ConfigError::CouldNotRead {
            path: path.to_string_lossy().to_string(),
            error,
        })?;
        toml::from_str::<Self>(&cfg).map_err(|error| ConfigError::InvalidToml {
            path: path.to_string_lossy().to_string(),
            error,
        })
    }

    // validate checks everything serde can't, so bad values are
    // reported before any connection is attempted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Self {
            broker,
            publisher,
            subscriber,
        } = self;

        if broker.host.is_empty() {
            return Err(ConfigError::invalid("broker.host", "must not be empty"));
        }
        if broker.port == 0 {
            return Err(ConfigError::invalid("broker.port", "must not be 0"));
        }
        if !broker.keep_alive.is_zero() && broker.keep_alive < Duration::from_secs(1) {
            return Err(ConfigError::invalid(
                "broker.keep_alive",
                "must be 0 (disabled) or at least 1s",
            ));
        }
        if broker.password.is_some() && broker.username.is_none() {
            return Err(ConfigError::invalid(
                "broker.password",
                "requires broker.username",
            ));
        }
        if let Some(tls) = &broker.tls {
            if tls.client_cert_path.is_some() != tls.client_key_path.is_some() {
                return Err(ConfigError::invalid(
                    "broker.tls",
                    "client_cert_path and client_key_path must be set together",
                ));
            }
        }

        validate_client_id("publisher.client_id", &publisher.client_id)?;
        validate_topic_name(&publisher.topic)
            .map_err(|e| ConfigError::invalid("publisher.topic", e.to_string()))?;
        if publisher.min_delay_secs > publisher.max_delay_secs {
            return Err(ConfigError::invalid(
                "publisher.min_delay_secs",
                format!(
                    "{} is greater than publisher.max_delay_secs ({})",
                    publisher.min_delay_secs, publisher.max_delay_secs
                ),
            ));
        }
        qos_from_level(publisher.qos)
            .map_err(|reason| ConfigError::invalid("publisher.qos", reason))?;

        if let Some(client_id) = &subscriber.client_id {
            validate_client_id("subscriber.client_id", client_id)?;
        }
        if subscriber.topics.is_empty() {
            return Err(ConfigError::invalid(
                "subscriber.topics",
                "at least one topic filter is required",
            ));
        }
        for topic in &subscriber.topics {
            validate_topic_filter(topic)
                .map_err(|e| ConfigError::invalid("subscriber.topics", e.to_string()))?;
        }
        self.subscriber_qos()?;
        if subscriber.max_messages == Some(0) {
            return Err(ConfigError::invalid(
                "subscriber.max_messages",
                "must be at least 1 when set",
            ));
        }
        if subscriber.stats_interval.is_some_and(|i| i.is_zero()) {
            return Err(ConfigError::invalid(
                "subscriber.stats_interval",
                "must be greater than 0 when set",
            ));
        }
        Ok(())
    }

    /// Client options for the publisher: broker settings plus the
    /// publisher's QoS and retain flag.
    pub fn publisher_client_options(&self) -> Result<ClientOptions, ConfigError> {
        let qos = qos_from_level(self.publisher.qos)
            .map_err(|reason| ConfigError::invalid("publisher.qos", reason))?;
        Ok(self
            .broker
            .client_options()?
            .with_qos(qos)
            .with_retain(self.publisher.retain))
    }

    /// QoS requested for every subscriber filter.
    pub fn subscriber_qos(&self) -> Result<QoS, ConfigError> {
        qos_from_level(self.subscriber.qos)
            .map_err(|reason| ConfigError::invalid("subscriber.qos", reason))
    }

    pub fn subscriber_client_options(&self) -> Result<ClientOptions, ConfigError> {
        self.broker.client_options()
    }

    pub fn into_annotated_config_file(self) -> String {
        let Self {
            broker,
            publisher,
            subscriber,
        } = self;
        let BrokerConfig {
            host,
            port,
            keep_alive,
            connect_timeout,
            reconnect_interval,
            username: _,
            password: _,
            tls: _,
        } = broker;
        let PublisherConfig {
            client_id: publisher_client_id,
            topic,
            device_name,
            message_count,
            min_delay_secs,
            max_delay_secs,
            qos: publisher_qos,
            retain,
        } = publisher;
        let SubscriberConfig {
            client_id: _,
            topics,
            qos: subscriber_qos,
            max_messages: _,
            stats_interval: _,
        } = subscriber;
        let keep_alive = format!("{}s", keep_alive.as_secs());
        let connect_timeout = format!("{}s", connect_timeout.as_secs());
        let reconnect_interval = format!("{}s", reconnect_interval.as_secs());

        format!(
            r##"
#####
## This is a default config file for devsim. Everything in this file is optional: Any
## non-comment line in this file simply represents default values. Commented lines with a single `#`
## represent examples for optional configuration which is not part of the default config.
#####

[broker]
## MQTT broker to connect to (plain TCP unless [broker.tls] is set)
host = {host:?}
port = {port}

## Keep-alive interval sent in CONNECT. "0s" disables keep-alive pings.
keep_alive = {keep_alive:?}

## How long to wait for the broker's CONNACK on startup
connect_timeout = {connect_timeout:?}

## How long to wait between reconnect attempts after an established connection drops
reconnect_interval = {reconnect_interval:?}

## Optional: credentials sent in CONNECT
# username = "devsim"
# password = "secret"

## Optional: connect over TLS. client_cert_path/client_key_path enable mutual TLS and must be set
## together.
# [broker.tls]
# ca_path = "/etc/devsim/ca.crt"
# client_cert_path = "/etc/devsim/client.crt"
# client_key_path = "/etc/devsim/client.key"

[publisher]
## Client id of the simulated device
client_id = {publisher_client_id:?}

## Topic every reading is published to
topic = {topic:?}

## Device name used in payloads ("<device_name> : Data <i>")
device_name = {device_name:?}

## How many readings to publish before stopping
message_count = {message_count}

## Each reading is preceded by a random delay of min_delay_secs..=max_delay_secs whole seconds
min_delay_secs = {min_delay_secs}
max_delay_secs = {max_delay_secs}

## MQTT QoS level (0, 1 or 2) and retain flag for published readings
qos = {publisher_qos}
retain = {retain}

[subscriber]
## Optional: fixed client id. By default a random "devsim-sub-<hex>" id is generated per run.
# client_id = "devsim-sub"

## Topic filters to subscribe to. MQTT wildcards ("+", "#") are allowed.
topics = {topics:?}

## MQTT QoS level (0, 1 or 2) requested for the subscriptions
qos = {subscriber_qos}

## Optional: exit after this many messages have been printed
# max_messages = 20

## Optional: log received/pending/dropped counts at this interval (only when they change)
# stats_interval = "10s"
"##
        )
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: Defaults::host(),
            port: Defaults::port(),
            keep_alive: Defaults::keep_alive(),
            connect_timeout: Defaults::connect_timeout(),
            reconnect_interval: Defaults::reconnect_interval(),
            username: None,
            password: None,
            tls: None,
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            client_id: Defaults::publisher_client_id(),
            topic: Defaults::topic(),
            device_name: Defaults::device_name(),
            message_count: Defaults::message_count(),
            min_delay_secs: Defaults::min_delay_secs(),
            max_delay_secs: Defaults::max_delay_secs(),
            qos: 0,
            retain: false,
        }
    }
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            topics: Defaults::topics(),
            qos: 0,
            max_messages: None,
            stats_interval: None,
        }
    }
}

impl BrokerConfig {
    // client_options reads any TLS material from disk, so it can fail.
    pub fn client_options(&self) -> Result<ClientOptions, ConfigError> {
        let mut options = ClientOptions::default()
            .with_keep_alive(self.keep_alive)
            .with_connect_timeout(self.connect_timeout)
            .with_reconnect_interval(self.reconnect_interval);

        if let Some(username) = &self.username {
            options = options.with_credentials(ClientCredentials {
                username: username.clone(),
                password: self.password.clone().unwrap_or_default(),
            });
        }

        if let Some(tls) = &self.tls {
            let client_identity = match (&tls.client_cert_path, &tls.client_key_path) {
                (Some(cert), Some(key)) => Some(ClientTlsIdentity {
                    certificate: read_tls_file(cert)?,
                    private_key: read_tls_file(key)?,
                }),
                (None, None) => None,
                _ => {
                    return Err(ConfigError::invalid(
                        "broker.tls",
                        "client_cert_path and client_key_path must be set together",
                    ));
                }
            };
            options = options.with_tls_config(ClientTlsConfig {
                ca_certificate: read_tls_file(&tls.ca_path)?,
                client_identity,
            });
        }

        Ok(options)
    }
}

pub struct Defaults;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file at {path}: {error}")]
    CouldNotRead { path: String, error: std::io::Error },
    #[error("TOML error reading config file at {path}: {error}")]
    InvalidToml {
        path: String,
        error: toml::de::Error,
    },
    #[error("Could not read TLS file at {path}: {error}")]
    CouldNotReadTlsFile { path: String, error: std::io::Error },
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl Defaults {
    pub fn host() -> String {
        "localhost".to_string()
    }

    pub fn port() -> u16 {
        1883
    }

    pub fn keep_alive() -> Duration {
        Duration::from_secs(60)
    }

    pub fn connect_timeout() -> Duration {
        Duration::from_secs(10)
    }

    pub fn reconnect_interval() -> Duration {
        Duration::from_secs(5)
    }

    pub fn publisher_client_id() -> String {
        "admin".to_string()
    }

    pub fn topic() -> String {
        "data".to_string()
    }

    pub fn device_name() -> String {
        "Device 1".to_string()
    }

    pub fn message_count() -> u32 {
        20
    }

    pub fn min_delay_secs() -> u64 {
        1
    }

    pub fn max_delay_secs() -> u64 {
        5
    }

    pub fn topics() -> Vec<String> {
        vec![Self::topic()]
    }
}

/// Maps an MQTT QoS level number to [`QoS`].
pub fn qos_from_level(level: u8) -> Result<QoS, String> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(format!("QoS must be 0, 1 or 2, got {other}")),
    }
}

/// Random subscriber client id, "devsim-sub-" followed by 8 hex digits.
pub fn generate_client_id() -> String {
    format!("devsim-sub-{}", hex::encode(rand::random::<[u8; 4]>()))
}

fn validate_client_id(field: &'static str, client_id: &str) -> Result<(), ConfigError> {
    if client_id.is_empty() || client_id.starts_with(char::is_whitespace) {
        return Err(ConfigError::invalid(
            field,
            format!("{client_id:?} is not a usable MQTT client id"),
        ));
    }
    Ok(())
}

fn read_tls_file(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|error| ConfigError::CouldNotReadTlsFile {
        path: path.to_string_lossy().to_string(),
        error,
    })
}

fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{}s", d.as_secs()))
}

fn serialize_option_duration<S>(d: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match d {
        Some(d) => serialize_duration(d, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use indoc::indoc;

    use super::*;

    #[test]
    fn test_default_file_is_actually_default() {
        let default_toml: Config = toml::from_str(&Config::default().into_annotated_config_file())
            .expect("default toml didn't parse");
        assert_eq!(default_toml, Config::default());
    }

    #[test]
    fn test_default_file_documents_every_section() {
        let file = Config::default().into_annotated_config_file();
        for needle in [
            "[broker]",
            "[publisher]",
            "[subscriber]",
            r##"MQTT wildcards ("+", "#") are allowed."##,
            "# stats_interval = \"10s\"",
        ] {
            assert!(file.contains(needle), "missing {needle:?} in:\n{file}");
        }
    }

    #[test]
    fn test_empty_config_file_is_default() {
        let empty_config: Config = toml::from_str("").expect("empty toml didn't parse");
        assert_eq!(empty_config, Config::default());
    }

    #[test]
    fn test_default_file_parses() {
        let default = Config::default();
        let default_toml = toml::to_string(&default).expect("default toml didn't serialize");
        let roundtripped =
            toml::from_str::<Config>(&default_toml).expect("default toml didn't parse");
        assert_eq!(default, roundtripped);
    }

    #[test]
    fn test_defaults_match_device_simulation() {
        let config = Config::default();
        assert_eq!(config.broker.host, "localhost");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.keep_alive, Duration::from_secs(60));
        assert_eq!(config.publisher.client_id, "admin");
        assert_eq!(config.publisher.topic, "data");
        assert_eq!(config.publisher.device_name, "Device 1");
        assert_eq!(config.publisher.message_count, 20);
        assert_eq!(
            (config.publisher.min_delay_secs, config.publisher.max_delay_secs),
            (1, 5)
        );
        assert_eq!(config.subscriber.topics, vec!["data".to_string()]);
        assert_eq!(config.subscriber.client_id, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let partial_config = indoc! {r#"
        [broker]
        host = "broker.internal"
        keep_alive = "30s"

        [publisher]
        message_count = 3

        [subscriber]
        topics = ["data", "devices/+/data"]
        stats_interval = "10s"
        "#};

        let config = toml::from_str::<Config>(partial_config).expect("Couldn't parse config toml");
        assert_eq!(config.broker.host, "broker.internal");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.keep_alive, Duration::from_secs(30));
        assert_eq!(config.publisher.message_count, 3);
        assert_eq!(config.publisher.client_id, "admin");
        assert_eq!(config.subscriber.topics.len(), 2);
        assert_eq!(
            config.subscriber.stats_interval,
            Some(Duration::from_secs(10))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[publisher]\ndevice_name = \"Device 7\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.publisher.device_name, "Device 7");
    }

    #[test]
    fn test_load_errors() {
        let err = Config::load(Path::new("/nonexistent/devsim.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::CouldNotRead { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[publisher]\nmessage_count = \"many\"").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidToml { .. }));
    }

    #[test]
    fn test_validation_failures() {
        let cases: [(&str, fn(&mut Config)); 10] = [
            ("publisher.min_delay_secs", |c| {
                c.publisher.min_delay_secs = 6
            }),
            ("publisher.topic", |c| c.publisher.topic = "data/#".into()),
            ("publisher.client_id", |c| c.publisher.client_id = "".into()),
            ("publisher.qos", |c| c.publisher.qos = 3),
            ("subscriber.topics", |c| c.subscriber.topics.clear()),
            ("subscriber.topics", |c| {
                c.subscriber.topics = vec!["data/#/x".into()]
            }),
            ("subscriber.max_messages", |c| {
                c.subscriber.max_messages = Some(0)
            }),
            ("broker.keep_alive", |c| {
                c.broker.keep_alive = Duration::from_millis(500)
            }),
            ("broker.port", |c| c.broker.port = 0),
            ("broker.password", |c| {
                c.broker.password = Some("secret".into())
            }),
        ];

        for (expected_field, mutate) in cases {
            let mut config = Config::default();
            mutate(&mut config);
            match config.validate() {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected_field),
                other => panic!("expected {expected_field} to be invalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_zero_keep_alive_is_allowed() {
        let mut config = Config::default();
        config.broker.keep_alive = Duration::ZERO;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tls_files_are_read() {
        let mut ca = tempfile::NamedTempFile::new().unwrap();
        write!(ca, "-----BEGIN CERTIFICATE-----").unwrap();

        let mut config = Config::default();
        config.broker.tls = Some(TlsConfig {
            ca_path: ca.path().to_path_buf(),
            client_cert_path: None,
            client_key_path: None,
        });
        let options = config.subscriber_client_options().unwrap();
        let tls = options.tls_config.unwrap();
        assert_eq!(tls.ca_certificate, b"-----BEGIN CERTIFICATE-----");
        assert!(tls.client_identity.is_none());

        config.broker.tls = Some(TlsConfig {
            ca_path: "/nonexistent/ca.crt".into(),
            client_cert_path: None,
            client_key_path: None,
        });
        assert!(matches!(
            config.subscriber_client_options(),
            Err(ConfigError::CouldNotReadTlsFile { .. })
        ));
    }

    #[test]
    fn test_publisher_options_carry_qos_and_credentials() {
        let mut config = Config::default();
        config.publisher.qos = 1;
        config.publisher.retain = true;
        config.broker.username = Some("devsim".into());

        let options = config.publisher_client_options().unwrap();
        let publish_options = options.publish_options.unwrap();
        assert_eq!(publish_options.qos, Some(QoS::AtLeastOnce));
        assert_eq!(publish_options.retain, Some(true));
        assert_eq!(options.credentials.unwrap().password, "");
        assert_eq!(options.keep_alive, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_generated_client_ids() {
        let id = generate_client_id();
        assert!(id.starts_with("devsim-sub-"));
        assert_eq!(id.len(), "devsim-sub-".len() + 8);
        assert_ne!(generate_client_id(), generate_client_id());
    }
}
