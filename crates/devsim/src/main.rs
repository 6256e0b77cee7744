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

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use devsim::config::{Config, ConfigError, Defaults};
use devsim::logging::{LogFormat, setup_logging};
use devsim::output::StdoutSink;
use devsim::{publisher, subscriber};
use eyre::WrapErr;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "multi_thread")]
pub async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.debug, cli.log_format).wrap_err("failed to initialize logging")?;

    match cli.command {
        Command::Publish(publish_command) => {
            let config: Config = (*publish_command).try_into()?;
            config.validate()?;
            let options = config.publisher_client_options()?;
            let (summary, _stats) =
                publisher::run(&config, options, Arc::new(StdoutSink), shutdown_on_ctrl_c())
                    .await
                    .wrap_err_with(|| {
                        format!(
                            "publisher failed (broker {}:{})",
                            config.broker.host, config.broker.port
                        )
                    })?;
            if summary.failed > 0 {
                tracing::warn!(
                    "{} of {} readings failed to publish",
                    summary.failed,
                    summary.attempted
                );
            }
        }
        Command::Subscribe(subscribe_command) => {
            let config: Config = (*subscribe_command).try_into()?;
            config.validate()?;
            let options = config.subscriber_client_options()?;
            subscriber::run(&config, options, Arc::new(StdoutSink), shutdown_on_ctrl_c())
                .await
                .wrap_err_with(|| {
                    format!(
                        "subscriber failed (broker {}:{})",
                        config.broker.host, config.broker.port
                    )
                })?;
        }
        Command::DefaultConfig => {
            print!("{}", Config::default().into_annotated_config_file())
        }
    }

    Ok(())
}

// shutdown_on_ctrl_c returns a token that is cancelled on the first SIGINT.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
            Err(e) => tracing::warn!("Failed to listen for Ctrl-C: {e}"),
        }
        token.cancel();
    });
    shutdown
}

#[derive(clap::Parser, Debug)]
#[clap(about = "Simulated MQTT device and subscriber")]
struct Cli {
    #[clap(long, short, help = "Turn on debug logging (same as RUST_LOG=debug)")]
    debug: bool,
    #[clap(long, value_enum, default_value_t = LogFormat::Compact, help = "Log output format")]
    log_format: LogFormat,
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Parser, Debug)]
enum Command {
    #[clap(about = "Publish simulated device readings")]
    Publish(Box<PublishCommand>),
    #[clap(about = "Print every message received on the subscribed topics")]
    Subscribe(Box<SubscribeCommand>),
    #[clap(about = "Output a default TOML config file for use with -c")]
    DefaultConfig,
}

#[derive(clap::Args, Debug)]
struct BrokerArgs {
    #[clap(long, short, help = "Path to TOML configuration file")]
    config: Option<PathBuf>,
    #[clap(long, env = "DEVSIM_MQTT_HOST", help = format!("Broker host, overriding configuration file (default {})", Defaults::host()))]
    host: Option<String>,
    #[clap(long, short, env = "DEVSIM_MQTT_PORT", help = format!("Broker port, overriding configuration file (default {})", Defaults::port()))]
    port: Option<u16>,
    #[clap(long, help = "MQTT client id, overriding configuration file")]
    client_id: Option<String>,
    #[clap(long, help = "MQTT QoS level (0, 1 or 2)")]
    qos: Option<u8>,
}

#[derive(clap::Parser, Debug)]
struct PublishCommand {
    #[clap(flatten)]
    broker: BrokerArgs,
    #[clap(long, short, help = format!("Topic to publish to (default {:?})", Defaults::topic()))]
    topic: Option<String>,
    #[clap(long, help = format!("Device name used in payloads (default {:?})", Defaults::device_name()))]
    device: Option<String>,
    #[clap(long, short = 'n', help = format!("Number of readings to publish (default {})", Defaults::message_count()))]
    count: Option<u32>,
    #[clap(long, help = "Minimum delay before each reading, in seconds")]
    min_delay: Option<u64>,
    #[clap(long, help = "Maximum delay before each reading, in seconds")]
    max_delay: Option<u64>,
    #[clap(long, action, help = "Set the retain flag on published readings")]
    retain: bool,
}

#[derive(clap::Parser, Debug)]
struct SubscribeCommand {
    #[clap(flatten)]
    broker: BrokerArgs,
    #[clap(
        long,
        short,
        help = "Topic filter to subscribe to (repeatable, replaces the configured list)"
    )]
    topic: Vec<String>,
    #[clap(long, help = "Keep-alive interval in seconds (0 disables)")]
    keep_alive: Option<u64>,
    #[clap(long, short = 'n', help = "Exit after printing this many messages")]
    max_messages: Option<u64>,
    #[clap(long, help = "Log queue statistics at this interval, e.g. \"10s\"")]
    stats_interval: Option<String>,
}

impl BrokerArgs {
    fn load(&self) -> Result<Config, CliError> {
        let mut config = if let Some(config_path) = &self.config {
            Config::load(config_path)?
        } else {
            Config::default()
        };
        if let Some(host) = &self.host {
            config.broker.host = host.clone();
        }
        if let Some(port) = self.port {
            config.broker.port = port;
        }
        Ok(config)
    }
}

impl TryInto<Config> for PublishCommand {
    type Error = CliError;

    // Load the config file, or the default, allowing CLI flags to override the corresponding settings.
    fn try_into(self) -> Result<Config, Self::Error> {
        let mut config = self.broker.load()?;
        let publisher = &mut config.publisher;

        if let Some(client_id) = self.broker.client_id {
            publisher.client_id = client_id;
        }
        if let Some(qos) = self.broker.qos {
            publisher.qos = qos;
        }
        if let Some(topic) = self.topic {
            publisher.topic = topic;
        }
        if let Some(device) = self.device {
            publisher.device_name = device;
        }
        if let Some(count) = self.count {
            publisher.message_count = count;
        }
        if let Some(min_delay) = self.min_delay {
            publisher.min_delay_secs = min_delay;
        }
        if let Some(max_delay) = self.max_delay {
            publisher.max_delay_secs = max_delay;
        }
        if self.retain {
            publisher.retain = true;
        }

        Ok(config)
    }
}

impl TryInto<Config> for SubscribeCommand {
    type Error = CliError;

    fn try_into(self) -> Result<Config, Self::Error> {
        let mut config = self.broker.load()?;

        if let Some(keep_alive) = self.keep_alive {
            config.broker.keep_alive = Duration::from_secs(keep_alive);
        }

        let subscriber = &mut config.subscriber;
        if let Some(client_id) = self.broker.client_id {
            subscriber.client_id = Some(client_id);
        }
        if let Some(qos) = self.broker.qos {
            subscriber.qos = qos;
        }
        if !self.topic.is_empty() {
            subscriber.topics = self.topic;
        }
        if let Some(max_messages) = self.max_messages {
            subscriber.max_messages = Some(max_messages);
        }
        if let Some(stats_interval) = self.stats_interval {
            let interval = duration_str::parse(&stats_interval).map_err(|error| {
                CliError::InvalidDuration {
                    value: stats_interval.clone(),
                    error: error.to_string(),
                }
            })?;
            subscriber.stats_interval = Some(interval);
        }

        Ok(config)
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("Invalid duration {value:?}: {error}")]
    InvalidDuration { value: String, error: String },
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
