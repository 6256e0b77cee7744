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

// subscriber connects with a (by default random) client id, subscribes to
// the configured filters on every CONNACK and prints each payload it
// receives on its own line.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use devsim_mqtt::client::ClientOptions;
use devsim_mqtt::{ConnectReturnCode, QueueStats, SimClient, SimClientError, StringMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError, generate_client_id};
use crate::output::LineSink;

#[derive(thiserror::Error, Debug)]
pub enum SubscriberError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Client(#[from] SimClientError),
}

/// The numeric MQTT 3.1.1 CONNACK return code.
pub fn return_code_value(code: ConnectReturnCode) -> u8 {
    match code {
        ConnectReturnCode::Success => 0,
        ConnectReturnCode::RefusedProtocolVersion => 1,
        ConnectReturnCode::BadClientId => 2,
        ConnectReturnCode::ServiceUnavailable => 3,
        ConnectReturnCode::BadUserNamePassword => 4,
        ConnectReturnCode::NotAuthorized => 5,
    }
}

pub fn connect_banner(code: ConnectReturnCode) -> String {
    format!("Connected with result code {}", return_code_value(code))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubscribeSummary {
    pub client_id: String,
    pub printed: u64,
    pub queue_stats: QueueStats,
}

/// Prints every message received on the configured filters until
/// `shutdown` fires or `max_messages` have been printed.
pub async fn run(
    config: &Config,
    options: ClientOptions,
    out: Arc<dyn LineSink>,
    shutdown: CancellationToken,
) -> Result<SubscribeSummary, SubscriberError> {
    let subscriber = &config.subscriber;
    let qos = config.subscriber_qos()?;
    let client_id = subscriber
        .client_id
        .clone()
        .unwrap_or_else(generate_client_id);

    let client = SimClient::new(
        &config.broker.host,
        config.broker.port,
        &client_id,
        Some(options),
    )?;

    client
        .register_string_message(subscriber.topics.clone())
        .await?;
    for topic in &subscriber.topics {
        client.subscribe(topic, qos).await?;
    }

    let banner_out = Arc::clone(&out);
    client
        .on_connect(move |ack| banner_out.write_line(&connect_banner(ack.code)))
        .await;

    // stop is cancelled by shutdown, or by the handler once
    // max_messages have been printed.
    let stop = shutdown.child_token();
    let printed = Arc::new(AtomicU64::new(0));
    {
        let out = Arc::clone(&out);
        let printed = Arc::clone(&printed);
        let stop = stop.clone();
        let max_messages = subscriber.max_messages;
        let received = Arc::new(AtomicU64::new(0));
        client
            .on_message(move |_client, message: StringMessage, topic| {
                let out = Arc::clone(&out);
                let printed = Arc::clone(&printed);
                let received = Arc::clone(&received);
                let stop = stop.clone();
                async move {
                    // Messages already queued when the limit is hit are
                    // drained by disconnect() but not printed.
                    let seen = received.fetch_add(1, Ordering::Relaxed) + 1;
                    if max_messages.is_some_and(|max| seen > max) {
                        debug!("Skipping message on '{}' past max_messages", topic);
                        return;
                    }
                    out.write_line(message.as_str());
                    printed.fetch_add(1, Ordering::Relaxed);
                    if max_messages.is_some_and(|max| seen >= max) {
                        stop.cancel();
                    }
                }
            })
            .await;
    }

    client.connect().await?;
    info!(
        "Subscribed to {:?} on {} as '{}'",
        subscriber.topics,
        client.broker(),
        client_id
    );

    if let Some(interval) = subscriber.stats_interval {
        tokio::spawn(report_stats(Arc::clone(&client), interval, stop.clone()));
    }

    stop.cancelled().await;
    if let Err(e) = client.disconnect().await {
        warn!("Failed to disconnect cleanly: {e}");
    }

    let queue_stats = client.queue_stats();
    info!(
        received = queue_stats.total_processed,
        failed = queue_stats.total_failed,
        dropped = queue_stats.total_dropped,
        unmatched = queue_stats.total_unmatched_topics,
        connects = queue_stats.total_connects,
        "Subscriber finished"
    );
    Ok(SubscribeSummary {
        client_id,
        printed: printed.load(Ordering::Relaxed),
        queue_stats,
    })
}

// report_stats logs queue counters every interval, but only when
// they changed since the last report.
async fn report_stats(client: Arc<SimClient>, interval: Duration, stop: CancellationToken) {
    let mut last = QueueStats::default();
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let stats = client.queue_stats();
        if stats.total_processed != last.total_processed
            || stats.pending_messages != last.pending_messages
            || stats.total_dropped != last.total_dropped
        {
            info!(
                "Stats: {} received, {} pending, {} dropped",
                stats.total_processed, stats.pending_messages, stats.total_dropped
            );
            last = stats;
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;

    use super::*;
    use crate::output::MemorySink;

    const WAIT: Duration = Duration::from_secs(5);

    async fn read_packet(stream: &mut TcpStream) -> std::io::Result<(u8, Vec<u8>)> {
        let header = stream.read_u8().await?;
        let mut len = 0usize;
        let mut shift = 0;
        loop {
            let byte = stream.read_u8().await?;
            len |= ((byte & 0x7f) as usize) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        let mut body = vec![0; len];
        stream.read_exact(&mut body).await?;
        Ok((header, body))
    }

    fn publish_frame(topic: &str, payload: &[u8]) -> Vec<u8> {
        // Short frames only: the remaining length must fit in one byte.
        let remaining = 2 + topic.len() + payload.len();
        assert!(remaining < 128);
        let mut frame = vec![0x30, remaining as u8];
        frame.extend((topic.len() as u16).to_be_bytes());
        frame.extend(topic.as_bytes());
        frame.extend(payload);
        frame
    }

    // broker accepts one client, waits for its SUBSCRIBE and then sends
    // the given publishes.
    async fn broker(publishes: Vec<(&'static str, Vec<u8>)>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_packet(&mut stream).await.unwrap();
            stream.write_all(&[0x20, 0x02, 0x00, 0x00]).await.unwrap();

            let (header, body) = read_packet(&mut stream).await.unwrap();
            assert_eq!(header >> 4, 8, "expected SUBSCRIBE");
            stream
                .write_all(&[0x90, 0x03, body[0], body[1], 0x00])
                .await
                .unwrap();

            for (topic, payload) in publishes {
                stream
                    .write_all(&publish_frame(topic, &payload))
                    .await
                    .unwrap();
            }
            // Drain until the client disconnects.
            while read_packet(&mut stream).await.is_ok() {}
        });
        port
    }

    fn test_config(port: u16, max_messages: u64) -> Config {
        let mut config = Config::default();
        config.broker.host = "127.0.0.1".to_string();
        config.broker.port = port;
        config.subscriber.client_id = Some("devsim-sub-test".to_string());
        config.subscriber.max_messages = Some(max_messages);
        config
    }

    #[test]
    fn test_connect_banner() {
        assert_eq!(
            connect_banner(ConnectReturnCode::Success),
            "Connected with result code 0"
        );
        assert_eq!(
            connect_banner(ConnectReturnCode::NotAuthorized),
            "Connected with result code 5"
        );
    }

    #[test]
    fn test_return_code_values() {
        let codes = [
            ConnectReturnCode::Success,
            ConnectReturnCode::RefusedProtocolVersion,
            ConnectReturnCode::BadClientId,
            ConnectReturnCode::ServiceUnavailable,
            ConnectReturnCode::BadUserNamePassword,
            ConnectReturnCode::NotAuthorized,
        ];
        let values: Vec<u8> = codes.into_iter().map(return_code_value).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_prints_banner_then_payloads() {
        let port = broker(vec![
            ("data", b"Device 1 : Data 0".to_vec()),
            ("data", b"Device 1 : Data 1".to_vec()),
        ])
        .await;
        let config = test_config(port, 2);
        let sink = Arc::new(MemorySink::new());

        let summary = timeout(
            WAIT,
            run(
                &config,
                config.subscriber_client_options().unwrap(),
                sink.clone(),
                CancellationToken::new(),
            ),
        )
        .await
        .expect("subscriber did not stop after max_messages")
        .unwrap();

        assert_eq!(
            sink.lines(),
            vec![
                "Connected with result code 0",
                "Device 1 : Data 0",
                "Device 1 : Data 1",
            ]
        );
        assert_eq!(summary.printed, 2);
        assert_eq!(summary.client_id, "devsim-sub-test");
        assert_eq!(summary.queue_stats.total_connects, 1);
    }

    #[tokio::test]
    async fn test_max_messages_caps_printed_output() {
        let port = broker(
            (0..5)
                .map(|i| ("data", format!("m{i}").into_bytes()))
                .collect(),
        )
        .await;
        let config = test_config(port, 2);
        let sink = Arc::new(MemorySink::new());

        let summary = timeout(
            WAIT,
            run(
                &config,
                config.subscriber_client_options().unwrap(),
                sink.clone(),
                CancellationToken::new(),
            ),
        )
        .await
        .expect("subscriber did not stop after max_messages")
        .unwrap();

        assert_eq!(
            sink.lines(),
            vec!["Connected with result code 0", "m0", "m1"]
        );
        assert_eq!(summary.printed, 2);
    }

    #[tokio::test]
    async fn test_invalid_qos_is_a_config_error() {
        let mut config = test_config(1, 1);
        config.subscriber.qos = 3;

        let err = run(
            &config,
            config.subscriber_client_options().unwrap(),
            Arc::new(MemorySink::new()),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            SubscriberError::Config(ConfigError::Invalid {
                field: "subscriber.qos",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_printed_lossily() {
        let port = broker(vec![("data", vec![b'o', b'k', 0xff])]).await;
        let config = test_config(port, 1);
        let sink = Arc::new(MemorySink::new());

        timeout(
            WAIT,
            run(
                &config,
                config.subscriber_client_options().unwrap(),
                sink.clone(),
                CancellationToken::new(),
            ),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(sink.lines().last().unwrap(), "ok\u{FFFD}");
    }

    #[tokio::test]
    async fn test_shutdown_stops_an_idle_subscriber() {
        let port = broker(Vec::new()).await;
        let config = test_config(port, 10);
        let sink = Arc::new(MemorySink::new());
        let shutdown = CancellationToken::new();

        let task = {
            let shutdown = shutdown.clone();
            let sink = sink.clone();
            tokio::spawn(async move {
                let options = config.subscriber_client_options().unwrap();
                run(&config, options, sink, shutdown).await
            })
        };

        timeout(WAIT, async {
            while sink.lines().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        shutdown.cancel();

        let summary = timeout(WAIT, task).await.unwrap().unwrap().unwrap();
        assert_eq!(summary.printed, 0);
        assert_eq!(sink.lines(), vec!["Connected with result code 0"]);
    }
}
