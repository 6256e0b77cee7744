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

// publisher simulates a single device: it connects once, then publishes
// "<device> : Data <i>" for i in 0..message_count, sleeping a random
// whole number of seconds before each reading.

use std::sync::Arc;
use std::time::Duration;

use devsim_mqtt::client::ClientOptions;
use devsim_mqtt::{MqttPublisher, PublishStats, SimClient, SimClientError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::output::LineSink;

/// The text payload for reading `index` of `device`.
pub fn device_payload(device: &str, index: u32) -> String {
    format!("{device} : Data {index}")
}

/// Source of the pause taken before each reading.
pub trait DelaySource: Send {
    fn next_delay(&mut self) -> Duration;
}

/// Uniformly random whole-second delays in `min_secs..=max_secs`.
pub struct UniformDelay {
    min_secs: u64,
    max_secs: u64,
    rng: StdRng,
}

impl UniformDelay {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self::with_rng(min_secs, max_secs, StdRng::from_os_rng())
    }

    pub fn seeded(min_secs: u64, max_secs: u64, seed: u64) -> Self {
        Self::with_rng(min_secs, max_secs, StdRng::seed_from_u64(seed))
    }

    fn with_rng(min_secs: u64, max_secs: u64, rng: StdRng) -> Self {
        // An inverted range would panic in random_range.
        let (min_secs, max_secs) = if min_secs <= max_secs {
            (min_secs, max_secs)
        } else {
            (max_secs, min_secs)
        };
        Self {
            min_secs,
            max_secs,
            rng,
        }
    }
}

impl DelaySource for UniformDelay {
    fn next_delay(&mut self) -> Duration {
        Duration::from_secs(self.rng.random_range(self.min_secs..=self.max_secs))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublisherSettings {
    pub device_name: String,
    pub topic: String,
    pub message_count: u32,
}

impl From<&Config> for PublisherSettings {
    fn from(config: &Config) -> Self {
        Self {
            device_name: config.publisher.device_name.clone(),
            topic: config.publisher.topic.clone(),
            message_count: config.publisher.message_count,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishSummary {
    /// Readings handed to the client (successfully or not).
    pub attempted: u32,
    pub published: u32,
    pub failed: u32,
    /// Set when the run was cut short by shutdown.
    pub interrupted: bool,
}

/// The device loop, independent of any particular MQTT client.
pub struct DevicePublisher<P, D> {
    publisher: P,
    delays: D,
    settings: PublisherSettings,
}

impl<P: MqttPublisher, D: DelaySource> DevicePublisher<P, D> {
    pub fn new(publisher: P, delays: D, settings: PublisherSettings) -> Self {
        Self {
            publisher,
            delays,
            settings,
        }
    }

    /// Publishes every reading, in index order. A failed publish is logged
    /// and the loop moves on to the next index.
    pub async fn run(&mut self, shutdown: &CancellationToken) -> PublishSummary {
        let mut summary = PublishSummary::default();

        for index in 0..self.settings.message_count {
            let delay = self.delays.next_delay();
            debug!("Waiting {:?} before reading {}", delay, index);
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested after {} readings", summary.attempted);
                    summary.interrupted = true;
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let payload = device_payload(&self.settings.device_name, index);
            summary.attempted += 1;
            match self
                .publisher
                .publish(&self.settings.topic, payload.into_bytes())
                .await
            {
                Ok(()) => summary.published += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        "Failed to publish reading {} to '{}': {}",
                        index, self.settings.topic, e
                    );
                }
            }
        }

        summary
    }
}

/// Connects as the configured device, publishes all readings, disconnects
/// and prints "Stopped...".
pub async fn run(
    config: &Config,
    options: ClientOptions,
    out: Arc<dyn LineSink>,
    shutdown: CancellationToken,
) -> Result<(PublishSummary, PublishStats), SimClientError> {
    let broker = &config.broker;
    let client = SimClient::new(
        &broker.host,
        broker.port,
        &config.publisher.client_id,
        Some(options),
    )?;

    let published_line = format!("{} : Data published.", config.publisher.device_name);
    let hook_out = Arc::clone(&out);
    client
        .on_publish(move |_pkid| hook_out.write_line(&published_line))
        .await;

    client.connect().await?;

    let settings = PublisherSettings::from(config);
    let delays = UniformDelay::new(
        config.publisher.min_delay_secs,
        config.publisher.max_delay_secs,
    );
    let mut publisher = DevicePublisher::new(Arc::clone(&client), delays, settings);
    let summary = publisher.run(&shutdown).await;

    // disconnect() returns once the event loop has written every queued
    // publish, so all "published" lines precede "Stopped...".
    let disconnected = client.disconnect().await;
    out.write_line("Stopped...");
    disconnected?;

    let stats = client.publish_stats();
    info!(
        attempted = summary.attempted,
        published = stats.total_published,
        written = stats.total_written,
        failed = stats.total_failed,
        bytes = stats.total_bytes_published,
        "Publisher finished"
    );
    Ok((summary, stats))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;
    use tokio::time::{Instant, timeout};

    use super::*;
    use crate::output::MemorySink;

    #[derive(Default)]
    struct RecordingPublisher {
        // (topic, payload, time since start)
        sent: Mutex<Vec<(String, String, Duration)>>,
        fail_indices: Vec<usize>,
        started: Option<Instant>,
    }

    impl RecordingPublisher {
        fn new() -> Self {
            Self {
                started: Some(Instant::now()),
                ..Default::default()
            }
        }

        fn payloads(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, payload, _)| payload.clone())
                .collect()
        }
    }

    #[async_trait]
    impl MqttPublisher for RecordingPublisher {
        async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SimClientError> {
            let mut sent = self.sent.lock().unwrap();
            let attempt = sent.len();
            let elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
            sent.push((
                topic.to_string(),
                String::from_utf8(payload).unwrap(),
                elapsed,
            ));
            if self.fail_indices.contains(&attempt) {
                return Err(SimClientError::event_loop_error("broker went away"));
            }
            Ok(())
        }
    }

    struct FixedDelay(Duration);

    impl DelaySource for FixedDelay {
        fn next_delay(&mut self) -> Duration {
            self.0
        }
    }

    fn settings(count: u32) -> PublisherSettings {
        PublisherSettings {
            device_name: "Device 1".to_string(),
            topic: "data".to_string(),
            message_count: count,
        }
    }

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

    // broker accepts one client and returns the payloads of every QoS 0
    // PUBLISH it reads before the connection closes.
    async fn broker() -> (u16, JoinHandle<Vec<String>>) {
        use tokio::io::AsyncWriteExt;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let task = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_packet(&mut stream).await.unwrap();
            stream.write_all(&[0x20, 0x02, 0x00, 0x00]).await.unwrap();

            let mut payloads = Vec::new();
            while let Ok((header, body)) = read_packet(&mut stream).await {
                if header >> 4 == 3 {
                    let topic_len = u16::from_be_bytes([body[0], body[1]]) as usize;
                    payloads.push(String::from_utf8(body[2 + topic_len..].to_vec()).unwrap());
                }
            }
            payloads
        });
        (port, task)
    }

    #[tokio::test]
    async fn test_run_reports_each_publish_before_stopping() {
        let (port, broker_task) = broker().await;
        let mut config = Config::default();
        config.broker.host = "127.0.0.1".to_string();
        config.broker.port = port;
        config.publisher.message_count = 3;
        config.publisher.min_delay_secs = 0;
        config.publisher.max_delay_secs = 0;
        let sink = Arc::new(MemorySink::new());

        let (summary, stats) = timeout(
            Duration::from_secs(5),
            run(
                &config,
                config.publisher_client_options().unwrap(),
                sink.clone(),
                CancellationToken::new(),
            ),
        )
        .await
        .expect("publisher did not finish")
        .unwrap();

        assert_eq!(
            sink.lines(),
            vec![
                "Device 1 : Data published.",
                "Device 1 : Data published.",
                "Device 1 : Data published.",
                "Stopped...",
            ]
        );
        assert_eq!(summary.published, 3);
        assert_eq!(stats.total_published, 3);
        assert_eq!(stats.total_written, 3);

        let received = timeout(Duration::from_secs(5), broker_task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            received,
            vec!["Device 1 : Data 0", "Device 1 : Data 1", "Device 1 : Data 2"]
        );
    }

    #[test]
    fn test_device_payload() {
        assert_eq!(device_payload("Device 1", 0), "Device 1 : Data 0");
        assert_eq!(device_payload("Device 1", 19), "Device 1 : Data 19");
    }

    #[test]
    fn test_uniform_delay_stays_in_range() {
        let mut delays = UniformDelay::seeded(1, 5, 42);
        let seen: HashSet<u64> = (0..1000).map(|_| delays.next_delay().as_secs()).collect();
        assert_eq!(seen, (1..=5).collect());
    }

    #[test]
    fn test_uniform_delay_fixed_range() {
        let mut delays = UniformDelay::seeded(3, 3, 7);
        for _ in 0..10 {
            assert_eq!(delays.next_delay(), Duration::from_secs(3));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_every_reading_in_order() {
        let recorder = Arc::new(RecordingPublisher::new());
        let mut publisher = DevicePublisher::new(
            Arc::clone(&recorder),
            FixedDelay(Duration::from_secs(1)),
            settings(20),
        );

        let summary = publisher.run(&CancellationToken::new()).await;
        assert_eq!(
            summary,
            PublishSummary {
                attempted: 20,
                published: 20,
                failed: 0,
                interrupted: false,
            }
        );

        let expected: Vec<String> = (0..20).map(|i| format!("Device 1 : Data {i}")).collect();
        assert_eq!(recorder.payloads(), expected);
        assert!(
            recorder
                .sent
                .lock()
                .unwrap()
                .iter()
                .all(|(topic, _, _)| topic == "data")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_precedes_each_publish() {
        let recorder = Arc::new(RecordingPublisher::new());
        let mut publisher = DevicePublisher::new(
            Arc::clone(&recorder),
            FixedDelay(Duration::from_secs(2)),
            settings(3),
        );
        publisher.run(&CancellationToken::new()).await;

        let times: Vec<Duration> = recorder
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, elapsed)| *elapsed)
            .collect();
        assert_eq!(times.len(), 3);
        for (i, elapsed) in times.iter().enumerate() {
            let expected = Duration::from_secs(2 * (i as u64 + 1));
            assert!(
                *elapsed >= expected && *elapsed < expected + Duration::from_secs(1),
                "reading {i} published at {elapsed:?}, expected {expected:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_random_delays_bound_total_runtime() {
        let recorder = Arc::new(RecordingPublisher::new());
        let mut publisher = DevicePublisher::new(
            Arc::clone(&recorder),
            UniformDelay::seeded(1, 5, 1),
            settings(20),
        );
        let start = Instant::now();
        publisher.run(&CancellationToken::new()).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_secs(20), "{elapsed:?}");
        assert!(elapsed <= Duration::from_secs(100), "{elapsed:?}");
        assert_eq!(recorder.payloads().len(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_publish_does_not_stop_the_loop() {
        let recorder = Arc::new(RecordingPublisher {
            fail_indices: vec![1, 3],
            ..RecordingPublisher::new()
        });
        let mut publisher = DevicePublisher::new(
            Arc::clone(&recorder),
            FixedDelay(Duration::from_secs(1)),
            settings(5),
        );

        let summary = publisher.run(&CancellationToken::new()).await;
        assert_eq!(summary.attempted, 5);
        assert_eq!(summary.published, 3);
        assert_eq!(summary.failed, 2);
        assert_eq!(recorder.payloads().last().unwrap(), "Device 1 : Data 4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_the_loop() {
        let recorder = Arc::new(RecordingPublisher::new());
        let mut publisher = DevicePublisher::new(
            Arc::clone(&recorder),
            FixedDelay(Duration::from_secs(5)),
            settings(20),
        );
        let shutdown = CancellationToken::new();
        let canceller = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            canceller.cancel();
        });

        let summary = publisher.run(&shutdown).await;
        assert!(summary.interrupted);
        assert_eq!(summary.attempted, 2);
        assert_eq!(
            recorder.payloads(),
            vec!["Device 1 : Data 0", "Device 1 : Data 1"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_count_publishes_nothing() {
        let recorder = Arc::new(RecordingPublisher::new());
        let mut publisher = DevicePublisher::new(
            Arc::clone(&recorder),
            FixedDelay(Duration::from_secs(1)),
            settings(0),
        );
        let summary = publisher.run(&CancellationToken::new()).await;
        assert_eq!(summary, PublishSummary::default());
        assert!(recorder.payloads().is_empty());
    }
}
