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

// src/traits.rs
// Core traits for MQTT message handling.
use std::sync::Arc;

use async_trait::async_trait;

use crate::client::SimClient;
use crate::errors::SimClientError;

// MqttRecipient lets a type decide which topic a message goes to.
//
// Example: per-device telemetry
// struct Device { index: u32 }
// impl MqttRecipient for Device {
//     fn to_mqtt_topic(&self) -> String {
//         format!("devices/{}/data", self.index)
//     }
// }
pub trait MqttRecipient {
    // to_mqtt_topic converts recipient into MQTT topic string
    fn to_mqtt_topic(&self) -> String;
}

impl MqttRecipient for String {
    fn to_mqtt_topic(&self) -> String {
        self.clone()
    }
}

impl MqttRecipient for &str {
    fn to_mqtt_topic(&self) -> String {
        self.to_string()
    }
}

impl MqttRecipient for &String {
    fn to_mqtt_topic(&self) -> String {
        (*self).clone()
    }
}

// MessageHandler processes incoming messages of a specific type.
//
// Example: collecting telemetry
// struct Collector { seen: Arc<Mutex<Vec<StringMessage>>> }
//
// #[async_trait]
// impl MessageHandler<StringMessage> for Collector {
//     async fn handle(&self, _client: Arc<SimClient>, message: StringMessage, _topic: String) {
//         self.seen.lock().await.push(message);
//     }
// }
#[async_trait]
pub trait MessageHandler<T>: Send + Sync {
    // handle processes incoming message of type T from specified topic.
    // The client parameter lets handlers publish replies.
    async fn handle(&self, client: Arc<SimClient>, message: T, topic: String);
}

// RawMessageType gives full control over the bytes of a message, for
// payloads that aren't JSON (plain text, binary frames, etc).
pub trait RawMessageType: Send + Sync + Clone + 'static {
    // to_bytes converts message to byte representation for transmission
    fn to_bytes(&self) -> Vec<u8>;

    // from_bytes recreates message from received bytes
    fn from_bytes(bytes: Vec<u8>) -> Self;
}

// MqttPublisher is the minimal publishing surface the device
// simulator needs. SimClient implements it; tests substitute mocks.
#[async_trait]
pub trait MqttPublisher: Send + Sync + 'static {
    // publish sends payload to topic with the client's default options.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SimClientError>;
}

#[async_trait]
impl MqttPublisher for SimClient {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SimClientError> {
        SimClient::publish(self, topic, payload).await
    }
}

#[async_trait]
impl<T: MqttPublisher> MqttPublisher for Arc<T> {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SimClientError> {
        T::publish(self, topic, payload).await
    }
}
