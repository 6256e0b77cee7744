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

// src/client/messages.rs
// ReceivedMessage is an incoming PUBLISH that matched a registered
// message type and is waiting in the local queue to be handled.

use std::any::TypeId;

use chrono::{DateTime, Utc};
use rumqttc::Publish;
use tokio::sync::RwLock;
use tracing::debug;

use crate::registry::MqttRegistry;

#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub topic: String,
    // type_id / type_name identify the registered type the
    // topic routed to.
    pub type_id: TypeId,
    pub type_name: String,
    pub payload: Vec<u8>,
    // payload_size is cached so stats bookkeeping doesn't depend on
    // the payload still being around.
    pub payload_size: usize,
    pub received_at: DateTime<Utc>,
}

impl ReceivedMessage {
    // from_publish routes a PUBLISH through the registry. Returns None
    // when no registered filter matches the topic.
    pub async fn from_publish(publish: &Publish, registry: &RwLock<MqttRegistry>) -> Option<Self> {
        let topic = publish.topic.clone();
        debug!("Looking for pattern match for topic: {}", topic);

        let registry_guard = registry.read().await;
        let type_info = registry_guard.find_matching_type_for_topic(&topic)?;
        let payload = publish.payload.to_vec();
        Some(Self {
            topic,
            type_id: type_info.type_id,
            type_name: type_info.type_name.clone(),
            payload_size: payload.len(),
            payload,
            received_at: Utc::now(),
        })
    }
}
