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

// src/client/registry.rs
// Message type registration on SimClient, delegating to the
// client's own MqttRegistry.

use crate::client::{SimClient, TopicPatterns};
use crate::errors::SimClientError;
use crate::message_types::StringMessage;
use crate::registry::types::PublishOptions;
use crate::traits::RawMessageType;

impl SimClient {
    // register_json_message registers a serde type carried as JSON
    // on the given topic filters.
    pub async fn register_json_message<
        T: serde::Serialize + serde::de::DeserializeOwned + Send + 'static,
    >(
        &self,
        patterns: impl Into<TopicPatterns> + Send,
    ) -> Result<(), SimClientError> {
        self.register_json_message_with_opts::<T>(patterns, None)
            .await
    }

    pub async fn register_json_message_with_opts<
        T: serde::Serialize + serde::de::DeserializeOwned + Send + 'static,
    >(
        &self,
        patterns: impl Into<TopicPatterns> + Send,
        publish_options: Option<PublishOptions>,
    ) -> Result<(), SimClientError> {
        let filters = patterns.into().into_vec();
        let mut registry_guard = self.registry.write().await;
        registry_guard.register_json_message::<T>(filters, publish_options)
    }

    // register_raw_message registers a RawMessageType on the given
    // topic filters.
    pub async fn register_raw_message<T: RawMessageType>(
        &self,
        patterns: impl Into<TopicPatterns> + Send,
    ) -> Result<(), SimClientError> {
        self.register_raw_message_with_opts::<T>(patterns, None)
            .await
    }

    pub async fn register_raw_message_with_opts<T: RawMessageType>(
        &self,
        patterns: impl Into<TopicPatterns> + Send,
        publish_options: Option<PublishOptions>,
    ) -> Result<(), SimClientError> {
        let filters = patterns.into().into_vec();
        let mut registry_guard = self.registry.write().await;
        registry_guard.register_raw_message::<T>(filters, publish_options)
    }

    // register_string_message is shorthand for the UTF-8 text
    // messages the simulated devices exchange.
    pub async fn register_string_message(
        &self,
        patterns: impl Into<TopicPatterns> + Send,
    ) -> Result<(), SimClientError> {
        self.register_raw_message::<StringMessage>(patterns).await
    }

    // registered_type_count returns how many message types this
    // client knows about.
    pub async fn registered_type_count(&self) -> usize {
        self.registry.read().await.entry_count()
    }
}
