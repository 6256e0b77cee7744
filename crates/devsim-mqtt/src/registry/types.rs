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

// src/registry/types.rs
// Shared registry types: serialization formats, per-type metadata
// and publish options.

use std::any::TypeId;

use rumqttc::QoS;

use crate::errors::SimClientError;

// SerializationFormat is how a registered type is encoded on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerializationFormat {
    Json,
    Raw,
}

// MessageTypeInfo stores metadata about a registered message type.
#[derive(Clone, Debug)]
pub struct MessageTypeInfo {
    // type_id identifies the Rust type this entry was registered for.
    pub type_id: TypeId,
    // type_name is the human-readable type name for debugging
    // and logging.
    pub type_name: String,
    // filters are the MQTT topic filters that route to this type.
    pub filters: Vec<String>,
    // publish_options are the optional overrides for
    // the client-wide publish options.
    pub publish_options: Option<PublishOptions>,
    pub format: SerializationFormat,
}

// PublishOptions holds per-publish MQTT flags. The client has a
// default set, and registered types may override either field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PublishOptions {
    pub qos: Option<QoS>,
    pub retain: Option<bool>,
}

impl PublishOptions {
    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = Some(qos);
        self
    }

    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = Some(retain);
        self
    }
}

// SerializeHandler converts a type-erased message to bytes.
pub type SerializeHandler =
    Box<dyn Fn(&dyn std::any::Any) -> Result<Vec<u8>, SimClientError> + Send + Sync>;

// DeserializeHandler converts bytes back to a type-erased message.
pub type DeserializeHandler =
    Box<dyn Fn(&[u8]) -> Result<Box<dyn std::any::Any + Send>, SimClientError> + Send + Sync>;

impl MessageTypeInfo {
    pub fn new<T: 'static>(
        filters: Vec<String>,
        publish_options: Option<PublishOptions>,
        format: SerializationFormat,
    ) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>().to_string(),
            filters,
            publish_options,
            format,
        }
    }

    pub fn has_filter(&self, filter: &str) -> bool {
        self.filters.iter().any(|f| f == filter)
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    // effective_qos falls back to the provided default when no
    // type-specific override is set.
    pub fn effective_qos(&self, default_qos: QoS) -> QoS {
        self.publish_options
            .and_then(|opts| opts.qos)
            .unwrap_or(default_qos)
    }

    pub fn effective_retain(&self, default_retain: bool) -> bool {
        self.publish_options
            .and_then(|opts| opts.retain)
            .unwrap_or(default_retain)
    }

    pub fn is_format(&self, format: SerializationFormat) -> bool {
        self.format == format
    }
}
