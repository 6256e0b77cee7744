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

// src/registry/entry.rs
// One registry entry: the metadata for a message type plus the
// handlers that serialize and deserialize it.

use super::types::{DeserializeHandler, MessageTypeInfo, SerializeHandler};
use crate::errors::SimClientError;

pub struct MqttRegistryEntry {
    pub message_type_info: MessageTypeInfo,
    pub serialize_handler: SerializeHandler,
    pub deserialize_handler: DeserializeHandler,
}

impl std::fmt::Debug for MqttRegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttRegistryEntry")
            .field("message_type_info", &self.message_type_info)
            .field("serialize_handler", &"<function>")
            .field("deserialize_handler", &"<function>")
            .finish()
    }
}

impl MqttRegistryEntry {
    pub fn new(
        message_type_info: MessageTypeInfo,
        serialize_handler: SerializeHandler,
        deserialize_handler: DeserializeHandler,
    ) -> Self {
        Self {
            message_type_info,
            serialize_handler,
            deserialize_handler,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.message_type_info.type_name
    }

    pub fn filters(&self) -> &[String] {
        &self.message_type_info.filters
    }

    pub fn serialize(&self, message: &dyn std::any::Any) -> Result<Vec<u8>, SimClientError> {
        (self.serialize_handler)(message)
    }

    pub fn deserialize(
        &self,
        bytes: &[u8],
    ) -> Result<Box<dyn std::any::Any + Send>, SimClientError> {
        (self.deserialize_handler)(bytes)
    }
}
