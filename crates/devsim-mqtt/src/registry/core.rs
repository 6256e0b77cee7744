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

// src/registry/core.rs
// MqttRegistry maps MQTT topic filters to registered message types.
//
// Each client owns one registry. Filters are validated and compiled
// to anchored regexes at registration time, and are checked in
// registration order when a message arrives (first match wins).

use std::any::{Any, TypeId};
use std::collections::HashMap;

use regex::Regex;
use tracing::debug;

use super::entry::MqttRegistryEntry;
use super::types::{
    DeserializeHandler, MessageTypeInfo, PublishOptions, SerializationFormat, SerializeHandler,
};
use crate::errors::SimClientError;
use crate::topics::{filter_to_regex, validate_topic_filter};

pub struct MqttRegistry {
    // topic_patterns stores compiled filters in registration
    // order (first-match-wins).
    topic_patterns: Vec<(Regex, TypeId)>,
    entries: HashMap<TypeId, MqttRegistryEntry>,
}

impl MqttRegistry {
    pub fn new() -> Self {
        Self {
            topic_patterns: Vec::new(),
            entries: HashMap::new(),
        }
    }

    // register_message_type registers a message type for the given
    // topic filters. Registering the same type again adds filters and
    // replaces its handlers.
    pub fn register_message_type<T: 'static>(
        &mut self,
        filters: Vec<String>,
        publish_options: Option<PublishOptions>,
        format: SerializationFormat,
        serialize_handler: SerializeHandler,
        deserialize_handler: DeserializeHandler,
    ) -> Result<(), SimClientError> {
        if filters.is_empty() {
            return Err(SimClientError::invalid_topic(format!(
                "no topic filters given for {}",
                std::any::type_name::<T>()
            )));
        }

        // Compile everything before touching state, so a bad filter
        // leaves the registry unchanged.
        let mut compiled = Vec::with_capacity(filters.len());
        for filter in &filters {
            validate_topic_filter(filter)?;
            let pattern = filter_to_regex(filter);
            let regex = Regex::new(&pattern)
                .map_err(|e| SimClientError::pattern_compilation_error(e.to_string()))?;
            compiled.push(regex);
        }

        let type_id = TypeId::of::<T>();
        let info = match self.entries.remove(&type_id) {
            Some(existing) => {
                let mut info = existing.message_type_info;
                info.filters.extend(filters);
                if publish_options.is_some() {
                    info.publish_options = publish_options;
                }
                info.format = format;
                info
            }
            None => MessageTypeInfo::new::<T>(filters, publish_options, format),
        };

        for regex in compiled {
            debug!(
                "Registered pattern '{}' for type '{}'",
                regex.as_str(),
                info.type_name
            );
            self.topic_patterns.push((regex, type_id));
        }

        self.entries.insert(
            type_id,
            MqttRegistryEntry::new(info, serialize_handler, deserialize_handler),
        );
        Ok(())
    }

    // find_matching_type_for_topic determines which message type
    // handles a given topic.
    pub fn find_matching_type_for_topic(&self, topic: &str) -> Option<&MessageTypeInfo> {
        for (regex, type_id) in &self.topic_patterns {
            if regex.is_match(topic) {
                let info = self.get_type_info_by_id(type_id);
                debug!(
                    "Topic '{}' matched pattern '{}' -> type '{}'",
                    topic,
                    regex.as_str(),
                    info.map(|i| i.type_name.as_str()).unwrap_or("<missing>")
                );
                return info;
            }
        }
        debug!("Topic '{}' did not match any registered patterns", topic);
        None
    }

    pub fn get_type_info_by_id(&self, type_id: &TypeId) -> Option<&MessageTypeInfo> {
        self.entries
            .get(type_id)
            .map(|entry| &entry.message_type_info)
    }

    pub fn get_type_info<T: 'static>(&self) -> Option<&MessageTypeInfo> {
        self.get_type_info_by_id(&TypeId::of::<T>())
    }

    pub fn get_entry_for_type<T: 'static>(&self) -> Option<&MqttRegistryEntry> {
        self.entries.get(&TypeId::of::<T>())
    }

    pub fn serialize_message<T: 'static>(&self, message: &T) -> Result<Vec<u8>, SimClientError> {
        match self.get_entry_for_type::<T>() {
            Some(entry) => entry.serialize(message as &dyn Any),
            None => Err(SimClientError::unregistered_type(std::any::type_name::<T>())),
        }
    }

    pub fn deserialize_message<T: 'static>(&self, bytes: &[u8]) -> Result<T, SimClientError> {
        let entry = self
            .get_entry_for_type::<T>()
            .ok_or_else(|| SimClientError::unregistered_type(std::any::type_name::<T>()))?;

        // Entries are keyed by TypeId, so the handler always produces a T.
        entry
            .deserialize(bytes)?
            .downcast::<T>()
            .map(|message| *message)
            .map_err(|_| {
                SimClientError::unregistered_type(format!(
                    "Failed to downcast {} after deserialization",
                    std::any::type_name::<T>()
                ))
            })
    }

    pub fn list_registered_types(&self) -> Vec<&MessageTypeInfo> {
        self.entries
            .values()
            .map(|entry| &entry.message_type_info)
            .collect()
    }

    // get_patterns_for_type returns the compiled regexes that route
    // to a type, in registration order.
    pub fn get_patterns_for_type<T: 'static>(&self) -> Vec<String> {
        let type_id = TypeId::of::<T>();
        self.topic_patterns
            .iter()
            .filter(|(_, id)| *id == type_id)
            .map(|(regex, _)| regex.as_str().to_string())
            .collect()
    }

    pub fn pattern_count(&self) -> usize {
        self.topic_patterns.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn has_entry_for_type<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn has_patterns(&self) -> bool {
        !self.topic_patterns.is_empty()
    }

    pub fn clear(&mut self) {
        self.topic_patterns.clear();
        self.entries.clear();
        debug!("Cleared all registry data");
    }

    // register_json_message registers a serde type carried as JSON.
    pub fn register_json_message<
        T: serde::Serialize + serde::de::DeserializeOwned + Send + 'static,
    >(
        &mut self,
        filters: Vec<String>,
        publish_options: Option<PublishOptions>,
    ) -> Result<(), SimClientError> {
        let serialize_handler: SerializeHandler = Box::new(|any_msg| {
            let msg = any_msg.downcast_ref::<T>().ok_or_else(|| {
                SimClientError::unregistered_type("Failed to downcast for JSON serialization")
            })?;
            serde_json::to_vec(msg).map_err(SimClientError::JsonSerializationError)
        });

        let deserialize_handler: DeserializeHandler = Box::new(|bytes| {
            let msg: T =
                serde_json::from_slice(bytes).map_err(SimClientError::JsonDeserializationError)?;
            Ok(Box::new(msg) as Box<dyn Any + Send>)
        });

        self.register_message_type::<T>(
            filters,
            publish_options,
            SerializationFormat::Json,
            serialize_handler,
            deserialize_handler,
        )
    }

    // register_raw_message registers a RawMessageType carried as-is.
    pub fn register_raw_message<T: crate::traits::RawMessageType>(
        &mut self,
        filters: Vec<String>,
        publish_options: Option<PublishOptions>,
    ) -> Result<(), SimClientError> {
        let serialize_handler: SerializeHandler = Box::new(|any_msg| {
            any_msg
                .downcast_ref::<T>()
                .map(|msg| msg.to_bytes())
                .ok_or_else(|| {
                    SimClientError::unregistered_type("Failed to downcast for raw serialization")
                })
        });

        let deserialize_handler: DeserializeHandler = Box::new(|bytes| {
            let msg = T::from_bytes(bytes.to_vec());
            Ok(Box::new(msg) as Box<dyn Any + Send>)
        });

        self.register_message_type::<T>(
            filters,
            publish_options,
            SerializationFormat::Raw,
            serialize_handler,
            deserialize_handler,
        )
    }
}

impl Default for MqttRegistry {
    fn default() -> Self {
        Self::new()
    }
}
