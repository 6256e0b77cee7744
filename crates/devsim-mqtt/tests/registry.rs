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

// tests/registry.rs
// Tests for message type registration, topic routing and
// serialization through the registry.

use devsim_mqtt::registry::PublishOptions;
use devsim_mqtt::{
    MqttRegistry, QoS, RawMessage, RawMessageType, SerializationFormat, StringMessage,
    TopicPatterns,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Reading {
    device: String,
    index: u32,
}

fn filters(filters: &[&str]) -> Vec<String> {
    filters.iter().map(|f| f.to_string()).collect()
}

#[test]
fn test_empty_registry() {
    let registry = MqttRegistry::new();
    assert_eq!(registry.entry_count(), 0);
    assert_eq!(registry.pattern_count(), 0);
    assert!(!registry.has_patterns());
    assert!(registry.find_matching_type_for_topic("data").is_none());
}

#[test]
fn test_register_string_message() {
    let mut registry = MqttRegistry::new();
    registry
        .register_raw_message::<StringMessage>(filters(&["data"]), None)
        .unwrap();

    assert_eq!(registry.entry_count(), 1);
    assert_eq!(registry.pattern_count(), 1);
    assert!(registry.has_entry_for_type::<StringMessage>());

    let info = registry.find_matching_type_for_topic("data").unwrap();
    assert_eq!(info.type_id, std::any::TypeId::of::<StringMessage>());
    assert!(info.is_format(SerializationFormat::Raw));
    assert!(info.has_filter("data"));
    assert!(registry.find_matching_type_for_topic("data/extra").is_none());

    let entry = registry.get_entry_for_type::<StringMessage>().unwrap();
    assert_eq!(entry.filters(), ["data".to_string()]);
    assert!(entry.type_name().ends_with("StringMessage"));
    assert_eq!(info.filter_count(), 1);
}

#[test]
fn test_topic_patterns_conversions() {
    let single = TopicPatterns::from("data");
    assert_eq!(single.len(), 1);
    assert!(single.contains("data"));
    assert_eq!(single.to_string(), "'data'");

    let multiple = TopicPatterns::from(["data", "devices/+/data"]);
    assert_eq!(multiple.len(), 2);
    assert!(multiple.contains("devices/+/data"));
    assert!(!multiple.is_empty());
    assert_eq!(multiple.to_string(), "['data', 'devices/+/data']");
    assert_eq!(
        multiple.into_vec(),
        vec!["data".to_string(), "devices/+/data".to_string()]
    );

    let owned = vec!["a".to_string()];
    assert_eq!(TopicPatterns::from(owned.as_slice()), TopicPatterns::from(owned));
    assert!(TopicPatterns::from(Vec::<String>::new()).is_empty());
}

#[test]
fn test_raw_message_bytes() {
    let message = RawMessage::from(vec![0x00, 0xff, 0x10]);
    assert_eq!(message.len(), 3);
    assert!(!message.is_empty());
    assert_eq!(RawMessage::from_bytes(message.to_bytes()), message);
}

#[test]
fn test_wildcard_routing() {
    let mut registry = MqttRegistry::new();
    registry
        .register_json_message::<Reading>(filters(&["devices/+/readings", "fleet/#"]), None)
        .unwrap();

    for topic in ["devices/1/readings", "devices/42/readings", "fleet", "fleet/a/b"] {
        let info = registry.find_matching_type_for_topic(topic).unwrap();
        assert!(info.is_format(SerializationFormat::Json), "{topic}");
    }
    assert!(
        registry
            .find_matching_type_for_topic("devices/1/2/readings")
            .is_none()
    );
}

#[test]
fn test_first_registered_match_wins() {
    let mut registry = MqttRegistry::new();
    registry
        .register_raw_message::<StringMessage>(filters(&["devices/1/data"]), None)
        .unwrap();
    registry
        .register_raw_message::<RawMessage>(filters(&["devices/#"]), None)
        .unwrap();

    let specific = registry
        .find_matching_type_for_topic("devices/1/data")
        .unwrap();
    assert_eq!(specific.type_id, std::any::TypeId::of::<StringMessage>());

    let general = registry
        .find_matching_type_for_topic("devices/2/data")
        .unwrap();
    assert_eq!(general.type_id, std::any::TypeId::of::<RawMessage>());
}

#[test]
fn test_reregistration_merges_filters() {
    let mut registry = MqttRegistry::new();
    registry
        .register_raw_message::<StringMessage>(filters(&["data"]), None)
        .unwrap();
    registry
        .register_raw_message::<StringMessage>(filters(&["telemetry"]), None)
        .unwrap();

    assert_eq!(registry.entry_count(), 1);
    assert_eq!(registry.pattern_count(), 2);
    assert_eq!(
        registry.get_type_info::<StringMessage>().unwrap().filters,
        vec!["data".to_string(), "telemetry".to_string()]
    );
    assert_eq!(
        registry.get_patterns_for_type::<StringMessage>(),
        vec!["^data$".to_string(), "^telemetry$".to_string()]
    );
}

#[test]
fn test_invalid_filters_leave_registry_unchanged() {
    let mut registry = MqttRegistry::new();
    let err = registry
        .register_raw_message::<StringMessage>(filters(&["data", "bad/#/filter"]), None)
        .unwrap_err();
    assert!(err.is_topic_error());
    assert_eq!(registry.entry_count(), 0);
    assert_eq!(registry.pattern_count(), 0);

    let err = registry
        .register_raw_message::<StringMessage>(Vec::new(), None)
        .unwrap_err();
    assert!(err.is_topic_error());
}

#[test]
fn test_string_message_roundtrip_through_registry() {
    let mut registry = MqttRegistry::new();
    registry
        .register_raw_message::<StringMessage>(filters(&["data"]), None)
        .unwrap();

    let bytes = registry
        .serialize_message(&StringMessage::new("Device 1 : Data 0"))
        .unwrap();
    assert_eq!(bytes, b"Device 1 : Data 0");

    let decoded: StringMessage = registry.deserialize_message(&bytes).unwrap();
    assert_eq!(decoded.as_str(), "Device 1 : Data 0");
    assert!(!decoded.lossy);
}

#[test]
fn test_string_message_invalid_utf8_is_lossy() {
    let decoded = StringMessage::from_bytes(vec![b'o', b'k', 0xff, b'!']);
    assert!(decoded.lossy);
    assert_eq!(decoded.as_str(), "ok\u{FFFD}!");
}

#[test]
fn test_json_message_through_registry() {
    let mut registry = MqttRegistry::new();
    registry
        .register_json_message::<Reading>(filters(&["readings"]), None)
        .unwrap();

    let reading = Reading {
        device: "Device 1".to_string(),
        index: 3,
    };
    let bytes = registry.serialize_message(&reading).unwrap();
    let decoded: Reading = registry.deserialize_message(&bytes).unwrap();
    assert_eq!(decoded, reading);

    let err = registry
        .deserialize_message::<Reading>(b"Device 1 : Data 3")
        .unwrap_err();
    assert!(err.is_deserialization_error());
}

#[test]
fn test_unregistered_type_errors() {
    let registry = MqttRegistry::new();
    let err = registry
        .serialize_message(&StringMessage::new("hello"))
        .unwrap_err();
    assert!(err.is_registry_error());

    let err = registry
        .deserialize_message::<StringMessage>(b"hello")
        .unwrap_err();
    assert!(err.is_registry_error());
}

#[test]
fn test_publish_options_override_defaults() {
    let mut registry = MqttRegistry::new();
    let options = PublishOptions::default()
        .with_qos(QoS::AtLeastOnce)
        .with_retain(true);
    registry
        .register_raw_message::<StringMessage>(filters(&["data"]), Some(options))
        .unwrap();
    registry
        .register_raw_message::<RawMessage>(filters(&["raw"]), None)
        .unwrap();

    let info = registry.get_type_info::<StringMessage>().unwrap();
    assert_eq!(info.effective_qos(QoS::AtMostOnce), QoS::AtLeastOnce);
    assert!(info.effective_retain(false));

    let info = registry.get_type_info::<RawMessage>().unwrap();
    assert_eq!(info.effective_qos(QoS::AtMostOnce), QoS::AtMostOnce);
    assert!(!info.effective_retain(false));
}

#[test]
fn test_clear() {
    let mut registry = MqttRegistry::new();
    registry
        .register_raw_message::<StringMessage>(filters(&["data"]), None)
        .unwrap();
    registry
        .register_raw_message::<RawMessage>(filters(&["raw/#"]), None)
        .unwrap();
    assert_eq!(registry.list_registered_types().len(), 2);

    registry.clear();
    assert_eq!(registry.entry_count(), 0);
    assert!(!registry.has_patterns());
}
