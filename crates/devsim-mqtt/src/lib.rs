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

// src/lib.rs
// Main exports for the devsim MQTT client library.

pub mod client;
pub mod errors;
pub mod message_types;
pub mod registry;
pub mod stats;
pub mod topics;
pub mod traits;

// Export some things for convenience.
pub use client::{ClientOptions, SimClient, TopicPatterns};
pub use errors::SimClientError;
pub use message_types::{RawMessage, StringMessage};
pub use registry::{MessageTypeInfo, MqttRegistry, SerializationFormat};
pub use rumqttc::{ConnectReturnCode, QoS};
pub use stats::{PublishStats, QueueStats};
pub use traits::{MessageHandler, MqttPublisher, MqttRecipient, RawMessageType};
