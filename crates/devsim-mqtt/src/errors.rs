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

// src/errors.rs
// Error taxonomy for the devsim MQTT client.
//
// Errors are grouped into a handful of categories (connection,
// serialization, deserialization, topic, registry) so callers can
// decide how to react without matching every variant.

use std::time::Duration;

use rumqttc::{ClientError, ConnectReturnCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimClientError {
    // ConnectionError wraps failures to hand a request to the
    // rumqttc request channel (e.g. the event loop is gone).
    #[error("MQTT client request failed: {0}")]
    ConnectionError(#[from] ClientError),

    // EventLoopError is raised when polling the rumqttc event loop
    // fails before the first connection was ever established.
    #[error("MQTT event loop error: {0}")]
    EventLoopError(String),

    // ConnectionRefused means the broker answered the CONNECT with a
    // non-success CONNACK return code.
    #[error("MQTT broker refused connection: {0:?}")]
    ConnectionRefused(ConnectReturnCode),

    #[error("Timed out after {0:?} waiting for broker CONNACK")]
    ConnectTimeout(Duration),

    #[error("Invalid MQTT client id: {0:?}")]
    InvalidClientId(String),

    #[error("Client is already connected (connect may only be called once)")]
    AlreadyConnected,

    #[error("Failed to serialize JSON message: {0}")]
    JsonSerializationError(#[from] serde_json::Error),

    #[error("Failed to deserialize JSON message: {0}")]
    JsonDeserializationError(serde_json::Error),

    #[error("Invalid UTF-8 payload: {0}")]
    InvalidUtf8(String),

    #[error("Message type not registered: {0}")]
    UnregisteredType(String),

    #[error("No registered message type for topic: {0}")]
    UnknownMessageType(String),

    #[error("Failed to parse topic: {0}")]
    TopicParsingError(String),

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Failed to compile topic pattern: {0}")]
    PatternCompilationError(String),

    #[error("Raw message error: {0}")]
    RawMessageError(String),
}

impl SimClientError {
    pub fn event_loop_error(msg: impl Into<String>) -> Self {
        Self::EventLoopError(msg.into())
    }

    pub fn unknown_message_type(topic: impl Into<String>) -> Self {
        Self::UnknownMessageType(topic.into())
    }

    pub fn topic_parsing_error(msg: impl Into<String>) -> Self {
        Self::TopicParsingError(msg.into())
    }

    pub fn invalid_topic(msg: impl Into<String>) -> Self {
        Self::InvalidTopic(msg.into())
    }

    pub fn raw_message_error(msg: impl Into<String>) -> Self {
        Self::RawMessageError(msg.into())
    }

    pub fn unregistered_type(type_name: impl Into<String>) -> Self {
        Self::UnregisteredType(type_name.into())
    }

    pub fn invalid_utf8(msg: impl Into<String>) -> Self {
        Self::InvalidUtf8(msg.into())
    }

    pub fn pattern_compilation_error(msg: impl Into<String>) -> Self {
        Self::PatternCompilationError(msg.into())
    }

    // is_connection_error covers everything related to talking
    // to the broker.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError(_)
                | Self::EventLoopError(_)
                | Self::ConnectionRefused(_)
                | Self::ConnectTimeout(_)
                | Self::InvalidClientId(_)
                | Self::AlreadyConnected
        )
    }

    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Self::JsonSerializationError(_))
    }

    pub fn is_deserialization_error(&self) -> bool {
        matches!(
            self,
            Self::JsonDeserializationError(_) | Self::InvalidUtf8(_)
        )
    }

    pub fn is_topic_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownMessageType(_) | Self::TopicParsingError(_) | Self::InvalidTopic(_)
        )
    }

    pub fn is_registry_error(&self) -> bool {
        matches!(
            self,
            Self::UnregisteredType(_) | Self::PatternCompilationError(_)
        )
    }
}
