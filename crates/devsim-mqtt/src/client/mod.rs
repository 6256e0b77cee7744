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

// src/client/mod.rs
// SimClient and the pieces it is built from.

mod core;
mod handlers;
mod messages;
mod options;
mod registry;
mod topic_patterns;

pub use core::SimClient;
pub use handlers::{ClosureAdapter, ConnectHook, ErasedHandler, HandlerFuture, PublishHook};
pub use messages::ReceivedMessage;
pub use options::{
    ClientCredentials, ClientOptions, ClientTlsConfig, ClientTlsIdentity,
    DEFAULT_CLIENT_QUEUE_SIZE, DEFAULT_CONNECT_TIMEOUT, DEFAULT_DISCONNECT_TIMEOUT,
    DEFAULT_KEEP_ALIVE, DEFAULT_MAX_CONCURRENCY, DEFAULT_MESSAGE_CHANNEL_CAPACITY, DEFAULT_QOS,
    DEFAULT_RECONNECT_INTERVAL, DEFAULT_RETAIN,
};
pub use topic_patterns::TopicPatterns;
