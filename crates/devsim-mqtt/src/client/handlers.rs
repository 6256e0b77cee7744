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

// src/client/handlers.rs
// Handler and hook types for the client's callbacks.
//
// Message handlers are type-erased so handlers for different message
// types can live in one map. Connect and publish hooks are plain
// synchronous callbacks run from the event loop task, so they should
// return quickly.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use rumqttc::ConnAck;

use crate::client::SimClient;
use crate::errors::SimClientError;
use crate::traits::MessageHandler;

// ErasedHandler takes the client, raw payload bytes and topic, and
// returns a future that deserializes and handles the message.
pub type ErasedHandler = Box<dyn Fn(Arc<SimClient>, Vec<u8>, String) -> HandlerFuture + Send + Sync>;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), SimClientError>> + Send>>;

// ConnectHook runs for every CONNACK the broker sends, accepted or not.
pub type ConnectHook = Box<dyn Fn(&ConnAck) + Send + Sync>;

// PublishHook runs every time the event loop writes a PUBLISH to the
// broker connection. The argument is the packet id (0 for QoS 0).
pub type PublishHook = Box<dyn Fn(u16) + Send + Sync>;

// ClosureAdapter lets closures be registered anywhere a
// MessageHandler is expected.
pub struct ClosureAdapter<T, F, Fut>
where
    T: Send + Sync + 'static,
    F: Fn(Arc<SimClient>, T, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub closure: F,
    pub _phantom: PhantomData<fn() -> (T, Fut)>,
}

impl<T, F, Fut> ClosureAdapter<T, F, Fut>
where
    T: Send + Sync + 'static,
    F: Fn(Arc<SimClient>, T, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub fn new(closure: F) -> Self {
        Self {
            closure,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F, Fut> MessageHandler<T> for ClosureAdapter<T, F, Fut>
where
    T: Send + Sync + 'static,
    F: Fn(Arc<SimClient>, T, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, client: Arc<SimClient>, message: T, topic: String) {
        (self.closure)(client, message, topic).await;
    }
}
