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

// src/stats/publish.rs
// Publish statistics for sent messages.

use std::sync::atomic::{AtomicUsize, Ordering};

// PublishStats is a snapshot of sent message statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishStats {
    // total_published is the count of publishes accepted by the
    // client request queue.
    pub total_published: usize,
    // total_written is the count of publishes the event loop has
    // actually written to the broker connection.
    pub total_written: usize,
    // total_failed is the count of publishes rejected before
    // reaching the request queue (bad topic, closed client).
    pub total_failed: usize,
    pub total_bytes_published: usize,
}

#[derive(Debug, Default)]
pub struct PublishStatsTracker {
    published_count: AtomicUsize,
    written_count: AtomicUsize,
    failed_count: AtomicUsize,
    published_bytes: AtomicUsize,
}

impl PublishStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // increment_published records a publish handed to rumqttc.
    // (e.g. increment_published(17) for "Device 1 : Data 0").
    pub fn increment_published(&self, bytes: usize) {
        self.published_count.fetch_add(1, Ordering::Relaxed);
        self.published_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    // increment_written records an Outgoing::Publish event from
    // the event loop.
    pub fn increment_written(&self) {
        self.written_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.failed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset_counters(&self) {
        self.published_count.store(0, Ordering::Relaxed);
        self.written_count.store(0, Ordering::Relaxed);
        self.failed_count.store(0, Ordering::Relaxed);
        self.published_bytes.store(0, Ordering::Relaxed);
    }

    pub fn to_stats(&self) -> PublishStats {
        PublishStats {
            total_published: self.published_count.load(Ordering::Relaxed),
            total_written: self.written_count.load(Ordering::Relaxed),
            total_failed: self.failed_count.load(Ordering::Relaxed),
            total_bytes_published: self.published_bytes.load(Ordering::Relaxed),
        }
    }
}
