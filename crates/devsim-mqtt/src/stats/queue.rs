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

// src/stats/queue.rs
// Queue statistics for received messages.
//
// Messages move pending -> processed or pending -> failed. Messages that
// never made it into the queue are counted as dropped or unmatched.

use std::sync::atomic::{AtomicUsize, Ordering};

// QueueStats is a snapshot of received message statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueStats {
    // pending_messages is the current queue depth.
    pub pending_messages: usize,
    pub pending_bytes: usize,
    pub total_processed: usize,
    pub total_failed: usize,
    pub total_bytes_processed: usize,
    // total_dropped counts messages dropped because the local
    // queue was full.
    pub total_dropped: usize,
    pub total_bytes_dropped: usize,
    // total_event_loop_errors counts rumqttc connection errors
    // seen while polling the event loop.
    pub total_event_loop_errors: usize,
    // total_unmatched_topics counts messages whose topic matched
    // no registered filter.
    pub total_unmatched_topics: usize,
    // total_connects counts successful CONNACKs (the first
    // connection plus every reconnect).
    pub total_connects: usize,
}

#[derive(Debug, Default)]
pub struct QueueStatsTracker {
    pending_count: AtomicUsize,
    pending_bytes: AtomicUsize,
    processed_count: AtomicUsize,
    processed_bytes: AtomicUsize,
    dropped_count: AtomicUsize,
    dropped_bytes: AtomicUsize,
    failed_count: AtomicUsize,
    event_loop_errors: AtomicUsize,
    unmatched_topics: AtomicUsize,
    connects: AtomicUsize,
}

impl QueueStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // increment_pending records a message entering the processing queue.
    pub fn increment_pending(&self, bytes: usize) {
        self.pending_count.fetch_add(1, Ordering::Relaxed);
        self.pending_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    // decrement_pending_increment_dropped records a message that was
    // counted as pending but then hit TrySendError::Full.
    pub fn decrement_pending_increment_dropped(&self, bytes: usize) {
        self.pending_count.fetch_sub(1, Ordering::Relaxed);
        self.pending_bytes.fetch_sub(bytes, Ordering::Relaxed);
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
        self.dropped_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_event_loop_errors(&self) {
        self.event_loop_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unmatched_topics(&self) {
        self.unmatched_topics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_connects(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_pending_increment_processed(&self, bytes: usize) {
        self.pending_count.fetch_sub(1, Ordering::Relaxed);
        self.pending_bytes.fetch_sub(bytes, Ordering::Relaxed);
        self.processed_count.fetch_add(1, Ordering::Relaxed);
        self.processed_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn decrement_pending_increment_failed(&self, bytes: usize) {
        self.pending_count.fetch_sub(1, Ordering::Relaxed);
        self.pending_bytes.fetch_sub(bytes, Ordering::Relaxed);
        self.failed_count.fetch_add(1, Ordering::Relaxed);
    }

    // is_empty is true when nothing is waiting to be processed
    // (e.g. wait for this before shutting down).
    pub fn is_empty(&self) -> bool {
        self.pending_count.load(Ordering::Relaxed) == 0
    }

    // reset_counters clears totals. Pending counts reflect current
    // state and are left alone.
    pub fn reset_counters(&self) {
        self.processed_count.store(0, Ordering::Relaxed);
        self.processed_bytes.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.dropped_bytes.store(0, Ordering::Relaxed);
        self.failed_count.store(0, Ordering::Relaxed);
        self.event_loop_errors.store(0, Ordering::Relaxed);
        self.unmatched_topics.store(0, Ordering::Relaxed);
        self.connects.store(0, Ordering::Relaxed);
    }

    pub fn to_stats(&self) -> QueueStats {
        QueueStats {
            pending_messages: self.pending_count.load(Ordering::Relaxed),
            pending_bytes: self.pending_bytes.load(Ordering::Relaxed),
            total_processed: self.processed_count.load(Ordering::Relaxed),
            total_failed: self.failed_count.load(Ordering::Relaxed),
            total_bytes_processed: self.processed_bytes.load(Ordering::Relaxed),
            total_dropped: self.dropped_count.load(Ordering::Relaxed),
            total_bytes_dropped: self.dropped_bytes.load(Ordering::Relaxed),
            total_event_loop_errors: self.event_loop_errors.load(Ordering::Relaxed),
            total_unmatched_topics: self.unmatched_topics.load(Ordering::Relaxed),
            total_connects: self.connects.load(Ordering::Relaxed),
        }
    }
}
