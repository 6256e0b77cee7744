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

use std::io::Write;
use std::sync::Mutex;

/// Where user-facing lines (payloads, banners) are written.
pub trait LineSink: Send + Sync + 'static {
    fn write_line(&self, line: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn write_line(&self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        // stdout may already be closed, e.g. `devsim subscribe | head`.
        if let Err(e) = writeln!(stdout, "{line}").and_then(|()| stdout.flush()) {
            tracing::debug!("Failed to write to stdout: {e}");
        }
    }
}

/// Collects lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, line: &str) {
        let mut lines = self
            .lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        lines.push(line.to_string());
    }
}
