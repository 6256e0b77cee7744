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

// src/client/topic_patterns.rs
// TopicPatterns lets registration methods take one filter or many
// in whatever shape the caller already has them.

#[derive(Debug, Clone, PartialEq)]
pub enum TopicPatterns {
    Single(String),
    Multiple(Vec<String>),
}

impl TopicPatterns {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Single(pattern) => vec![pattern],
            Self::Multiple(patterns) => patterns,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multiple(patterns) => patterns.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(pattern) => pattern.is_empty(),
            Self::Multiple(patterns) => patterns.iter().all(|p| p.is_empty()),
        }
    }

    pub fn contains(&self, pattern: &str) -> bool {
        match self {
            Self::Single(p) => p == pattern,
            Self::Multiple(patterns) => patterns.iter().any(|p| p == pattern),
        }
    }
}

// register_string_message("data")
impl From<&str> for TopicPatterns {
    fn from(pattern: &str) -> Self {
        Self::Single(pattern.to_string())
    }
}

impl From<String> for TopicPatterns {
    fn from(pattern: String) -> Self {
        Self::Single(pattern)
    }
}

// register_string_message(vec!["data", "devices/+/data"])
impl From<Vec<&str>> for TopicPatterns {
    fn from(patterns: Vec<&str>) -> Self {
        Self::Multiple(patterns.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for TopicPatterns {
    fn from(patterns: Vec<String>) -> Self {
        Self::Multiple(patterns)
    }
}

impl<const N: usize> From<[&str; N]> for TopicPatterns {
    fn from(patterns: [&str; N]) -> Self {
        Self::Multiple(patterns.into_iter().map(String::from).collect())
    }
}

impl From<&[String]> for TopicPatterns {
    fn from(patterns: &[String]) -> Self {
        Self::Multiple(patterns.to_vec())
    }
}

impl std::fmt::Display for TopicPatterns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(pattern) => write!(f, "'{pattern}'"),
            Self::Multiple(patterns) => {
                let quoted: Vec<String> = patterns.iter().map(|p| format!("'{p}'")).collect();
                write!(f, "[{}]", quoted.join(", "))
            }
        }
    }
}
