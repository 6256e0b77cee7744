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

// src/topics.rs
// MQTT topic name and topic filter handling.
//
// Topic names are what gets published to ("data", "devices/1/data"),
// topic filters are what gets subscribed to and may contain the "+"
// (single level) and "#" (multi level) wildcards. Rules follow
// MQTT 3.1.1 section 4.7.

use crate::errors::SimClientError;

pub const LEVEL_SEPARATOR: char = '/';
pub const SINGLE_LEVEL_WILDCARD: &str = "+";
pub const MULTI_LEVEL_WILDCARD: &str = "#";

// Topics are length-prefixed with a u16 on the wire.
const MAX_TOPIC_LEN: usize = 65_535;

// validate_topic_name checks a topic that will be published to.
pub fn validate_topic_name(topic: &str) -> Result<(), SimClientError> {
    check_common(topic)?;
    if topic.contains(['+', '#']) {
        return Err(SimClientError::invalid_topic(format!(
            "wildcards are not allowed in topic names: '{topic}'"
        )));
    }
    Ok(())
}

// validate_topic_filter checks a subscription filter. "+" must occupy
// a whole level, "#" must occupy the whole last level.
pub fn validate_topic_filter(filter: &str) -> Result<(), SimClientError> {
    check_common(filter)?;
    let levels: Vec<&str> = filter.split(LEVEL_SEPARATOR).collect();
    let last = levels.len() - 1;
    for (i, level) in levels.iter().enumerate() {
        if level.contains('#') && (*level != MULTI_LEVEL_WILDCARD || i != last) {
            return Err(SimClientError::invalid_topic(format!(
                "'#' must be the entire last level of filter '{filter}'"
            )));
        }
        if level.contains('+') && *level != SINGLE_LEVEL_WILDCARD {
            return Err(SimClientError::invalid_topic(format!(
                "'+' must occupy an entire level of filter '{filter}'"
            )));
        }
    }
    Ok(())
}

fn check_common(s: &str) -> Result<(), SimClientError> {
    if s.is_empty() {
        return Err(SimClientError::invalid_topic("topic must not be empty"));
    }
    if s.len() > MAX_TOPIC_LEN {
        return Err(SimClientError::invalid_topic(format!(
            "topic is {} bytes, max is {MAX_TOPIC_LEN}",
            s.len()
        )));
    }
    if s.contains('\0') {
        return Err(SimClientError::invalid_topic(
            "topic must not contain NUL characters",
        ));
    }
    Ok(())
}

// is_wildcard_filter returns true if the filter contains any wildcard.
pub fn is_wildcard_filter(filter: &str) -> bool {
    filter
        .split(LEVEL_SEPARATOR)
        .any(|level| level == SINGLE_LEVEL_WILDCARD || level == MULTI_LEVEL_WILDCARD)
}

// topic_matches reports whether a topic name matches a filter. The
// filter is assumed to be valid.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    // Filters starting with a wildcard never match $SYS-style topics.
    if topic.starts_with('$')
        && (filter.starts_with(SINGLE_LEVEL_WILDCARD) || filter.starts_with(MULTI_LEVEL_WILDCARD))
    {
        return false;
    }

    let mut filter_levels = filter.split(LEVEL_SEPARATOR);
    let mut topic_levels = topic.split(LEVEL_SEPARATOR);
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some(MULTI_LEVEL_WILDCARD), _) => return true,
            (Some(SINGLE_LEVEL_WILDCARD), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

// filter_to_regex compiles a topic filter into an anchored regular
// expression with the same matching semantics as topic_matches.
pub fn filter_to_regex(filter: &str) -> String {
    let levels: Vec<&str> = filter.split(LEVEL_SEPARATOR).collect();
    let mut out = String::from("^");
    for (i, level) in levels.iter().enumerate() {
        let first = i == 0;
        match *level {
            MULTI_LEVEL_WILDCARD if first => out.push_str(r"(?:[^$].*)?"),
            // "a/#" also matches the parent level "a".
            MULTI_LEVEL_WILDCARD => out.push_str(r"(?:/.*)?"),
            SINGLE_LEVEL_WILDCARD => {
                if !first {
                    out.push('/');
                }
                if first {
                    out.push_str(r"(?:[^/$][^/]*)?");
                } else {
                    out.push_str(r"[^/]*");
                }
            }
            literal => {
                if !first {
                    out.push('/');
                }
                out.push_str(&regex::escape(literal));
            }
        }
    }
    out.push('$');
    out
}
