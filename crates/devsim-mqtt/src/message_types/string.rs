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

// src/message_types/string.rs
// StringMessage is a UTF-8 text payload, which is what the simulated
// devices send ("Device 1 : Data 7").

use tracing::warn;

use crate::traits::RawMessageType;

#[derive(Clone, Debug, PartialEq)]
pub struct StringMessage {
    // content is the decoded text of the message.
    pub content: String,
    // lossy is set when the received bytes were not valid UTF-8 and
    // invalid sequences were replaced with U+FFFD.
    pub lossy: bool,
}

impl StringMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            lossy: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn into_string(self) -> String {
        self.content
    }
}

impl RawMessageType for StringMessage {
    fn to_bytes(&self) -> Vec<u8> {
        self.content.as_bytes().to_vec()
    }

    // from_bytes never fails: invalid UTF-8 is decoded lossily and
    // flagged, so a bad payload can't take down a subscriber.
    fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(content) => Self {
                content,
                lossy: false,
            },
            Err(e) => {
                warn!("Received payload is not valid UTF-8: {}", e.utf8_error());
                Self {
                    content: String::from_utf8_lossy(e.as_bytes()).into_owned(),
                    lossy: true,
                }
            }
        }
    }
}

impl From<String> for StringMessage {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

impl From<&str> for StringMessage {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<StringMessage> for String {
    fn from(msg: StringMessage) -> String {
        msg.content
    }
}

impl std::fmt::Display for StringMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}
