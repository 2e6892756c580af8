// This file is part of validator-monitor.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use derive_more::{Display, From};
use serde::Deserialize;
use std::error::Error as StdError;

/// Identifier of a chat to send messages to or receive messages from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

/// Outbound notification sink.
#[trait_variant::make(Send)]
pub trait Notifier
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), Self::Error>;
}

/// Chat abstraction: a [Notifier] which also receives messages.
#[trait_variant::make(Send)]
pub trait Chat
where
    Self: Notifier,
{
    /// Wait for and return the messages received since the last call; possibly none.
    async fn receive(&mut self) -> Result<Vec<IncomingMessage>, Self::Error>;

    /// Send a text together with a keyboard of the given buttons in a single row.
    async fn send_menu(&self, chat_id: ChatId, text: &str, buttons: &[&str])
    -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub text: String,
}
