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

use crate::domain::{Chat, ChatId, IncomingMessage, Notifier};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use thiserror::Error;

/// Slack on top of the long polling timeout before a request is considered failed.
const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Config for the Telegram Bot API.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub token: SecretString,

    #[serde(default = "api_url_default")]
    pub api_url: String,

    #[serde(with = "humantime_serde", default = "poll_timeout_default")]
    pub poll_timeout: Duration,
}

/// A [Chat] implementation based on the Telegram Bot API with long polling.
#[derive(Debug, Clone)]
pub struct TelegramChat {
    http: Client,
    api_url: String,
    token: SecretString,
    poll_timeout: Duration,
    offset: Option<i64>,
}

impl TelegramChat {
    pub fn new(config: Config) -> Result<Self, TelegramError> {
        let Config {
            token,
            api_url,
            poll_timeout,
        } = config;

        let http = Client::builder()
            .timeout(poll_timeout + HTTP_TIMEOUT_MARGIN)
            .build()
            .map_err(|error| TelegramError::Http(error.without_url()))?;

        Ok(Self {
            http,
            api_url,
            token,
            poll_timeout,
            offset: None,
        })
    }

    async fn call<P, T>(&self, method: &str, params: &P) -> Result<T, TelegramError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // The URL contains the token, hence it is stripped from errors.
        let url = format!("{}/bot{}/{method}", self.api_url, self.token.expose_secret());

        let response = self
            .http
            .post(url)
            .json(params)
            .send()
            .await
            .map_err(|error| TelegramError::Http(error.without_url()))?
            .json::<ApiResponse<T>>()
            .await
            .map_err(|error| TelegramError::Http(error.without_url()))?;

        response.into_result(method)
    }
}

impl Notifier for TelegramChat {
    type Error = TelegramError;

    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), Self::Error> {
        let params = SendMessage {
            chat_id: chat_id.0,
            text,
            reply_markup: None,
        };

        self.call::<_, Value>("sendMessage", &params).await?;
        Ok(())
    }
}

impl Chat for TelegramChat {
    async fn receive(&mut self) -> Result<Vec<IncomingMessage>, Self::Error> {
        let params = GetUpdates {
            offset: self.offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: &["message"],
        };

        let updates = self.call::<_, Vec<Update>>("getUpdates", &params).await?;
        Ok(messages(updates, &mut self.offset))
    }

    async fn send_menu(
        &self,
        chat_id: ChatId,
        text: &str,
        buttons: &[&str],
    ) -> Result<(), Self::Error> {
        let row = buttons
            .iter()
            .map(|&text| KeyboardButton { text })
            .collect::<Vec<_>>();
        let params = SendMessage {
            chat_id: chat_id.0,
            text,
            reply_markup: Some(ReplyKeyboardMarkup {
                keyboard: vec![row],
                resize_keyboard: true,
            }),
        };

        self.call::<_, Value>("sendMessage", &params).await?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("cannot call Telegram Bot API")]
    Http(#[source] reqwest::Error),

    #[error("Telegram Bot API method {method} failed: {description}")]
    Api { method: String, description: String },
}

type Value = serde_json::Value;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyKeyboardMarkup<'a>>,
}

#[derive(Debug, Serialize)]
struct ReplyKeyboardMarkup<'a> {
    keyboard: Vec<Vec<KeyboardButton<'a>>>,
    resize_keyboard: bool,
}

#[derive(Debug, Serialize)]
struct KeyboardButton<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GetUpdates<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T, TelegramError> {
        match self {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),

            ApiResponse { description, .. } => Err(TelegramError::Api {
                method: method.to_owned(),
                description: description.unwrap_or_else(|| "no result".to_owned()),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: MessageChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageChat {
    id: i64,
}

/// Text messages of the given updates; advances the offset past the last update.
fn messages(updates: Vec<Update>, offset: &mut Option<i64>) -> Vec<IncomingMessage> {
    if let Some(last) = updates.iter().map(|update| update.update_id).max() {
        *offset = Some(last + 1);
    }

    updates
        .into_iter()
        .filter_map(|update| update.message)
        .filter_map(|message| {
            message.text.map(|text| IncomingMessage {
                chat_id: ChatId(message.chat.id),
                text,
            })
        })
        .collect()
}

fn api_url_default() -> String {
    "https://api.telegram.org".to_owned()
}

fn poll_timeout_default() -> Duration {
    Duration::from_secs(30)
}
