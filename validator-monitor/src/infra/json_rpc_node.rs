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

use crate::domain::{Endpoint, Node, ValidatorSnapshot};
use fastrace::trace;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Config for node connections.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// RPC endpoints, used in the given order.
    pub endpoints: Vec<Endpoint>,

    #[serde(with = "humantime_serde", default = "request_timeout_default")]
    pub request_timeout: Duration,
}

/// A [Node] implementation calling the JSON-RPC `validators` method over HTTP.
#[derive(Debug, Clone)]
pub struct JsonRpcNode {
    http: Client,
}

impl JsonRpcNode {
    pub fn new(config: &Config) -> Result<Self, JsonRpcNodeError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(JsonRpcNodeError::Client)?;

        Ok(Self { http })
    }
}

impl Node for JsonRpcNode {
    type Error = JsonRpcNodeError;

    #[trace]
    async fn validators(&self, endpoint: &Endpoint) -> Result<ValidatorSnapshot, Self::Error> {
        let request = Request {
            jsonrpc: "2.0",
            id: "dontcare",
            method: "validators",
            params: [Value::Null],
        };

        let response = self
            .http
            .post(endpoint.as_str())
            .json(&request)
            .send()
            .await
            .map_err(JsonRpcNodeError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(JsonRpcNodeError::Status(status));
        }

        let body = response.bytes().await.map_err(JsonRpcNodeError::Http)?;
        decode(&body)
    }
}

#[derive(Debug, Error)]
pub enum JsonRpcNodeError {
    #[error("cannot create HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("cannot call RPC endpoint")]
    Http(#[source] reqwest::Error),

    #[error("RPC endpoint responded with HTTP status {0}")]
    Status(StatusCode),

    #[error("RPC returned empty response")]
    EmptyResponse,

    #[error("RPC error {code}: {message} ({data})")]
    Rpc {
        code: i64,
        message: String,
        data: Value,
    },

    #[error("cannot decode RPC response")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'a str,
    id: &'a str,
    method: &'a str,
    params: [Value; 1],
}

#[derive(Debug, Deserialize)]
struct Response<T> {
    result: Option<T>,
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,

    #[serde(default)]
    data: Value,
}

fn decode(body: &[u8]) -> Result<ValidatorSnapshot, JsonRpcNodeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(JsonRpcNodeError::EmptyResponse);
    }

    let response = serde_json::from_slice::<Response<ValidatorSnapshot>>(body)?;

    match response {
        Response {
            error: Some(ErrorObject {
                code,
                message,
                data,
            }),
            ..
        } => Err(JsonRpcNodeError::Rpc {
            code,
            message,
            data,
        }),

        Response {
            result: Some(snapshot),
            ..
        } => Ok(snapshot),

        Response { result: None, .. } => Err(JsonRpcNodeError::EmptyResponse),
    }
}

fn request_timeout_default() -> Duration {
    Duration::from_secs(10)
}

#[cfg(test)]
mod tests {
    use crate::infra::json_rpc_node::{JsonRpcNodeError, decode};
    use assert_matches::assert_matches;
    use indoc::indoc;

    #[test]
    fn test_decode() {
        let body = indoc! {r#"{
            "jsonrpc": "2.0",
            "id": "dontcare",
            "result": {
                "current_validators": [
                    {
                        "account_id": "lux.poolv1.near",
                        "stake": "1000000000000000000000000",
                        "num_produced_blocks": 1,
                        "num_expected_blocks": 1
                    }
                ],
                "next_validators": [],
                "current_proposals": []
            }
        }"#};

        assert_matches!(decode(body.as_bytes()), Ok(snapshot) if snapshot.current.len() == 1);
    }

    #[test]
    fn test_decode_empty() {
        assert_matches!(decode(b""), Err(JsonRpcNodeError::EmptyResponse));
        assert_matches!(decode(b" \n"), Err(JsonRpcNodeError::EmptyResponse));
        assert_matches!(
            decode(br#"{ "jsonrpc": "2.0", "id": "dontcare", "result": null }"#),
            Err(JsonRpcNodeError::EmptyResponse)
        );
    }

    #[test]
    fn test_decode_error() {
        let body = indoc! {r#"{
            "jsonrpc": "2.0",
            "id": "dontcare",
            "error": {
                "name": "HANDLER_ERROR",
                "code": -32000,
                "message": "Server error",
                "data": "validator info unavailable"
            }
        }"#};

        let error = decode(body.as_bytes());
        assert_matches!(
            &error,
            Err(JsonRpcNodeError::Rpc { code: -32000, message, .. }) if message == "Server error"
        );
        assert_eq!(
            error.map(|_| ()).unwrap_err().to_string(),
            r#"RPC error -32000: Server error ("validator info unavailable")"#
        );

        assert_matches!(decode(b"<html>"), Err(JsonRpcNodeError::Decode(_)));
    }
}
