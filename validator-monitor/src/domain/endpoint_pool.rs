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
use parking_lot::Mutex;
use serde::Deserialize;
use thiserror::Error;

/// URL of a node RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Display, From, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Endpoint {
    fn from(endpoint: &str) -> Self {
        Self(endpoint.to_owned())
    }
}

/// Fixed, non-empty, ordered set of endpoints with a cursor pointing at the one to use. Shared by
/// the monitor and the query handling, hence the cursor is guarded; the lock is only held to read
/// or advance the cursor, never across a call to an endpoint.
#[derive(Debug)]
pub struct EndpointPool {
    endpoints: Vec<Endpoint>,
    cursor: Mutex<usize>,
}

impl EndpointPool {
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self, EndpointPoolError> {
        if endpoints.is_empty() {
            return Err(EndpointPoolError::Empty);
        }

        Ok(Self {
            endpoints,
            cursor: Mutex::new(0),
        })
    }

    /// The endpoint to use next.
    pub fn current(&self) -> Endpoint {
        let cursor = self.cursor.lock();
        self.endpoints[*cursor].clone()
    }

    /// Advance to the next endpoint, wrapping around after the last one.
    pub fn rotate(&self) {
        let mut cursor = self.cursor.lock();
        *cursor = (*cursor + 1) % self.endpoints.len();
    }

    pub fn cursor(&self) -> usize {
        *self.cursor.lock()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum EndpointPoolError {
    #[error("at least one RPC endpoint must be configured")]
    Empty,
}
