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

use crate::domain::{Endpoint, ValidatorSnapshot};
use std::error::Error as StdError;

/// Node abstraction.
#[trait_variant::make(Send)]
pub trait Node
where
    Self: Clone + Send + Sync + 'static,
{
    /// Error type for failed calls; all are considered transient.
    type Error: StdError + Send + Sync + 'static;

    /// Fetch the validator set of the current epoch from the given endpoint.
    async fn validators(&self, endpoint: &Endpoint) -> Result<ValidatorSnapshot, Self::Error>;
}
