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

use std::{error::Error as StdError, fmt};

/// Extension methods for standard errors.
pub trait StdErrorExt
where
    Self: StdError,
{
    /// Display this error together with all of its sources, separated by ": ".
    fn as_chain(&self) -> ErrorChain<'_, Self> {
        ErrorChain(self)
    }
}

impl<T> StdErrorExt for T where T: StdError + ?Sized {}

/// Display adapter returned by [StdErrorExt::as_chain].
pub struct ErrorChain<'a, E: ?Sized>(&'a E);

impl<E> fmt::Display for ErrorChain<'_, E>
where
    E: StdError + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;

        let mut source = self.0.source();
        while let Some(error) = source {
            write!(f, ": {error}")?;
            source = error.source();
        }

        Ok(())
    }
}
