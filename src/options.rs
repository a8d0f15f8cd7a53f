/*******************************************************************************
 *     ___                  _   ____  ____
 *    / _ \ _   _  ___  ___| |_|  _ \| __ )
 *   | | | | | | |/ _ \/ __| __| | | |  _ \
 *   | |_| | |_| |  __/\__ \ |_| |_| | |_) |
 *    \__\_\\__,_|\___||___/\__|____/|____/
 *
 *  Copyright (c) 2014-2019 Appsicle
 *  Copyright (c) 2019-2026 QuestDB
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *  http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 *
 ******************************************************************************/
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Largest page (compressed or uncompressed) accepted by default.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1024 * 1024 * 1024;
/// Largest serialized footer accepted by default.
pub const DEFAULT_MAX_FOOTER_SIZE: usize = 256 * 1024 * 1024;

/// Shared flag to stop a running check between row groups.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct CheckOptions {
    max_page_size: usize,
    max_footer_size: usize,
    verify_checksums: bool,
    cancellation: Option<CancellationToken>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_footer_size: DEFAULT_MAX_FOOTER_SIZE,
            verify_checksums: true,
            cancellation: None,
        }
    }
}

impl CheckOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the upper bound on declared page sizes.
    /// Larger pages are reported as layout errors instead of being allocated.
    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    pub fn with_max_footer_size(mut self, max_footer_size: usize) -> Self {
        self.max_footer_size = max_footer_size;
        self
    }

    /// Verify page CRCs when the writer stored them. Defaults to `true`.
    pub fn with_verify_checksums(mut self, verify_checksums: bool) -> Self {
        self.verify_checksums = verify_checksums;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    pub fn max_footer_size(&self) -> usize {
        self.max_footer_size
    }

    pub fn verify_checksums(&self) -> bool {
        self.verify_checksums
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}
