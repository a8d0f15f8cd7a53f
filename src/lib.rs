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
//! Full structural scan of Parquet files: every page of every column chunk
//! is read, checksummed when a CRC is present, decompressed and decoded.
//! Any failure is reported as a single [`CorruptionError`] for the file.

pub mod check;
pub mod logging;
pub mod options;
pub mod parquet;
pub mod parquet_read;

pub use check::{
    check_for_corruption, check_source, CheckOutcome, CorruptionError, IntegrityChecker,
    ScanSummary,
};
pub use options::{CancellationToken, CheckOptions};
pub use parquet::error::{ErrorKind, ParquetError, ParquetResult};
pub use parquet::io::{ByteSource, FileSource, SourceStream};
pub use parquet_read::decode::PageDecoder;
pub use parquet_read::meta::read_metadata;
pub use parquet_read::page::{Page, PageReader};
pub use parquet_read::row_group::{RowGroup, RowGroupReader};
pub use parquet_read::FileMetadata;
