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
use std::io;
use std::path::{Path, PathBuf};

use snafu::Snafu;

use crate::options::CheckOptions;
use crate::parquet::error::{ErrorKind, ParquetError, ParquetResult};
use crate::parquet::io::{ByteSource, FileSource};
use crate::parquet_read::decode::PageDecoder;
use crate::parquet_read::meta::read_metadata;
use crate::parquet_read::page::Page;
use crate::parquet_read::row_group::{RowGroup, RowGroupReader};
use crate::parquet_read::ColumnDescriptor;

/// The single verdict of a failed check.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CorruptionError {
    #[snafu(display("Potential corruption of file: {}", path.display()))]
    PotentialCorruption { path: PathBuf, source: ParquetError },
}

impl CorruptionError {
    pub fn path(&self) -> &Path {
        match self {
            CorruptionError::PotentialCorruption { path, .. } => path,
        }
    }

    /// The low-level failure, with its row group / column / page context.
    pub fn cause(&self) -> &ParquetError {
        match self {
            CorruptionError::PotentialCorruption { source, .. } => source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.cause().kind()
    }
}

/// What a full scan went through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub row_groups: usize,
    pub column_chunks: usize,
    pub dictionary_pages: usize,
    pub data_pages: usize,
    pub rows: i64,
    pub compressed_bytes: u64,
    pub decoded_bytes: u64,
}

impl ScanSummary {
    pub fn pages(&self) -> usize {
        self.dictionary_pages + self.data_pages
    }

    fn record(&mut self, page: &Page, decoded_len: usize) {
        match page {
            Page::Dict(_) => self.dictionary_pages += 1,
            Page::V1(_) | Page::V2(_) => self.data_pages += 1,
        }
        self.compressed_bytes += page.data().compressed_size() as u64;
        self.decoded_bytes += decoded_len as u64;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The path does not exist. Nothing to check.
    Missing,
    Clean(ScanSummary),
    /// Stopped between row groups; the scanned part was clean.
    Cancelled(ScanSummary),
}

#[derive(Debug, Clone, Default)]
pub struct IntegrityChecker {
    options: CheckOptions,
}

impl IntegrityChecker {
    pub fn new(options: CheckOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Decodes every page of the file at `path`.
    /// A path that does not exist is not an error.
    pub fn check(&self, path: impl AsRef<Path>) -> Result<CheckOutcome, CorruptionError> {
        // Kept local: `ParquetErrorExt` has methods of the same names.
        use snafu::ResultExt as _;

        let path = path.as_ref();
        let source = match FileSource::open(path) {
            Ok(source) => source,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} does not exist, nothing to check", path.display());
                return Ok(CheckOutcome::Missing);
            }
            Err(err) => {
                return Err(ParquetError::from(err)).context(PotentialCorruptionSnafu { path })
            }
        };

        let outcome =
            check_source(&source, &self.options).context(PotentialCorruptionSnafu { path })?;
        match &outcome {
            CheckOutcome::Clean(summary) => log::debug!(
                "{} is clean: {} row groups, {} pages, {} bytes decoded",
                path.display(),
                summary.row_groups,
                summary.pages(),
                summary.decoded_bytes
            ),
            CheckOutcome::Cancelled(summary) => log::info!(
                "check of {} cancelled after {} row groups",
                path.display(),
                summary.row_groups
            ),
            CheckOutcome::Missing => {}
        }
        Ok(outcome)
    }
}

/// Checks the file at `path` with default options.
pub fn check_for_corruption(path: impl AsRef<Path>) -> Result<(), CorruptionError> {
    IntegrityChecker::default().check(path).map(|_| ())
}

/// Runs the full scan over any byte source: footer, then every page of every
/// column of every row group, in file order. Stops at the first failure.
pub fn check_source<S: ByteSource + ?Sized>(
    source: &S,
    options: &CheckOptions,
) -> ParquetResult<CheckOutcome> {
    use crate::parquet::error::ParquetErrorExt as _;

    let metadata = read_metadata(source, options)?;
    let mut summary = ScanSummary::default();
    let mut row_groups = RowGroupReader::new(source, &metadata, options);
    loop {
        if options.is_cancelled() {
            return Ok(CheckOutcome::Cancelled(summary));
        }
        let Some(row_group) = row_groups.next() else {
            break;
        };
        let row_group = row_group?;
        scan_row_group(&row_group, options, &mut summary)
            .with_context(|_| format!("row group {}", row_group.index()))?;
    }
    Ok(CheckOutcome::Clean(summary))
}

fn scan_row_group<S: ByteSource + ?Sized>(
    row_group: &RowGroup<'_, S>,
    options: &CheckOptions,
    summary: &mut ScanSummary,
) -> ParquetResult<()> {
    use crate::parquet::error::ParquetErrorExt as _;

    log::debug!(
        "row group {}: {} rows, {} columns",
        row_group.index(),
        row_group.num_rows(),
        row_group.num_columns()
    );
    for (column, (descriptor, _)) in row_group.columns().enumerate() {
        scan_column(row_group, column, descriptor, options, summary)
            .with_context(|_| format!("column {}", descriptor))?;
    }
    summary.row_groups += 1;
    summary.rows += row_group.num_rows();
    Ok(())
}

fn scan_column<S: ByteSource + ?Sized>(
    row_group: &RowGroup<'_, S>,
    column: usize,
    descriptor: &ColumnDescriptor,
    options: &CheckOptions,
    summary: &mut ScanSummary,
) -> ParquetResult<()> {
    let mut pages = row_group.page_reader(column)?;
    let mut decoder = PageDecoder::new(descriptor, options.verify_checksums());
    if let Some(page) = pages.read_dictionary_page()? {
        let decoded = decoder.decode(&page)?.len();
        summary.record(&page, decoded);
    }
    while let Some(page) = pages.read_page()? {
        let decoded = decoder.decode(&page)?.len();
        summary.record(&page, decoded);
    }
    summary.column_chunks += 1;
    Ok(())
}
