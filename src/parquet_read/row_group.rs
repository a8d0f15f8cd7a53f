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
use crate::options::CheckOptions;
use crate::parquet::error::{fmt_err, ParquetErrorExt, ParquetResult};
use crate::parquet::io::ByteSource;
use crate::parquet_read::page::PageReader;
use crate::parquet_read::{ColumnChunkMetadata, ColumnDescriptor, FileMetadata, RowGroupMetadata};

/// Walks the row groups of a file in order, validating each as it is reached.
pub struct RowGroupReader<'a, S: ByteSource + ?Sized> {
    source: &'a S,
    metadata: &'a FileMetadata,
    options: &'a CheckOptions,
    next: usize,
    failed: bool,
}

impl<'a, S: ByteSource + ?Sized> RowGroupReader<'a, S> {
    pub fn new(source: &'a S, metadata: &'a FileMetadata, options: &'a CheckOptions) -> Self {
        Self {
            source,
            metadata,
            options,
            next: 0,
            failed: false,
        }
    }

    fn open(&self, index: usize, row_group: &'a RowGroupMetadata) -> ParquetResult<RowGroup<'a, S>> {
        let columns = &self.metadata.columns;
        if row_group.columns.len() != columns.len() {
            return Err(fmt_err!(
                Layout,
                "row group has {} column chunks, schema has {} columns",
                row_group.columns.len(),
                columns.len()
            ));
        }

        let mut ranges = Vec::with_capacity(columns.len());
        for (descriptor, chunk) in columns.iter().zip(&row_group.columns) {
            let range = chunk
                .validate(descriptor, self.metadata.footer_offset)
                .with_context(|_| format!("column {}", descriptor))?;
            ranges.push(range);
        }

        let mut sorted: Vec<(u64, u64)> = ranges.iter().copied().filter(|r| r.1 > 0).collect();
        sorted.sort_unstable();
        for pair in sorted.windows(2) {
            let (start, len) = pair[0];
            if start + len > pair[1].0 {
                return Err(fmt_err!(
                    Layout,
                    "column chunks {}..{} and {}..{} overlap",
                    start,
                    start + len,
                    pair[1].0,
                    pair[1].0 + pair[1].1
                ));
            }
        }

        Ok(RowGroup {
            index,
            source: self.source,
            metadata: row_group,
            columns,
            ranges,
            max_page_size: self.options.max_page_size(),
        })
    }
}

impl<'a, S: ByteSource + ?Sized> Iterator for RowGroupReader<'a, S> {
    type Item = ParquetResult<RowGroup<'a, S>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let index = self.next;
        let row_group = self.metadata.row_groups.get(index)?;
        self.next += 1;
        let res = self
            .open(index, row_group)
            .with_context(|_| format!("row group {}", index));
        self.failed = res.is_err();
        Some(res)
    }
}

/// A validated row group: hands out one page reader per column.
pub struct RowGroup<'a, S: ByteSource + ?Sized> {
    index: usize,
    source: &'a S,
    metadata: &'a RowGroupMetadata,
    columns: &'a [ColumnDescriptor],
    ranges: Vec<(u64, u64)>,
    max_page_size: usize,
}

impl<'a, S: ByteSource + ?Sized> RowGroup<'a, S> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn num_rows(&self) -> i64 {
        self.metadata.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&'a ColumnDescriptor, &'a ColumnChunkMetadata)> {
        self.columns.iter().zip(self.metadata.columns.iter())
    }

    pub fn page_reader(&self, column: usize) -> ParquetResult<PageReader<'a, S>> {
        let chunk = self.metadata.columns.get(column).ok_or_else(|| {
            fmt_err!(
                Layout,
                "column index {} out of range for {} columns",
                column,
                self.columns.len()
            )
        })?;
        let (start, len) = self.ranges[column];
        PageReader::new(self.source, chunk, start, len, self.max_page_size)
    }
}
