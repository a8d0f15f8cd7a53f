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
use std::io::{BufReader, Read, Seek, SeekFrom, Take};

use parquet_format_safe::thrift::protocol::TCompactInputProtocol;
use parquet_format_safe::{PageHeader, PageType};

use crate::parquet::compression::Compression;
use crate::parquet::error::{fmt_err, ParquetErrorExt, ParquetResult};
use crate::parquet::io::{ByteSource, SourceStream};
use crate::parquet_read::{ColumnChunkMetadata, Encoding};

const MAX_READ_BUFFER_SIZE: u64 = 64 * 1024;

/// The stored bytes of a page and the header fields shared by all page kinds.
#[derive(Debug, Clone)]
pub struct PageBuffer {
    /// File offset of the page header.
    pub offset: u64,
    pub header_size: usize,
    /// The payload as stored, possibly compressed.
    pub buffer: Vec<u8>,
    pub uncompressed_size: usize,
    pub compression: Compression,
    pub crc: Option<u32>,
}

impl PageBuffer {
    pub fn compressed_size(&self) -> usize {
        self.buffer.len()
    }

    /// File offset of the first payload byte.
    pub fn payload_offset(&self) -> u64 {
        self.offset + self.header_size as u64
    }
}

#[derive(Debug, Clone)]
pub struct DictPage {
    pub data: PageBuffer,
    pub num_values: usize,
    pub encoding: Encoding,
    pub is_sorted: bool,
}

#[derive(Debug, Clone)]
pub struct DataPageV1 {
    pub data: PageBuffer,
    pub num_values: usize,
    pub encoding: Encoding,
    pub def_level_encoding: Encoding,
    pub rep_level_encoding: Encoding,
}

/// Levels are stored uncompressed in front of the (optionally compressed) values.
#[derive(Debug, Clone)]
pub struct DataPageV2 {
    pub data: PageBuffer,
    pub num_values: usize,
    pub num_nulls: usize,
    pub num_rows: usize,
    pub encoding: Encoding,
    pub def_levels_byte_length: usize,
    pub rep_levels_byte_length: usize,
    pub is_compressed: bool,
}

impl DataPageV2 {
    pub fn levels_byte_length(&self) -> usize {
        self.def_levels_byte_length + self.rep_levels_byte_length
    }
}

#[derive(Debug, Clone)]
pub enum Page {
    Dict(DictPage),
    V1(DataPageV1),
    V2(DataPageV2),
}

impl Page {
    pub fn data(&self) -> &PageBuffer {
        match self {
            Page::Dict(page) => &page.data,
            Page::V1(page) => &page.data,
            Page::V2(page) => &page.data,
        }
    }

    pub fn offset(&self) -> u64 {
        self.data().offset
    }

    pub fn num_values(&self) -> usize {
        match self {
            Page::Dict(page) => page.num_values,
            Page::V1(page) => page.num_values,
            Page::V2(page) => page.num_values,
        }
    }
}

/// Counts the bytes the thrift deserializer pulls, so the header size is known.
struct CountingReader<'r, R> {
    inner: &'r mut R,
    count: u64,
}

impl<R: Read> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

/// Iterates the pages of one column chunk in file order.
///
/// Reads strictly forward: every byte of the chunk is fetched from the source once.
pub struct PageReader<'a, S: ByteSource + ?Sized> {
    reader: BufReader<Take<SourceStream<'a, S>>>,
    chunk_start: u64,
    chunk_len: u64,
    consumed: u64,
    compression: Compression,
    declared_values: i64,
    seen_values: i64,
    seen_dictionary: bool,
    seen_data: bool,
    pending: Option<Page>,
    max_page_size: usize,
    failed: bool,
}

impl<'a, S: ByteSource + ?Sized> PageReader<'a, S> {
    /// `start` and `len` must already be validated against the file layout.
    pub fn new(
        source: &'a S,
        chunk: &ColumnChunkMetadata,
        start: u64,
        len: u64,
        max_page_size: usize,
    ) -> ParquetResult<Self> {
        let mut stream = SourceStream::new(source);
        stream.seek(SeekFrom::Start(start))?;
        let capacity = len.clamp(1, MAX_READ_BUFFER_SIZE) as usize;
        Ok(Self {
            reader: BufReader::with_capacity(capacity, stream.take(len)),
            chunk_start: start,
            chunk_len: len,
            consumed: 0,
            compression: chunk.compression,
            declared_values: chunk.num_values,
            seen_values: 0,
            seen_dictionary: false,
            seen_data: false,
            pending: None,
            max_page_size,
            failed: false,
        })
    }

    /// Returns the dictionary page if the chunk starts with one.
    /// A data page read while looking is kept for the next [`Self::read_page`].
    pub fn read_dictionary_page(&mut self) -> ParquetResult<Option<Page>> {
        if self.seen_dictionary || self.seen_data || self.pending.is_some() {
            return Ok(None);
        }
        match self.next_page()? {
            Some(page @ Page::Dict(_)) => Ok(Some(page)),
            Some(page) => {
                self.pending = Some(page);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Returns the next page, or `None` once the chunk's byte span is consumed.
    pub fn read_page(&mut self) -> ParquetResult<Option<Page>> {
        if let Some(page) = self.pending.take() {
            return Ok(Some(page));
        }
        self.next_page()
    }

    fn remaining(&self) -> u64 {
        self.chunk_len - self.consumed
    }

    fn next_page(&mut self) -> ParquetResult<Option<Page>> {
        loop {
            if self.remaining() == 0 {
                if self.seen_values != self.declared_values {
                    return Err(fmt_err!(
                        Layout,
                        "pages hold {} values, column chunk declares {}",
                        self.seen_values,
                        self.declared_values
                    ));
                }
                return Ok(None);
            }

            let offset = self.chunk_start + self.consumed;
            let (header, header_size) = self
                .read_header()
                .with_context(|_| format!("page header at offset {}", offset))?;
            self.consumed += header_size;

            match self.read_payload(header, offset, header_size)? {
                Some(page) => return Ok(Some(page)),
                None => continue,
            }
        }
    }

    fn read_header(&mut self) -> ParquetResult<(PageHeader, u64)> {
        let mut counting = CountingReader {
            inner: &mut self.reader,
            count: 0,
        };
        let header = {
            let mut prot = TCompactInputProtocol::new(&mut counting, self.max_page_size);
            PageHeader::read_from_in_protocol(&mut prot)?
        };
        Ok((header, counting.count))
    }

    /// Reads the payload of a page; `None` for pages that carry no column data.
    fn read_payload(
        &mut self,
        header: PageHeader,
        offset: u64,
        header_size: u64,
    ) -> ParquetResult<Option<Page>> {
        let compressed_size = self.page_size(header.compressed_page_size, offset)?;
        let uncompressed_size = self.page_size(header.uncompressed_page_size, offset)?;
        if compressed_size as u64 > self.remaining() {
            return Err(fmt_err!(
                Layout,
                "page at offset {} of {} bytes overruns its column chunk, {} bytes remain",
                offset,
                compressed_size,
                self.remaining()
            ));
        }

        let mut buffer = vec![0u8; compressed_size];
        self.reader.read_exact(&mut buffer)?;
        self.consumed += compressed_size as u64;

        let data = PageBuffer {
            offset,
            header_size: header_size as usize,
            buffer,
            uncompressed_size,
            compression: self.compression,
            crc: header.crc.map(|crc| crc as u32),
        };

        let page = match header.type_ {
            PageType::DICTIONARY_PAGE => {
                if self.seen_dictionary || self.seen_data {
                    return Err(fmt_err!(
                        Layout,
                        "dictionary page at offset {} is not the first page of its chunk",
                        offset
                    ));
                }
                let dict_header = header.dictionary_page_header.ok_or_else(|| {
                    fmt_err!(Layout, "dictionary page at offset {} has no header", offset)
                })?;
                self.seen_dictionary = true;
                Page::Dict(DictPage {
                    data,
                    num_values: count(dict_header.num_values, "dictionary values", offset)?,
                    encoding: Encoding::try_from(dict_header.encoding)?,
                    is_sorted: dict_header.is_sorted.unwrap_or(false),
                })
            }
            PageType::DATA_PAGE => {
                let data_header = header.data_page_header.ok_or_else(|| {
                    fmt_err!(Layout, "data page at offset {} has no header", offset)
                })?;
                let num_values = count(data_header.num_values, "values", offset)?;
                self.add_values(num_values);
                Page::V1(DataPageV1 {
                    data,
                    num_values,
                    encoding: Encoding::try_from(data_header.encoding)?,
                    def_level_encoding: Encoding::try_from(data_header.definition_level_encoding)?,
                    rep_level_encoding: Encoding::try_from(data_header.repetition_level_encoding)?,
                })
            }
            PageType::DATA_PAGE_V2 => {
                let data_header = header.data_page_header_v2.ok_or_else(|| {
                    fmt_err!(Layout, "data page v2 at offset {} has no header", offset)
                })?;
                let num_values = count(data_header.num_values, "values", offset)?;
                let num_nulls = count(data_header.num_nulls, "nulls", offset)?;
                let def_levels_byte_length = count(
                    data_header.definition_levels_byte_length,
                    "definition level bytes",
                    offset,
                )?;
                let rep_levels_byte_length = count(
                    data_header.repetition_levels_byte_length,
                    "repetition level bytes",
                    offset,
                )?;
                let levels = def_levels_byte_length as u64 + rep_levels_byte_length as u64;
                if levels > compressed_size as u64 || levels > uncompressed_size as u64 {
                    return Err(fmt_err!(
                        Layout,
                        "data page v2 at offset {} declares {} level bytes in a page of {}",
                        offset,
                        levels,
                        compressed_size
                    ));
                }
                if num_nulls > num_values {
                    return Err(fmt_err!(
                        Layout,
                        "data page v2 at offset {} declares {} nulls for {} values",
                        offset,
                        num_nulls,
                        num_values
                    ));
                }
                self.add_values(num_values);
                Page::V2(DataPageV2 {
                    data,
                    num_values,
                    num_nulls,
                    num_rows: count(data_header.num_rows, "rows", offset)?,
                    encoding: Encoding::try_from(data_header.encoding)?,
                    def_levels_byte_length,
                    rep_levels_byte_length,
                    is_compressed: data_header.is_compressed.unwrap_or(true),
                })
            }
            PageType::INDEX_PAGE => {
                log::trace!("skipping index page at offset {}", offset);
                return Ok(None);
            }
            other => {
                return Err(fmt_err!(
                    Layout,
                    "unknown page type {} at offset {}",
                    other.0,
                    offset
                ))
            }
        };
        log::trace!(
            "page at offset {}: {} stored bytes, {} values",
            offset,
            page.data().compressed_size(),
            page.num_values()
        );
        Ok(Some(page))
    }

    fn add_values(&mut self, num_values: usize) {
        self.seen_data = true;
        self.seen_values = self.seen_values.saturating_add(num_values as i64);
    }

    fn page_size(&self, size: i32, offset: u64) -> ParquetResult<usize> {
        let size = count(size, "page bytes", offset)?;
        if size > self.max_page_size {
            return Err(fmt_err!(
                Layout,
                "page at offset {} declares {} bytes, the limit is {}",
                offset,
                size,
                self.max_page_size
            ));
        }
        Ok(size)
    }
}

fn count(value: i32, what: &str, offset: u64) -> ParquetResult<usize> {
    usize::try_from(value)
        .map_err(|_| fmt_err!(Layout, "page at offset {} declares {} {}", offset, value, what))
}

impl<S: ByteSource + ?Sized> Iterator for PageReader<'_, S> {
    type Item = ParquetResult<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_page() {
            Ok(Some(page)) => Some(Ok(page)),
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
