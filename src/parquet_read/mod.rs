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
use std::fmt::{Display, Formatter};

use parquet_format_safe::{Encoding as ParquetEncoding, Type as ParquetType};

use crate::parquet::compression::Compression;
use crate::parquet::error::{fmt_err, ParquetError, ParquetResult};

pub mod decode;
pub mod decoders;
pub mod meta;
pub mod page;
pub mod row_group;

/// Leading and trailing file marker.
pub const PARQUET_MAGIC: [u8; 4] = *b"PAR1";
/// Trailing marker of a file with an encrypted footer.
pub const PARQUET_ENCRYPTED_MAGIC: [u8; 4] = *b"PARE";
/// Footer length (i32) followed by the magic.
pub const FOOTER_TRAILER_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Int96,
    Float,
    Double,
    ByteArray,
    FixedLenByteArray(usize),
}

impl PhysicalType {
    pub(crate) fn from_thrift(type_: ParquetType, type_length: Option<i32>) -> ParquetResult<Self> {
        Ok(match type_ {
            ParquetType::BOOLEAN => PhysicalType::Boolean,
            ParquetType::INT32 => PhysicalType::Int32,
            ParquetType::INT64 => PhysicalType::Int64,
            ParquetType::INT96 => PhysicalType::Int96,
            ParquetType::FLOAT => PhysicalType::Float,
            ParquetType::DOUBLE => PhysicalType::Double,
            ParquetType::BYTE_ARRAY => PhysicalType::ByteArray,
            ParquetType::FIXED_LEN_BYTE_ARRAY => {
                let length = type_length.ok_or_else(|| {
                    fmt_err!(Layout, "FIXED_LEN_BYTE_ARRAY column without a type length")
                })?;
                let length: usize = length.try_into()?;
                PhysicalType::FixedLenByteArray(length)
            }
            other => return Err(fmt_err!(Layout, "unknown physical type {}", other.0)),
        })
    }

    /// Width of a single PLAIN-encoded value, `None` for variable-length and bit-packed types.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            PhysicalType::Int32 | PhysicalType::Float => Some(4),
            PhysicalType::Int64 | PhysicalType::Double => Some(8),
            PhysicalType::Int96 => Some(12),
            PhysicalType::FixedLenByteArray(len) => Some(*len),
            PhysicalType::Boolean | PhysicalType::ByteArray => None,
        }
    }

    /// Whether the chunk metadata type matches, ignoring the fixed length.
    fn same_kind(&self, other: &PhysicalType) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Plain,
    PlainDictionary,
    Rle,
    BitPacked,
    DeltaBinaryPacked,
    DeltaLengthByteArray,
    DeltaByteArray,
    RleDictionary,
    ByteStreamSplit,
}

impl Encoding {
    pub fn is_dictionary(&self) -> bool {
        matches!(self, Encoding::PlainDictionary | Encoding::RleDictionary)
    }
}

impl TryFrom<ParquetEncoding> for Encoding {
    type Error = ParquetError;

    fn try_from(encoding: ParquetEncoding) -> Result<Self, Self::Error> {
        Ok(match encoding {
            ParquetEncoding::PLAIN => Encoding::Plain,
            ParquetEncoding::PLAIN_DICTIONARY => Encoding::PlainDictionary,
            ParquetEncoding::RLE => Encoding::Rle,
            ParquetEncoding::BIT_PACKED => Encoding::BitPacked,
            ParquetEncoding::DELTA_BINARY_PACKED => Encoding::DeltaBinaryPacked,
            ParquetEncoding::DELTA_LENGTH_BYTE_ARRAY => Encoding::DeltaLengthByteArray,
            ParquetEncoding::DELTA_BYTE_ARRAY => Encoding::DeltaByteArray,
            ParquetEncoding::RLE_DICTIONARY => Encoding::RleDictionary,
            ParquetEncoding::BYTE_STREAM_SPLIT => Encoding::ByteStreamSplit,
            other => return Err(fmt_err!(Layout, "unknown encoding {}", other.0)),
        })
    }
}

/// A leaf column of the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub path: Vec<String>,
    pub physical_type: PhysicalType,
    pub max_def_level: i16,
    pub max_rep_level: i16,
}

impl ColumnDescriptor {
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

impl Display for ColumnDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.path_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChunkMetadata {
    pub path: Vec<String>,
    pub physical_type: PhysicalType,
    pub compression: Compression,
    pub encodings: Vec<Encoding>,
    pub num_values: i64,
    pub total_compressed_size: i64,
    pub total_uncompressed_size: i64,
    pub data_page_offset: i64,
    pub dictionary_page_offset: Option<i64>,
    /// Set when the chunk lives in another file.
    pub file_path: Option<String>,
}

impl ColumnChunkMetadata {
    /// Offset of the first page of the chunk.
    /// Some writers emit a zero dictionary offset for chunks without a dictionary.
    pub fn start_offset(&self) -> i64 {
        match self.dictionary_page_offset {
            Some(offset) if offset > 0 && offset < self.data_page_offset => offset,
            _ => self.data_page_offset,
        }
    }

    /// `(start, length)` of the chunk, unvalidated.
    pub fn byte_range(&self) -> (i64, i64) {
        (self.start_offset(), self.total_compressed_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroupMetadata {
    pub num_rows: i64,
    pub total_byte_size: i64,
    pub columns: Vec<ColumnChunkMetadata>,
}

/// Parsed footer of a file. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub version: i32,
    pub num_rows: i64,
    pub created_by: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
    pub row_groups: Vec<RowGroupMetadata>,
    /// Offset of the serialized footer block. No column chunk may extend past it.
    pub footer_offset: u64,
    pub footer_len: u64,
}

impl ColumnChunkMetadata {
    /// Checks the chunk against its schema column and the file layout.
    pub(crate) fn validate(
        &self,
        descriptor: &ColumnDescriptor,
        footer_offset: u64,
    ) -> ParquetResult<(u64, u64)> {
        if self.file_path.is_some() {
            return Err(fmt_err!(
                Unsupported,
                "column chunk stored in an external file {:?}",
                self.file_path
            ));
        }
        if self.path != descriptor.path {
            return Err(fmt_err!(
                Layout,
                "column chunk path \"{}\" does not match schema column {}",
                self.path.join("."),
                descriptor
            ));
        }
        if !self.physical_type.same_kind(&descriptor.physical_type) {
            return Err(fmt_err!(
                Layout,
                "column chunk type {:?} does not match schema type {:?}",
                self.physical_type,
                descriptor.physical_type
            ));
        }
        if self.num_values < 0 {
            return Err(fmt_err!(Layout, "negative value count {}", self.num_values));
        }
        let (start, len) = self.byte_range();
        let start: u64 = start.try_into().map_err(|_| {
            fmt_err!(Layout, "negative column chunk offset {}", start)
        })?;
        let len: u64 = len.try_into().map_err(|_| {
            fmt_err!(Layout, "negative column chunk length {}", len)
        })?;
        let end = start.checked_add(len);
        match end {
            Some(end) if start >= PARQUET_MAGIC.len() as u64 && end <= footer_offset => {
                Ok((start, len))
            }
            _ => Err(fmt_err!(
                Layout,
                "column chunk range {}..{} lies outside the data region {}..{}",
                start,
                start.saturating_add(len),
                PARQUET_MAGIC.len(),
                footer_offset
            )),
        }
    }
}
