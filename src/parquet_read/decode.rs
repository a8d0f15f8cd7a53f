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
use crate::parquet::compression::{decompress, Compression};
use crate::parquet::error::{fmt_err, ParquetErrorExt, ParquetResult};
use crate::parquet_read::decoders::delta::{
    decode_delta_binary_packed, validate_delta_byte_array, validate_delta_length_byte_array,
};
use crate::parquet_read::decoders::hybrid_rle::{
    count_bit_packed_levels, count_levels, validate_dictionary_indices,
};
use crate::parquet_read::decoders::plain::{
    validate_byte_stream_split, validate_plain, validate_rle_booleans,
};
use crate::parquet_read::decoders::read_length_prefix;
use crate::parquet_read::page::{DataPageV1, DataPageV2, DictPage, Page, PageBuffer};
use crate::parquet_read::{ColumnDescriptor, Encoding, PhysicalType};

/// Decompresses and structurally decodes the pages of one column chunk.
///
/// Pages must be fed in chunk order: a dictionary page, when present, sizes
/// the index checks of the data pages after it.
pub struct PageDecoder<'a> {
    descriptor: &'a ColumnDescriptor,
    buffer: Vec<u8>,
    dict_len: Option<usize>,
    verify_checksums: bool,
}

impl<'a> PageDecoder<'a> {
    pub fn new(descriptor: &'a ColumnDescriptor, verify_checksums: bool) -> Self {
        Self {
            descriptor,
            buffer: Vec::new(),
            dict_len: None,
            verify_checksums,
        }
    }

    /// Entry count of the dictionary page seen so far.
    pub fn dictionary_len(&self) -> Option<usize> {
        self.dict_len
    }

    /// Returns the page's raw (decompressed) bytes once they are proven well-formed.
    pub fn decode<'b>(&'b mut self, page: &'b Page) -> ParquetResult<&'b [u8]> {
        let offset = page.offset();
        if self.verify_checksums {
            verify_crc(page.data()).with_context(|_| format!("page at offset {}", offset))?;
        }
        let descriptor = self.descriptor;
        let raw = decompress_page(page, &mut self.buffer)
            .with_context(|_| format!("page at offset {}", offset))?;
        let decoded = match page {
            Page::Dict(dict) => {
                let res = validate_dictionary(descriptor, dict, raw);
                if res.is_ok() {
                    self.dict_len = Some(dict.num_values);
                }
                res
            }
            Page::V1(data_page) => validate_v1(descriptor, data_page, raw, self.dict_len),
            Page::V2(data_page) => validate_v2(descriptor, data_page, raw, self.dict_len),
        };
        decoded.with_context(|_| format!("page at offset {}", offset))?;
        Ok(raw)
    }
}

fn verify_crc(data: &PageBuffer) -> ParquetResult<()> {
    if let Some(expected) = data.crc {
        let actual = crc32fast::hash(&data.buffer);
        if actual != expected {
            return Err(fmt_err!(
                Checksum,
                "page crc {:#010x} does not match stored {:#010x}",
                actual,
                expected
            ));
        }
    }
    Ok(())
}

fn stored_as_is(data: &PageBuffer) -> ParquetResult<&[u8]> {
    if data.buffer.len() != data.uncompressed_size {
        return Err(fmt_err!(
            Decode,
            "uncompressed page holds {} bytes, header declares {}",
            data.buffer.len(),
            data.uncompressed_size
        ));
    }
    Ok(&data.buffer)
}

fn decompress_page<'b>(page: &'b Page, buffer: &'b mut Vec<u8>) -> ParquetResult<&'b [u8]> {
    let data = page.data();
    let levels = match page {
        Page::V2(data_page) => {
            let levels = data_page.levels_byte_length();
            if levels > data.buffer.len() || levels > data.uncompressed_size {
                return Err(fmt_err!(
                    Decode,
                    "{} level bytes exceed the page: {} stored, {} declared",
                    levels,
                    data.buffer.len(),
                    data.uncompressed_size
                ));
            }
            if !data_page.is_compressed {
                return stored_as_is(data);
            }
            levels
        }
        Page::Dict(_) | Page::V1(_) => 0,
    };
    if data.compression == Compression::Uncompressed {
        return stored_as_is(data);
    }
    // All-null v2 page: an empty values section is not a codec stream.
    if levels > 0 && data.uncompressed_size == levels && data.buffer.len() == levels {
        return Ok(&data.buffer);
    }
    buffer.clear();
    buffer.resize(data.uncompressed_size, 0);
    buffer[..levels].copy_from_slice(&data.buffer[..levels]);
    decompress(
        data.compression,
        &data.buffer[levels..],
        &mut buffer[levels..],
    )?;
    Ok(buffer.as_slice())
}

fn validate_dictionary(descriptor: &ColumnDescriptor, page: &DictPage, raw: &[u8]) -> ParquetResult<()> {
    match page.encoding {
        Encoding::Plain | Encoding::PlainDictionary => {
            validate_plain(raw, descriptor.physical_type, page.num_values)
        }
        other => Err(fmt_err!(Decode, "dictionary page encoded as {:?}", other)),
    }
}

fn validate_v1(
    descriptor: &ColumnDescriptor,
    page: &DataPageV1,
    raw: &[u8],
    dict_len: Option<usize>,
) -> ParquetResult<()> {
    let mut rest = raw;
    let mut non_null = page.num_values;
    if descriptor.max_rep_level > 0 {
        let (size, _) = read_levels_v1(
            rest,
            page.rep_level_encoding,
            descriptor.max_rep_level,
            page.num_values,
        )
        .context("repetition levels")?;
        rest = &rest[size..];
    }
    if descriptor.max_def_level > 0 {
        let (size, at_max) = read_levels_v1(
            rest,
            page.def_level_encoding,
            descriptor.max_def_level,
            page.num_values,
        )
        .context("definition levels")?;
        rest = &rest[size..];
        non_null = at_max;
    }
    validate_values(descriptor.physical_type, page.encoding, rest, non_null, dict_len)
}

/// Returns the size of the level section and the number of levels at the maximum.
fn read_levels_v1(
    data: &[u8],
    encoding: Encoding,
    max_level: i16,
    count: usize,
) -> ParquetResult<(usize, usize)> {
    match encoding {
        Encoding::Rle => {
            let (len, rest) = read_length_prefix(data)?;
            let (_, at_max) = count_levels(&rest[..len], max_level, count)?;
            Ok((4 + len, at_max))
        }
        Encoding::BitPacked => count_bit_packed_levels(data, max_level, count),
        other => Err(fmt_err!(Decode, "levels encoded as {:?}", other)),
    }
}

fn validate_v2(
    descriptor: &ColumnDescriptor,
    page: &DataPageV2,
    raw: &[u8],
    dict_len: Option<usize>,
) -> ParquetResult<()> {
    if page.levels_byte_length() > raw.len() {
        return Err(fmt_err!(
            Decode,
            "{} level bytes exceed the page of {}",
            page.levels_byte_length(),
            raw.len()
        ));
    }
    let (rep, rest) = raw.split_at(page.rep_levels_byte_length);
    let (def, values) = rest.split_at(page.def_levels_byte_length);

    if descriptor.max_rep_level > 0 {
        count_levels(rep, descriptor.max_rep_level, page.num_values)
            .context("repetition levels")?;
    } else if !rep.is_empty() {
        return Err(fmt_err!(
            Decode,
            "{} repetition level bytes for a non-repeated column",
            rep.len()
        ));
    }

    let mut non_null = page.num_values;
    if descriptor.max_def_level > 0 {
        let (_, at_max) = count_levels(def, descriptor.max_def_level, page.num_values)
            .context("definition levels")?;
        non_null = at_max;
    } else if !def.is_empty() {
        return Err(fmt_err!(
            Decode,
            "{} definition level bytes for a required column",
            def.len()
        ));
    }
    if page.num_values - non_null != page.num_nulls {
        log::warn!(
            "data page v2 at offset {} declares {} nulls, levels hold {}",
            page.data.offset,
            page.num_nulls,
            page.num_values - non_null
        );
    }
    validate_values(descriptor.physical_type, page.encoding, values, non_null, dict_len)
}

/// Checks the values section holds exactly `count` entries in `encoding`.
fn validate_values(
    physical_type: PhysicalType,
    encoding: Encoding,
    data: &[u8],
    count: usize,
    dict_len: Option<usize>,
) -> ParquetResult<()> {
    match (encoding, physical_type) {
        (Encoding::Plain, _) => validate_plain(data, physical_type, count),
        (Encoding::PlainDictionary | Encoding::RleDictionary, _) => {
            let dict_len = dict_len.ok_or_else(|| {
                fmt_err!(Decode, "dictionary-encoded page without a dictionary page")
            })?;
            validate_dictionary_indices(data, count, dict_len)
        }
        (Encoding::Rle, PhysicalType::Boolean) => validate_rle_booleans(data, count),
        (Encoding::ByteStreamSplit, _) => validate_byte_stream_split(data, physical_type, count),
        (Encoding::DeltaBinaryPacked, PhysicalType::Int32 | PhysicalType::Int64) => {
            let consumed = decode_delta_binary_packed(data, count, |_| Ok(()))?;
            expect_consumed(consumed, data.len(), encoding)
        }
        (Encoding::DeltaLengthByteArray, PhysicalType::ByteArray) => {
            let consumed = validate_delta_length_byte_array(data, count)?;
            expect_consumed(consumed, data.len(), encoding)
        }
        (
            Encoding::DeltaByteArray,
            PhysicalType::ByteArray | PhysicalType::FixedLenByteArray(_),
        ) => {
            let consumed = validate_delta_byte_array(data, count)?;
            expect_consumed(consumed, data.len(), encoding)
        }
        (encoding, physical_type) => Err(fmt_err!(
            Decode,
            "encoding {:?} is not valid for {:?} values",
            encoding,
            physical_type
        )),
    }
}

fn expect_consumed(consumed: usize, len: usize, encoding: Encoding) -> ParquetResult<()> {
    if consumed != len {
        return Err(fmt_err!(
            Decode,
            "{:?} values end at byte {} of {}",
            encoding,
            consumed,
            len
        ));
    }
    Ok(())
}
