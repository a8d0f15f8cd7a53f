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
use crate::parquet::error::{fmt_err, ParquetResult};
use crate::parquet_read::decoders::hybrid_rle::decode_hybrid_rle;
use crate::parquet_read::decoders::read_length_prefix;
use crate::parquet_read::PhysicalType;

/// Checks that `data` holds exactly `count` PLAIN values of `physical_type`.
pub fn validate_plain(data: &[u8], physical_type: PhysicalType, count: usize) -> ParquetResult<()> {
    match physical_type {
        PhysicalType::Boolean => expect_size(data, count.div_ceil(8), count, "PLAIN BOOLEAN"),
        PhysicalType::ByteArray => walk_byte_arrays(data, count),
        fixed => {
            let width = fixed.fixed_width().unwrap_or(0);
            let size = count
                .checked_mul(width)
                .ok_or_else(|| fmt_err!(Decode, "{} values of width {} overflow", count, width))?;
            expect_size(data, size, count, "PLAIN")
        }
    }
}

/// Byte-stream-split pages scatter the bytes of each value across `width` streams.
pub fn validate_byte_stream_split(
    data: &[u8],
    physical_type: PhysicalType,
    count: usize,
) -> ParquetResult<()> {
    let width = match physical_type {
        PhysicalType::Float
        | PhysicalType::Double
        | PhysicalType::Int32
        | PhysicalType::Int64
        | PhysicalType::FixedLenByteArray(_) => physical_type.fixed_width().unwrap_or(0),
        other => {
            return Err(fmt_err!(
                Decode,
                "BYTE_STREAM_SPLIT is not defined for {:?}",
                other
            ))
        }
    };
    let size = count
        .checked_mul(width)
        .ok_or_else(|| fmt_err!(Decode, "{} values of width {} overflow", count, width))?;
    expect_size(data, size, count, "BYTE_STREAM_SPLIT")
}

/// RLE-encoded booleans: a 4-byte length followed by width-1 hybrid runs.
pub fn validate_rle_booleans(data: &[u8], count: usize) -> ParquetResult<()> {
    let (len, rest) = read_length_prefix(data)?;
    if len != rest.len() {
        return Err(fmt_err!(
            Decode,
            "RLE boolean section declares {} bytes, page holds {}",
            len,
            rest.len()
        ));
    }
    decode_hybrid_rle(rest, 1, count, |value, _| {
        if value > 1 {
            return Err(fmt_err!(Decode, "boolean value {}", value));
        }
        Ok(())
    })?;
    Ok(())
}

fn expect_size(data: &[u8], size: usize, count: usize, encoding: &str) -> ParquetResult<()> {
    if data.len() != size {
        return Err(fmt_err!(
            Decode,
            "{} values of {} need {} bytes, page holds {}",
            count,
            encoding,
            size,
            data.len()
        ));
    }
    Ok(())
}

/// Each value is a 4-byte little-endian length followed by that many bytes.
/// The walk must end exactly at the end of the buffer.
fn walk_byte_arrays(data: &[u8], count: usize) -> ParquetResult<()> {
    let mut pos = 0usize;
    for index in 0..count {
        let rest = &data[pos..];
        if rest.len() < 4 {
            return Err(fmt_err!(
                Decode,
                "byte array {} of {} has no length prefix, {} bytes remain",
                index,
                count,
                rest.len()
            ));
        }
        let len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        if len > rest.len() - 4 {
            return Err(fmt_err!(
                Decode,
                "byte array {} of {} declares {} bytes, {} remain",
                index,
                count,
                len,
                rest.len() - 4
            ));
        }
        pos += 4 + len;
    }
    if pos != data.len() {
        return Err(fmt_err!(
            Decode,
            "{} byte arrays end at byte {} of {}",
            count,
            pos,
            data.len()
        ));
    }
    Ok(())
}
