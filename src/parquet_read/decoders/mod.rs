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
//! Structural walkers for the value and level encodings.
//!
//! They never materialize typed values; each one only proves that a buffer
//! holds exactly the declared number of well-formed entries.

pub mod delta;
pub mod hybrid_rle;
pub mod plain;

use crate::parquet::error::{fmt_err, ParquetResult};

/// Number of bits needed to store `max_value`.
pub fn bit_width(max_value: u64) -> u32 {
    64 - max_value.leading_zeros()
}

/// Reads an unsigned LEB128 varint at `*pos`, advancing it.
pub fn read_uleb128(data: &[u8], pos: &mut usize) -> ParquetResult<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| fmt_err!(Decode, "varint runs past the end of the buffer"))?;
        *pos += 1;
        if shift >= 64 || (shift == 63 && byte > 1) {
            return Err(fmt_err!(Decode, "varint overflows 64 bits"));
        }
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

pub fn read_zigzag(data: &[u8], pos: &mut usize) -> ParquetResult<i64> {
    let raw = read_uleb128(data, pos)?;
    Ok((raw >> 1) as i64 ^ -((raw & 1) as i64))
}

/// Extracts `bit_width` bits starting at `bit_offset`, LSB first.
/// Bits beyond the end of `data` read as zero.
pub fn unpack_bits(data: &[u8], bit_offset: usize, bit_width: u32) -> u64 {
    if bit_width == 0 {
        return 0;
    }
    let start = bit_offset / 8;
    let shift = bit_offset % 8;
    let mut word = 0u128;
    for i in 0..9 {
        if let Some(byte) = data.get(start + i) {
            word |= u128::from(*byte) << (8 * i);
        }
    }
    let mask = if bit_width >= 64 {
        u64::MAX
    } else {
        (1u64 << bit_width) - 1
    };
    (word >> shift) as u64 & mask
}

/// Reads the little-endian length prefix used by V1 level sections and RLE booleans.
pub fn read_length_prefix(data: &[u8]) -> ParquetResult<(usize, &[u8])> {
    if data.len() < 4 {
        return Err(fmt_err!(
            Decode,
            "{} bytes cannot hold a 4-byte length prefix",
            data.len()
        ));
    }
    let len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let rest = &data[4..];
    if len > rest.len() {
        return Err(fmt_err!(
            Decode,
            "length prefix of {} bytes exceeds the {} remaining",
            len,
            rest.len()
        ));
    }
    Ok((len, rest))
}
