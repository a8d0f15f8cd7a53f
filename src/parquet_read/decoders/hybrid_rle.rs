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
use crate::parquet_read::decoders::{read_uleb128, unpack_bits};

/// Widest value the hybrid encoding may carry (dictionary indices).
pub const MAX_BIT_WIDTH: u32 = 32;

/// Walks `count` values of the RLE / bit-packed hybrid encoding.
///
/// `visit` receives each value with its repeat count. Returns the number of
/// bytes consumed. The final bit-packed run may be shorter than its declared
/// group count: writers are allowed to stop once all values are written.
pub fn decode_hybrid_rle<F>(
    data: &[u8],
    bit_width: u32,
    count: usize,
    mut visit: F,
) -> ParquetResult<usize>
where
    F: FnMut(u64, usize) -> ParquetResult<()>,
{
    if bit_width > MAX_BIT_WIDTH {
        return Err(fmt_err!(
            Decode,
            "hybrid run bit width {} exceeds {}",
            bit_width,
            MAX_BIT_WIDTH
        ));
    }
    let bit_width_usize = bit_width as usize;
    let value_bytes = bit_width_usize.div_ceil(8);
    let mut pos = 0usize;
    let mut remaining = count;

    while remaining > 0 {
        let header = read_uleb128(data, &mut pos).map_err(|_| {
            fmt_err!(
                Decode,
                "hybrid runs end with {} of {} values missing",
                remaining,
                count
            )
        })?;
        if header & 1 == 1 {
            let groups = usize::try_from(header >> 1)
                .map_err(|_| fmt_err!(Decode, "bit-packed run length {} overflows", header))?;
            let declared_values = groups.saturating_mul(8);
            let declared_bytes = groups.saturating_mul(bit_width_usize);
            let available = declared_bytes.min(data.len() - pos);
            let packed = &data[pos..pos + available];
            let values_in_run = if bit_width == 0 {
                declared_values
            } else {
                declared_values.min(available * 8 / bit_width_usize)
            };
            let take = values_in_run.min(remaining);
            for i in 0..take {
                visit(unpack_bits(packed, i * bit_width_usize, bit_width), 1)?;
            }
            pos += available;
            remaining -= take;
        } else {
            let run = usize::try_from(header >> 1)
                .map_err(|_| fmt_err!(Decode, "rle run length {} overflows", header))?;
            if data.len() - pos < value_bytes {
                return Err(fmt_err!(
                    Decode,
                    "rle run value needs {} bytes, {} remain",
                    value_bytes,
                    data.len() - pos
                ));
            }
            let mut value = 0u64;
            for (i, byte) in data[pos..pos + value_bytes].iter().enumerate() {
                value |= u64::from(*byte) << (8 * i);
            }
            pos += value_bytes;
            let take = run.min(remaining);
            if take > 0 {
                visit(value, take)?;
            }
            remaining -= take;
        }
    }
    Ok(pos)
}

/// Validates `count` levels and returns how many equal `max_level`.
pub fn count_levels(data: &[u8], max_level: i16, count: usize) -> ParquetResult<(usize, usize)> {
    let max_level = max_level as u64;
    let bit_width = super::bit_width(max_level);
    let mut at_max = 0usize;
    let consumed = decode_hybrid_rle(data, bit_width, count, |level, repeat| {
        if level > max_level {
            return Err(fmt_err!(
                Decode,
                "level {} exceeds the maximum of {}",
                level,
                max_level
            ));
        }
        if level == max_level {
            at_max += repeat;
        }
        Ok(())
    })?;
    Ok((consumed, at_max))
}

/// Dictionary-encoded values: one bit-width byte, then hybrid runs of indices.
pub fn validate_dictionary_indices(data: &[u8], count: usize, dict_len: usize) -> ParquetResult<()> {
    if count == 0 {
        return Ok(());
    }
    let (&bit_width, runs) = data
        .split_first()
        .ok_or_else(|| fmt_err!(Decode, "dictionary indices have no bit width"))?;
    decode_hybrid_rle(runs, u32::from(bit_width), count, |index, _| {
        if index >= dict_len as u64 {
            return Err(fmt_err!(
                Decode,
                "dictionary index {} out of range for {} entries",
                index,
                dict_len
            ));
        }
        Ok(())
    })?;
    Ok(())
}

/// Legacy BIT_PACKED levels: no run headers, values packed MSB first.
pub fn count_bit_packed_levels(
    data: &[u8],
    max_level: i16,
    count: usize,
) -> ParquetResult<(usize, usize)> {
    let max_level = max_level as u64;
    let bit_width = super::bit_width(max_level) as usize;
    let len = count
        .checked_mul(bit_width)
        .map(|bits| bits.div_ceil(8))
        .ok_or_else(|| fmt_err!(Decode, "bit-packed level section overflows"))?;
    if len > data.len() {
        return Err(fmt_err!(
            Decode,
            "bit-packed levels need {} bytes, {} remain",
            len,
            data.len()
        ));
    }
    let mut at_max = 0usize;
    for i in 0..count {
        let mut level = 0u64;
        for bit in i * bit_width..(i + 1) * bit_width {
            let byte = data[bit / 8];
            level = (level << 1) | u64::from((byte >> (7 - bit % 8)) & 1);
        }
        if level > max_level {
            return Err(fmt_err!(
                Decode,
                "level {} exceeds the maximum of {}",
                level,
                max_level
            ));
        }
        if level == max_level {
            at_max += 1;
        }
    }
    Ok((len, at_max))
}
