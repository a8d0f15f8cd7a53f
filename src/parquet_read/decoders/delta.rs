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
use crate::parquet_read::decoders::{read_uleb128, read_zigzag, unpack_bits};

/// Walks a DELTA_BINARY_PACKED stream holding exactly `count` values.
///
/// `visit` receives every decoded value. Returns the bytes consumed. The last
/// used miniblock may be cut short of its padding; unused miniblocks of the
/// last block carry a bit width but no data.
pub fn decode_delta_binary_packed<F>(data: &[u8], count: usize, mut visit: F) -> ParquetResult<usize>
where
    F: FnMut(i64) -> ParquetResult<()>,
{
    let mut pos = 0usize;
    let block_size = read_uleb128(data, &mut pos)?;
    let miniblocks = read_uleb128(data, &mut pos)?;
    let total = read_uleb128(data, &mut pos)?;
    let first = read_zigzag(data, &mut pos)?;

    if block_size == 0 || block_size % 128 != 0 {
        return Err(fmt_err!(
            Decode,
            "delta block size {} is not a positive multiple of 128",
            block_size
        ));
    }
    if miniblocks == 0 || block_size % miniblocks != 0 || (block_size / miniblocks) % 32 != 0 {
        return Err(fmt_err!(
            Decode,
            "{} miniblocks do not split a delta block of {}",
            miniblocks,
            block_size
        ));
    }
    if total != count as u64 {
        return Err(fmt_err!(
            Decode,
            "delta stream holds {} values, expected {}",
            total,
            count
        ));
    }
    if count == 0 {
        return Ok(pos);
    }

    let miniblocks = miniblocks as usize;
    let values_per_miniblock = (block_size / miniblocks as u64) as usize;
    let mut last = first;
    visit(first)?;
    let mut remaining = count - 1;

    while remaining > 0 {
        let min_delta = read_zigzag(data, &mut pos)?;
        if data.len() - pos < miniblocks {
            return Err(fmt_err!(
                Decode,
                "delta block bit widths need {} bytes, {} remain",
                miniblocks,
                data.len() - pos
            ));
        }
        let bit_widths = &data[pos..pos + miniblocks];
        pos += miniblocks;

        for &bit_width in bit_widths {
            if remaining == 0 {
                break;
            }
            if bit_width > 64 {
                return Err(fmt_err!(Decode, "delta miniblock bit width {}", bit_width));
            }
            let bit_width = bit_width as usize;
            let full_size = values_per_miniblock * bit_width / 8;
            let take = values_per_miniblock.min(remaining);
            let needed = (take * bit_width).div_ceil(8);
            let available = data.len() - pos;
            if available < needed {
                return Err(fmt_err!(
                    Decode,
                    "delta miniblock needs {} bytes, {} remain",
                    needed,
                    available
                ));
            }
            let size = full_size.min(available);
            let packed = &data[pos..pos + size];
            for i in 0..take {
                let delta = unpack_bits(packed, i * bit_width, bit_width as u32);
                last = last.wrapping_add(min_delta).wrapping_add(delta as i64);
                visit(last)?;
            }
            pos += size;
            remaining -= take;
        }
    }
    Ok(pos)
}

/// Lengths as DELTA_BINARY_PACKED, then the concatenated bytes.
/// Returns the bytes consumed.
pub fn validate_delta_length_byte_array(data: &[u8], count: usize) -> ParquetResult<usize> {
    let mut total = 0usize;
    let consumed = decode_delta_binary_packed(data, count, |len| {
        total = add_length(total, len)?;
        Ok(())
    })?;
    let end = consumed
        .checked_add(total)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| {
            fmt_err!(
                Decode,
                "byte arrays of {} bytes overrun the {} remaining",
                total,
                data.len() - consumed
            )
        })?;
    Ok(end)
}

/// Prefix lengths as DELTA_BINARY_PACKED, then suffixes as
/// DELTA_LENGTH_BYTE_ARRAY. Each prefix must fit in the previous value.
pub fn validate_delta_byte_array(data: &[u8], count: usize) -> ParquetResult<usize> {
    let mut prefixes = Vec::with_capacity(count.min(data.len()));
    let prefix_size = decode_delta_binary_packed(data, count, |len| {
        if len < 0 {
            return Err(fmt_err!(Decode, "negative prefix length {}", len));
        }
        prefixes.push(len as usize);
        Ok(())
    })?;

    let suffixes = &data[prefix_size..];
    let mut index = 0usize;
    let mut previous_len = 0usize;
    let mut total = 0usize;
    let suffix_size = decode_delta_binary_packed(suffixes, count, |len| {
        let prefix = prefixes[index];
        if prefix > previous_len {
            return Err(fmt_err!(
                Decode,
                "value {} shares a prefix of {} bytes with a value of {}",
                index,
                prefix,
                previous_len
            ));
        }
        total = add_length(total, len)?;
        previous_len = prefix + len as usize;
        index += 1;
        Ok(())
    })?;
    let end = suffix_size
        .checked_add(total)
        .filter(|end| *end <= suffixes.len())
        .ok_or_else(|| {
            fmt_err!(
                Decode,
                "suffixes of {} bytes overrun the {} remaining",
                total,
                suffixes.len() - suffix_size
            )
        })?;
    Ok(prefix_size + end)
}

fn add_length(total: usize, len: i64) -> ParquetResult<usize> {
    let len = usize::try_from(len).map_err(|_| fmt_err!(Decode, "negative length {}", len))?;
    total
        .checked_add(len)
        .ok_or_else(|| fmt_err!(Decode, "byte array lengths overflow"))
}
