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
//! Whole-stream decompression of page payloads.
//!
//! Every codec must produce exactly the declared number of bytes *and* consume
//! its entire input. Stopping as soon as the output buffer is full would let
//! corrupted trailing bytes (and, for gzip, a bad CRC trailer) pass unnoticed.

use std::io::Read;

use parquet_format_safe::CompressionCodec;

use crate::parquet::error::{fmt_err, ParquetError, ParquetResult};

const BROTLI_BUFFER_SIZE: usize = 4096;

/// Size of the Hadoop LZ4 block prefix: big-endian decompressed and compressed sizes.
const HADOOP_LZ4_PREFIX_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    Uncompressed,
    Snappy,
    Gzip,
    Lzo,
    Brotli,
    Lz4,
    Zstd,
    Lz4Raw,
}

impl TryFrom<CompressionCodec> for Compression {
    type Error = ParquetError;

    fn try_from(codec: CompressionCodec) -> Result<Self, Self::Error> {
        Ok(match codec {
            CompressionCodec::UNCOMPRESSED => Compression::Uncompressed,
            CompressionCodec::SNAPPY => Compression::Snappy,
            CompressionCodec::GZIP => Compression::Gzip,
            CompressionCodec::LZO => Compression::Lzo,
            CompressionCodec::BROTLI => Compression::Brotli,
            CompressionCodec::LZ4 => Compression::Lz4,
            CompressionCodec::ZSTD => Compression::Zstd,
            CompressionCodec::LZ4_RAW => Compression::Lz4Raw,
            other => return Err(fmt_err!(Layout, "unknown compression codec {}", other.0)),
        })
    }
}

/// Decompresses `input` into `output`, which is already sized to the declared
/// uncompressed length.
pub fn decompress(compression: Compression, input: &[u8], output: &mut [u8]) -> ParquetResult<()> {
    match compression {
        Compression::Uncompressed => {
            if input.len() != output.len() {
                return Err(fmt_err!(
                    Decode,
                    "uncompressed page holds {} bytes, header declares {}",
                    input.len(),
                    output.len()
                ));
            }
            output.copy_from_slice(input);
            Ok(())
        }
        Compression::Snappy => decompress_snappy(input, output),
        Compression::Gzip => {
            let decoder = flate2::read::MultiGzDecoder::new(input);
            read_whole_stream(decoder, output, "gzip")
        }
        Compression::Brotli => {
            let decoder = brotli::Decompressor::new(input, BROTLI_BUFFER_SIZE);
            read_whole_stream(decoder, output, "brotli")
        }
        Compression::Zstd => {
            let written = zstd::bulk::decompress_to_buffer(input, output)
                .map_err(|e| ParquetError::codec(e, "zstd"))?;
            expect_len(written, output.len(), "zstd")
        }
        Compression::Lz4Raw => {
            let written = lz4_flex::block::decompress_into(input, output)
                .map_err(|e| ParquetError::codec(e, "lz4_raw"))?;
            expect_len(written, output.len(), "lz4_raw")
        }
        Compression::Lz4 => decompress_lz4(input, output),
        Compression::Lzo => Err(fmt_err!(Unsupported, "LZO compression is not supported")),
    }
}

fn expect_len(actual: usize, expected: usize, codec: &str) -> ParquetResult<()> {
    if actual != expected {
        return Err(fmt_err!(
            Decode,
            "{codec} stream decompressed to {actual} bytes, header declares {expected}"
        ));
    }
    Ok(())
}

fn decompress_snappy(input: &[u8], output: &mut [u8]) -> ParquetResult<()> {
    let len = snap::raw::decompress_len(input).map_err(|e| ParquetError::codec(e, "snappy"))?;
    expect_len(len, output.len(), "snappy")?;
    let written = snap::raw::Decoder::new()
        .decompress(input, output)
        .map_err(|e| ParquetError::codec(e, "snappy"))?;
    expect_len(written, output.len(), "snappy")
}

/// Fills `output` from a streaming decoder, then requires the stream to end.
/// Reaching the end is what makes gzip verify its CRC and size trailer.
fn read_whole_stream<R: Read>(mut decoder: R, output: &mut [u8], codec: &str) -> ParquetResult<()> {
    decoder
        .read_exact(output)
        .map_err(|e| ParquetError::codec(e, codec))?;
    let mut probe = [0u8; 1];
    let extra = decoder
        .read(&mut probe)
        .map_err(|e| ParquetError::codec(e, codec))?;
    if extra != 0 {
        return Err(fmt_err!(
            Decode,
            "{codec} stream decompresses past the declared {} bytes",
            output.len()
        ));
    }
    Ok(())
}

/// The `LZ4` codec is ambiguous in the wild: Hadoop-framed blocks (what the
/// format mandates today), LZ4 frames, or bare blocks from older writers.
/// Try them in that order.
fn decompress_lz4(input: &[u8], output: &mut [u8]) -> ParquetResult<()> {
    if decompress_lz4_hadoop(input, output).is_ok() {
        return Ok(());
    }
    let frame = lz4_flex::frame::FrameDecoder::new(input);
    if read_whole_stream(frame, output, "lz4").is_ok() {
        return Ok(());
    }
    let written = lz4_flex::block::decompress_into(input, output)
        .map_err(|e| ParquetError::codec(e, "lz4"))?;
    expect_len(written, output.len(), "lz4")
}

fn decompress_lz4_hadoop(mut input: &[u8], output: &mut [u8]) -> ParquetResult<()> {
    let mut filled = 0usize;
    while !input.is_empty() {
        if input.len() < HADOOP_LZ4_PREFIX_SIZE {
            return Err(fmt_err!(Decode, "truncated hadoop lz4 block prefix"));
        }
        let expected = u32::from_be_bytes([input[0], input[1], input[2], input[3]]) as usize;
        let compressed = u32::from_be_bytes([input[4], input[5], input[6], input[7]]) as usize;
        input = &input[HADOOP_LZ4_PREFIX_SIZE..];
        if compressed > input.len() || expected > output.len() - filled {
            return Err(fmt_err!(Decode, "hadoop lz4 block exceeds its buffers"));
        }
        let written = lz4_flex::block::decompress_into(
            &input[..compressed],
            &mut output[filled..filled + expected],
        )
        .map_err(|e| ParquetError::codec(e, "lz4"))?;
        expect_len(written, expected, "lz4")?;
        filled += expected;
        input = &input[compressed..];
    }
    expect_len(filled, output.len(), "lz4")
}
