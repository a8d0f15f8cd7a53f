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
//! Byte-exact file fixtures for unit tests.
//!
//! Pages and footers are laid out by hand and their thrift headers serialized
//! with the compact protocol, so tests can place corruption at known offsets.

use std::io::Write;

use parquet_format_safe::thrift::protocol::TCompactOutputProtocol;
use parquet_format_safe::{
    ColumnChunk, ColumnMetaData, CompressionCodec, DataPageHeader, DataPageHeaderV2,
    DictionaryPageHeader, Encoding, FieldRepetitionType, FileMetaData, PageHeader, PageType,
    RowGroup, SchemaElement, Type,
};

use crate::parquet_read::decoders::bit_width;

/// Run headers of the hybrid RLE encoding.
fn push_uleb128(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// One RLE run of `count` copies of `value`.
pub fn rle_run(value: u64, count: usize, bit_width: u32) -> Vec<u8> {
    let mut out = Vec::new();
    push_uleb128(&mut out, (count as u64) << 1);
    let bytes = (bit_width as usize).div_ceil(8);
    out.extend_from_slice(&value.to_le_bytes()[..bytes]);
    out
}

/// One bit-packed run; `values` is padded with zeros to a multiple of 8.
pub fn bit_packed_run(values: &[u64], bit_width: u32) -> Vec<u8> {
    let groups = values.len().div_ceil(8);
    let mut out = Vec::new();
    push_uleb128(&mut out, ((groups as u64) << 1) | 1);
    let mut packed = vec![0u8; groups * bit_width as usize];
    for (i, value) in values.iter().enumerate() {
        for bit in 0..bit_width as usize {
            if value >> bit & 1 == 1 {
                let pos = i * bit_width as usize + bit;
                packed[pos / 8] |= 1 << (pos % 8);
            }
        }
    }
    out.extend(packed);
    out
}

pub fn plain_i64(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn plain_byte_array<T: AsRef<[u8]>>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in values {
        let value = value.as_ref();
        out.extend_from_slice(&(value.len() as u32).to_le_bytes());
        out.extend_from_slice(value);
    }
    out
}

fn dictionary_indices(dict_len: usize, indices: &[u64]) -> Vec<u8> {
    let width = bit_width(dict_len.saturating_sub(1) as u64);
    let mut out = vec![width as u8];
    out.extend(bit_packed_run(indices, width));
    out
}

#[derive(Debug, Clone)]
pub struct TestColumn {
    name: String,
    type_: Option<Type>,
    type_length: Option<i32>,
    repetition: FieldRepetitionType,
    num_children: Option<i32>,
}

impl TestColumn {
    pub fn with_length(mut self, length: i32) -> Self {
        self.type_length = Some(length);
        self
    }
}

fn leaf(name: &str, type_: Type, repetition: FieldRepetitionType) -> TestColumn {
    TestColumn {
        name: name.to_string(),
        type_: Some(type_),
        type_length: None,
        repetition,
        num_children: None,
    }
}

pub fn required(name: &str, type_: Type) -> TestColumn {
    leaf(name, type_, FieldRepetitionType::REQUIRED)
}

pub fn optional(name: &str, type_: Type) -> TestColumn {
    leaf(name, type_, FieldRepetitionType::OPTIONAL)
}

pub fn repeated(name: &str, type_: Type) -> TestColumn {
    leaf(name, type_, FieldRepetitionType::REPEATED)
}

/// A group whose `num_children` children follow it in the schema list.
pub fn group(name: &str, repetition: FieldRepetitionType, num_children: i32) -> TestColumn {
    TestColumn {
        name: name.to_string(),
        type_: None,
        type_length: None,
        repetition,
        num_children: Some(num_children),
    }
}

#[derive(Debug, Clone)]
enum TestPageKind {
    Dict {
        num_values: usize,
    },
    V1 {
        num_values: usize,
        encoding: Encoding,
    },
    V2 {
        num_values: usize,
        num_nulls: usize,
        encoding: Encoding,
        def_len: usize,
    },
    Index,
}

#[derive(Debug, Clone)]
pub struct TestPage {
    kind: TestPageKind,
    /// Uncompressed payload; for V2 pages the levels come first.
    payload: Vec<u8>,
}

impl TestPage {
    pub fn dict_plain(num_values: usize, payload: Vec<u8>) -> Self {
        Self {
            kind: TestPageKind::Dict { num_values },
            payload,
        }
    }

    pub fn v1_plain(num_values: usize, payload: Vec<u8>) -> Self {
        Self {
            kind: TestPageKind::V1 {
                num_values,
                encoding: Encoding::PLAIN,
            },
            payload,
        }
    }

    /// Dictionary indices of a required column.
    pub fn v1_dict(num_values: usize, dict_len: usize, indices: &[u64]) -> Self {
        Self {
            kind: TestPageKind::V1 {
                num_values,
                encoding: Encoding::RLE_DICTIONARY,
            },
            payload: dictionary_indices(dict_len, indices),
        }
    }

    /// V1 definition levels of an optional column: length prefix plus one bit-packed run.
    pub fn def_levels_v1(levels: &[u64], max_level: u64) -> Vec<u8> {
        let runs = bit_packed_run(levels, bit_width(max_level));
        let mut out = (runs.len() as u32).to_le_bytes().to_vec();
        out.extend(runs);
        out
    }

    /// Plain values of an optional (max definition level 1) column.
    pub fn v2_plain(num_values: usize, def_levels: &[u64], values: Vec<u8>) -> Self {
        Self::v2(num_values, def_levels, Encoding::PLAIN, values)
    }

    /// Dictionary indices of an optional (max definition level 1) column.
    pub fn v2_dict(num_values: usize, def_levels: &[u64], dict_len: usize, indices: &[u64]) -> Self {
        Self::v2(
            num_values,
            def_levels,
            Encoding::RLE_DICTIONARY,
            dictionary_indices(dict_len, indices),
        )
    }

    fn v2(num_values: usize, def_levels: &[u64], encoding: Encoding, values: Vec<u8>) -> Self {
        let mut payload = bit_packed_run(def_levels, 1);
        let def_len = payload.len();
        payload.extend(values);
        Self {
            kind: TestPageKind::V2 {
                num_values,
                num_nulls: def_levels.iter().filter(|level| **level == 0).count(),
                encoding,
                def_len,
            },
            payload,
        }
    }

    pub fn index(payload: Vec<u8>) -> Self {
        Self {
            kind: TestPageKind::Index,
            payload,
        }
    }

    fn data_values(&self) -> usize {
        match self.kind {
            TestPageKind::V1 { num_values, .. } | TestPageKind::V2 { num_values, .. } => {
                num_values
            }
            TestPageKind::Dict { .. } | TestPageKind::Index => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TestChunk {
    pages: Vec<TestPage>,
    codec: CompressionCodec,
    with_crc: bool,
    num_values: Option<i64>,
    size_adjust: i64,
    path: Option<Vec<String>>,
}

impl TestChunk {
    pub fn plain(pages: Vec<TestPage>) -> Self {
        Self {
            pages,
            codec: CompressionCodec::UNCOMPRESSED,
            with_crc: false,
            num_values: None,
            size_adjust: 0,
            path: None,
        }
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_crc(mut self) -> Self {
        self.with_crc = true;
        self
    }

    /// Overrides the value count declared in the chunk metadata.
    pub fn with_num_values(mut self, num_values: i64) -> Self {
        self.num_values = Some(num_values);
        self
    }

    /// Adds `delta` to the declared total compressed size.
    pub fn with_size_adjust(mut self, delta: i64) -> Self {
        self.size_adjust = delta;
        self
    }

    pub fn with_path(mut self, path: &[&str]) -> Self {
        self.path = Some(path.iter().map(|p| p.to_string()).collect());
        self
    }
}

fn compress(codec: CompressionCodec, data: &[u8]) -> Vec<u8> {
    match codec {
        CompressionCodec::UNCOMPRESSED => data.to_vec(),
        CompressionCodec::SNAPPY => snap::raw::Encoder::new().compress_vec(data).unwrap(),
        CompressionCodec::GZIP => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        CompressionCodec::ZSTD => zstd::bulk::compress(data, 3).unwrap(),
        other => panic!("unsupported test codec {other:?}"),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BuiltPage {
    pub header_offset: u64,
    pub payload_offset: u64,
    pub payload_len: u64,
}

#[derive(Debug, Clone)]
pub struct BuiltChunk {
    pub start: u64,
    pub len: u64,
    pub pages: Vec<BuiltPage>,
}

pub struct BuiltFile {
    pub bytes: Vec<u8>,
    /// Indexed by row group, then column.
    pub chunks: Vec<Vec<BuiltChunk>>,
}

impl BuiltFile {
    /// Dictionary and data pages, index pages excluded.
    pub fn page_count(&self) -> usize {
        self.chunks
            .iter()
            .flatten()
            .map(|chunk| chunk.pages.len())
            .sum()
    }
}

pub struct FileBuilder {
    schema: Vec<TestColumn>,
    row_groups: Vec<(i64, Vec<TestChunk>)>,
    num_rows: Option<i64>,
}

impl FileBuilder {
    pub fn new(schema: Vec<TestColumn>) -> Self {
        Self {
            schema,
            row_groups: Vec::new(),
            num_rows: None,
        }
    }

    pub fn row_group(mut self, num_rows: i64, chunks: Vec<TestChunk>) -> Self {
        self.row_groups.push((num_rows, chunks));
        self
    }

    /// Overrides the file row count written to the footer.
    pub fn with_num_rows(mut self, num_rows: i64) -> Self {
        self.num_rows = Some(num_rows);
        self
    }

    /// Leaf paths and types in schema order, plus the number of top-level fields.
    fn leaves(&self) -> (Vec<(Vec<String>, Type)>, i32) {
        fn walk(
            schema: &[TestColumn],
            next: &mut usize,
            path: &mut Vec<String>,
            out: &mut Vec<(Vec<String>, Type)>,
        ) {
            let column = &schema[*next];
            *next += 1;
            path.push(column.name.clone());
            match column.type_ {
                Some(type_) => out.push((path.clone(), type_)),
                None => {
                    for _ in 0..column.num_children.unwrap_or(0) {
                        walk(schema, next, path, out);
                    }
                }
            }
            path.pop();
        }

        let mut out = Vec::new();
        let mut next = 0;
        let mut top_level = 0;
        while next < self.schema.len() {
            walk(&self.schema, &mut next, &mut Vec::new(), &mut out);
            top_level += 1;
        }
        (out, top_level)
    }

    pub fn build(self) -> BuiltFile {
        let (leaves, top_level) = self.leaves();
        let mut bytes = b"PAR1".to_vec();
        let mut chunks = Vec::new();
        let mut row_group_meta = Vec::new();

        for (num_rows, test_chunks) in &self.row_groups {
            let mut built_chunks = Vec::new();
            let mut columns = Vec::new();
            for (index, chunk) in test_chunks.iter().enumerate() {
                let start = bytes.len() as u64;
                let mut pages = Vec::new();
                let mut uncompressed = 0i64;
                let mut data_page_offset = None;
                let mut dictionary_page_offset = None;
                let mut encodings = vec![Encoding::RLE];
                for page in &chunk.pages {
                    let header_offset = bytes.len() as u64;
                    let stored = match page.kind {
                        TestPageKind::V2 { def_len, .. } => {
                            let mut stored = page.payload[..def_len].to_vec();
                            stored.extend(compress(chunk.codec, &page.payload[def_len..]));
                            stored
                        }
                        _ => compress(chunk.codec, &page.payload),
                    };
                    let header = page_header(page, &stored, chunk.with_crc);
                    uncompressed += (header.len() + page.payload.len()) as i64;
                    bytes.extend(&header);
                    let payload_offset = bytes.len() as u64;
                    bytes.extend(&stored);
                    match page.kind {
                        TestPageKind::Dict { .. } => {
                            dictionary_page_offset.get_or_insert(header_offset as i64);
                            push_encoding(&mut encodings, Encoding::PLAIN);
                        }
                        TestPageKind::V1 { encoding, .. } | TestPageKind::V2 { encoding, .. } => {
                            data_page_offset.get_or_insert(header_offset as i64);
                            push_encoding(&mut encodings, encoding);
                        }
                        TestPageKind::Index => continue,
                    }
                    pages.push(BuiltPage {
                        header_offset,
                        payload_offset,
                        payload_len: stored.len() as u64,
                    });
                }
                let len = bytes.len() as u64 - start;
                let (path, type_) = leaves
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| (vec![format!("extra{index}")], Type::INT64));
                let data_page_offset = data_page_offset.unwrap_or(start as i64);
                let meta_data = ColumnMetaData {
                    type_,
                    encodings,
                    path_in_schema: chunk.path.clone().unwrap_or(path),
                    codec: chunk.codec,
                    num_values: chunk.num_values.unwrap_or_else(|| {
                        chunk.pages.iter().map(|p| p.data_values() as i64).sum()
                    }),
                    total_uncompressed_size: uncompressed,
                    total_compressed_size: len as i64 + chunk.size_adjust,
                    key_value_metadata: None,
                    data_page_offset,
                    index_page_offset: None,
                    dictionary_page_offset,
                    statistics: None,
                    encoding_stats: None,
                    bloom_filter_offset: None,
                };
                columns.push(ColumnChunk {
                    file_path: None,
                    file_offset: data_page_offset,
                    meta_data: Some(meta_data),
                    offset_index_offset: None,
                    offset_index_length: None,
                    column_index_offset: None,
                    column_index_length: None,
                    crypto_metadata: None,
                    encrypted_column_metadata: None,
                });
                built_chunks.push(BuiltChunk { start, len, pages });
            }
            chunks.push(built_chunks);
            let total_byte_size = columns
                .iter()
                .filter_map(|c| c.meta_data.as_ref())
                .map(|m| m.total_uncompressed_size)
                .sum();
            row_group_meta.push(RowGroup {
                columns,
                total_byte_size,
                num_rows: *num_rows,
                sorting_columns: None,
                file_offset: None,
                total_compressed_size: None,
                ordinal: None,
            });
        }

        let num_rows = self
            .num_rows
            .unwrap_or_else(|| self.row_groups.iter().map(|(rows, _)| rows).sum());
        let footer = file_metadata(&self.schema, top_level, num_rows, row_group_meta);
        bytes.extend(&footer);
        bytes.extend((footer.len() as i32).to_le_bytes());
        bytes.extend(b"PAR1");
        BuiltFile { bytes, chunks }
    }
}

fn push_encoding(encodings: &mut Vec<Encoding>, encoding: Encoding) {
    if !encodings.contains(&encoding) {
        encodings.push(encoding);
    }
}

fn page_header(page: &TestPage, stored: &[u8], with_crc: bool) -> Vec<u8> {
    let mut header = PageHeader {
        type_: PageType::DATA_PAGE,
        uncompressed_page_size: page.payload.len() as i32,
        compressed_page_size: stored.len() as i32,
        crc: with_crc.then(|| crc32fast::hash(stored) as i32),
        data_page_header: None,
        index_page_header: None,
        dictionary_page_header: None,
        data_page_header_v2: None,
    };
    match page.kind {
        TestPageKind::V1 {
            num_values,
            encoding,
        } => {
            header.data_page_header = Some(DataPageHeader {
                num_values: num_values as i32,
                encoding,
                definition_level_encoding: Encoding::RLE,
                repetition_level_encoding: Encoding::RLE,
                statistics: None,
            });
        }
        TestPageKind::Dict { num_values } => {
            header.type_ = PageType::DICTIONARY_PAGE;
            header.dictionary_page_header = Some(DictionaryPageHeader {
                num_values: num_values as i32,
                encoding: Encoding::PLAIN,
                is_sorted: None,
            });
        }
        TestPageKind::V2 {
            num_values,
            num_nulls,
            encoding,
            def_len,
        } => {
            header.type_ = PageType::DATA_PAGE_V2;
            header.data_page_header_v2 = Some(DataPageHeaderV2 {
                num_values: num_values as i32,
                num_nulls: num_nulls as i32,
                num_rows: num_values as i32,
                encoding,
                definition_levels_byte_length: def_len as i32,
                repetition_levels_byte_length: 0,
                is_compressed: None,
                statistics: None,
            });
        }
        TestPageKind::Index => header.type_ = PageType::INDEX_PAGE,
    }

    let mut buf = Vec::new();
    {
        let mut protocol = TCompactOutputProtocol::new(&mut buf);
        header.write_to_out_protocol(&mut protocol).unwrap();
    }
    buf
}

fn schema_element(
    name: &str,
    type_: Option<Type>,
    type_length: Option<i32>,
    repetition_type: Option<FieldRepetitionType>,
    num_children: Option<i32>,
) -> SchemaElement {
    SchemaElement {
        type_,
        type_length,
        repetition_type,
        name: name.to_string(),
        num_children,
        converted_type: None,
        scale: None,
        precision: None,
        field_id: None,
        logical_type: None,
    }
}

fn file_metadata(
    schema: &[TestColumn],
    top_level: i32,
    num_rows: i64,
    row_groups: Vec<RowGroup>,
) -> Vec<u8> {
    let mut elements = vec![schema_element("schema", None, None, None, Some(top_level))];
    elements.extend(schema.iter().map(|column| {
        schema_element(
            &column.name,
            column.type_,
            column.type_length,
            Some(column.repetition),
            column.num_children,
        )
    }));
    let metadata = FileMetaData {
        version: 1,
        schema: elements,
        num_rows,
        row_groups,
        key_value_metadata: None,
        created_by: None,
        column_orders: None,
        encryption_algorithm: None,
        footer_signing_key_metadata: None,
    };

    let mut buf = Vec::new();
    {
        let mut protocol = TCompactOutputProtocol::new(&mut buf);
        metadata.write_to_out_protocol(&mut protocol).unwrap();
    }
    buf
}

#[test]
fn test_built_chunks_cover_their_pages() {
    let file = FileBuilder::new(vec![required("a", Type::INT64)])
        .row_group(
            2,
            vec![TestChunk::plain(vec![
                TestPage::dict_plain(2, plain_i64(&[5, 6])),
                TestPage::v1_dict(2, 2, &[0, 1]),
            ])
            .with_codec(CompressionCodec::SNAPPY)],
        )
        .build();
    let chunk = &file.chunks[0][0];
    assert_eq!(chunk.start, 4);
    assert_eq!(chunk.pages[0].header_offset, chunk.start);
    let last = chunk.pages[1];
    assert_eq!(last.payload_offset + last.payload_len, chunk.start + chunk.len);
    assert_eq!(file.page_count(), 2);
}
