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
#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::ops::Range;
use std::sync::Arc;

use parquet::basic::{BrotliLevel, Compression, Encoding, GzipLevel, ZstdLevel};
use parquet::data_type::{
    BoolType, ByteArray, ByteArrayType, DoubleType, FixedLenByteArray, FixedLenByteArrayType,
    Int32Type, Int64Type,
};
use parquet::file::properties::{EnabledStatistics, WriterProperties, WriterVersion};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::{SerializedColumnWriter, SerializedFileWriter};
use parquet::schema::parser::parse_message_type;
use parquet::schema::types::ColumnPath;
use tempfile::NamedTempFile;

pub const COUNT: usize = 4096;

pub const VERSIONS: [WriterVersion; 2] = [WriterVersion::PARQUET_1_0, WriterVersion::PARQUET_2_0];

pub fn all_codecs() -> Vec<Compression> {
    vec![
        Compression::UNCOMPRESSED,
        Compression::SNAPPY,
        Compression::GZIP(GzipLevel::default()),
        Compression::BROTLI(BrotliLevel::default()),
        Compression::LZ4,
        Compression::LZ4_RAW,
        Compression::ZSTD(ZstdLevel::default()),
    ]
}

/// One line per column; a narrow file takes the first three.
const SAMPLE_COLUMNS: [&str; 8] = [
    "required int64 id;",
    "optional binary name (STRING);",
    "optional double score;",
    "required boolean flag;",
    "required int32 small;",
    "optional fixed_len_byte_array(4) tag;",
    "repeated int32 readings;",
    "optional group tags (LIST) { repeated group list { optional binary element (STRING); } }",
];

pub const NARROW_COLUMNS: usize = 3;

/// Non-default value encoding per sample column, in column order.
const SAMPLE_ENCODINGS: [(&str, Encoding); 8] = [
    ("id", Encoding::DELTA_BINARY_PACKED),
    ("name", Encoding::DELTA_LENGTH_BYTE_ARRAY),
    ("score", Encoding::BYTE_STREAM_SPLIT),
    ("flag", Encoding::RLE),
    ("small", Encoding::DELTA_BINARY_PACKED),
    ("tag", Encoding::DELTA_BYTE_ARRAY),
    ("readings", Encoding::DELTA_BINARY_PACKED),
    ("tags.list.element", Encoding::DELTA_BYTE_ARRAY),
];

#[derive(Debug, Clone)]
pub struct WriteConfig {
    pub compression: Compression,
    pub version: WriterVersion,
    pub dictionary: bool,
    pub columns: usize,
    pub row_groups: Vec<usize>,
    pub page_rows: usize,
    pub page_index: bool,
    pub encoded: bool,
}

impl WriteConfig {
    pub fn new(compression: Compression, version: WriterVersion) -> Self {
        Self {
            compression,
            version,
            dictionary: true,
            columns: SAMPLE_COLUMNS.len(),
            row_groups: vec![COUNT / 2, COUNT / 2],
            page_rows: 256,
            page_index: true,
            encoded: false,
        }
    }

    pub fn with_dictionary(mut self, dictionary: bool) -> Self {
        self.dictionary = dictionary;
        self
    }

    pub fn narrow(mut self) -> Self {
        self.columns = NARROW_COLUMNS;
        self
    }

    pub fn with_row_groups(mut self, row_groups: &[usize]) -> Self {
        self.row_groups = row_groups.to_vec();
        self
    }

    pub fn with_page_rows(mut self, page_rows: usize) -> Self {
        self.page_rows = page_rows;
        self
    }

    /// Nothing is written between the last column chunk and the footer.
    pub fn without_page_index(mut self) -> Self {
        self.page_index = false;
        self
    }

    /// Writes every column with its entry in `SAMPLE_ENCODINGS` instead of
    /// PLAIN or a dictionary.
    pub fn with_encodings(mut self) -> Self {
        self.dictionary = false;
        self.encoded = true;
        self
    }

    pub fn total_rows(&self) -> usize {
        self.row_groups.iter().sum()
    }

    fn schema(&self) -> String {
        let mut schema = String::from("message sample {\n");
        for column in &SAMPLE_COLUMNS[..self.columns] {
            schema.push_str("    ");
            schema.push_str(column);
            schema.push('\n');
        }
        schema.push('}');
        schema
    }

    fn properties(&self) -> WriterProperties {
        let mut builder = WriterProperties::builder()
            .set_writer_version(self.version)
            .set_compression(self.compression)
            .set_dictionary_enabled(self.dictionary)
            .set_data_page_row_count_limit(self.page_rows)
            .set_write_batch_size(self.page_rows);
        if self.encoded {
            for (path, encoding) in &SAMPLE_ENCODINGS[..self.columns] {
                let path = ColumnPath::new(path.split('.').map(String::from).collect());
                builder = builder.set_column_encoding(path, *encoding);
            }
        }
        if self.page_index {
            builder.build()
        } else {
            builder
                .set_statistics_enabled(EnabledStatistics::None)
                .set_offset_index_disabled(true)
                .build()
        }
    }
}

/// Writes the sample table with one `next_row_group` per entry of `row_groups`.
pub fn write_sample(config: &WriteConfig) -> NamedTempFile {
    let schema = Arc::new(parse_message_type(&config.schema()).unwrap());
    let file = NamedTempFile::new().unwrap();
    let mut writer = SerializedFileWriter::new(
        file.reopen().unwrap(),
        schema,
        Arc::new(config.properties()),
    )
    .unwrap();

    let mut first_row = 0;
    for &rows in &config.row_groups {
        let mut row_group = writer.next_row_group().unwrap();
        let mut column = 0;
        while let Some(mut column_writer) = row_group.next_column().unwrap() {
            write_sample_column(&mut column_writer, column, first_row..first_row + rows);
            column_writer.close().unwrap();
            column += 1;
        }
        row_group.close().unwrap();
        first_row += rows;
    }
    writer.close().unwrap();
    file
}

fn write_sample_column(writer: &mut SerializedColumnWriter<'_>, column: usize, rows: Range<usize>) {
    match column {
        0 => {
            let values: Vec<i64> = rows.map(|i| i as i64).collect();
            writer
                .typed::<Int64Type>()
                .write_batch(&values, None, None)
                .unwrap();
        }
        1 => {
            let (values, def_levels) = optional_values(rows, |i| {
                (i % 10 != 0).then(|| ByteArray::from(format!("name-{}", i % 37).as_str()))
            });
            writer
                .typed::<ByteArrayType>()
                .write_batch(&values, Some(&def_levels), None)
                .unwrap();
        }
        2 => {
            let (values, def_levels) =
                optional_values(rows, |i| (i % 2 == 1).then(|| i as f64 * 0.5));
            writer
                .typed::<DoubleType>()
                .write_batch(&values, Some(&def_levels), None)
                .unwrap();
        }
        3 => {
            let values: Vec<bool> = rows.map(|i| i % 3 == 0).collect();
            writer
                .typed::<BoolType>()
                .write_batch(&values, None, None)
                .unwrap();
        }
        4 => {
            let values: Vec<i32> = rows.map(|i| (i % 100) as i32 - 50).collect();
            writer
                .typed::<Int32Type>()
                .write_batch(&values, None, None)
                .unwrap();
        }
        5 => {
            let (values, def_levels) = optional_values(rows, |i| {
                (i % 7 != 0).then(|| {
                    let bytes = vec![i as u8, (i >> 8) as u8, 1, 2];
                    FixedLenByteArray::from(ByteArray::from(bytes))
                })
            });
            writer
                .typed::<FixedLenByteArrayType>()
                .write_batch(&values, Some(&def_levels), None)
                .unwrap();
        }
        6 => {
            let mut values = Vec::new();
            let mut def_levels = Vec::new();
            let mut rep_levels = Vec::new();
            for i in rows {
                let len = i % 4;
                if len == 0 {
                    def_levels.push(0);
                    rep_levels.push(0);
                }
                for k in 0..len {
                    values.push((i * 10 + k) as i32);
                    def_levels.push(1);
                    rep_levels.push(if k == 0 { 0 } else { 1 });
                }
            }
            writer
                .typed::<Int32Type>()
                .write_batch(&values, Some(&def_levels), Some(&rep_levels))
                .unwrap();
        }
        7 => {
            // null list, empty list, or two elements of which the first may be null
            let mut values = Vec::new();
            let mut def_levels = Vec::new();
            let mut rep_levels = Vec::new();
            for i in rows {
                match i % 5 {
                    0 => {
                        def_levels.push(0);
                        rep_levels.push(0);
                    }
                    1 => {
                        def_levels.push(1);
                        rep_levels.push(0);
                    }
                    _ => {
                        if i % 3 == 0 {
                            def_levels.push(2);
                        } else {
                            def_levels.push(3);
                            values.push(ByteArray::from(format!("t{}", i).as_str()));
                        }
                        rep_levels.push(0);
                        def_levels.push(3);
                        values.push(ByteArray::from(format!("u{}", i % 11).as_str()));
                        rep_levels.push(1);
                    }
                }
            }
            writer
                .typed::<ByteArrayType>()
                .write_batch(&values, Some(&def_levels), Some(&rep_levels))
                .unwrap();
        }
        _ => panic!("no sample column {column}"),
    }
}

fn optional_values<T>(rows: Range<usize>, value: impl Fn(usize) -> Option<T>) -> (Vec<T>, Vec<i16>) {
    let mut values = Vec::new();
    let mut def_levels = Vec::new();
    for i in rows {
        match value(i) {
            Some(v) => {
                values.push(v);
                def_levels.push(1);
            }
            None => def_levels.push(0),
        }
    }
    (values, def_levels)
}

/// A file with a schema and no row groups.
pub fn write_empty() -> NamedTempFile {
    let config = WriteConfig::new(Compression::SNAPPY, WriterVersion::PARQUET_1_0);
    write_sample(&config.with_row_groups(&[]))
}

/// `(start, len)` of a column chunk, as recorded in the footer.
pub fn chunk_range(file: &NamedTempFile, row_group: usize, column: usize) -> (u64, u64) {
    let reader = SerializedFileReader::new(file.reopen().unwrap()).unwrap();
    reader
        .metadata()
        .row_group(row_group)
        .column(column)
        .byte_range()
}

/// Encodings a column chunk lists in the footer.
pub fn chunk_encodings(file: &NamedTempFile, row_group: usize, column: usize) -> Vec<Encoding> {
    let reader = SerializedFileReader::new(file.reopen().unwrap()).unwrap();
    reader
        .metadata()
        .row_group(row_group)
        .column(column)
        .encodings()
        .clone()
}

/// Copies `file` into a new temp file after applying `edit` to its bytes.
pub fn corrupted_copy(file: &NamedTempFile, edit: impl FnOnce(&mut Vec<u8>)) -> NamedTempFile {
    let mut bytes = fs::read(file.path()).unwrap();
    edit(&mut bytes);
    let mut copy = NamedTempFile::new().unwrap();
    copy.write_all(&bytes).unwrap();
    copy.flush().unwrap();
    copy
}
