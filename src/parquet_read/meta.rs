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
use std::io::Cursor;

use parquet_format_safe::thrift::protocol::TCompactInputProtocol;
use parquet_format_safe::{
    ColumnChunk, FieldRepetitionType, FileMetaData as ThriftFileMetaData, RowGroup,
    SchemaElement,
};

use crate::options::CheckOptions;
use crate::parquet::compression::Compression;
use crate::parquet::error::{fmt_err, ParquetErrorExt, ParquetResult};
use crate::parquet::io::ByteSource;
use crate::parquet_read::{
    ColumnChunkMetadata, ColumnDescriptor, Encoding, FileMetadata, PhysicalType,
    RowGroupMetadata, FOOTER_TRAILER_SIZE, PARQUET_ENCRYPTED_MAGIC, PARQUET_MAGIC,
};

/// Smallest possible file: leading magic plus the trailer.
const MIN_FILE_SIZE: u64 = (PARQUET_MAGIC.len() + FOOTER_TRAILER_SIZE) as u64;

/// Nesting guard for the recursive schema walk.
const MAX_SCHEMA_DEPTH: usize = 256;

/// Reads and validates the footer of the file.
pub fn read_metadata<S: ByteSource + ?Sized>(
    source: &S,
    options: &CheckOptions,
) -> ParquetResult<FileMetadata> {
    let file_len = source.len();
    if file_len < MIN_FILE_SIZE {
        return Err(fmt_err!(
            Layout,
            "file of {} bytes is too small, expected at least {}",
            file_len,
            MIN_FILE_SIZE
        ));
    }

    let mut magic = [0u8; 4];
    source.read_at(0, &mut magic)?;
    if magic != PARQUET_MAGIC {
        return Err(fmt_err!(Layout, "invalid leading magic {:?}", magic));
    }

    let mut trailer = [0u8; FOOTER_TRAILER_SIZE];
    source.read_at(file_len - FOOTER_TRAILER_SIZE as u64, &mut trailer)?;
    let trailing_magic = [trailer[4], trailer[5], trailer[6], trailer[7]];
    if trailing_magic == PARQUET_ENCRYPTED_MAGIC {
        return Err(fmt_err!(Unsupported, "encrypted footers are not supported"));
    }
    if trailing_magic != PARQUET_MAGIC {
        return Err(fmt_err!(
            Layout,
            "invalid trailing magic {:?}",
            trailing_magic
        ));
    }

    let footer_len = i32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let max_len = file_len - MIN_FILE_SIZE;
    let footer_len: u64 = match u64::try_from(footer_len) {
        Ok(len) if len <= max_len => len,
        _ => {
            return Err(fmt_err!(
                Layout,
                "footer length {} does not fit in a file of {} bytes",
                footer_len,
                file_len
            ))
        }
    };
    if footer_len > options.max_footer_size() as u64 {
        return Err(fmt_err!(
            Layout,
            "footer length {} exceeds the limit of {} bytes",
            footer_len,
            options.max_footer_size()
        ));
    }

    let footer_offset = file_len - FOOTER_TRAILER_SIZE as u64 - footer_len;
    let mut footer = vec![0u8; footer_len as usize];
    source.read_at(footer_offset, &mut footer)?;

    let metadata = deserialize_footer(&footer).context("could not parse footer")?;
    let metadata = convert_metadata(metadata, footer_offset, footer_len)?;
    log::debug!(
        "footer of {} bytes at offset {}: {} row groups, {} columns, {} rows",
        footer_len,
        footer_offset,
        metadata.row_groups.len(),
        metadata.columns.len(),
        metadata.num_rows
    );
    Ok(metadata)
}

fn deserialize_footer(footer: &[u8]) -> ParquetResult<ThriftFileMetaData> {
    // Bounds the allocations the deserializer may make for lists and strings.
    let max_size = footer.len() * 2 + 1024;
    let mut cursor = Cursor::new(footer);
    let mut prot = TCompactInputProtocol::new(&mut cursor, max_size);
    let metadata = ThriftFileMetaData::read_from_in_protocol(&mut prot)?;
    let unread = footer.len() as u64 - cursor.position();
    if unread > 0 {
        log::warn!("{} trailing footer bytes were not consumed", unread);
    }
    Ok(metadata)
}

fn convert_metadata(
    metadata: ThriftFileMetaData,
    footer_offset: u64,
    footer_len: u64,
) -> ParquetResult<FileMetadata> {
    let columns = build_columns(&metadata.schema)?;
    if metadata.num_rows < 0 {
        return Err(fmt_err!(Layout, "negative row count {}", metadata.num_rows));
    }

    let row_groups = metadata
        .row_groups
        .into_iter()
        .enumerate()
        .map(|(index, row_group)| {
            convert_row_group(row_group)
                .with_context(|_| format!("row group {} metadata", index))
        })
        .collect::<ParquetResult<Vec<_>>>()?;

    let mut total_rows = 0i64;
    for row_group in &row_groups {
        total_rows = total_rows
            .checked_add(row_group.num_rows)
            .ok_or_else(|| fmt_err!(Layout, "row group row counts overflow"))?;
    }
    if total_rows != metadata.num_rows {
        return Err(fmt_err!(
            Layout,
            "row groups hold {} rows, footer declares {}",
            total_rows,
            metadata.num_rows
        ));
    }

    Ok(FileMetadata {
        version: metadata.version,
        num_rows: metadata.num_rows,
        created_by: metadata.created_by,
        columns,
        row_groups,
        footer_offset,
        footer_len,
    })
}

fn convert_row_group(row_group: RowGroup) -> ParquetResult<RowGroupMetadata> {
    if row_group.num_rows < 0 {
        return Err(fmt_err!(Layout, "negative row count {}", row_group.num_rows));
    }
    let columns = row_group
        .columns
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            convert_column_chunk(chunk).with_context(|_| format!("column chunk {}", index))
        })
        .collect::<ParquetResult<Vec<_>>>()?;
    Ok(RowGroupMetadata {
        num_rows: row_group.num_rows,
        total_byte_size: row_group.total_byte_size,
        columns,
    })
}

fn convert_column_chunk(chunk: ColumnChunk) -> ParquetResult<ColumnChunkMetadata> {
    let meta = chunk
        .meta_data
        .ok_or_else(|| fmt_err!(Layout, "column chunk has no inline metadata"))?;
    let encodings = meta
        .encodings
        .into_iter()
        .map(Encoding::try_from)
        .collect::<ParquetResult<Vec<_>>>()?;
    Ok(ColumnChunkMetadata {
        // The fixed length lives in the schema; chunks only carry the kind.
        physical_type: PhysicalType::from_thrift(meta.type_, Some(0))?,
        path: meta.path_in_schema,
        compression: Compression::try_from(meta.codec)?,
        encodings,
        num_values: meta.num_values,
        total_compressed_size: meta.total_compressed_size,
        total_uncompressed_size: meta.total_uncompressed_size,
        data_page_offset: meta.data_page_offset,
        dictionary_page_offset: meta.dictionary_page_offset,
        file_path: chunk.file_path,
    })
}

/// Flattens the depth-first schema list into its leaf columns.
fn build_columns(schema: &[SchemaElement]) -> ParquetResult<Vec<ColumnDescriptor>> {
    let root = schema
        .first()
        .ok_or_else(|| fmt_err!(Layout, "schema has no root element"))?;
    let num_children: usize = root.num_children.unwrap_or(0).try_into()?;

    let mut walker = SchemaWalker {
        schema,
        next: 1,
        path: Vec::new(),
        columns: Vec::new(),
    };
    for _ in 0..num_children {
        walker.visit(0, 0, 1)?;
    }
    if walker.next != schema.len() {
        return Err(fmt_err!(
            Layout,
            "schema has {} elements, only {} are reachable from the root",
            schema.len(),
            walker.next
        ));
    }
    Ok(walker.columns)
}

struct SchemaWalker<'a> {
    schema: &'a [SchemaElement],
    next: usize,
    path: Vec<String>,
    columns: Vec<ColumnDescriptor>,
}

impl SchemaWalker<'_> {
    fn visit(&mut self, def_level: i16, rep_level: i16, depth: usize) -> ParquetResult<()> {
        if depth > MAX_SCHEMA_DEPTH {
            return Err(fmt_err!(Layout, "schema nesting exceeds {}", MAX_SCHEMA_DEPTH));
        }
        let element = self.schema.get(self.next).ok_or_else(|| {
            fmt_err!(
                Layout,
                "schema ends after {} elements, more children are declared",
                self.schema.len()
            )
        })?;
        self.next += 1;

        let (def_level, rep_level) = match element.repetition_type {
            Some(FieldRepetitionType::REQUIRED) => (def_level, rep_level),
            Some(FieldRepetitionType::OPTIONAL) => (def_level + 1, rep_level),
            Some(FieldRepetitionType::REPEATED) => (def_level + 1, rep_level + 1),
            Some(other) => {
                return Err(fmt_err!(
                    Layout,
                    "unknown repetition {} for schema element \"{}\"",
                    other.0,
                    element.name
                ))
            }
            None => {
                return Err(fmt_err!(
                    Layout,
                    "schema element \"{}\" has no repetition",
                    element.name
                ))
            }
        };

        self.path.push(element.name.clone());
        let num_children = element.num_children.unwrap_or(0);
        if num_children > 0 || element.type_.is_none() {
            let num_children: usize = num_children.try_into()?;
            for _ in 0..num_children {
                self.visit(def_level, rep_level, depth + 1)?;
            }
        } else if let Some(type_) = element.type_ {
            let physical_type = PhysicalType::from_thrift(type_, element.type_length)
                .with_context(|_| format!("schema element \"{}\"", element.name))?;
            self.columns.push(ColumnDescriptor {
                path: self.path.clone(),
                physical_type,
                max_def_level: def_level,
                max_rep_level: rep_level,
            });
        }
        self.path.pop();
        Ok(())
    }
}
