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
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::{Display, Formatter, Write};
use std::sync::Arc;

use parquet_format_safe::thrift;

/// Coarse classification of a [`ParquetError`].
///
/// Every cause maps onto exactly one kind. Callers deciding between
/// "the file is broken" and "the file could not be read" only look at this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The medium could not be read: permissions, disappearing file, short read.
    Io,
    /// The bytes violate the file layout: magic, footer, page headers, byte ranges.
    Format,
    /// A page payload does not decompress or decode to its declared shape.
    Decode,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Io => "io",
            ErrorKind::Format => "format",
            ErrorKind::Decode => "decode",
        };
        f.write_str(name)
    }
}

/// Cause of a parquet error.
#[derive(Debug, Clone)]
pub enum ParquetErrorCause {
    /// Thrift deserialization of the footer or a page header failed.
    Thrift(Arc<thrift::Error>),
    Layout,
    Unsupported,
    /// A decompressor rejected the stream.
    Codec(Arc<dyn std::error::Error + Send + Sync>),
    Decode,
    Checksum,
    Io(Arc<std::io::Error>),
}

impl ParquetErrorCause {
    pub fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParquetErrorCause::Thrift(err) => Some(err.as_ref()),
            ParquetErrorCause::Codec(err) => Some(err.as_ref()),
            ParquetErrorCause::Io(err) => Some(err.as_ref()),
            ParquetErrorCause::Layout
            | ParquetErrorCause::Unsupported
            | ParquetErrorCause::Decode
            | ParquetErrorCause::Checksum => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ParquetErrorCause::Io(_) => ErrorKind::Io,
            ParquetErrorCause::Thrift(_)
            | ParquetErrorCause::Layout
            | ParquetErrorCause::Unsupported => ErrorKind::Format,
            ParquetErrorCause::Codec(_)
            | ParquetErrorCause::Decode
            | ParquetErrorCause::Checksum => ErrorKind::Decode,
        }
    }

    #[track_caller]
    pub fn into_err(self) -> ParquetError {
        ParquetError::new(self)
    }
}

/// An error reading parquet.
#[derive(Debug, Clone)]
pub struct ParquetError {
    /// What caused the error.
    cause: ParquetErrorCause,

    /// Initial message (if any) and
    /// stack of additional contextual information,
    /// printed in reverse order.
    context: Vec<String>,

    backtrace: Arc<Backtrace>,
}

impl ParquetError {
    #[track_caller]
    pub fn new(cause: ParquetErrorCause) -> Self {
        Self {
            cause,
            context: Vec::new(),
            backtrace: Backtrace::capture().into(),
        }
    }

    #[track_caller]
    pub fn with_descr(cause: ParquetErrorCause, descr: impl Into<String>) -> Self {
        Self {
            cause,
            context: vec![descr.into()],
            backtrace: Backtrace::capture().into(),
        }
    }

    /// Wraps a decompressor failure.
    #[track_caller]
    pub fn codec<E>(err: E, descr: impl Into<String>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::with_descr(ParquetErrorCause::Codec(Arc::new(err)), descr)
    }

    pub fn cause(&self) -> &ParquetErrorCause {
        &self.cause
    }

    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }

    fn fmt_msg<W: Write>(&self, f: &mut W) -> std::fmt::Result {
        // Print the context first in reverse order.
        let source = self.cause.source();
        let last_index = self.context.len().saturating_sub(1);
        for (index, context) in self.context.iter().rev().enumerate() {
            if index == last_index {
                write!(f, "{}", context)?;
            } else {
                write!(f, "{}: ", context)?;
            }
        }

        // Then the source's cause, if there is one.
        match source {
            Some(source) if self.context.is_empty() => write!(f, "{}", source)?,
            Some(source) => write!(f, ": {}", source)?,
            None if self.context.is_empty() => write!(f, "{:?}", self.cause)?,
            None => {}
        }
        Ok(())
    }

    pub fn display_with_backtrace(&self) -> String {
        let mut msg = String::new();
        let _ = self.fmt_msg(&mut msg);
        if self.backtrace.status() == BacktraceStatus::Captured {
            let _ = write!(msg, "\n{}", self.backtrace);
        }
        msg
    }
}

impl Display for ParquetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.fmt_msg(f)
    }
}

impl std::error::Error for ParquetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.source()
    }
}

impl From<thrift::Error> for ParquetError {
    #[track_caller]
    fn from(source: thrift::Error) -> Self {
        Self::new(ParquetErrorCause::Thrift(Arc::new(source)))
    }
}

impl From<std::io::Error> for ParquetError {
    #[track_caller]
    fn from(e: std::io::Error) -> Self {
        Self::new(ParquetErrorCause::Io(Arc::new(e)))
    }
}

impl From<std::num::TryFromIntError> for ParquetError {
    #[track_caller]
    fn from(e: std::num::TryFromIntError) -> Self {
        Self::with_descr(ParquetErrorCause::Layout, format!("integer out of range: {e}"))
    }
}

pub type ParquetResult<T> = Result<T, ParquetError>;

pub trait ParquetErrorExt<T> {
    fn context(self, context: &str) -> Self;
    fn with_context<F>(self, context: F) -> Self
    where
        F: FnOnce(&mut ParquetError) -> String;
}

impl<T> ParquetErrorExt<T> for ParquetResult<T> {
    fn context(self, context: &str) -> Self {
        match self {
            Ok(val) => Ok(val),
            Err(mut err) => {
                err.context.push(context.to_string());
                Err(err)
            }
        }
    }

    fn with_context<F>(self, context: F) -> Self
    where
        F: FnOnce(&mut ParquetError) -> String,
    {
        match self {
            Ok(val) => Ok(val),
            Err(mut err) => {
                let context = context(&mut err);
                err.context.push(context);
                Err(err)
            }
        }
    }
}

macro_rules! fmt_err {
    ($cause: ident, $($arg:tt)*) => {
        $crate::parquet::error::ParquetError::with_descr(
            $crate::parquet::error::ParquetErrorCause::$cause,
            format!($($arg)*))
    };
}

pub(crate) use fmt_err;
