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
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::SetLoggerError;
use parquet_check::logging::{init_logger, level_filter};
use parquet_check::options::{DEFAULT_MAX_FOOTER_SIZE, DEFAULT_MAX_PAGE_SIZE};
use parquet_check::{CheckOptions, CheckOutcome, CorruptionError, ErrorKind, IntegrityChecker};
use rayon::prelude::*;
use rayon::ThreadPoolBuildError;
use snafu::{ResultExt, Snafu};

/// Decodes every page of every column chunk of each Parquet file and reports
/// the first structural failure per file.
#[derive(Debug, Parser)]
#[command(name = "parquet-check", version)]
struct Args {
    /// Files to check. Paths that do not exist are reported and skipped.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Largest compressed or uncompressed page size accepted, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_PAGE_SIZE)]
    max_page_size: usize,

    /// Largest serialized footer accepted, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_FOOTER_SIZE)]
    max_footer_size: usize,

    /// Skip page CRC verification.
    #[arg(long)]
    no_checksums: bool,

    /// Number of files checked in parallel. Defaults to the number of CPUs.
    #[arg(short, long)]
    jobs: Option<usize>,

    /// More log output on stderr; repeat for more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Snafu)]
enum CliError {
    #[snafu(display("could not install logger"))]
    Logger { source: SetLoggerError },

    #[snafu(display("could not start {jobs} worker threads"))]
    ThreadPool {
        jobs: usize,
        source: ThreadPoolBuildError,
    },
}

const EXIT_CORRUPT: u8 = 1;
const EXIT_IO: u8 = 2;

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(EXIT_IO)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode, CliError> {
    init_logger(level_filter(args.verbose, args.quiet)).context(LoggerSnafu)?;

    let options = CheckOptions::new()
        .with_max_page_size(args.max_page_size)
        .with_max_footer_size(args.max_footer_size)
        .with_verify_checksums(!args.no_checksums);
    let checker = IntegrityChecker::new(options);

    let jobs = args.jobs.unwrap_or(0);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context(ThreadPoolSnafu { jobs })?;
    let results: Vec<Result<CheckOutcome, CorruptionError>> =
        pool.install(|| args.files.par_iter().map(|path| checker.check(path)).collect());

    for (path, result) in args.files.iter().zip(&results) {
        report(path, result);
    }
    let tally = Tally::new(&results);
    log::info!(
        "checked {} files: {} corrupt, {} unreadable",
        args.files.len(),
        tally.corrupt,
        tally.unreadable
    );
    Ok(ExitCode::from(tally.exit_code()))
}

fn report(path: &Path, result: &Result<CheckOutcome, CorruptionError>) {
    match result {
        Ok(CheckOutcome::Clean(summary)) => println!(
            "OK       {}: {} row groups, {} column chunks, {} pages, {} rows",
            path.display(),
            summary.row_groups,
            summary.column_chunks,
            summary.pages(),
            summary.rows
        ),
        Ok(CheckOutcome::Missing) => println!("MISSING  {}", path.display()),
        Ok(CheckOutcome::Cancelled(summary)) => println!(
            "STOPPED  {}: after {} row groups",
            path.display(),
            summary.row_groups
        ),
        Err(err) => {
            let label = match err.kind() {
                ErrorKind::Io => "IO ERROR",
                ErrorKind::Format | ErrorKind::Decode => "CORRUPT ",
            };
            println!("{} {}: [{}] {}", label, path.display(), err.kind(), err.cause());
        }
    }
}

/// Failed files by kind. Corruption outranks I/O failures in the exit code.
#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    corrupt: usize,
    unreadable: usize,
}

impl Tally {
    fn new(results: &[Result<CheckOutcome, CorruptionError>]) -> Self {
        let mut tally = Tally::default();
        for err in results.iter().filter_map(|result| result.as_ref().err()) {
            match err.kind() {
                ErrorKind::Io => tally.unreadable += 1,
                ErrorKind::Format | ErrorKind::Decode => tally.corrupt += 1,
            }
        }
        tally
    }

    fn exit_code(&self) -> u8 {
        if self.corrupt > 0 {
            EXIT_CORRUPT
        } else if self.unreadable > 0 {
            EXIT_IO
        } else {
            0
        }
    }
}
