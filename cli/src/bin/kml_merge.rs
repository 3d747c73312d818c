// Copyright 2023 Viktor Reusch
//
// This file is part of kml_fixup.
//
// kml_fixup is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// kml_fixup is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with kml_fixup. If not, see <https://www.gnu.org/licenses/>.

//! Command-line interface for merging and compressing KML track files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use kml_fixup::{merge, write_kml, Error};

/// Merge and compress KML files.
#[derive(Parser)]
#[command(about = "Merge and compress KML files", version)]
struct Args {
    /// Output file
    output: PathBuf,
    /// Input files, in the order their placemarks should appear
    #[arg(required = true)]
    input: Vec<PathBuf>,
    /// Keep only every RATE-th coordinate of each line
    #[arg(long, default_value_t = 1)]
    rate: usize,
}

fn run(args: &Args) -> Result<(), Error> {
    info!("building tree");
    let mut kml = merge::build_document(&args.input)?;

    info!("compressing tree");
    merge::compress_coordinates(&mut kml, args.rate)?;

    info!("writing to {}", args.output.display());
    let mut sink = BufWriter::new(File::create(&args.output)?);
    write_kml(&kml, &mut sink)?;
    sink.flush()?;

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("merging failed: {err}");
            ExitCode::FAILURE
        }
    }
}
