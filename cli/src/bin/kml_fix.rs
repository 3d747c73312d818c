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

//! Command-line interface for repairing a directory of broken KML exports.

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use log::{error, info};

use kml_fixup::fix;

/// Fix the broken KML that the route planner exports.
#[derive(Parser)]
#[command(about = "Fix the broken KML that the route planner exports", version)]
struct Args {
    /// Input directory
    input: PathBuf,
    /// Output directory
    output: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    let args = Args::parse();

    info!(
        "fixing files in {}, writing to {}",
        args.input.display(),
        args.output.display()
    );
    match fix::fix_dir(&args.input, &args.output) {
        Ok(()) => {
            info!("done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("fixing failed: {err}");
            ExitCode::FAILURE
        }
    }
}
