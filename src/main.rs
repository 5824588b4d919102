use std::{
    collections::HashMap,
    io::{self, Write},
    path::PathBuf,
};

use clap::Parser;
use lazy_static::lazy_static;
use regex::Regex;

mod dump;
mod error;
mod model;
mod service;
mod util;

use error::CommonResult;
use model::DisplayMode;

const TAG_MAPPING: &str = include_str!("../tag_mapping.txt");

lazy_static! {
    // exact tags, then `x` wildcard patterns in table order
    static ref TAG_MAPPINGS: (HashMap<String, String>, Vec<(Regex, String)>) =
        util::load_and_convert_tag_mapping(TAG_MAPPING);
}

/// Dump the data elements of DICOM files as JSON
#[derive(Parser, Debug)]
#[command(name = "dicom_dump", version, about)]
struct Cli {
    /// DICOM Part 10 files, dumped in the order given
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,
}

fn main() -> CommonResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let mode = DisplayMode::default();

    let stdout = io::stdout();

    for file_path in &cli.files {
        let records = dump::dump_file(file_path, mode)?;

        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, &records)?;
        writeln!(out)?;
        out.flush()?;
    }

    Ok(())
}
