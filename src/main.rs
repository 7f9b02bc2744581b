// (c) 2022 Dimitar Rusev <mitikodev@gmail.com> licensed under GPL-3.0

use std::path::{Path, PathBuf};
use std::time::Instant;
use std::{env, fs, process};

use rayon::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wikiac::helpers::{first_mismatch, line_of};
use wikiac::search::select_order;
use wikiac::{compress, decompress, Config, Error, Result};

#[derive(Clone, Copy, Debug)]
enum Action {
    Compress,
    Decompress,
    Test,
    Search,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        print_usage_and_exit("Invocation doesn't match usage! Provide 2 arguments.");
    }
    let action = match args[1].as_str() {
        "c" => Action::Compress,
        "d" => Action::Decompress,
        "t" => Action::Test,
        "s" => Action::Search,
        _ => print_usage_and_exit("Unrecognized option -> <action>!"),
    };

    let path = PathBuf::from(&args[2]);
    if let Err(err) = Config::from_env().and_then(|config| run_path(&path, action, &config)) {
        error!(%err, "aborted");
        process::exit(1);
    }
}

fn run_path(path: &Path, action: Action, config: &Config) -> Result<()> {
    if path.is_file() {
        return run(path, action, config);
    }
    if !path.is_dir() {
        let reason = format!("{} is not a file or a directory", path.display());
        return Err(Error::Configuration(reason));
    }

    let mut files = vec![];
    for entry in fs::read_dir(path)? {
        let file_path = entry?.path();
        if file_path.is_file() {
            files.push(file_path);
        }
    }
    files.sort();
    files.par_iter().try_for_each(|file| run(file, action, config))
}

fn run(file_path: &Path, action: Action, config: &Config) -> Result<()> {
    let file_name = file_path
        .file_name()
        .ok_or_else(|| Error::Configuration(format!("{} has no file name", file_path.display())))?;
    let mut out_path = env::current_dir()?;
    out_path.push(file_name);

    let compress_path = out_path.with_extension("wac");
    let decompress_path = out_path.with_extension("orig");

    let timer = Instant::now();
    match action {
        Action::Compress => {
            compress_file(file_path, &compress_path, config)?;
            info!(file = %file_path.display(), elapsed = ?timer.elapsed(), "compression done");
        }
        Action::Decompress => {
            decompress_file(file_path, &decompress_path, config)?;
            info!(file = %file_path.display(), elapsed = ?timer.elapsed(), "decompression done");
        }
        Action::Test => {
            compress_file(file_path, &compress_path, config)?;
            info!(file = %file_path.display(), elapsed = ?timer.elapsed(), "compression done");
            let timer = Instant::now();
            decompress_file(&compress_path, &decompress_path, config)?;
            info!(file = %file_path.display(), elapsed = ?timer.elapsed(), "decompression done");
            compare(file_path, &decompress_path)?;
        }
        Action::Search => {
            let data = fs::read(file_path)?;
            let orders: Vec<usize> = (0..=config.order).collect();
            let best = select_order(&data, &orders, config.precision_bits)?;
            info!(
                file = %file_path.display(),
                order = best.order,
                bytes = best.archive_bytes(),
                ratio = best.archive_bytes() as f64 / data.len().max(1) as f64,
                elapsed = ?timer.elapsed(),
                "search done"
            );
        }
    }

    Ok(())
}

fn compress_file(input_file: &Path, output_file: &Path, config: &Config) -> Result<()> {
    let data = fs::read(input_file)?;
    let archive = compress(&data, config).map_err(|failure| failure.source)?;
    let bytes = archive.to_bytes()?;
    info!(
        input = data.len(),
        output = bytes.len(),
        ratio = bytes.len() as f64 / data.len().max(1) as f64,
        "archive written to {}",
        output_file.display()
    );
    fs::write(output_file, bytes)?;
    Ok(())
}

fn decompress_file(input_file: &Path, output_file: &Path, config: &Config) -> Result<()> {
    let bytes = fs::read(input_file)?;
    let data = decompress(&bytes, config)?;
    fs::write(output_file, data)?;
    Ok(())
}

fn compare(file1: &Path, file2: &Path) -> Result<()> {
    let (a, b) = (fs::read(file1)?, fs::read(file2)?);
    match first_mismatch(&a, &b) {
        None => {
            info!(file = %file1.display(), "compare: OK");
            Ok(())
        }
        Some(pos) => Err(Error::Format {
            what: "roundtrip",
            reason: format!(
                "files differ at byte {pos}, line {} ({} vs {} bytes)",
                line_of(&a, pos),
                a.len(),
                b.len()
            ),
        }),
    }
}

fn print_usage_and_exit(msg: &str) -> ! {
    println!("Usage: wikiac <Action> <Path>");
    println!("<Action> [single file]: c (compress), d (decompress), t (test = c + d)");
    println!("<Action> [single file]: s (search order)");
    println!("<Path> can be a single file or a directory");
    println!("Note: Directories are shallow traversed");
    println!("Env: WIKIAC_ORDER, WIKIAC_PRECISION, WIKIAC_TRAIN_LIMIT, RUST_LOG");
    eprintln!("{msg}");
    process::exit(2);
}
