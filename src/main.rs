mod args;

use gamearc::COUNTER;
use gamearc::archive::Archive;
use gamearc::formats::{REGISTRY, Sniffer};
use gamearc::progress::LogProgress;
use gamearc::resource::Replacement;
use gamearc::types;
use gamearc::utils;
use std::path::{Path, PathBuf};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

fn load_config(arg: &args::Arg) -> anyhow::Result<types::ExtraConfig> {
    let mut cfg = match &arg.config {
        Some(path) => types::ExtraConfig::load(path)?,
        None => types::ExtraConfig::default(),
    };
    if let Some(size) = arg.buffer_size {
        cfg.buffer_size = size;
    }
    if let Some(max) = arg.max_files {
        cfg.max_files = max;
    }
    if let Some(enc) = arg.encoding.and_then(|e| e.to_encoding()) {
        cfg.archive_encoding = Some(enc);
    }
    Ok(cfg)
}

pub fn open_archive(
    filename: &Path,
    arg: &args::Arg,
    config: &types::ExtraConfig,
) -> anyhow::Result<Archive> {
    match &arg.format {
        Some(format) => {
            let descriptor = REGISTRY
                .get(*format)
                .ok_or_else(|| anyhow::anyhow!("Format {:?} is not registered", format))?;
            Archive::open_as(filename, descriptor.clone(), config.clone())
        }
        None => Archive::open(filename, &REGISTRY, config.clone()),
    }
}

pub fn detect_archive(filename: &Path, config: &types::ExtraConfig) -> anyhow::Result<()> {
    let sniffer = Sniffer::new(&REGISTRY, config);
    let candidates = sniffer.rate_all(filename)?;
    println!("{}:", filename.display());
    for candidate in candidates.iter().filter(|c| c.score > 0) {
        println!(
            "  {:>4}  {:?}  {}",
            candidate.score,
            candidate.descriptor.format(),
            candidate.descriptor.name()
        );
    }
    if candidates.iter().all(|c| c.score == 0) {
        println!("  no matching format");
        COUNTER.archive_unrecognized();
    } else {
        COUNTER.archive_done();
    }
    Ok(())
}

pub fn list_archive(
    filename: &Path,
    arg: &args::Arg,
    config: &types::ExtraConfig,
    json: bool,
) -> anyhow::Result<()> {
    let archive = open_archive(filename, arg, config)?;
    if json {
        let entries: Vec<_> = archive
            .resources()
            .iter()
            .enumerate()
            .map(|(i, r)| {
                serde_json::json!({
                    "name": r.name,
                    "offset": r.offset,
                    "length": r.length,
                    "decompressedLength": r.decompressed_length,
                    "compressed": r.is_compressed(),
                    "preview": archive.preview_hint(i),
                })
            })
            .collect();
        let doc = serde_json::json!({
            "path": filename.display().to_string(),
            "format": archive.descriptor().name(),
            "resources": entries,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!(
            "{} ({}, {} resources)",
            filename.display(),
            archive.descriptor().name(),
            archive.len()
        );
        for r in archive.resources() {
            println!(
                "  {:#010x} {:>10} {:>10}  {}",
                r.offset, r.length, r.decompressed_length, r.name
            );
        }
    }
    COUNTER.archive_done();
    Ok(())
}

fn default_output_dir(filename: &Path) -> PathBuf {
    let stem = filename.file_stem().unwrap_or(filename.as_os_str());
    filename.with_file_name(stem)
}

pub fn extract_archive(
    filename: &Path,
    arg: &args::Arg,
    config: &types::ExtraConfig,
    output: &Option<String>,
    is_dir: bool,
) -> anyhow::Result<()> {
    let archive = open_archive(filename, arg, config)?;
    let out_dir = match output {
        Some(output) if is_dir => {
            let stem = filename.file_stem().unwrap_or(filename.as_os_str());
            Path::new(output).join(stem)
        }
        Some(output) => PathBuf::from(output),
        None => default_output_dir(filename),
    };
    std::fs::create_dir_all(&out_dir)?;
    let mut progress = LogProgress::new(filename.display().to_string());
    let count = archive.extract_all(&out_dir, &mut progress)?;
    eprintln!(
        "Extracted {} of {} resources to {}",
        count,
        archive.len(),
        out_dir.display()
    );
    COUNTER.archive_done();
    Ok(())
}

pub fn write_archive(
    arg: &args::Arg,
    config: &types::ExtraConfig,
    wargs: &args::WriteArgs,
    patch: bool,
) -> anyhow::Result<()> {
    let filename = Path::new(&wargs.input);
    let mut archive = open_archive(filename, arg, config)?;
    for (name, file) in wargs.replacements.iter() {
        let index = archive
            .find(name)
            .ok_or_else(|| anyhow::anyhow!("No resource named {} in {}", name, wargs.input))?;
        archive.set_replacement(index, Replacement::File(file.clone()))?;
    }
    let mut progress = LogProgress::new(wargs.output.clone());
    if patch {
        archive.replace(&wargs.output, &mut progress)?;
    } else {
        archive.write(&wargs.output, &mut progress)?;
    }
    COUNTER.archive_done();
    Ok(())
}

fn report(filename: &Path, e: anyhow::Error, backtrace: bool) {
    eprintln!("Error processing {}: {:#}", filename.display(), e);
    if backtrace {
        eprintln!("Backtrace: {}", e.backtrace());
    }
    COUNTER.archive_failed();
}

fn main() {
    let arg = args::parse_args();
    if arg.backtrace {
        unsafe { std::env::set_var("RUST_LIB_BACKTRACE", "1") };
    }
    init_logging(arg.verbose);
    let cfg = match load_config(&arg) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(2);
        }
    };
    match &arg.command {
        args::Command::Detect { input }
        | args::Command::List { input, .. }
        | args::Command::Extract { input, .. } => {
            let (files, is_dir) =
                match utils::files::collect_files(input, arg.recursive, arg.all_files) {
                    Ok(found) => found,
                    Err(e) => {
                        eprintln!("{}", e);
                        std::process::exit(2);
                    }
                };
            for file in files.iter() {
                let re = match &arg.command {
                    args::Command::Detect { .. } => detect_archive(file, &cfg),
                    args::Command::List { json, .. } => list_archive(file, &arg, &cfg, *json),
                    args::Command::Extract { output, .. } => {
                        extract_archive(file, &arg, &cfg, output, is_dir)
                    }
                    _ => Ok(()),
                };
                if let Err(e) = re {
                    report(file, e, arg.backtrace);
                }
            }
        }
        args::Command::Rebuild(wargs) => {
            if let Err(e) = write_archive(&arg, &cfg, wargs, false) {
                report(Path::new(&wargs.input), e, arg.backtrace);
            }
        }
        args::Command::Patch(wargs) => {
            if let Err(e) = write_archive(&arg, &cfg, wargs, true) {
                report(Path::new(&wargs.input), e, arg.backtrace);
            }
        }
    }
    eprintln!("{}", COUNTER);
    if COUNTER.failures() > 0 {
        std::process::exit(1);
    }
}
