//! Subcommand implementations

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use zipease_core::{ArchiveReader, ArchiveWriter, Config, ExtractReport, ZipSink};

fn spinner(enabled: bool, message: String) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Number of failures the writer recorded, each one logged
fn writer_failures(writer: &ArchiveWriter<ZipSink>) -> usize {
    for failure in writer.failures() {
        warn!("Not archived: {}", failure);
    }
    writer.failures().len()
}

/// Number of failed entries in the report, each one logged
fn report_failures(report: &ExtractReport) -> usize {
    for name in &report.skipped_encrypted {
        warn!("Skipped encrypted entry: {}", name);
    }
    for failure in &report.failures {
        warn!("Not extracted: {}", failure);
    }
    report.failures.len()
}

fn pack_into(config: &Config, input: &Path, output: &Path, progress: bool) -> usize {
    let pb = spinner(progress, format!("Packing {}", input.display()));

    let mut writer = ArchiveWriter::create_with_config(output, config.writer.clone());
    // Failures are collected by the writer and checked below
    let _ = writer.add_folder(input);
    let _ = writer.flush();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!(
        "Packed {} entries into {:?}",
        writer.entries_written(),
        output
    );
    writer_failures(&writer)
}

/// Pack a folder or a single file
pub fn pack(config: &Config, input: &Path, output: &Path, progress: bool) -> Result<()> {
    let failed = pack_into(config, input, output, progress);
    if failed > 0 {
        bail!("{} operation(s) failed while packing {:?}", failed, input);
    }
    Ok(())
}

/// Print entry names, or their metadata as JSON
pub fn list(config: &Config, archive: &Path, json: bool) -> Result<()> {
    let mut reader = ArchiveReader::open_with_config(archive, config.reader.clone());

    if json {
        let entries = reader.entries()?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for name in reader.list_entries()? {
            println!("{}", name);
        }
    }

    Ok(())
}

/// Extract everything, one named entry, or the first entry
pub fn extract(
    config: &Config,
    archive: &Path,
    output: &Path,
    entry: Option<&str>,
    first: Option<&Path>,
    progress: bool,
) -> Result<()> {
    let mut reader = ArchiveReader::open_with_config(archive, config.reader.clone());

    if let Some(dest) = first {
        if !reader.extract_first_to_file(dest)? {
            bail!("Archive {:?} is empty", archive);
        }
        info!("Extracted first entry to {:?}", dest);
        return Ok(());
    }

    if let Some(name) = entry {
        match reader.extract_one(name, output)? {
            Some(path) => info!("Extracted {} to {:?}", name, path),
            None => bail!("Entry {} not found in {:?}", name, archive),
        }
        return Ok(());
    }

    let pb = spinner(progress, format!("Extracting {}", archive.display()));
    let report = reader.extract_all(output)?;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let failed = report_failures(&report);
    if failed > 0 {
        bail!("{} entries could not be extracted", failed);
    }
    Ok(())
}

/// Pack `folder`, reopen the archive, extract it, copy the first entry and list everything
pub fn demo(
    config: &Config,
    folder: &Path,
    archive: &Path,
    output: &Path,
    first: &Path,
    progress: bool,
) -> Result<()> {
    let mut failed = pack_into(config, folder, archive, progress);

    let mut reader = ArchiveReader::open_with_config(archive, config.reader.clone());
    let report = reader.extract_all(output)?;
    failed += report_failures(&report);

    if !reader.extract_first_to_file(first)? {
        warn!("Archive {:?} has no entries", archive);
    }

    for name in reader.list_entries()? {
        println!("{}", name);
    }

    if failed > 0 {
        bail!("{} operation(s) failed", failed);
    }
    Ok(())
}
