//! docpeek - Preview and extract files embedded in documents and archives

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use docpeek_core::codecs::PreviewPayload;
use docpeek_core::config::{DocpeekConfig, EntryFilter, XmlFallbackSetting};
use docpeek_core::{spawn_open, ExportOptions, ExtractionSession, PreviewResult, SessionSettings};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::path::Path;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::List {
            file,
            images_only,
            json,
            config,
        } => {
            let mut cfg = DocpeekConfig::load_or_default(config.as_deref())?;
            if images_only {
                cfg.filter = EntryFilter::ImagesOnly;
            }
            let session = open_with_progress(&file, &cfg)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&session.descriptors())?);
                return Ok(());
            }

            println!("{} ({} entries, {} images)", file.display(), session.len(), session.image_count());
            for d in session.descriptors() {
                let path = if d.relative_path.is_empty() {
                    d.name.clone()
                } else {
                    format!("{}/{}", d.relative_path, d.name)
                };
                println!(
                    "  {:<6} {:>10}  {}{}",
                    d.kind.as_str(),
                    d.size_bytes,
                    path,
                    d.sniffed_mime.map(|m| format!("  [{}]", m)).unwrap_or_default()
                );
            }
            print_unreadable(&session);
            Ok(())
        }

        Commands::Preview {
            file,
            entry,
            out,
            strict_xml,
            config,
        } => {
            let mut cfg = DocpeekConfig::load_or_default(config.as_deref())?;
            if strict_xml {
                cfg.xml_fallback = XmlFallbackSetting::Fail;
            }
            let session = open_with_progress(&file, &cfg)?;
            let item = session
                .find_path(&entry)
                .ok_or_else(|| anyhow!("Entry not found in {}: {}", file.display(), entry))?;

            match item.preview() {
                PreviewResult::Success(PreviewPayload::Bitmap(bitmap)) => {
                    println!(
                        "{}: {}x{} image (decoded as {})",
                        entry, bitmap.width, bitmap.height, bitmap.decoder
                    );
                    if let Some(out) = out {
                        let rgba = bitmap
                            .to_rgba_image()
                            .ok_or_else(|| anyhow!("Decoded bitmap has inconsistent dimensions"))?;
                        rgba.save(&out)
                            .with_context(|| format!("Failed to write {}", out.display()))?;
                        println!("Saved preview to {}", out.display());
                    }
                }
                PreviewResult::Success(PreviewPayload::Text(text))
                | PreviewResult::Success(PreviewPayload::Xml(text)) => {
                    println!("{}", text);
                }
                PreviewResult::Success(PreviewPayload::Empty) => {
                    println!(
                        "{}: no preview for this entry type ({} bytes)",
                        entry,
                        item.raw_bytes().len()
                    );
                }
                PreviewResult::Failure(e) => {
                    return Err(anyhow!("Preview failed for {}: {}", entry, e));
                }
            }
            Ok(())
        }

        Commands::Extract {
            file,
            output,
            images_only,
            keep_structure,
            overwrite,
            config,
        } => {
            let mut cfg = DocpeekConfig::load_or_default(config.as_deref())?;
            if images_only {
                cfg.filter = EntryFilter::ImagesOnly;
            }
            let mut session = open_with_progress(&file, &cfg)?;

            println!("Extracting {} entries to {}", session.len(), output.display());
            let pb = progress_bar()?;
            let pb_clone = pb.clone();
            let progress_fn = move |current: usize, total: usize, msg: &str| {
                pb_clone.set_length(total as u64);
                pb_clone.set_position(current as u64);
                pb_clone.set_message(msg.to_string());
            };

            let options = ExportOptions {
                keep_structure,
                overwrite,
            };
            let report = session.extract_to(&output, options, Some(&progress_fn))?;
            pb.finish_with_message("Complete");

            println!();
            println!("Extraction complete!");
            println!("  Written: {} files ({} bytes)", report.written.len(), report.total_bytes());
            for f in &report.written {
                debug!("written path={} crc32={:08x}", f.path.display(), f.crc32);
            }
            if !report.failed.is_empty() {
                println!("  Failed: {} files", report.failed.len());
                for f in &report.failed {
                    println!("    {}: {}", f.source, f.message);
                }
            }
            print_unreadable(&session);
            Ok(())
        }
    }
}

fn print_unreadable(session: &ExtractionSession) {
    let failed = session.failed_entries();
    if failed.is_empty() {
        return;
    }
    println!("{} files could not be extracted:", failed.len());
    for f in failed {
        if f.relative_path.is_empty() {
            println!("    {}: {}", f.name, f.message);
        } else {
            println!("    {}/{}: {}", f.relative_path, f.name, f.message);
        }
    }
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Open `path` on the background worker, driving a progress bar from its events.
fn open_with_progress(path: &Path, cfg: &DocpeekConfig) -> Result<ExtractionSession> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path.file_name().map(|n| n.to_string_lossy().to_string());

    let pb = progress_bar()?;
    let job = spawn_open(ExtractionSession::new(SessionSettings::from_config(cfg)), bytes, name);
    for event in job.events().iter() {
        pb.set_length(event.total as u64);
        pb.set_position(event.current as u64);
        pb.set_message(event.name);
    }
    let (session, result) = job.wait();
    pb.finish_and_clear();

    result.with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(session)
}
