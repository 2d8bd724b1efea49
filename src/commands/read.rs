//! Read command implementation

use super::{print_hex, Target};
use indicatif::{ProgressBar, ProgressStyle};
use owmem_core::bank::ReadProgress;
use std::fs;
use std::path::Path;

/// Progress bar for long bank reads
#[derive(Default)]
pub(crate) struct BarProgress {
    pb: Option<ProgressBar>,
}

impl ReadProgress for BarProgress {
    fn reading(&mut self, total_bytes: usize) {
        let pb = ProgressBar::new(total_bytes as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        self.pb = Some(pb);
    }

    fn read_progress(&mut self, bytes_read: usize) {
        if let Some(pb) = &self.pb {
            pb.set_position(bytes_read as u64);
        }
    }
}

impl BarProgress {
    fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_with_message("Read complete");
        }
    }
}

/// Run the read command
pub fn run_read(
    target: &mut Target,
    output: Option<&Path>,
    start: u32,
    length: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let size = target.bank.size();
    if start >= size {
        return Err(format!("Start 0x{:X} is beyond the {}-byte bank", start, size).into());
    }
    let length = length.unwrap_or(size - start);

    println!(
        "Reading {} bytes from '{}' of {}",
        length,
        target.bank.name(),
        target.device
    );

    let mut data = vec![0u8; length as usize];
    let mut progress = BarProgress::default();
    target
        .bank
        .read_with_progress(&mut target.session.bus, start, &mut data, &mut progress)?;
    progress.finish();

    match output {
        Some(path) => {
            fs::write(path, &data)?;
            println!("Wrote {} bytes to {:?}", data.len(), path);
        }
        None => print_hex(start, &data),
    }

    Ok(())
}
