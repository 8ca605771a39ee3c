use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use smush_core::consts::DEFAULT_SOURCE_FPS;
use smush_core::io::ser::SerReader;

#[derive(Args)]
pub struct InfoArgs {
    /// Input SER file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let reader = SerReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let header = &reader.header;

    println!("File:        {}", args.file.display());
    println!("Frames:      {}", reader.frame_count());
    println!("Dimensions:  {}x{}", header.width, header.height);
    println!("Bit depth:   {}", header.pixel_depth);
    println!("Color:       {}", header.color_name());
    match reader.timestamp_frame_rate() {
        Some(fps) => {
            println!("Frame rate:  {fps:.3} fps");
            println!("Duration:    {:.1} s", reader.frame_count() as f64 / fps);
        }
        None => println!("Frame rate:  unknown (assuming {DEFAULT_SOURCE_FPS} fps)"),
    }

    for (label, value) in [
        ("Observer:   ", &header.observer),
        ("Telescope:  ", &header.telescope),
        ("Instrument: ", &header.instrument),
    ] {
        if !value.is_empty() {
            println!("{label} {value}");
        }
    }

    let frame_bytes = header.frame_byte_size()?;
    let total_mb = (frame_bytes * reader.frame_count()) as f64 / (1024.0 * 1024.0);
    println!("Data size:   {total_mb:.1} MB");

    Ok(())
}
