use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use subscale_core::decoder::{
    DecoderFactory, ExifOrientationReader, FileDecoderFactory, OrientationReader,
    RegionDecoder, SerRegionDecoder,
};

#[derive(Args)]
pub struct InfoArgs {
    /// Input image or SER file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let decoder = FileDecoderFactory.open(&args.file)?;
    let (width, height) = decoder.dimensions();
    let rotation = ExifOrientationReader.read(&args.file)?;

    println!("File:        {}", args.file.display());
    println!("Dimensions:  {}x{}", width, height);
    match rotation {
        Some(r) => println!("EXIF:        rotate {}\u{b0}", r.degrees()),
        None => println!("EXIF:        none"),
    }
    let megapixels = width as f64 * height as f64 / 1_000_000.0;
    println!("Pixels:      {:.1} MP", megapixels);

    let is_ser = args
        .file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ser"));
    if is_ser {
        let ser = SerRegionDecoder::open(&args.file)?;
        let header = ser.header();
        println!("Frames:      {}", header.frame_count);
        println!("Bit depth:   {}", header.pixel_depth);
        println!("Color mode:  {:?}", header.color_mode);
        if let Some(frame_bytes) = header.frame_byte_size() {
            let total_mb = (frame_bytes * header.frame_count as usize) as f64 / (1024.0 * 1024.0);
            println!("Data size:   {:.1} MB", total_mb);
        }
    }

    Ok(())
}
