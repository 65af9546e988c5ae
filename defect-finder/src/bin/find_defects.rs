//! Defect finding demo on synthetic calibration exposures.
//!
//! Generates flats and darks with injected hot/cold regions and an
//! intermittent column, runs the full defect pipeline on them and prints one
//! `x y width height` line per consolidated defect box.

use anyhow::{Context, Result};
use clap::Parser;
use defect_finder::{
    defects::{area_of, TracingReporter},
    synthetic::{inject_offset, make_mock_flat_pair, normal_image, MockFlatConfig},
    DefectBox, DefectFinder, ExposureKind, FindDefectsConfig, MaskedImage, PixelShape,
};
use std::{fs, path::PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Find defective pixels in synthetic flats and darks"
)]
struct Args {
    #[arg(short = 'c', long, help = "JSON file with defect finding configuration")]
    config: Option<PathBuf>,

    #[arg(long, default_value = "128", help = "Sensor width in pixels")]
    width: usize,

    #[arg(long, default_value = "144", help = "Sensor height in pixels")]
    height: usize,

    #[arg(long, default_value = "2", help = "Number of flat pairs to generate")]
    flat_pairs: usize,

    #[arg(long, default_value = "3", help = "Number of darks to generate")]
    darks: usize,

    #[arg(long, default_value = "100.0", help = "Dark bias level in ADU")]
    dark_bias: f64,

    #[arg(long, default_value = "5.0", help = "Dark read noise in ADU")]
    dark_noise: f64,

    #[arg(short = 'o', long, help = "Write the defect boxes as JSON to this file")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {path:?}"))?;
            serde_json::from_str::<FindDefectsConfig>(&text)
                .with_context(|| format!("Failed to parse config file: {path:?}"))?
        }
        None => FindDefectsConfig {
            bad_on_and_off_pixel_column_threshold: 10,
            good_pixel_column_gap_threshold: 10,
            ..Default::default()
        },
    };

    let finder =
        DefectFinder::new(config, &mut TracingReporter).context("Invalid defect configuration")?;
    let shape = PixelShape::new(args.width, args.height);

    // Hot regions show up in both flats and darks
    let injected = injected_defects(shape);

    let mut exposures = Vec::new();
    for pair in 0..args.flat_pairs {
        let mock = MockFlatConfig {
            shape,
            seed_flat1: 1984 + pair as u64,
            seed_flat2: 666 + pair as u64,
            ..Default::default()
        };
        let sigma = mock.mean_signal_adu().sqrt();
        let (mut flat1, mut flat2) = make_mock_flat_pair(&mock).context("Mock flat generation")?;
        for bbox in &injected {
            inject_offset(&mut flat1, bbox, 20.0 * sigma);
            inject_offset(&mut flat2, bbox, 20.0 * sigma);
        }
        exposures.push((flat1, ExposureKind::Flat));
        exposures.push((flat2, ExposureKind::Flat));
    }

    for i in 0..args.darks {
        let noise = normal_image(shape, 0.0, args.dark_noise, 42 + i as u64);
        // Darks arrive as raw 16-bit samples
        let raw = noise.mapv(|v| (args.dark_bias + v).clamp(0.0, u16::MAX as f64) as u16);
        let mut dark = MaskedImage::from_samples(&raw.view());
        for bbox in &injected {
            inject_offset(&mut dark, bbox, 30.0 * args.dark_noise);
        }
        exposures.push((dark, ExposureKind::Dark));
    }

    info!(
        "Generated {} exposures of {} with {} injected defect regions",
        exposures.len(),
        shape,
        injected.len()
    );

    let views: Vec<_> = exposures.iter().map(|(image, kind)| (image, *kind)).collect();
    let defects = finder
        .find_in_exposures(&views)
        .context("Defect finding failed")?;

    info!(
        "{} defect boxes, area {}, {} distinct pixels",
        defects.len(),
        area_of(&defects),
        defects.covered_pixels()
    );

    for (x, y, w, h) in defects.to_tuples() {
        println!("{x} {y} {w} {h}");
    }

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&defects.to_tuples())?;
        fs::write(path, json).with_context(|| format!("Failed to write {path:?}"))?;
        info!("Wrote defect boxes to {:?}", path);
    }

    Ok(())
}

/// A few isolated regions plus two intermittent clusters starting at column 50.
fn injected_defects(shape: PixelShape) -> Vec<DefectBox> {
    let mut boxes = vec![
        DefectBox::new(20, 30, 3, 3),
        DefectBox::new(70, 100, 1, 1),
        DefectBox::new(40, 90, 2, 2),
    ];
    let column = 50;
    for (y, w) in [(11, 3), (14, 3), (20, 5), (26, 7), (33, 10)] {
        boxes.push(DefectBox::new(column, y, w, 1));
        boxes.push(DefectBox::new(column, y + 44, w, 1));
    }
    boxes.retain(|b| b.max_x() < shape.width && b.max_y() < shape.height);
    boxes
}
