//! This example shows you how to convert a standalone JBIG2 file into a PNG
//! file.

#![allow(missing_docs)]

use std::process::ExitCode;

use jbig2_core::{Report, Severity};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() != 3 {
        eprintln!("Usage: {} <input.jb2> <output.png>", args[0]);

        return ExitCode::FAILURE;
    }

    let input_path = &args[1];
    let output_path = &args[2];

    let data = match std::fs::read(input_path) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("Failed to read input file: {err}");

            return ExitCode::FAILURE;
        }
    };

    let mut reports: Vec<Report> = Vec::new();
    let result = jbig2_core::decode_file(&data, &mut reports);

    for report in reports.iter().filter(|r| r.severity == Severity::Warning) {
        eprintln!("Warning: {}", report.message);
    }

    let image = match result {
        Ok(image) => image,
        Err(err) => {
            eprintln!("Failed to decode JBIG2: {err}");

            return ExitCode::FAILURE;
        }
    };

    println!("Decoded: {}x{} image", image.width, image.height);

    if let Err(err) = image.to_luma8().save(output_path) {
        eprintln!("Failed to save PNG: {err}");

        return ExitCode::FAILURE;
    }

    eprintln!("Saved: {output_path}");

    ExitCode::SUCCESS
}
