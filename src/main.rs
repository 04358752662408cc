//! img-forge – command-line images → PDF converter.
//!
//! Usage:
//!   img-forge <image>... [--out-dir DIR | --output FILE] [--title "Scans"] [--json]
//!
//! Without `--output` the PDF is written to `DIR` (default `uploads`) under a
//! generated `pdf-<millis>-<seq>.pdf` name.

use std::path::{Path, PathBuf};
use std::{env, fs, process};

use img_forge::{Assembler, AssemblerConfig, GenerateError, ImageInput, UploadLimits};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut inputs: Vec<PathBuf> = Vec::new();
    let mut out_dir: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut title: Option<String> = None;
    let mut json = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out-dir" | "-d" => out_dir = Some(required(&args[0], arg, iter.next()).into()),
            "--output" | "-o" => output = Some(required(&args[0], arg, iter.next()).into()),
            "--title" | "-t" => title = Some(required(&args[0], arg, iter.next())),
            "--json" => json = true,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => inputs.push(PathBuf::from(path)),
        }
    }

    if inputs.is_empty() {
        eprintln!("Error: no input images specified.");
        print_usage(&args[0]);
        process::exit(1);
    }

    let mut images = Vec::with_capacity(inputs.len());
    for path in &inputs {
        match ImageInput::from_path(path) {
            Ok(image) => images.push(image),
            Err(e) => {
                eprintln!("Error reading '{}': {e}", path.display());
                process::exit(1);
            }
        }
    }

    let defaults = AssemblerConfig::default();
    let config = AssemblerConfig {
        output_dir: out_dir.unwrap_or(defaults.output_dir.clone()),
        title: title.unwrap_or(defaults.title.clone()),
        limits: Some(UploadLimits::default()),
        parallel_decode: true,
        ..defaults
    };
    let assembler = Assembler::new(config);

    let result = match &output {
        Some(path) => assembler.render(images).and_then(|doc| {
            write_output(path, &doc.bytes)?;
            Ok((path.clone(), doc.page_count()))
        }),
        None => assembler
            .assemble(images)
            .map(|artifact| (artifact.path.clone(), artifact.page_count())),
    };

    match result {
        Ok((path, pages)) => {
            if json {
                let summary = serde_json::json!({
                    "path": path,
                    "pages": pages,
                    "mime_type": img_forge::Artifact::MIME_TYPE,
                });
                println!("{summary}");
            } else {
                eprintln!(
                    "Wrote '{}' ({} page{})",
                    path.display(),
                    pages,
                    if pages == 1 { "" } else { "s" }
                );
            }
        }
        Err(e) => {
            if json {
                match serde_json::to_string(&e.to_response()) {
                    Ok(body) => println!("{body}"),
                    Err(_) => eprintln!("{e}"),
                }
            } else {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    }
}

/// Write an in-memory PDF to an explicit path, creating parent directories.
fn write_output(path: &Path, bytes: &[u8]) -> Result<(), GenerateError> {
    let persistence = |source| {
        GenerateError::from(img_forge::AssembleError::Persistence {
            path: path.to_path_buf(),
            source,
        })
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(persistence)?;
        }
    }
    fs::write(path, bytes).map_err(persistence)
}

fn required(prog: &str, flag: &str, value: Option<&String>) -> String {
    match value {
        Some(v) => v.clone(),
        None => {
            eprintln!("Missing value for {flag}");
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    eprintln!("img-forge – images to PDF converter");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <image>... [--out-dir DIR | --output FILE] [--title \"Scans\"] [--json]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <image>...       PNG or JPEG files, one page each, in the given order (max 20, 10 MB each)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --out-dir, -d    Directory for the generated pdf-<timestamp>.pdf (default: uploads)");
    eprintln!("  --output, -o     Write to this exact path instead");
    eprintln!("  --title, -t      Document title in PDF metadata");
    eprintln!("  --json           Print a JSON summary, or {{\"message\": ...}} on failure");
    eprintln!("  --help           Print this message");
}
