use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};

use id_card_masker::{LineSurface, OutputPaths, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "id-card-masker",
    version,
    about = "Mark face and ID regions on ID-card images, then redact and OCR them"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw the face and ID regions and save them as the mask
    Capture {
        /// ID-card image (jpg/png/bmp)
        image: PathBuf,

        /// Mask file to write (default from settings)
        #[arg(short = 'c', long = "mask")]
        mask: Option<PathBuf>,

        /// Read capture commands from a file instead of stdin
        #[arg(short = 's', long = "script")]
        script: Option<PathBuf>,

        /// Where to write the live preview frame
        #[arg(short = 'p', long = "preview")]
        preview: Option<PathBuf>,

        /// Start from the regions already stored in the mask file
        #[arg(long = "edit")]
        edit: bool,

        /// Process the image right after the mask is saved
        #[arg(long = "process")]
        process: bool,
    },
    /// Apply the saved mask: overlay, face crop and ID number
    Process {
        /// ID-card image (jpg/png/bmp)
        image: PathBuf,

        /// Mask file to read (default from settings)
        #[arg(short = 'c', long = "mask")]
        mask: Option<PathBuf>,

        /// Overlay output path
        #[arg(short = 'o', long = "overlay-out")]
        overlay_out: Option<PathBuf>,

        /// Face crop output path
        #[arg(short = 'f', long = "face-out")]
        face_out: Option<PathBuf>,

        /// Do not write any output image
        #[arg(long = "no-save")]
        no_save: bool,

        /// Print the result as JSON
        #[arg(long = "json")]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    id_card_masker::logging::init(cli.verbose)?;
    let settings = id_card_masker::load_settings(cli.read_settings.as_deref())?;

    match cli.command {
        None => run_menu(&settings),
        Some(Command::Capture {
            image,
            mask,
            script,
            preview,
            edit,
            process: process_now,
        }) => {
            let mask = mask.unwrap_or_else(|| settings.mask_path.clone());
            let preview = preview.or_else(|| settings.preview_path.clone());
            let saved = match script {
                Some(script) => {
                    let file = std::fs::File::open(&script)
                        .with_context(|| format!("failed to open script: {}", script.display()))?;
                    let mut surface = LineSurface::new(io::BufReader::new(file), preview);
                    capture(&settings, &image, &mask, edit, &mut surface)?
                }
                None => {
                    print_capture_help(preview.as_deref());
                    let stdin = io::stdin();
                    let mut surface = LineSurface::new(stdin.lock(), preview).with_prompt(true);
                    capture(&settings, &image, &mask, edit, &mut surface)?
                }
            };
            if saved && process_now {
                process(&settings, &image, &mask, default_outputs(&settings), false)?;
            }
            Ok(())
        }
        Some(Command::Process {
            image,
            mask,
            overlay_out,
            face_out,
            no_save,
            json,
        }) => {
            let mask = mask.unwrap_or_else(|| settings.mask_path.clone());
            let outputs = if no_save {
                None
            } else {
                Some(OutputPaths {
                    overlay: overlay_out.unwrap_or_else(|| settings.overlay_output_path.clone()),
                    face: face_out.unwrap_or_else(|| settings.face_output_path.clone()),
                })
            };
            process(&settings, &image, &mask, outputs, json)
        }
    }
}

fn capture<S: id_card_masker::Surface>(
    settings: &Settings,
    image: &Path,
    mask: &Path,
    edit: bool,
    surface: &mut S,
) -> Result<bool> {
    let initial = if edit {
        id_card_masker::load_mask(mask)?
    } else {
        None
    };
    let options = id_card_masker::capture_options(settings, initial)?;
    match id_card_masker::capture_and_save(image, mask, options, surface)? {
        Some(_) => {
            println!("Masks saved to {}", mask.display());
            Ok(true)
        }
        None => {
            println!("Mask creation cancelled.");
            Ok(false)
        }
    }
}

fn process(
    settings: &Settings,
    image: &Path,
    mask: &Path,
    outputs: Option<OutputPaths>,
    json: bool,
) -> Result<()> {
    let engine = id_card_masker::build_engine(settings)?;
    let result = id_card_masker::process_image(&engine, image, mask, outputs.as_ref())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result.summary())?);
    } else {
        println!("{}", id_card_masker::format_report(&result));
        if let Some(outputs) = outputs.as_ref() {
            println!("Saved: {}", outputs.overlay.display());
            println!("Saved: {}", outputs.face.display());
        }
    }
    Ok(())
}

fn default_outputs(settings: &Settings) -> Option<OutputPaths> {
    Some(OutputPaths {
        overlay: settings.overlay_output_path.clone(),
        face: settings.face_output_path.clone(),
    })
}

fn run_menu(settings: &Settings) -> Result<()> {
    println!("=== ID Card Processor ===\n");
    println!("1. Create new mask configuration");
    println!("2. Process ID card with existing masks");
    println!("3. Exit");

    let choice = prompt("\nSelect option (1-3): ")?;
    match choice.as_str() {
        "1" => {
            let Some(image) = prompt_image()? else {
                return Ok(());
            };
            let preview = settings.preview_path.clone();
            print_capture_help(preview.as_deref());
            let saved = {
                let stdin = io::stdin();
                let mut surface = LineSurface::new(stdin.lock(), preview).with_prompt(true);
                capture(settings, &image, &settings.mask_path, false, &mut surface)?
            };
            if saved {
                let answer = prompt("\nProcess this ID card now? (y/n): ")?;
                if answer.eq_ignore_ascii_case("y") {
                    process(settings, &image, &settings.mask_path, default_outputs(settings), false)?;
                }
            }
            Ok(())
        }
        "2" => {
            let Some(image) = prompt_image()? else {
                return Ok(());
            };
            if id_card_masker::load_mask(&settings.mask_path)?.is_none() {
                println!("No mask configuration found! Please create masks first (option 1).");
                return Ok(());
            }
            process(settings, &image, &settings.mask_path, default_outputs(settings), false)
        }
        "3" => {
            println!("Goodbye!");
            Ok(())
        }
        _ => {
            println!("Invalid option!");
            Ok(())
        }
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(anyhow!("stdin closed"));
    }
    Ok(line.trim().to_string())
}

fn prompt_image() -> Result<Option<PathBuf>> {
    let value = prompt("ID card image path: ")?;
    if value.is_empty() {
        println!("No image selected!");
        return Ok(None);
    }
    let path = PathBuf::from(value);
    if !path.exists() {
        println!("Image not found: {}", path.display());
        return Ok(None);
    }
    println!("\nLoaded: {}", path.display());
    Ok(Some(path))
}

fn print_capture_help(preview: Option<&Path>) {
    println!("Capture commands:");
    println!("  drag X1 Y1 X2 Y2       Draw a rectangle in preview coordinates");
    println!("  down X Y / move X Y / up X Y");
    println!("  f                      Face mode (green)");
    println!("  i                      ID mode (blue)");
    println!("  r                      Reset current rectangle");
    println!("  s                      Save & continue");
    println!("  q                      Quit without saving");
    if let Some(path) = preview {
        println!("Preview frame: {}", path.display());
    }
}
