// ============================================================================
// Trixel CLI: headless gesture replay via command-line arguments
// ============================================================================
//
// Usage examples:
//   trixel --input strokes.json --output result.trx
//   trixel -i recordings/*.json --output-dir out/ --format json
//   trixel -i art.trx -o art.json                      (format inferred from output ext)
//   trixel -i demo.json --format draw --config my_settings.cfg
//
// Inputs are gesture scripts (.json) replayed onto a fresh document, or .trx
// projects that are loaded and re-exported. Everything runs synchronously on
// the current thread.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::io::{Palette, save_project, snapshot_to_json_pretty};
use crate::ops::render::DrawList;
use crate::ops::script::{load_script, replay};
use crate::project::Project;
use crate::settings::GridSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Trixel headless triangle-grid renderer.
#[derive(Parser, Debug)]
#[command(
    name = "trixel",
    about = "Trixel headless gesture replay and export",
    long_about = "Replay recorded gesture scripts on a triangular pixel grid, or convert\n\
                  .trx projects, without an interactive session.\n\n\
                  Example:\n  \
                  trixel --input strokes.json --output result.trx\n  \
                  trixel -i recordings/*.json --output-dir out/ --format json"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.json", "art/*.trx").
    /// `.trx` files are loaded as projects; anything else is read as a gesture script.
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: json (grid snapshot), trx (project) or draw (render commands).
    /// When omitted, the format is inferred from --output's extension, defaulting to json.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Settings file to use instead of the per-user one.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// GIMP palette to validate and print before processing.
    #[arg(long, value_name = "PALETTE.gpl")]
    pub palette: Option<PathBuf>,

    /// Write the session log here instead of the per-user data directory.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Print per-file timing and replay statistics; mirror the log to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Trx,
    Draw,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Trx => "trx",
            OutputFormat::Draw => "draw.json",
        }
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let format = parse_format(args.format.as_deref(), args.output.as_deref());
    let settings = match &args.config {
        Some(path) => GridSettings::load_from(path),
        None => GridSettings::load(),
    };

    if let Some(path) = &args.palette {
        match Palette::load(path) {
            Ok(palette) => {
                println!("palette '{}': {} colors", palette.name, palette.entries.len());
                if args.verbose {
                    for entry in &palette.entries {
                        println!("  {} {}", entry.hex(), entry.name);
                    }
                }
            }
            Err(e) => {
                eprintln!("error: could not read palette '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let output_path = match build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            format,
        ) {
            Some(p) => p,
            None => {
                eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
                any_failure = true;
                continue;
            }
        };

        match run_one(input_path, &output_path, format, &settings, idx + 1, args.verbose) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

pub fn run_one(
    input: &Path,
    output: &Path,
    format: OutputFormat,
    settings: &GridSettings,
    untitled_counter: usize,
    verbose: bool,
) -> Result<(), String> {
    // -- Step 1: Load or replay ------------------------------------------
    let project = if is_project_file(input) {
        Project::open(input, settings).map_err(|e| format!("load failed: {}", e))?
    } else {
        let script = load_script(input).map_err(|e| format!("script error: {}", e))?;
        let mut project = Project::new_untitled(untitled_counter, settings);
        let report = replay(&mut project, &script).map_err(|e| format!("script error: {}", e))?;
        if verbose {
            println!(
                "  [replay] {} events, {} changed the grid, {} undo steps",
                report.events, report.changes, report.undo_steps
            );
        }
        project
    };

    // -- Step 2: Save ----------------------------------------------------
    match format {
        OutputFormat::Trx => {
            save_project(&project.geometry, &project.grid, output)
                .map_err(|e| format!("project save failed: {}", e))?;
        }
        OutputFormat::Json => {
            let text = snapshot_to_json_pretty(&project.grid)
                .map_err(|e| format!("snapshot encoding failed: {}", e))?;
            std::fs::write(output, text).map_err(|e| format!("save failed: {}", e))?;
        }
        OutputFormat::Draw => {
            let mut list = DrawList::new(&project.geometry);
            project.render(&mut list);
            let text = serde_json::to_string_pretty(&list)
                .map_err(|e| format!("draw list encoding failed: {}", e))?;
            std::fs::write(output, text).map_err(|e| format!("save failed: {}", e))?;
        }
    }

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn is_project_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("trx"))
}

/// Expand each argument into script or project paths. Existing paths are
/// taken literally, anything else is treated as a glob. First occurrence wins.
pub fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    patterns
        .iter()
        .flat_map(|pattern| expand_pattern(pattern))
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

fn expand_pattern(pattern: &str) -> Vec<PathBuf> {
    let literal = Path::new(pattern);
    if literal.exists() {
        return vec![literal.to_path_buf()];
    }
    let matches: Vec<PathBuf> = match glob::glob(pattern) {
        Ok(entries) => entries.flatten().collect(),
        Err(e) => {
            eprintln!("warning: invalid glob '{}': {}", pattern, e);
            return Vec::new();
        }
    };
    if matches.is_empty() {
        eprintln!("warning: pattern '{}' matched no files.", pattern);
    }
    matches
}

/// Choose the [`OutputFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to JSON when neither is known.
pub fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> OutputFormat {
    if let Some(f) = format_arg {
        return match f.to_lowercase().as_str() {
            "trx" => OutputFormat::Trx,
            "draw" => OutputFormat::Draw,
            _ => OutputFormat::Json,
        };
    }

    if let Some(out) = output {
        let name = out
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_lowercase();
        if name.ends_with(".draw.json") {
            return OutputFormat::Draw;
        }
        if name.ends_with(".trx") {
            return OutputFormat::Trx;
        }
    }

    OutputFormat::Json
}

/// Where the result for `input` goes: the explicit `--output` file, else
/// `<output_dir>/<stem>.<ext>`, else next to the input. A result that would
/// land on the input itself gets an `_out` suffix.
pub fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: OutputFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }
    let stem = input.file_stem()?.to_string_lossy();
    let ext = format.extension();
    let file_name = format!("{}.{}", stem, ext);

    let path = match output_dir {
        Some(dir) => dir.join(file_name),
        None => {
            let beside = input.with_file_name(&file_name);
            if beside == input {
                input.with_file_name(format!("{}_out.{}", stem, ext))
            } else {
                beside
            }
        }
    };
    Some(path)
}
