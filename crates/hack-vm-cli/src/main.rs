use anyhow::{Context, Result, bail};
use clap::Parser;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use hack_vm::{OptimizationFlags, SourceUnit, TranslateOptions};

#[derive(Parser)]
#[command(name = "hack-vm")]
#[command(version)]
#[command(about = "Stack VM to Hack assembly translator")]
struct Cli {
    #[arg(
        required = true,
        help = "Input .vm files, or directories whose .vm files are translated in name order"
    )]
    inputs: Vec<PathBuf>,

    #[arg(short, long, help = "Output .asm file (default: stdout)")]
    output: Option<PathBuf>,

    #[arg(long, help = "Skip the bootstrap (SP = 256; call the entry function)")]
    no_init: bool,

    #[arg(long, default_value = "Sys.init", help = "Function called by the bootstrap")]
    entry: String,

    #[arg(long, help = "Inline every construct instead of emitting shared subroutines")]
    no_dedup: bool,

    #[arg(
        long,
        overrides_with = "no_check_labels",
        help = "Reject jumps to undefined labels (default)"
    )]
    check_labels: bool,

    #[arg(long, overrides_with = "check_labels", help = "Skip the label check")]
    no_check_labels: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut units = Vec::new();
    for input in &cli.inputs {
        for path in collect_vm_files(input)? {
            units.push(read_unit(&path)?);
        }
    }
    check_unique_names(&units)?;

    let options = TranslateOptions {
        bootstrap: !cli.no_init,
        entry_function: cli.entry,
        check_labels: cli.check_labels || !cli.no_check_labels,
        optimizations: if cli.no_dedup {
            OptimizationFlags::none()
        } else {
            OptimizationFlags::default()
        },
    };

    let program = hack_vm::translate(&units, &options).context("Translation failed")?;
    tracing::info!(
        units = units.len(),
        rom_words = program.rom_size(),
        "translated"
    );

    let text = program.to_string();
    match &cli.output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("Failed to write output to {}", path.display()))?,
        None => std::io::stdout()
            .lock()
            .write_all(text.as_bytes())
            .context("Failed to write output to stdout")?,
    }

    Ok(())
}

/// A single file as given, or every `.vm` file in a directory sorted by name.
fn collect_vm_files(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let entries = fs::read_dir(input)
        .with_context(|| format!("Failed to read directory {}", input.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read directory {}", input.display()))?
            .path();
        if path.is_file() && path.extension().is_some_and(|e| e == "vm") {
            files.push(path);
        }
    }
    if files.is_empty() {
        bail!("{} contains no .vm files", input.display());
    }
    files.sort();
    Ok(files)
}

/// The translation unit name is the file stem; `static` symbols are scoped by it.
fn read_unit(path: &Path) -> Result<SourceUnit> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    Ok(SourceUnit::new(name, source))
}

fn check_unique_names(units: &[SourceUnit]) -> Result<()> {
    let mut seen = HashSet::new();
    for unit in units {
        if !seen.insert(unit.name.as_str()) {
            bail!(
                "two inputs share the unit name `{}`; their static variables would collide",
                unit.name
            );
        }
    }
    Ok(())
}
