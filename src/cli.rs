// Command-line front end for xdelta.
//
// Two subcommands over the file entry points:
//   xdelta create [--block-size N] OLD NEW PATCH
//   xdelta apply OLD PATCH OUT
//
// Existing outputs are only replaced with `--force`. Failures print
// `xdelta: <message>` on stderr and exit with status 1.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use log::{LevelFilter, info};

use crate::hash::config::DEFAULT_BLOCK_SIZE;
use crate::io::{ApplyStats, CreateStats, apply_patch_file, create_patch_file};

// ---------------------------------------------------------------------------
// Byte size parsing (supports K, M, G suffixes)
// ---------------------------------------------------------------------------

fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".into());
    }
    let (num_part, multiplier) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1024u64),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 1024 * 1024),
        Some(b'g' | b'G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1u64),
    };
    let num: u64 = num_part
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: '{s}'"))
}

fn parse_block_size(s: &str) -> Result<u32, String> {
    let size = parse_byte_size(s)?;
    match u32::try_from(size) {
        Ok(0) => Err("block size must be at least 1".into()),
        Ok(size) => Ok(size),
        Err(_) => Err(format!("block size {size} exceeds {}", u32::MAX)),
    }
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Block-matching binary delta tool.
#[derive(Parser, Debug)]
#[command(
    name = "xdelta",
    version,
    about = "Create and apply binary patches",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (errors only).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (repeat for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a patch that turns OLD into NEW.
    Create(CreateArgs),
    /// Rebuild a file from OLD and PATCH.
    Apply(ApplyArgs),
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Block size for matching (supports K/M/G suffix).
    #[arg(long = "block-size", short = 'b', value_parser = parse_block_size, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u32,

    /// Old file.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// New file.
    #[arg(value_hint = ValueHint::FilePath)]
    new: PathBuf,

    /// Patch file to write.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Old file the patch was created against.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,

    /// Reconstructed file to write.
    #[arg(value_hint = ValueHint::FilePath)]
    out: PathBuf,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn check_output(path: &Path, force: bool) -> Result<(), String> {
    if path.exists() && !force {
        return Err(format!(
            "output file exists, use -f to overwrite: {}",
            path.display()
        ));
    }
    Ok(())
}

fn cmd_create(cli: &Cli, args: &CreateArgs) -> Result<(), String> {
    check_output(&args.patch, cli.force)?;
    let stats = create_patch_file(&args.old, &args.new, &args.patch, args.block_size)
        .map_err(|e| e.to_string())?;

    info!(
        "old size: {}, new size: {}, patch size: {}, instructions: {}",
        stats.old_size, stats.new_size, stats.patch_size, stats.instructions
    );
    if cli.json_output {
        eprintln!("{:#}", create_json(&stats, args.block_size));
    }
    Ok(())
}

fn cmd_apply(cli: &Cli, args: &ApplyArgs) -> Result<(), String> {
    check_output(&args.out, cli.force)?;
    let stats = apply_patch_file(&args.old, &args.patch, &args.out).map_err(|e| e.to_string())?;

    info!(
        "old size: {}, patch size: {}, output size: {}, instructions: {}",
        stats.old_size, stats.patch_size, stats.output_size, stats.instructions
    );
    if cli.json_output {
        eprintln!("{:#}", apply_json(&stats));
    }
    Ok(())
}

fn create_json(stats: &CreateStats, block_size: u32) -> serde_json::Value {
    serde_json::json!({
        "command": "create",
        "block_size": block_size,
        "old_size": stats.old_size,
        "new_size": stats.new_size,
        "patch_size": stats.patch_size,
        "instructions": stats.instructions,
        "new_sha256": stats.new_sha256.as_ref().map(|d| hex(d)),
    })
}

fn apply_json(stats: &ApplyStats) -> serde_json::Value {
    serde_json::json!({
        "command": "apply",
        "old_size": stats.old_size,
        "patch_size": stats.patch_size,
        "output_size": stats.output_size,
        "instructions": stats.instructions,
        "output_sha256": stats.output_sha256.as_ref().map(|d| hex(d)),
    })
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn log_level(cli: &Cli) -> LevelFilter {
    if cli.quiet {
        return LevelFilter::Error;
    }
    match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level(&cli).as_str()),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();

    let result = match &cli.command {
        Cmd::Create(args) => cmd_create(&cli, args),
        Cmd::Apply(args) => cmd_apply(&cli, args),
    };

    match result {
        Ok(()) => process::exit(0),
        Err(msg) => {
            eprintln!("xdelta: {msg}");
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
