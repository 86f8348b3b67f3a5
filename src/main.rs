use std::{
    fs,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use assembly_engine::{
    assembly::{index_search, AssemblyResult, Outcome},
    config::AssemblyConfig,
    interrupt::CancelToken,
    loader,
};
use clap::Parser;
use log::warn;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// A `.mol` file, or a directory of them.
    path: PathBuf,

    /// Stop after this many milliseconds and report the best index so far.
    #[arg(long, value_name = "MS")]
    run_time: Option<u64>,

    /// Maximum number of distinct subgraphs to canonize while enumerating.
    #[arg(long, default_value_t = AssemblyConfig::default().enum_max)]
    enum_max: usize,

    /// Print the best assembly pathway as JSON.
    #[arg(long)]
    pathway: bool,

    #[arg(long)]
    keep_hydrogens: bool,

    /// Subtract one from the index for every disconnected piece beyond the
    /// first.
    #[arg(long)]
    compensate_disjoint: bool,

    /// Log search progress.
    #[arg(short, long)]
    verbose: bool,
}

fn run(path: &Path, config: &AssemblyConfig) -> Result<AssemblyResult> {
    let molecule =
        loader::parse_molfile(path).with_context(|| format!("failed to parse {}", path.display()))?;
    let result = index_search(&molecule, config, &CancelToken::new())
        .with_context(|| format!("cannot assemble {}", path.display()))?;
    if result.outcome == Outcome::Cancelled {
        warn!("{}: ran out of time, index is an upper bound", path.display());
    }
    Ok(result)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = AssemblyConfig {
        run_time: cli.run_time.map(Duration::from_millis),
        enum_max: cli.enum_max,
        pathway: cli.pathway,
        remove_hydrogens: !cli.keep_hydrogens,
        compensate_disjoint: cli.compensate_disjoint,
    };

    if cli.path.is_dir() {
        let mut paths: Vec<PathBuf> = fs::read_dir(&cli.path)
            .with_context(|| format!("cannot list {}", cli.path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "mol"))
            .collect();
        if paths.is_empty() {
            bail!("no .mol files in {}", cli.path.display());
        }
        paths.sort();

        let mut writer = csv::Writer::from_writer(io::stdout());
        writer.write_record(["file_name", "index"])?;
        for path in &paths {
            let result = run(path, &config)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            writer.write_record([name, result.index.to_string()])?;
        }
        writer.flush()?;
        return Ok(());
    }

    let result = run(&cli.path, &config)?;
    println!("{}", result.index);
    if let Some(pathway) = &result.pathway {
        println!("{}", serde_json::to_string_pretty(pathway)?);
    }
    Ok(())
}
