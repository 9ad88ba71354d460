mod cli;
mod console;
mod paths;
mod player;
mod run;

use anyhow::Result;
use cli::{CatalogArgs, Command};
use paths::{load_config, AppPaths};
use serde::Serialize;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Catalog(args)) => run_catalog(cli.run.config.as_deref(), args),
        Some(Command::Where) => run_where(cli.run.config.as_deref()),
        None => run::run(cli.run),
    }
}

#[derive(Serialize)]
struct CatalogListing<'a> {
    index: usize,
    id: &'a str,
    label: &'a str,
    processed: &'a str,
    raw: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
}

fn run_catalog(explicit: Option<&std::path::Path>, args: CatalogArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let (config, _) = load_config(explicit, &paths)?;
    let listing: Vec<CatalogListing<'_>> = config
        .exercises
        .iter()
        .enumerate()
        .map(|(index, exercise)| CatalogListing {
            index,
            id: &exercise.id,
            label: &exercise.label,
            processed: &exercise.processed,
            raw: &exercise.raw,
            icon: exercise.icon.as_deref(),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("Exercises:");
    for entry in listing {
        println!(
            "  {:>2} {:<12} {:<16} processed={} raw={}",
            entry.index, entry.id, entry.label, entry.processed, entry.raw
        );
    }
    Ok(())
}

fn run_where(explicit: Option<&std::path::Path>) -> Result<()> {
    let paths = AppPaths::discover()?;
    println!("Configuration:");
    println!("  directory:  {}", paths.config_dir().display());
    println!("  stage file: {}", paths.config_file().display());
    match load_config(explicit, &paths)? {
        (_, Some(source)) => println!("  loaded:     {}", source.display()),
        (_, None) => println!("  loaded:     built-in defaults"),
    }
    Ok(())
}
