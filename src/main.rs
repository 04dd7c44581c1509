use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use gremgraph::config::ClientConfig;
use gremgraph::gremlin::{FileSourceLoader, MethodOwner, QueryMethod, QuerySourceLoader};

/// Gremgraph - inspect Groovy query sources
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Query source file (relative paths resolve against GREMGRAPH_QUERY_SOURCE_ROOT)
    #[arg(long)]
    source: PathBuf,

    /// Print only this method's resolved script
    #[arg(long)]
    method: Option<String>,
}

fn main() {
    let (mut logger, dotenv) = logger_builder(None);
    logger.init();

    if let Err(e) = dotenv {
        // A missing .env file is fine
        log::debug!("No .env file loaded: {}", e);
    }

    let cli = Cli::parse();

    println!("\nGremgraph v{}\n", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Load `.env` (the given file, or the nearest one), then build the logger
/// from the resulting environment so a RUST_LOG set there applies.
fn logger_builder(
    env_file: Option<&Path>,
) -> (env_logger::Builder, Result<PathBuf, dotenvy::Error>) {
    let dotenv = match env_file {
        Some(path) => dotenvy::from_path(path).map(|_| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    // Defaults to INFO level, can be overridden with RUST_LOG env var
    let builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    (builder, dotenv)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ClientConfig::from_env().context("invalid client configuration")?;
    let path = config.source_path(&cli.source);

    match cli.method {
        Some(method) => print_method(&path, &method),
        None => print_source(&path),
    }
}

fn print_source(path: &Path) -> anyhow::Result<()> {
    let file = FileSourceLoader
        .parse(path)
        .with_context(|| format!("cannot load {}", path.display()))?;

    println!("{}", path.display());
    for import in &file.imports {
        println!("  {}", import.statement);
    }
    for function in &file.functions {
        println!("\n  def {}({})", function.name, function.args.join(", "));
        for line in function.body.lines() {
            println!("    {}", line);
        }
    }
    Ok(())
}

fn print_method(path: &Path, method: &str) -> anyhow::Result<()> {
    let label = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let descriptor = QueryMethod::new().path(path);
    descriptor.configure(
        MethodOwner {
            type_name: label.clone(),
            label,
            source_dir: None,
        },
        method,
    );

    let resolved = descriptor
        .resolve()
        .with_context(|| format!("cannot resolve '{}' in {}", method, path.display()))?;
    println!("{}({})", resolved.method_name, resolved.args.join(", "));
    println!("{}", resolved.script());
    Ok(())
}
