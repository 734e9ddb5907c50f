//! mocksrc CLI - コマンドラインインターフェース
//!
//! dwarfdump の出力からドキュメント生成用のモックソース（output.cpp）を作成する

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use mocksrc_core::{EmitMode, GeneratorConfig, MockGenerator, SourceLinker};
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal};
use std::path::PathBuf;
use tracing::debug;

/// mocksrc - Mock source generator for Doxygen
#[derive(Parser)]
#[command(name = "mocksrc")]
#[command(version = "0.1.0")]
#[command(about = "Generates a merged mock source of the container and iterator classes from dwarfdump output", long_about = None)]
struct Cli {
    /// Output directory
    #[arg(short = 'o', value_name = "OUTPUT_DIR", default_value = "src")]
    output_dir: PathBuf,

    /// Print method names and declaration places instead of writing output.cpp
    #[arg(short = 'p')]
    print_places: bool,

    /// Output mode
    #[arg(long, value_enum, default_value_t = Mode::Documentation)]
    mode: Mode,

    /// Container class name pattern (also selects the .debug_info block)
    #[arg(long, value_name = "REGEX")]
    container_pattern: Option<String>,

    /// Iterator class name pattern
    #[arg(long, value_name = "REGEX")]
    iterator_pattern: Option<String>,

    /// Source revision used in source links (resolved with `hg id` if omitted)
    #[arg(long)]
    revision: Option<String>,

    /// Do not append source links to method comments
    #[arg(long)]
    no_source_links: bool,

    /// Base URL of source links
    #[arg(long, value_name = "URL")]
    link_base: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Project root directory
    project_root: PathBuf,

    /// dwarfdump output file ("-" for stdin)
    input_file: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Macro-declared methods are omitted
    Documentation,
    /// Macro-declared methods are kept as `//!! MACRO:` comments
    Annotated,
}

impl From<Mode> for EmitMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Documentation => EmitMode::Documentation,
            Mode::Annotated => EmitMode::Annotated,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let source = open_input(&cli.input_file)?;
    let generator = MockGenerator::new(build_config(&cli))?;
    let analysis = generator.analyze(source)?;

    if cli.print_places {
        let stdout = io::stdout();
        generator.print_places(&analysis, &mut stdout.lock())?;
        return Ok(());
    }

    let linker = SourceLinker::new(&cli.project_root, &generator.config().source_links);
    let path = generator.generate(&analysis, &linker, &cli.output_dir)?;
    println!("Wrote {}", path.display());

    Ok(())
}

/// ログ出力を初期化する（RUST_LOG が優先）
fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    Ok(())
}

/// 入力を開く（`-` は標準入力、端末からの入力は受け付けない）
fn open_input(input_file: &str) -> Result<Box<dyn BufRead>> {
    if input_file == "-" {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            bail!("No input data!");
        }
        debug!("Reading dwarfdump output from stdin");
        return Ok(Box::new(stdin.lock()));
    }

    let file = File::open(input_file)
        .with_context(|| format!("Failed to open input file {}", input_file))?;
    Ok(Box::new(BufReader::new(file)))
}

/// コマンドライン引数から生成設定を作る
fn build_config(cli: &Cli) -> GeneratorConfig {
    let mut config = GeneratorConfig::default().with_mode(cli.mode.into());

    if let Some(pattern) = &cli.container_pattern {
        config = config.with_container_pattern(pattern.as_str());
    }
    if let Some(pattern) = &cli.iterator_pattern {
        config = config.with_iterator_pattern(pattern.as_str());
    }

    config.source_links.enabled = !cli.no_source_links;
    if let Some(revision) = &cli.revision {
        config.source_links.revision = Some(revision.clone());
    }
    if let Some(base) = &cli.link_base {
        config.source_links.base_url = base.clone();
    }

    config
}
