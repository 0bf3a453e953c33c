use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Result, WrapErr};
use tapefuck::config::DEFAULT_TAPE_SIZE;
use tapefuck::opcode::disassemble;
use tapefuck::{Config, Error, Program, Tier, Tiers};
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(
    name = "tapefuck",
    version,
    about = "Tiered Brainfuck interpreter with unified memory"
)]
struct Cli {
    /// Program files, run one after another on fresh tapes.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Number of data cells per run.
    #[arg(short, long, default_value_t = DEFAULT_TAPE_SIZE)]
    tape_size: NonZeroUsize,

    /// Highest enabled extension tier. Tier 2 and above switch to unified memory.
    #[arg(short = 'x', long, value_enum, default_value_t = Extensions::Base)]
    extensions: Extensions,

    /// Print the loaded program instead of running it.
    #[arg(long)]
    disassemble: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Extensions {
    #[value(name = "none")]
    Base,
    #[value(name = "1")]
    One,
    #[value(name = "2")]
    Two,
    #[value(name = "3")]
    Three,
}

impl From<Extensions> for Tiers {
    fn from(ext: Extensions) -> Self {
        Tiers::up_to(match ext {
            Extensions::Base => Tier::Base,
            Extensions::One => Tier::One,
            Extensions::Two => Tier::Two,
            Extensions::Three => Tier::Three,
        })
    }
}

fn install_tracing() {
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = fmt::layer().with_target(false).with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();
}

fn main() -> Result<ExitCode> {
    install_tracing();
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = Config::new(cli.tape_size, cli.extensions.into());

    let mut missing = 0usize;
    for path in &cli.files {
        let program = match Program::load_path(path, config.tiers) {
            Ok(program) => program,
            Err(e @ Error::NotFound { .. }) => {
                error!("{e}");
                missing += 1;
                continue;
            }
            Err(e) => {
                return Err(e).wrap_err_with(|| format!("failed to load {}", path.display()));
            }
        };

        if cli.disassemble {
            print!("{}", disassemble(program.code(), config.tiers));
            continue;
        }

        let stdin = io::stdin().lock();
        let stdout = io::stdout().lock();
        let halt = tapefuck::run(&program, &config, stdin, stdout)
            .wrap_err_with(|| format!("failed to run {}", path.display()))?;
        info!(path = %path.display(), ?halt, "program finished");
    }

    Ok(if missing == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
