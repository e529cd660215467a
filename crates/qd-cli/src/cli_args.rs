use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use qd_container::{Algorithm, EncodeOptions};

#[derive(Debug, Parser)]
#[command(name = "qd-cli")]
#[command(about = "QriaDrama interactive fiction compiler and player")]
pub(crate) struct Cli {
    /// Log at debug level (RUST_LOG still wins when set).
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Compile a script source to structured JSON.
    Compile(CompileArgs),
    /// Play a script, compressed script, package or project directory.
    Run(RunArgs),
    /// Compress a script source into a .qdz file.
    Save(SaveArgs),
    /// Pack a project directory into a .qdpkg file.
    Release(ReleaseArgs),
    /// Unpack a .qdpkg file.
    Extract(ExtractArgs),
}

#[derive(Debug, Args)]
pub(crate) struct CompileArgs {
    pub(crate) input: PathBuf,
    #[arg(short, long)]
    pub(crate) output: Option<PathBuf>,
    /// Role registry (JSON) for role-prefixed sources.
    #[arg(long)]
    pub(crate) roles: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    pub(crate) path: PathBuf,
    #[arg(long, value_enum, default_value_t = PlayMode::Line)]
    pub(crate) mode: PlayMode,
    /// Seconds between typed characters.
    #[arg(long)]
    pub(crate) delay: Option<f64>,
    /// Type every line at once.
    #[arg(long)]
    pub(crate) instant: bool,
    #[arg(long)]
    pub(crate) roles: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum PlayMode {
    Line,
    Tui,
    Auto,
}

#[derive(Debug, Args)]
pub(crate) struct CompressionArgs {
    #[arg(long, default_value_t = 6)]
    pub(crate) level: u8,
    #[arg(long, value_enum, default_value_t = AlgorithmArg::Gzip)]
    pub(crate) algorithm: AlgorithmArg,
}

impl CompressionArgs {
    pub(crate) fn encode_options(&self) -> Result<EncodeOptions, qd_core::DramaError> {
        EncodeOptions::new(self.algorithm.into(), self.level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum AlgorithmArg {
    Gzip,
    Zlib,
    Bzip2,
    Zstd,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(value: AlgorithmArg) -> Self {
        match value {
            AlgorithmArg::Gzip => Algorithm::Gzip,
            AlgorithmArg::Zlib => Algorithm::Zlib,
            AlgorithmArg::Bzip2 => Algorithm::Bzip2,
            AlgorithmArg::Zstd => Algorithm::Zstd,
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct SaveArgs {
    pub(crate) input: PathBuf,
    #[arg(short, long)]
    pub(crate) output: Option<PathBuf>,
    #[command(flatten)]
    pub(crate) compression: CompressionArgs,
}

#[derive(Debug, Args)]
pub(crate) struct ReleaseArgs {
    pub(crate) dir: PathBuf,
    #[arg(short, long)]
    pub(crate) output: Option<PathBuf>,
    #[command(flatten)]
    pub(crate) compression: CompressionArgs,
}

#[derive(Debug, Args)]
pub(crate) struct ExtractArgs {
    pub(crate) package: PathBuf,
    #[arg(short = 'd', long = "dest")]
    pub(crate) dest: Option<PathBuf>,
}
