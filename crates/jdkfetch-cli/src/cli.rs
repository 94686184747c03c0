use crate::tracing::{LogLevel, TracingFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jdkfetch")]
#[command(about = "Resolve, download and unpack Temurin JDK builds into a local cache")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,

    #[arg(
        long,
        global = true,
        env = "JDKFETCH_CONFIG",
        help = "Path to a TOML configuration file"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "JDKFETCH_CACHE_DIR",
        help = "Cache root directory [default: ~/.jdks]"
    )]
    pub cache_dir: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "JDKFETCH_API_BASE",
        help = "Release API prefix"
    )]
    pub api_base: Option<String>,

    #[arg(long, global = true, help = "Request timeout in seconds")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct Target {
    #[arg(help = "JDK major version, e.g. 17")]
    pub version: String,

    #[arg(
        long,
        short = 'p',
        help = "Target platform (windows, mac, linux) [default: host]"
    )]
    pub platform: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Install a JDK if needed and print its JAVA_HOME")]
    Fetch {
        #[command(flatten)]
        target: Target,
        #[arg(long, help = "Do not show a download progress bar")]
        no_progress: bool,
    },
    #[command(about = "Print the cached installation directory, failing if absent")]
    Path {
        #[arg(help = "JDK major version, e.g. 17")]
        version: String,
    },
    #[command(about = "Print the download URL without downloading")]
    Resolve {
        #[command(flatten)]
        target: Target,
    },
    #[command(about = "Print the asset file name token")]
    Token {
        #[command(flatten)]
        target: Target,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
