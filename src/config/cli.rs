use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::ContentKind;

/// Command-line arguments for the collate binary.
#[derive(Debug, Parser)]
#[command(
    name = "collate",
    version,
    about = "Aggregate script and stylesheet dependencies"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "COLLATE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Combine the given dependencies and print the checksum of the result.
    Resolve(Box<ResolveArgs>),
}

#[derive(Debug, Args, Clone)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub overrides: ResolveOverrides,

    /// Content kind of every path (js or css).
    #[arg(long, value_name = "KIND")]
    pub kind: ContentKind,

    /// Theme the stylesheets are rendered for.
    #[arg(long, value_name = "THEME")]
    pub theme: Option<String>,

    /// Directory to write the combined artifact to, named by its checksum.
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Print cache sizes after resolving.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub report: bool,

    /// Resource paths in order; entries starting with `>>>` are inline source.
    #[arg(value_name = "PATH", required = true, num_args = 1..)]
    pub paths: Vec<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ResolveOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the number of path sets remembered before eviction.
    #[arg(long = "file-set-cache-limit", value_name = "COUNT")]
    pub file_set_cache_limit: Option<usize>,

    /// Skip compression and caching of path sets.
    #[arg(
        long = "client-debug",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub client_debug: Option<bool>,

    /// Bypass the script compressor.
    #[arg(
        long = "collation-debug",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub collation_debug: Option<bool>,

    /// Override the directory resources are read from.
    #[arg(long = "resources-root", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub resources_root: Option<PathBuf>,

    /// Override the hosting context path used in rewritten URLs.
    #[arg(long = "resources-context-path", value_name = "PATH")]
    pub resources_context_path: Option<String>,

    /// Override the resource controller mount point used in rewritten URLs.
    #[arg(long = "resources-controller-mapping", value_name = "PATH")]
    pub resources_controller_mapping: Option<String>,
}
