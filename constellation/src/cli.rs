use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use constellation_core::spec::vip::VipRole;

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[command(flatten)]
    pub global_args: GlobalArgs,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// override the configuration directory (defaults to $CONSTELLATION_HOME or ~/.constellation)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,
    /// constellation to work with (overrides the one selected with `use`)
    #[arg(short = 'c', long, global = true)]
    pub constellation: Option<String>,
    /// enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose_logging: bool,
    /// enable trace output (more detailed than verbose, overrides it if present)
    #[arg(long = "trace", global = true)]
    pub trace_logging: bool,
}

impl GlobalArgs {
    pub fn get_log_level(&self) -> LogLevel {
        if self.trace_logging {
            return LogLevel::Trace;
        }

        if self.verbose_logging {
            return LogLevel::Verbose;
        }

        LogLevel::Normal
    }
}

pub enum LogLevel {
    Normal,
    Verbose,
    Trace,
}

#[derive(Debug, Subcommand)]
#[command(arg_required_else_help = true)]
pub enum Commands {
    /// select the constellation used by other commands
    Use(UseArgs),
    /// load and validate the constellation spec
    Validate,
    /// list clusters of the constellation
    #[command(alias = "lc")]
    ListClusters(ListClustersArgs),
    /// reserve missing VIPs and record the reserved addresses
    #[command(alias = "r")]
    ReconcileVips(ReconcileVipsArgs),
    /// print the recorded VIPs of a cluster
    #[command(alias = "gv")]
    GetVips(GetVipsArgs),
    /// print the control-plane endpoint (or the address of another VIP role) of a cluster
    #[command(alias = "e")]
    Endpoint(EndpointArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Names,
    Table,
    TableWithHeaders,
    Json,
    JsonPretty,
    Yaml,
}

#[derive(Debug, Args)]
pub struct UseArgs {
    /// name of the constellation, its spec is read from <config-dir>/<name>.constellation.yaml
    pub name: String,
}

#[derive(Debug, Args)]
pub struct ListClustersArgs {
    /// output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::TableWithHeaders)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ReconcileVipsArgs {
    /// reconcile a single cluster instead of the whole constellation
    #[arg(long)]
    pub cluster: Option<String>,
    /// if set, nothing will be allocated or recorded
    #[arg(long)]
    pub dry_run: bool,
    /// provider project holding the addresses (defaults to $METAL_PROJECT_ID)
    #[arg(long)]
    pub metal_project: Option<String>,
    /// provider API URL (defaults to $METAL_API_URL or the public API)
    #[arg(long)]
    pub metal_api_url: Option<String>,
    /// output format of the summary
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::TableWithHeaders)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct GetVipsArgs {
    /// name of the cluster
    pub cluster: String,
    /// print a single role only
    #[arg(long, value_enum)]
    pub role: Option<VipRoleArg>,
    /// output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::TableWithHeaders)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct EndpointArgs {
    /// name of the cluster
    pub cluster: String,
    /// print the first address of this role instead of the control-plane URL
    #[arg(long, value_enum)]
    pub role: Option<VipRoleArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VipRoleArg {
    Cp,
    Ingress,
    Mesh,
}

impl From<VipRoleArg> for VipRole {
    fn from(value: VipRoleArg) -> Self {
        match value {
            VipRoleArg::Cp => VipRole::Cp,
            VipRoleArg::Ingress => VipRole::Ingress,
            VipRoleArg::Mesh => VipRole::Mesh,
        }
    }
}
