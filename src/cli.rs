use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::client::Tab;

#[derive(Parser, Debug)]
#[command(
    name = "repo-depgraph",
    about = "Analyze repositories into component dependency graphs",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file [default: ./.repo-depgraph/config.toml, fallback ~/.config/repo-depgraph/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP analysis service
    Serve {
        /// Listen address, overrides `server.bind`
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Results directory, overrides `server.output_dir`
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Analyze one repository through the service and print a tab
    Analyze {
        /// Repository URL, sent exactly as given
        url: String,

        /// Service base URL, overrides `client.endpoint`
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Tab to print
        #[arg(long, default_value = "formatted", value_name = "TAB")]
        tab: TabArg,

        /// Also export the components JSON
        #[arg(long)]
        export: bool,
    },

    /// Interactive session with tabs and export
    Interactive {
        /// Analyze this URL right away
        url: Option<String>,

        /// Service base URL, overrides `client.endpoint`
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
    },

    /// Analyze a local checkout without the service
    Scan {
        /// Directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Report format
        #[arg(long, default_value = "terminal", value_name = "FORMAT")]
        report: ReportFormat,

        /// Write ir.json and dag.json into `server.output_dir`
        #[arg(long)]
        export: bool,

        /// Also print the DAG and both orderings
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum TabArg {
    Formatted,
    Components,
    Dag,
    Statistics,
}

impl From<TabArg> for Tab {
    fn from(arg: TabArg) -> Self {
        match arg {
            TabArg::Formatted => Tab::Formatted,
            TabArg::Components => Tab::Components,
            TabArg::Dag => Tab::Dag,
            TabArg::Statistics => Tab::Statistics,
        }
    }
}
