// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and subcommands for bosun

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bosun")]
#[command(about = "Prepare, build, and launch coupled ocean-model runs")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

/// Where the environment store comes from
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct EnvironArgs {
    #[arg(short = 'e', long = "environ", help = "Environment YAML file (repeatable, later wins)")]
    pub files: Vec<PathBuf>,

    #[arg(short = 's', long = "set", help = "Override an environment value (key=value)")]
    pub set: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run tasks in order against one environment
    Run {
        #[arg(required = true, help = "Tasks to run, in order")]
        tasks: Vec<String>,

        #[command(flatten)]
        environ: EnvironArgs,

        #[arg(long, conflicts_with = "local", help = "Run commands on this host over ssh")]
        host: Option<String>,

        #[arg(long, help = "Run commands on this machine even if a host is configured")]
        local: bool,

        #[arg(long, help = "Fail when a namelist overlay names unknown groups or keys")]
        strict_overlay: bool,
    },

    /// List the available tasks
    List,

    /// Print a template resolved against the environment
    Render {
        #[arg(help = "Template text, e.g. '{workdir}/input.nml'")]
        template: String,

        #[command(flatten)]
        environ: EnvironArgs,
    },

    /// Rewrite a local namelist file in canonical form
    Namelist {
        #[arg(help = "Path to the namelist file")]
        file: PathBuf,

        #[arg(short, long, help = "Write here instead of standard output")]
        output: Option<PathBuf>,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
