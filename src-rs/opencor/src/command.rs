use clap::{Parser, Subcommand};

/// OpenCOR simulation engine CLI
#[derive(Parser)]
#[command(name = "opencor")]
#[command(version, about = "Run CellML models and SED-ML simulation experiments", long_about = None)]
pub struct CliCommand {
    #[command(subcommand)]
    pub command: Commands,

    /// Log what the engine does (overridden by `RUST_LOG`)
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Describe a file and the simulation experiment it defines
    Info {
        /// Path or URL of a CellML file, SED-ML file or COMBINE archive
        #[arg(value_name = "FILE")]
        file: String,
    },
    /// Run the simulation experiment of a file and print its results as CSV
    Run {
        /// Path or URL of a CellML file, SED-ML file or COMBINE archive
        #[arg(value_name = "FILE")]
        file: String,

        /// Walk the model equations instead of compiling them first
        #[arg(long)]
        interpreted: bool,

        /// Run again whenever the file changes
        #[arg(long)]
        watch: bool,
    },
    /// Print the simulation experiment of a file as SED-ML
    Serialise {
        /// Path or URL of a CellML file, SED-ML file or COMBINE archive
        #[arg(value_name = "FILE")]
        file: String,

        /// Write model sources relative to this path or URL
        #[arg(long, value_name = "PATH")]
        base_path: Option<String>,
    },
    /// List the supported solvers and their properties
    Solvers,
}
