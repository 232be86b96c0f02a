//! Kiln command-line tool
//!
//! Loads JSON class-definition files, runs them through the composition
//! engine, and reports finalization status, descriptor contents, or a
//! constructed instance's resolved config.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;
mod files;
mod output;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Kiln class-composition toolchain", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Define every class in the given files and report status
    Check {
        /// Definition files (JSON object or array of objects)
        files: Vec<PathBuf>,
        /// Platform to evaluate conditional configs against
        #[arg(long, default_value = "desktop")]
        platform: String,
        /// Environment properties, e.g. --env width=320
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,
    },

    /// Print a finalized class descriptor
    Inspect {
        /// Class path, alias, or xtype to inspect
        class: String,
        /// Definition files
        files: Vec<PathBuf>,
        #[arg(long, default_value = "desktop")]
        platform: String,
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,
    },

    /// Construct an instance and print its resolved config
    Create {
        /// Class path, alias, or xtype to instantiate
        name: String,
        /// Definition files
        files: Vec<PathBuf>,
        /// Instance config object as inline JSON
        #[arg(long)]
        config: Option<String>,
        #[arg(long, default_value = "desktop")]
        platform: String,
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let choice = output::resolve_color_choice(cli.color.as_deref());
    let mut out = output::StyledOutput::new(choice);

    let result = match cli.command {
        Commands::Check { files, platform, env } => {
            commands::check::run(&mut out, &files, &platform, &env)
        }
        Commands::Inspect {
            class,
            files,
            platform,
            env,
        } => commands::inspect::run(&mut out, &class, &files, &platform, &env),
        Commands::Create {
            name,
            files,
            config,
            platform,
            env,
        } => commands::create::run(&mut out, &name, &files, config.as_deref(), &platform, &env),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            out.error(&format!("error: {:#}", err));
            ExitCode::FAILURE
        }
    }
}
