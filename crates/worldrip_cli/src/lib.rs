//! The `worldrip` command line utility
//!
//! Extracts a game world out of memory dumps, given the addresses of its tables in a TOML
//! description file.

use clap::{ArgAction, Parser, Subcommand};
use commands::{extract::ExtractCommand, schemas::SchemasCommand};
use log::LevelFilter;
use worldrip_utils::{ok, AnyResult};

pub mod commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increases log verbosity, can be repeated
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: CliCommand,
}

impl Cli {
    /// Level filter selected with `-v` flags. `RUST_LOG` takes precedence over it.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Extracts a world into OBJ, MTL and MAP files
    Extract(ExtractCommand),
    /// Lists supported titles and their record layouts
    Schemas(SchemasCommand),
}

pub trait Command {
    fn run(self) -> AnyResult;
}

/// Runs `worldrip` as if it was ran from the command line.
pub fn run(cli: Cli) -> AnyResult {
    match cli.command {
        CliCommand::Extract(c) => c.run()?,
        CliCommand::Schemas(c) => c.run()?,
    }
    ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_the_log_level() {
        let cli = Cli::parse_from(["worldrip", "schemas"]);
        assert_eq!(cli.log_level(), LevelFilter::Info);

        let cli = Cli::parse_from(["worldrip", "-vv", "schemas"]);
        assert_eq!(cli.log_level(), LevelFilter::Trace);
    }

    #[test]
    fn extract_arguments() {
        let cli = Cli::parse_from([
            "worldrip", "extract", "--schema", "bo2", "world.toml", "-o", "out", "-v",
        ]);
        assert_eq!(cli.log_level(), LevelFilter::Debug);

        let CliCommand::Extract(extract) = cli.command else {
            panic!("expected the extract command");
        };
        assert_eq!(extract.schema, Some(worldrip_gfx::schema::Schema::BlackOps2));
        assert_eq!(extract.description.to_str(), Some("world.toml"));
        assert_eq!(extract.output.to_str(), Some("out"));
        assert_eq!(extract.name, None);
    }
}
