//! Main CLI entry point for deb-release

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use debrel_config::DEFAULT_CONFIG_FILE;
use debrel_debian::{BuildKind, ChangelogMode};
use tracing_subscriber::EnvFilter;

mod commands;

/// deb-release - Build and publish Debian packages from a Subversion tree
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    quiet: u8,

    /// Configuration file path (global option)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stage, build and optionally upload packages
    Package {
        /// Release to build for
        #[arg(short, long, value_name = "RELEASE", required_unless_present = "all")]
        release: Option<String>,

        /// Build every configured release
        #[arg(short, long, conflicts_with = "release")]
        all: bool,

        /// Build a signed source package
        #[arg(short, long, conflicts_with_all = ["binary", "sbuild"])]
        source: bool,

        /// Build an unsigned binary package (default)
        #[arg(short, long, conflicts_with = "sbuild")]
        binary: bool,

        /// Build an unsigned source package and run sbuild on it
        #[arg(long)]
        sbuild: bool,

        /// Send the source package to the PPA
        #[arg(short = 'p', long = "ppa")]
        upload: bool,

        /// Use this revision instead of asking Subversion
        #[arg(long, value_name = "N")]
        revision: Option<String>,

        /// How debian/changelog is produced
        #[arg(long, value_name = "MODE", default_value_t = ChangelogMode::Generate)]
        changelog: ChangelogMode,
    },

    /// Regenerate debian/changelog from the Subversion log
    Changelog {
        /// Release the stanzas are written for
        #[arg(value_name = "RELEASE")]
        release: String,

        /// Write to this file instead of the template changelog
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Validate configuration, templates and required tools
    Validate,

    /// Remove leftover staging directories
    Clean,

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,

        /// Force overwrite existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet)?;

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let result = match cli.command {
        Commands::Package {
            release,
            all,
            source,
            binary: _,
            sbuild,
            upload,
            revision,
            changelog,
        } => {
            let kind = if source {
                BuildKind::Source
            } else if sbuild {
                BuildKind::Sbuild
            } else {
                BuildKind::Binary
            };
            let target = if all { None } else { release };
            let command =
                commands::PackageCommand::new(config_path, target, kind, upload, revision, changelog);
            command.execute().await
        }

        Commands::Changelog { release, output } => {
            let command = commands::ChangelogCommand::new(config_path, release, output);
            command.execute().await
        }

        Commands::Validate => {
            let command = commands::ValidateCommand::new(config_path);
            command.execute().await
        }

        Commands::Clean => {
            let command = commands::CleanCommand::new(config_path);
            command.execute().await
        }

        Commands::Init { output, force } => {
            let command = commands::InitCommand::new(output, force);
            command.execute().await
        }
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn setup_logging(verbose: u8, quiet: u8) -> Result<()> {
    let log_level = match (verbose, quiet) {
        (0, 0) => "info",
        (1, 0) => "debug",
        (v, 0) if v >= 2 => "trace",
        (0, 1) => "warn",
        (0, 2) => "error",
        (0, q) if q > 2 => "off",
        _ => "info",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_package_flags() {
        let cli = Cli::parse_from(["debrel", "package", "-r", "precise", "-s", "-p", "--revision", "77"]);
        match cli.command {
            Commands::Package { release, source, upload, revision, changelog, .. } => {
                assert_eq!(release.as_deref(), Some("precise"));
                assert!(source);
                assert!(upload);
                assert_eq!(revision.as_deref(), Some("77"));
                assert_eq!(changelog, ChangelogMode::Generate);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_package_requires_release_or_all() {
        assert!(Cli::try_parse_from(["debrel", "package"]).is_err());
        assert!(Cli::try_parse_from(["debrel", "package", "-a", "-r", "precise"]).is_err());
        assert!(Cli::try_parse_from(["debrel", "package", "-a", "--changelog", "skip"]).is_ok());
    }

    #[test]
    fn test_build_kind_flags_conflict() {
        assert!(Cli::try_parse_from(["debrel", "package", "-a", "-s", "--sbuild"]).is_err());
        assert!(Cli::try_parse_from(["debrel", "package", "-a", "-b", "--sbuild"]).is_err());
    }
}
