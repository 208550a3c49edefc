//! appdeploy - bundle a Linux application as an AppImage.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use appdeploy::commands;
use appdeploy::Config;

#[derive(Parser)]
#[command(name = "appdeploy")]
#[command(about = "Bundle a Linux application and its shared libraries as an AppImage")]
#[command(
    after_help = "QUICK START:\n  appdeploy deps AppDir/usr/bin/app         Show what would be bundled\n  appdeploy deploy --app-dir AppDir --executables AppDir/usr/bin/app --target App.AppImage"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy dependencies into an AppDir, set up AppRun and pack an AppImage
    Deploy {
        /// AppDir to populate
        #[arg(long)]
        app_dir: PathBuf,

        /// Executables inside the AppDir, separated by ':'. The first one is launched.
        #[arg(long)]
        executables: String,

        /// AppImage to write
        #[arg(long)]
        target: PathBuf,

        /// Stop after assembling the AppDir
        #[arg(long)]
        no_appimage: bool,

        /// Don't download AppRun and its hooks
        #[arg(long)]
        no_fetch: bool,
    },

    /// Print the resolved shared-library closure
    Deps {
        /// Binaries to resolve
        #[arg(required = true)]
        binaries: Vec<PathBuf>,

        /// Also resolve every library under this directory (repeatable)
        #[arg(long = "lib-dir")]
        lib_dirs: Vec<PathBuf>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    match cli.command {
        Commands::Deploy {
            app_dir,
            executables,
            target,
            no_appimage,
            no_fetch,
        } => {
            commands::cmd_deploy(
                &app_dir,
                &executables,
                &target,
                no_appimage,
                no_fetch,
                &config,
            )?;
        }

        Commands::Deps {
            binaries,
            lib_dirs,
            json,
        } => {
            commands::cmd_deps(&binaries, &lib_dirs, json, &config)?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
            };
            commands::cmd_show(show_target, &config)?;
        }
    }

    Ok(())
}
