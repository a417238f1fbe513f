use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cobblerd")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Idempotent management of Cobbler distros and profiles", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: ~/.config/cobblerd/config.toml)
    #[arg(short, long, global = true, env = "COBBLERD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check image names for strings Cobbler would rewrite
    Validate {
        /// Names to check
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Show current vs desired state of declared objects
    Status(TargetArgs),

    /// Preview what apply would change
    Diff(TargetArgs),

    /// Make Cobbler match the declared objects
    Apply(ApplyArgs),

    /// Delete one object from Cobbler
    #[command(subcommand)]
    Delete(DeleteCommand),

    /// Run `cobbler sync`
    Sync,

    /// Show the resolved configuration
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct TargetArgs {
    /// Only these objects: `image`, `profile`, or `type.name`
    pub target: Option<String>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Only these objects: `image`, `profile`, or `type.name`
    pub target: Option<String>,

    /// Dry run - show what would be done
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

// ============================================================================
// Delete
// ============================================================================

#[derive(Subcommand)]
pub enum DeleteCommand {
    /// Remove the distro created from an image
    Image {
        /// Image name (the distro is `<name>-<arch>`)
        name: String,

        /// Architecture the image was imported with
        #[arg(short, long, default_value = "x86_64")]
        arch: String,
    },

    /// Remove a profile and its kickstart file
    Profile {
        /// Profile name
        name: String,

        /// Distro the profile belongs to
        #[arg(short, long)]
        distro: String,
    },
}
