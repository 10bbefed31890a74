//! Code related to the CLI

use crate::console_utils::ColorOutputPolicy;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// The path that makes the viewer read updates from stdin.
const STDIN_PATH: &str = "-";

/// A side-by-side viewer for disassembly diffs between an original and a rebuilt binary.
///
/// Reads build updates as JSON lines, one message per line, and renders the resulting diff.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
pub struct Args {
    /// A file with the stream of updates. Updates are read from stdin if this is missing or "-".
    pub input: Option<PathBuf>,

    /// Print debug output
    ///
    /// This will print debug logs at the trace level. This is useful for debugging and bug
    /// reports should contain debug logging info.
    #[clap(short, long)]
    pub debug: bool,

    /// Specify which renderer tag to use.
    ///
    /// The tags are `side_by_side` and `json`. If this isn't set, the default renderer from the
    /// config is used.
    #[clap(short, long)]
    pub renderer: Option<String>,

    /// Use the config provided at the given path
    ///
    /// By default, romdiff attempts to find the config at `$XDG_CONFIG_HOME/romdiff/config.json5`.
    /// On Windows the app will look in the standard config path.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Set the color output policy. Valid values are: "auto", "on", "off".
    ///
    /// "auto" will automatically detect whether colors should be applied by trying to determine
    /// whether the process is outputting to a TTY. "on" will enable output and "off" will
    /// disable color output regardless of whether the process detects a TTY.
    #[clap(long, default_value_t)]
    pub color_output: ColorOutputPolicy,

    /// Ignore any config files and use the default config
    ///
    /// `ROMDIFF_` environment variables still apply.
    #[clap(short, long)]
    pub no_config: bool,

    /// Render a frame after every update instead of only the final state.
    #[clap(short, long)]
    pub every_update: bool,

    /// Subcommands that don't read any updates.
    #[clap(subcommand)]
    pub cmd: Option<Command>,
}

impl Args {
    /// The path to read updates from, or `None` for stdin.
    pub fn input_path(&self) -> Option<&Path> {
        self.input
            .as_deref()
            .filter(|path| path.as_os_str() != STDIN_PATH)
    }
}

/// Commands related to the configuration
#[derive(Debug, Eq, PartialEq, Clone, Copy, Subcommand)]
pub enum Command {
    /// Dump the default config to stdout
    DumpDefaultConfig,

    /// Generate shell completion scripts for romdiff
    GenCompletion {
        /// The shell to generate completion scripts for.
        #[clap(value_enum)]
        shell: clap_complete::Shell,
    },
}
