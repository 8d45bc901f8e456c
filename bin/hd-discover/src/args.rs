//! Parses command-line arguments for the discovery CLI.

use std::path::PathBuf;

use clap::{crate_version, Parser};

#[derive(Debug, Parser)]
#[clap(
    name = "hd-discover",
    about = "Runs gap-limit address discovery over a stored HD wallet account",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[clap(
        long,
        short = 'c',
        help = "The file containing the configuration for discovery",
        default_value = "config.toml"
    )]
    pub config: PathBuf,

    #[clap(
        long,
        short = 'a',
        help = "The JSON file holding the account state",
        default_value = "account.json"
    )]
    pub account: PathBuf,

    #[clap(
        long,
        short = 'o',
        help = "Where to write the discovered account state, defaults to overwriting the account file"
    )]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// The file the discovered account is written to.
    pub(crate) fn output_path(&self) -> &PathBuf {
        self.output.as_ref().unwrap_or(&self.account)
    }
}
