use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use rigor_logging::VerbosityLevel;
use rigor_package::SettingValue;
use rigor_static::EnvVars;

#[derive(Debug, Parser)]
#[command(author, name = "rigor", about = "Builds and inspects test packages.")]
#[command(version)]
pub(crate) struct Args {
    #[command(subcommand)]
    pub(crate) command: Command,

    #[clap(flatten)]
    pub(crate) verbosity: Verbosity,
}

#[derive(Debug, clap::Subcommand)]
pub(crate) enum Command {
    /// Build a test package and write it as XML.
    Package(PackageCommand),

    /// Print the tree of a test package file.
    Inspect(InspectCommand),
}

#[derive(Debug, Parser)]
pub(crate) struct PackageCommand {
    /// Units to include, one leaf each.
    #[clap(value_name = "PATH", required = true)]
    pub(crate) paths: Vec<Utf8PathBuf>,

    /// Set a setting on every node, after the configuration file is applied.
    #[clap(long = "setting", short = 's', value_name = "KEY=VALUE", value_parser = parse_setting)]
    pub(crate) settings: Vec<SettingArg>,

    /// Configuration file to use instead of `rigor.toml` in the working directory.
    #[clap(long, value_name = "FILE", env = EnvVars::RIGOR_CONFIG_FILE)]
    pub(crate) config: Option<Utf8PathBuf>,

    /// Write the package here instead of stdout.
    #[clap(long, short = 'o', value_name = "FILE")]
    pub(crate) output: Option<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
pub(crate) struct InspectCommand {
    /// A package file written by `rigor package`.
    #[clap(value_name = "FILE")]
    pub(crate) file: Utf8PathBuf,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub(crate) struct Verbosity {
    /// Use verbose output. Repeat for more detail (`-vv`, `-vvv`).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

impl Verbosity {
    pub(crate) const fn level(&self) -> VerbosityLevel {
        VerbosityLevel::from_flag_count(self.verbose)
    }
}

/// A `KEY=VALUE` pair from the command line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SettingArg {
    pub(crate) name: String,
    pub(crate) value: SettingValue,
}

/// Values are typed the same way as when a package file is read back.
fn parse_setting(text: &str) -> Result<SettingArg, String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, found `{text}`"))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing setting name in `{text}`"));
    }

    Ok(SettingArg {
        name: name.to_string(),
        value: SettingValue::parse_typed(value),
    })
}
