use std::fmt::Write as _;
use std::io::{self, BufWriter, Write};
use std::process::{ExitCode, Termination};

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use colored::Colorize;
use rigor_logging::setup_tracing;
use rigor_metadata::ConfigurationFile;
use rigor_package::{PackageNode, SequentialIds, from_xml, to_xml};

use crate::args::{Args, Command, InspectCommand, PackageCommand};

mod args;

#[must_use]
pub fn main() -> ExitStatus {
    run().unwrap_or_else(|error| {
        let mut stderr = io::stderr().lock();

        writeln!(stderr, "{}", "rigor failed".red().bold()).ok();
        for cause in error.chain() {
            if let Some(ioerr) = cause.downcast_ref::<io::Error>()
                && ioerr.kind() == io::ErrorKind::BrokenPipe
            {
                return ExitStatus::Success;
            }

            writeln!(stderr, "  {} {cause}", "Cause:".bold()).ok();
        }

        ExitStatus::Error
    })
}

fn run() -> Result<ExitStatus> {
    let args = wild::args_os();
    let args = argfile::expand_args_from(args, argfile::parse_fromfile, argfile::PREFIX)
        .context("Failed to read CLI arguments from file")?;
    let args = Args::parse_from(args);

    setup_tracing(args.verbosity.level()).context("Failed to set up logging")?;

    match args.command {
        Command::Package(package_args) => package(&package_args)?,
        Command::Inspect(inspect_args) => inspect(&inspect_args)?,
    }

    Ok(ExitStatus::Success)
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().context("Failed to get the current working directory")?;
    Utf8PathBuf::from_path_buf(cwd).map_err(|path| {
        anyhow!(
            "The current working directory `{}` contains non-Unicode characters. Rigor only supports Unicode paths.",
            path.display()
        )
    })
}

fn absolute(path: &Utf8Path, cwd: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn package(args: &PackageCommand) -> Result<()> {
    let cwd = current_dir()?;
    let package = build_package(args, &cwd)?;
    let xml = to_xml(&package).context("Failed to encode the package")?;

    match &args.output {
        Some(output) => {
            let output = absolute(output, &cwd);
            std::fs::write(&output, format!("{xml}\n"))
                .with_context(|| format!("Failed to write `{output}`"))?;
            tracing::info!("Wrote package {} to `{output}`", package.id());
        }
        None => {
            let mut stdout = BufWriter::new(io::stdout().lock());
            writeln!(stdout, "{xml}")?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Builds the package for `args`: one leaf per path, configured defaults first, then the
/// settings given on the command line.
fn build_package(args: &PackageCommand, cwd: &Utf8Path) -> Result<PackageNode> {
    let paths: Vec<_> = args.paths.iter().map(|path| absolute(path, cwd)).collect();

    let ids = SequentialIds::global();
    let mut package = match paths.as_slice() {
        [path] => PackageNode::from_path(path.clone(), ids),
        _ => PackageNode::from_paths(paths, ids),
    };

    let configuration = match &args.config {
        Some(path) => Some(ConfigurationFile::from_path(absolute(path, cwd))?),
        None => ConfigurationFile::discover(cwd)?,
    };

    if let Some(configuration) = configuration {
        tracing::info!("Using configuration from `{}`", configuration.path());
        configuration.options().apply_to(&mut package);
    }

    for setting in &args.settings {
        package.add_setting(setting.name.clone(), setting.value.clone());
    }

    Ok(package)
}

fn inspect(args: &InspectCommand) -> Result<()> {
    let cwd = current_dir()?;
    let file = absolute(&args.file, &cwd);

    let text =
        std::fs::read_to_string(&file).with_context(|| format!("Failed to read `{file}`"))?;
    let package = from_xml(&text).with_context(|| format!("Failed to parse `{file}`"))?;

    let mut stdout = BufWriter::new(io::stdout().lock());
    write!(stdout, "{}", render_tree(&package))?;
    stdout.flush()?;

    Ok(())
}

/// One line per node, indented by depth, followed by the node's own settings.
fn render_tree(package: &PackageNode) -> String {
    let mut out = String::new();
    let mut stack = vec![(package, 0)];

    while let Some((node, depth)) = stack.pop() {
        let indent = "  ".repeat(depth);
        let name = node.name().unwrap_or("(anonymous)");
        let marker = if node.is_leaf() { " [leaf]" } else { "" };
        writeln!(out, "{indent}{} {name}{marker}", node.id()).ok();

        for (setting, value) in node.settings() {
            writeln!(out, "{indent}  - {setting} = {value}").ok();
        }

        stack.extend(
            node.sub_packages()
                .iter()
                .rev()
                .map(|child| (child, depth + 1)),
        );
    }

    out
}

#[derive(Copy, Clone)]
pub enum ExitStatus {
    /// The command completed.
    Success = 0,

    /// The command failed.
    Error = 2,
}

impl Termination for ExitStatus {
    fn report(self) -> ExitCode {
        ExitCode::from(self as u8)
    }
}
