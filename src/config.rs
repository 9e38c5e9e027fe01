use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::layout::{LayoutConfig, Rect};
use crate::output::SinkPolicy;
use crate::scanner::InputKind;

pub const USAGE: &str = "\
Usage: revmap-rs [OPTIONS] <INPUT>...

Lays out a weighted hierarchy as a squarified treemap once, then re-solves the
same layout for every revision and writes <out>/t<revision>.rect files.

Inputs:
  <INPUT>             Dataset directory of id,weight revision files
                      (or, with --snapshots, one directory per revision)

Options:
  -o, --out <DIR>     Output directory [default: output]
      --width <W>     Base rectangle width [default: 1000]
      --height <H>    Base rectangle height [default: 1000]
      --nested        Lay out every level of the hierarchy, not just the root's children
      --max-depth <N> Deepest entity level that still gets a nested layout [default: 64]
      --snapshots     Treat each input as a filesystem snapshot (file sizes are weights)
      --parallel      Solve revisions in parallel (output is identical)
      --strict        Abort on the first revision that cannot be written
  -h, --help          Print this help
";

/// Everything a run needs, parsed from the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub inputs: Vec<PathBuf>,
    pub input_kind: InputKind,
    pub out_dir: PathBuf,
    pub width: f64,
    pub height: f64,
    pub layout: LayoutConfig,
    pub parallel: bool,
    pub sink_policy: SinkPolicy,
    pub help: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            input_kind: InputKind::Dataset,
            out_dir: PathBuf::from("output"),
            width: 1000.0,
            height: 1000.0,
            layout: LayoutConfig::default(),
            parallel: false,
            sink_policy: SinkPolicy::Continue,
            help: false,
        }
    }
}

impl RunConfig {
    /// Parse arguments (without the program name).
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = RunConfig::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => config.help = true,
                "-o" | "--out" => config.out_dir = PathBuf::from(value(&arg, args.next())?),
                "--width" => config.width = dimension(&arg, args.next())?,
                "--height" => config.height = dimension(&arg, args.next())?,
                "--nested" => config.layout.nested = true,
                "--max-depth" => {
                    let raw = value(&arg, args.next())?;
                    config.layout.max_depth = raw
                        .parse()
                        .with_context(|| format!("Invalid value for --max-depth: '{}'", raw))?;
                }
                "--snapshots" => config.input_kind = InputKind::Snapshots,
                "--parallel" => config.parallel = true,
                "--strict" => config.sink_policy = SinkPolicy::Abort,
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    bail!("Unknown option '{}'\n\n{}", flag, USAGE)
                }
                _ => config.inputs.push(PathBuf::from(arg)),
            }
        }

        if !config.help && config.inputs.is_empty() {
            bail!("No input given\n\n{}", USAGE);
        }
        Ok(config)
    }

    pub fn base_rect(&self) -> Rect {
        Rect::sized(self.width, self.height)
    }
}

fn value(flag: &str, next: Option<String>) -> Result<String> {
    match next {
        Some(v) => Ok(v),
        None => bail!("Option '{}' needs a value", flag),
    }
}

fn dimension(flag: &str, next: Option<String>) -> Result<f64> {
    let raw = value(flag, next)?;
    let v: f64 = raw
        .parse()
        .with_context(|| format!("Invalid value for {}: '{}'", flag, raw))?;
    if !v.is_finite() || v <= 0.0 {
        bail!("{} must be a positive number, got {}", flag, raw);
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_with_single_input() {
        let config = RunConfig::from_args(["dataset/test"]).unwrap();
        assert_eq!(config.inputs, vec![PathBuf::from("dataset/test")]);
        assert_eq!(config.input_kind, InputKind::Dataset);
        assert_eq!(config.out_dir, PathBuf::from("output"));
        assert_eq!(config.base_rect(), Rect::sized(1000.0, 1000.0));
        assert!(!config.layout.nested);
        assert_eq!(config.sink_policy, SinkPolicy::Continue);
    }

    #[test]
    fn parses_all_options() {
        let config = RunConfig::from_args([
            "--snapshots", "rev0", "rev1", "-o", "out", "--width", "1920", "--height", "1080",
            "--nested", "--max-depth", "3", "--parallel", "--strict",
        ])
        .unwrap();
        assert_eq!(config.inputs.len(), 2);
        assert_eq!(config.input_kind, InputKind::Snapshots);
        assert_eq!(config.out_dir, PathBuf::from("out"));
        assert_eq!(config.base_rect(), Rect::sized(1920.0, 1080.0));
        assert!(config.layout.nested);
        assert_eq!(config.layout.max_depth, 3);
        assert!(config.parallel);
        assert_eq!(config.sink_policy, SinkPolicy::Abort);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(RunConfig::from_args(Vec::<String>::new()).is_err());
        assert!(RunConfig::from_args(["in", "--width"]).is_err());
        assert!(RunConfig::from_args(["in", "--width", "-5"]).is_err());
        assert!(RunConfig::from_args(["in", "--height", "tall"]).is_err());
        assert!(RunConfig::from_args(["in", "--bogus"]).is_err());
    }

    #[test]
    fn help_needs_no_input() {
        let config = RunConfig::from_args(["--help"]).unwrap();
        assert!(config.help);
    }
}
