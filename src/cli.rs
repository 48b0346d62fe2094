// src/cli.rs

use crate::distill::{DistillConfig, TraceErrorPolicy};
use crate::model::KeyOrder;
use clap::Parser;
use std::path::PathBuf;

/// Increases the quality of a capture file collection by moving aside the
/// captures that add no branch coverage to TShark.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Location of the menagerie (directory of capture files)
    #[arg(short, long)]
    pub menagerie: PathBuf,

    /// Location of pin
    #[arg(short, long, required_unless_present = "trace_dir", requires_all = ["pintool", "tshark"])]
    pub pin: Option<PathBuf>,

    /// Location of the pintool that writes MyPinTool.out
    #[arg(short = 't', long)]
    pub pintool: Option<PathBuf>,

    /// Location of TShark
    #[arg(short = 'b', long)]
    pub tshark: Option<PathBuf>,

    /// Read pre-recorded traces (`<name>.trace`) from this directory instead of running pin
    #[arg(long, conflicts_with = "pin")]
    pub trace_dir: Option<PathBuf>,

    /// capinfos used to validate captures [default: next to TShark]
    #[arg(long)]
    pub capinfos: Option<PathBuf>,

    /// Do not wrap pin in `setarch -R`
    #[arg(long)]
    pub no_setarch: bool,

    /// How branch addresses are ordered
    #[arg(long, value_enum, default_value_t = KeyOrder::Lexical)]
    pub key_order: KeyOrder,

    /// What to do when a capture cannot be traced
    #[arg(long, value_enum, default_value_t = TraceErrorPolicy::Abort)]
    pub on_trace_error: TraceErrorPolicy,

    /// Report what would be removed without moving anything
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON run report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write the annotated coverage index (JSON lines) to this file
    #[arg(long)]
    pub dump_index: Option<PathBuf>,
}

impl Args {
    pub fn config(&self) -> DistillConfig {
        DistillConfig {
            menagerie: self.menagerie.clone(),
            key_order: self.key_order,
            on_trace_error: self.on_trace_error,
            dry_run: self.dry_run,
            dump_index: self.dump_index.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn pin_mode_needs_all_tools() {
        let args = Args::try_parse_from(["distill", "-m", "m", "-p", "pin", "-t", "tool.so", "-b", "tshark"]).unwrap();
        assert_eq!(args.pin.as_deref(), Some(std::path::Path::new("pin")));
        assert_eq!(args.key_order, KeyOrder::Lexical);

        assert!(Args::try_parse_from(["distill", "-m", "m", "-p", "pin"]).is_err());
        assert!(Args::try_parse_from(["distill", "-m", "m"]).is_err());
    }

    #[test]
    fn trace_dir_replaces_pin() {
        let args = Args::try_parse_from([
            "distill", "-m", "m", "--trace-dir", "traces", "--key-order", "numeric", "--on-trace-error", "skip",
            "--dry-run",
        ])
        .unwrap();
        let config = args.config();
        assert_eq!(config.key_order, KeyOrder::Numeric);
        assert_eq!(config.on_trace_error, TraceErrorPolicy::Skip);
        assert!(config.dry_run);

        assert!(Args::try_parse_from(["distill", "-m", "m", "--trace-dir", "t", "-p", "pin", "-t", "x", "-b", "y"]).is_err());
    }
}
