// src/main.rs

use anyhow::Context;
use clap::Parser;
use distill::cli::Args;
use distill::model::RunReport;
use distill::tracer::{AcceptAll, Capinfos, PinTracer, RecordedTraces, SampleValidator, TraceSource};
use distill::{DistillError, Distiller};
use std::fs::File;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let start_time = Instant::now();

    let result = run(&args);
    log::info!("Total time: {:.2?}", start_time.elapsed());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            match e.downcast_ref::<DistillError>() {
                Some(DistillError::NoValidSamples(_)) => ExitCode::from(2),
                Some(DistillError::Interrupted) => ExitCode::from(130),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let interrupted = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&interrupted)).context("installing signal handler")?;
    }

    // Holds the pintool output; removed when it goes out of scope, whatever the outcome.
    let scratch = tempfile::Builder::new()
        .prefix("distill_menagerie_")
        .tempdir()
        .context("creating scratch directory")?;

    let mut tracer: Box<dyn TraceSource> = match (&args.trace_dir, &args.pin, &args.pintool, &args.tshark) {
        (Some(dir), ..) => Box::new(RecordedTraces::new(dir)),
        (None, Some(pin), Some(pintool), Some(tshark)) => Box::new(PinTracer {
            pin: pin.clone(),
            pintool: pintool.clone(),
            tshark: tshark.clone(),
            setarch: !args.no_setarch,
            workdir: scratch.path().to_path_buf(),
        }),
        _ => anyhow::bail!("either --trace-dir or all of --pin, --pintool and --tshark are required"),
    };

    let validator: Box<dyn SampleValidator> = match (&args.capinfos, &args.tshark) {
        (Some(capinfos), _) => Box::new(Capinfos::new(capinfos)),
        (None, Some(tshark)) => Box::new(Capinfos::beside(tshark)),
        (None, None) => Box::new(AcceptAll),
    };

    let report = Distiller::new(args.config(), tracer.as_mut(), validator.as_ref())
        .with_interrupt(interrupted)
        .run()
        .with_context(|| format!("distilling {}", args.menagerie.display()))?;

    print_summary(&report);
    if let Some(path) = &args.report {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(file, &report).context("writing run report")?;
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!(
        "Distilled {} valid of {} files over {} branches: keeping {}, removing {}.",
        report.valid_samples,
        report.total_files,
        report.branches,
        report.keep.len(),
        report.discard.len()
    );
    match &report.moved_to {
        Some(dir) => println!("Removed captures were moved to {}", dir.display()),
        None if !report.discard.is_empty() => println!("Dry run, nothing was moved."),
        None => {}
    }
}
