// src/distill.rs

use crate::annotate::annotate;
use crate::corpus;
use crate::error::{DistillError, Result};
use crate::index::CoverageIndex;
use crate::ingest::ingest;
use crate::model::*;
use crate::select::{discard, select, Selection};
use crate::tracer::{SampleValidator, TraceSource};
use chrono::Utc;
use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// What to do when a sample's trace cannot be produced
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceErrorPolicy {
    /// Stop the run
    #[default]
    Abort,
    /// Treat the sample as covering nothing
    Skip,
}

#[derive(Debug, Clone, Default)]
pub struct DistillConfig {
    pub menagerie: PathBuf,
    pub key_order: KeyOrder,
    pub on_trace_error: TraceErrorPolicy,
    /// Compute the selection but leave every file where it is
    pub dry_run: bool,
    /// Write the annotated index here as JSON lines
    pub dump_index: Option<PathBuf>,
}

/// One minimization run over a menagerie.
pub struct Distiller<'a> {
    config: DistillConfig,
    tracer: &'a mut dyn TraceSource,
    validator: &'a dyn SampleValidator,
    interrupted: Arc<AtomicBool>,
}

impl<'a> Distiller<'a> {
    pub fn new(config: DistillConfig, tracer: &'a mut dyn TraceSource, validator: &'a dyn SampleValidator) -> Self {
        Self { config, tracer, validator, interrupted: Arc::new(AtomicBool::new(false)) }
    }

    /// Flag checked between samples and before any file is moved; setting it
    /// ends the run with `DistillError::Interrupted`.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    fn check_interrupt(&self) -> Result<()> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(DistillError::Interrupted);
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<RunReport> {
        let started_at = Utc::now();
        let menagerie = self.config.menagerie.clone();

        // 1. Enumerate and validate
        let files = corpus::list_samples(&menagerie)?;
        info!("Total file count: {}", files.len());
        if files.is_empty() {
            return Err(DistillError::NoSamples(menagerie));
        }
        let samples = self.validate(&files);
        if samples.is_empty() {
            return Err(DistillError::NoValidSamples(menagerie));
        }
        for invalid in files.iter().filter(|f| !samples.contains(f)) {
            debug!("{invalid} is not a valid sample, leaving it in place");
        }

        // 2. Ingest, first sample twice as a sanity pass
        let mut index = CoverageIndex::new(self.config.key_order);
        let mut skipped = Vec::new();
        let mut traced = 0;

        let bar = ProgressBar::new(samples.len() as u64 + 1);
        bar.set_message("Tracing samples");
        let order = std::iter::once(&samples[0]).chain(samples.iter());
        for (pass, sample) in order.enumerate() {
            if let Err(e) = self.check_interrupt() {
                bar.abandon_with_message("Interrupted");
                return Err(e);
            }

            let start = Instant::now();
            let result = self.tracer.trace(&menagerie.join(sample));
            let elapsed = start.elapsed();
            match result {
                Ok(trace) => {
                    let length = ingest(&mut index, sample, &trace);
                    if pass > 0 {
                        traced += 1;
                    }
                    bar.suspend(|| {
                        info!(
                            "{sample}: {length}/{} branches, {:.2} s",
                            index.total_branch_count(),
                            elapsed.as_secs_f64()
                        )
                    });
                }
                Err(source) => match self.config.on_trace_error {
                    TraceErrorPolicy::Abort => {
                        bar.abandon();
                        return Err(DistillError::Trace { sample: sample.clone(), source });
                    }
                    TraceErrorPolicy::Skip => {
                        bar.suspend(|| warn!("skipping {sample}: {source}"));
                        if pass > 0 {
                            skipped.push(SkippedSample { sample: sample.clone(), reason: source.to_string() });
                        }
                    }
                },
            }
            bar.inc(1);
        }
        // a signal during the last trace leaves that sample's coverage incomplete
        if let Err(e) = self.check_interrupt() {
            bar.abandon_with_message("Interrupted");
            return Err(e);
        }
        bar.finish_with_message("Tracing complete");
        info!("Pcap count: {traced}");

        // 3. Annotate and select
        annotate(&mut index);
        info!(
            "Indexed {} branches, {} sample registrations",
            index.total_branch_count(),
            index.pair_count()
        );
        if let Some(path) = &self.config.dump_index {
            index.save(path)?;
            info!("Wrote index to {}", path.display());
        }

        let selection = select(&index);
        let outcome = match &selection {
            Selection::Empty => {
                warn!("No branch was recorded for any sample, nothing to minimize");
                Outcome::NothingToMinimize
            }
            Selection::Cover { keep, steps } => {
                debug!("Selection finished in {steps} steps");
                info!("Keeping {} of {} samples", keep.len(), samples.len());
                Outcome::Minimized
            }
        };

        // 4. Dispose of the rest
        let keep = selection.into_keep();
        let discarded = match outcome {
            Outcome::Minimized => discard(&samples, &keep),
            Outcome::NothingToMinimize => Vec::new(),
        };
        let moved_to = if self.config.dry_run || discarded.is_empty() {
            None
        } else {
            self.check_interrupt()?;
            let target = corpus::relocate(&menagerie, &discarded)?;
            info!("Moved {} samples to {}", discarded.len(), target.display());
            Some(target)
        };

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            menagerie,
            key_order: self.config.key_order,
            total_files: files.len(),
            valid_samples: samples.len(),
            traced_samples: traced,
            skipped,
            branches: index.total_branch_count(),
            keep: keep.into_iter().collect(),
            discard: discarded,
            moved_to,
            outcome,
        })
    }

    fn validate(&self, files: &[SampleId]) -> Vec<SampleId> {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_message("Checking samples");
        let validator = self.validator;
        let menagerie = &self.config.menagerie;

        let verdicts: Vec<bool> = files
            .par_iter()
            .progress_with(bar)
            .map(|name| validator.is_valid(&menagerie.join(name)))
            .collect();

        files
            .iter()
            .zip(verdicts)
            .filter_map(|(name, ok)| ok.then(|| name.clone()))
            .collect()
    }
}
