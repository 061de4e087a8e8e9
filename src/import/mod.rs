//! Episode import pipeline.
//!
//! Submissions are directories dropped into the pull directory, each holding
//! a `task.json` manifest and the audio (plus optional image) it names.
//! A batch scans them, ingests them one by one and then republishes the
//! feeds of every podcast that gained an episode.

mod ingest;
mod job;
mod manifest;
mod probe;
mod scanner;
mod scheduler;

pub use ingest::{next_ordinal, ImportError, Ingested, Ingestor};
pub use job::{BatchReport, ImportJob};
pub use manifest::{ManifestError, TaskManifest, MANIFEST_FILE_NAME};
pub use probe::{probe, probe_duration, ProbeError};
pub use scanner::{scan, ImportTask};
pub use scheduler::{ImportScheduler, SchedulerHandle};
