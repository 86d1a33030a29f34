//! Batch Analysis
//!
//! Fans textures out over rayon, one independent task each, and collects the
//! recommendations into a map keyed by texture id. A texture that fails never
//! stops its siblings; it lands in [`BatchReport::errors`] instead.

use crate::config::AnalysisConfig;
use crate::diagnostics::{Diagnostics, Notice};
use crate::pipeline::{TextureAnalyzer, TextureId, TextureInput, TextureRecommendation};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tga", "bmp", "tif", "tiff", "webp"];

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Files under `dir` with one of `extensions`, sorted for stable output.
pub fn collect_files(dir: &Path, extensions: &[&str], recursive: bool) -> Vec<PathBuf> {
    let walker = if recursive {
        WalkDir::new(dir).follow_links(true)
    } else {
        WalkDir::new(dir).max_depth(1)
    };

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| has_extension(e.path(), extensions))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

const DUPLICATE_ID_ERROR: &str = "duplicate texture id; earlier result kept";

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: HashMap<TextureId, TextureRecommendation>,
    pub errors: Vec<(TextureId, String)>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a result. A repeated id keeps the first result, counts the
    /// newcomer as failed and returns `false`.
    pub fn success(&mut self, recommendation: TextureRecommendation) -> bool {
        if self.results.contains_key(&recommendation.id) {
            self.fail(recommendation.id, DUPLICATE_ID_ERROR.to_string());
            return false;
        }
        self.total += 1;
        self.succeeded += 1;
        self.results.insert(recommendation.id.clone(), recommendation);
        true
    }

    pub fn fail(&mut self, id: TextureId, error: String) {
        self.total += 1;
        self.failed += 1;
        self.errors.push((id, error));
    }

    pub fn skip(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }

    /// Recommendations ordered by id.
    pub fn sorted_results(&self) -> Vec<&TextureRecommendation> {
        let mut results: Vec<_> = self.results.values().collect();
        results.sort_by(|a, b| a.id.cmp(&b.id));
        results
    }
}

enum TaskOutcome {
    Skipped,
    Done(Box<TextureRecommendation>, Vec<Notice>),
    Panicked(TextureId, String),
}

/// Analyzes every input in parallel. Notices are merged into `diagnostics`
/// after all tasks finish.
pub fn analyze_batch(
    inputs: &[TextureInput],
    config: &AnalysisConfig,
    diagnostics: &mut Diagnostics,
) -> BatchReport {
    let start = Instant::now();
    let analyzer = TextureAnalyzer::new(config.clone());

    let outcomes: Vec<TaskOutcome> = inputs
        .par_iter()
        .map(|input| {
            if input.settings.skip {
                return TaskOutcome::Skipped;
            }
            match catch_unwind(AssertUnwindSafe(|| analyzer.analyze(input))) {
                Ok((recommendation, notices)) => TaskOutcome::Done(Box::new(recommendation), notices),
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "analysis panicked".to_string());
                    TaskOutcome::Panicked(input.id.clone(), message)
                }
            }
        })
        .collect();

    let mut report = BatchReport::new();
    for outcome in outcomes {
        match outcome {
            TaskOutcome::Skipped => report.skip(),
            TaskOutcome::Done(recommendation, notices) => {
                diagnostics.merge(notices);
                let id = recommendation.id.clone();
                if !report.success(*recommendation) {
                    diagnostics.report(Notice::for_texture(id.as_str(), DUPLICATE_ID_ERROR));
                }
            }
            TaskOutcome::Panicked(id, message) => {
                diagnostics.report(Notice::for_texture(id.as_str(), format!("analysis failed: {message}")));
                report.fail(id, message);
            }
        }
    }

    info!(
        total = report.total,
        succeeded = report.succeeded,
        skipped = report.skipped,
        failed = report.failed,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Batch analysis finished"
    );
    report
}
