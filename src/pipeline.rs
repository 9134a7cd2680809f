//! End-to-end label round-trip pipeline
//!
//! States advance strictly in order:
//! `Init -> ReductionDone -> LabelCreated -> TypeNormalized -> Painted ->
//! Persisted -> Reloaded -> Verified`. The first error moves the run to
//! `Failed` and nothing after it executes. Nothing is retried.

use crate::cast::{normalize_label, ScalarCaster};
use crate::config::PipelineConfig;
use crate::error::{ErrorKind, Result, RoundTripError};
use crate::magnitude::reduce_magnitude;
use crate::paint::{diagonal_strokes, RasterPainter, StrokeTiming};
use crate::persist::RoundTripPersistor;
use crate::scene::Scene;
use crate::storage::LabelStore;
use crate::types::VolumeClass;
use crate::utils::is_plain_file_name;
use crate::volume::VolumeImage;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Where a run stands
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Init,
    ReductionDone,
    LabelCreated,
    TypeNormalized,
    Painted,
    Persisted,
    Reloaded,
    Verified,
    Failed(Box<Failure>),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Verified | PipelineState::Failed(_))
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Failed(failure) => write!(f, "Failed({})", failure.kind),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Why and where a run stopped
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: ErrorKind,
    /// Last state reached before the failing step
    pub from: PipelineState,
    pub message: String,
}

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub input_name: String,
    pub state: PipelineState,
    /// Every state entered, starting with `Init`
    pub history: Vec<PipelineState>,
    pub saved_path: Option<PathBuf>,
    pub bytes_written: u64,
    pub strokes: Vec<StrokeTiming>,
    pub elapsed: Duration,
}

impl PipelineReport {
    fn new(input_name: &str) -> Self {
        Self {
            input_name: input_name.to_string(),
            state: PipelineState::Init,
            history: vec![PipelineState::Init],
            saved_path: None,
            bytes_written: 0,
            strokes: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        info!(input = %self.input_name, from = %self.state, to = %next, "pipeline transition");
        self.history.push(next.clone());
        self.state = next;
    }

    fn fail(&mut self, err: &RoundTripError) {
        let failure = Failure {
            kind: err.kind(),
            from: self.state.clone(),
            message: err.to_string(),
        };
        error!(
            input = %self.input_name,
            stage = %failure.from,
            kind = %failure.kind,
            "{}",
            failure.message
        );
        self.advance(PipelineState::Failed(Box::new(failure)));
    }

    /// Whether the run reached `Verified`
    pub fn passed(&self) -> bool {
        self.state == PipelineState::Verified
    }

    pub fn failure(&self) -> Option<&Failure> {
        match &self.state {
            PipelineState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn summary(&self) -> String {
        match self.failure() {
            None => format!(
                "'{}': {} in {:.3}s, {} stroke(s), {} bytes written",
                self.input_name,
                self.state,
                self.elapsed.as_secs_f64(),
                self.strokes.len(),
                self.bytes_written
            ),
            Some(failure) => format!(
                "'{}': failed after {} with {}: {}",
                self.input_name, failure.from, failure.kind, failure.message
            ),
        }
    }
}

/// Sequences reduction, label creation, normalization, painting and the
/// disk round trip over host-provided collaborators
pub struct PipelineOrchestrator<'a> {
    config: PipelineConfig,
    scene: &'a dyn Scene,
    store: &'a dyn LabelStore,
    caster: &'a dyn ScalarCaster,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(
        config: PipelineConfig,
        scene: &'a dyn Scene,
        store: &'a dyn LabelStore,
        caster: &'a dyn ScalarCaster,
    ) -> Self {
        Self {
            config,
            scene,
            store,
            caster,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole pipeline once. Never returns early with an error: the
    /// outcome, failed or not, is in the report.
    pub async fn run(&self, input: &VolumeImage) -> PipelineReport {
        let started = Instant::now();
        let mut report = PipelineReport::new(input.name());
        info!(input = input.name(), "processing started");

        if let Err(e) = self.execute(input, &mut report).await {
            report.fail(&e);
        } else {
            info!(input = input.name(), "processing completed");
        }

        report.elapsed = started.elapsed();
        report
    }

    /// [`run`](Self::run) on a dedicated current-thread runtime, for
    /// synchronous callers.
    ///
    /// Returns [`RoundTripError::Configuration`] when called from inside a
    /// tokio runtime; use `run(..).await` there.
    pub fn run_blocking(&self, input: &VolumeImage) -> Result<PipelineReport> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(RoundTripError::Configuration(
                "run_blocking called from within an async runtime".to_string(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.run(input)))
    }

    fn check_input(&self, input: &VolumeImage) -> Result<()> {
        if !input.has_image_data() {
            return Err(RoundTripError::InvalidInput(format!(
                "'{}' has no image data",
                input.name()
            )));
        }
        if input.class() != VolumeClass::Vector || input.channels() < 2 {
            return Err(RoundTripError::InvalidInput(format!(
                "expected a vector volume, '{}' was loaded as a {} with {} channel(s)",
                input.name(),
                input.class(),
                input.channels()
            )));
        }
        let label_name = format!(
            "{}{}{}",
            input.name(),
            self.config.grey_suffix,
            self.config.label_suffix
        );
        if !is_plain_file_name(&label_name) {
            return Err(RoundTripError::InvalidInput(format!(
                "label name '{}' is not a plain file name",
                label_name
            )));
        }
        Ok(())
    }

    async fn execute(&self, input: &VolumeImage, report: &mut PipelineReport) -> Result<()> {
        self.config.validate()?;
        self.check_input(input)?;

        info!(input = input.name(), "image is a vector volume, creating a grey scale");
        let grey_name = format!("{}{}", input.name(), self.config.grey_suffix);
        let grey = reduce_magnitude(input, grey_name)?;
        let grey_node = self.scene.add(grey);
        report.advance(PipelineState::ReductionDone);

        let label = {
            let grey = grey_node.volume.read();
            let label_name = format!("{}{}", grey.name(), self.config.label_suffix);
            VolumeImage::label_like(&grey, label_name)?
        };
        let label_name = label.name().to_string();
        info!(label = %label_name, "setting up label map");
        let label_node = self.scene.add(label);
        report.advance(PipelineState::LabelCreated);

        let mut label = label_node.volume.read().clone();
        normalize_label(&mut label, self.caster).await?;
        *label_node.volume.write() = label;
        report.advance(PipelineState::TypeNormalized);

        let (width, height) = match self.config.canvas {
            Some(canvas) => canvas,
            None => {
                let dims = label_node.volume.read().dims();
                (
                    u32::try_from(dims.nx).unwrap_or(u32::MAX),
                    u32::try_from(dims.ny).unwrap_or(u32::MAX),
                )
            }
        };
        let strokes = diagonal_strokes(width, height, self.config.label_count);
        let painter =
            RasterPainter::new(self.config.brush_radius).with_slice(self.config.paint_slice);
        info!(
            radius = painter.radius(),
            canvas_width = width,
            canvas_height = height,
            "paint radius set"
        );
        report.strokes = painter.paint(&mut label_node.volume.write(), &strokes)?;
        info!(label = %label_name, "painting complete");
        report.advance(PipelineState::Painted);

        let persistor = RoundTripPersistor::new(self.store, self.scene, &self.config.output_dir)
            .with_format(self.config.file_format);
        let snapshot = label_node.volume.read().clone();
        let saved = persistor.save(&snapshot).await?;
        report.saved_path = Some(saved.path.clone());
        report.bytes_written = saved.bytes_written;
        report.advance(PipelineState::Persisted);

        let reloaded = persistor.reload(&saved, &label_name).await?;
        report.advance(PipelineState::Reloaded);

        persistor.verify(&saved, &reloaded)?;
        report.advance(PipelineState::Verified);
        Ok(())
    }
}
