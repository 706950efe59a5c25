// ============================================================
// Layer 6 — Model Artifacts
// ============================================================
// Saves a trained model to a single file and restores it.
//
// What goes into one artifact:
//   1. format_version — bumped whenever the layout below changes
//   2. architecture   — the layer stack as JSON, so load() can
//                       rebuild the network before filling it
//   3. network        — every parameter at full precision
//
// The record is encoded with Burn's NamedMpkBytesRecorder
// (MessagePack) and gzip-compressed with flate2 into exactly
// the path the caller gave, with no extension added.
//
// ArtifactStore adds the directory conventions used by the CLI:
//
//   artifacts/
//     cnn.mpk.gz                ← one artifact per model kind
//     linear.mpk.gz
//     train_config_cnn.json     ← settings of the last run per kind
//     train_config_linear.json
//     metrics.csv               ← one row per epoch
//
// Error mapping:
//   - file system failures            → PipelineError::Persistence
//   - undecodable or foreign content  → PipelineError::CorruptArtifact
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Record, Recorder},
};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use crate::application::train_use_case::TrainConfig;
use crate::domain::architecture::{Architecture, ModelKind};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::ml::model::{Mode, Model, NetworkRecord, ParamShapes};

/// Layout version written into every artifact.
pub const FORMAT_VERSION: usize = 1;

#[derive(Record)]
struct ArtifactRecord<B: Backend> {
    format_version: usize,
    architecture:   String,
    network:        NetworkRecord<B>,
}

fn persistence(path: &Path, source: io::Error) -> PipelineError {
    PipelineError::Persistence { path: path.to_path_buf(), source }
}

/// Write `model` (architecture and parameters) to `path`.
pub fn save<B: Backend>(model: &Model<B>, path: impl AsRef<Path>) -> PipelineResult<()> {
    let path = path.as_ref();

    let architecture = serde_json::to_string(model.architecture())
        .map_err(|e| persistence(path, e.into()))?;
    let record = ArtifactRecord::<B> {
        format_version: FORMAT_VERSION,
        architecture,
        network: model.network().clone().into_record(),
    };

    let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
    let bytes = Recorder::<B>::record(&recorder, record, ())
        .map_err(|e| persistence(path, io::Error::other(format!("{e:?}"))))?;

    let file = fs::File::create(path).map_err(|e| persistence(path, e))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(&bytes).map_err(|e| persistence(path, e))?;
    encoder
        .finish()
        .and_then(|file| file.sync_all())
        .map_err(|e| persistence(path, e))?;

    tracing::debug!("Saved {} bytes of model record to '{}'", bytes.len(), path.display());
    Ok(())
}

/// Rebuild the model stored at `path` on `device`, in Mode::Inference.
pub fn load<B: Backend>(path: impl AsRef<Path>, device: &B::Device) -> PipelineResult<Model<B>> {
    let path = path.as_ref();
    let corrupt = |reason: String| PipelineError::corrupt_artifact(path, reason);

    let file = fs::File::open(path).map_err(|e| persistence(path, e))?;
    let mut bytes = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut bytes)
        .map_err(|e| corrupt(format!("not a gzip stream: {e}")))?;

    let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
    let record: ArtifactRecord<B> = Recorder::<B>::load(&recorder, bytes, device)
        .map_err(|e| corrupt(format!("cannot decode model record: {e:?}")))?;

    if record.format_version != FORMAT_VERSION {
        return Err(corrupt(format!(
            "format version {} is not supported (expected {FORMAT_VERSION})",
            record.format_version
        )));
    }

    let architecture: Architecture = serde_json::from_str(&record.architecture)
        .map_err(|e| corrupt(format!("cannot parse architecture: {e}")))?;
    let fresh = Model::<B>::build(architecture, device)
        .map_err(|e| corrupt(format!("stored architecture is invalid: {e}")))?;

    let expected = fresh.network().param_shapes();
    let stored = ParamShapes::of_record(&record.network);
    if stored != expected {
        return Err(corrupt(format!(
            "parameters do not match the stored architecture: {} conv / {} dense layers \
             stored, {} / {} expected",
            stored.convs.len(),
            stored.denses.len(),
            expected.convs.len(),
            expected.denses.len()
        )));
    }
    let model = fresh.map_network(|network| network.load_record(record.network));

    tracing::debug!("Loaded {} parameters from '{}'", model.num_params(), path.display());
    Ok(model.with_mode(Mode::Inference))
}

// ─── ArtifactStore ────────────────────────────────────────────────────────────
/// Directory holding model artifacts, the run config, and metrics.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Use `dir`, creating it (like `mkdir -p`) if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create artifact directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Use an existing `dir` without touching the file system.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self, kind: ModelKind) -> PathBuf {
        self.dir.join(format!("{}.mpk.gz", kind.name()))
    }

    pub fn save_model<B: Backend>(&self, kind: ModelKind, model: &Model<B>) -> PipelineResult<PathBuf> {
        let path = self.model_path(kind);
        save(model, &path)?;
        tracing::info!("Saved {} model to '{}'", kind.name(), path.display());
        Ok(path)
    }

    pub fn load_model<B: Backend>(&self, kind: ModelKind, device: &B::Device) -> PipelineResult<Model<B>> {
        let path = self.model_path(kind);
        tracing::info!("Loading {} model from '{}'", kind.name(), path.display());
        load(path, device)
    }

    pub fn config_path(&self, kind: ModelKind) -> PathBuf {
        self.dir.join(format!("train_config_{}.json", kind.name()))
    }

    /// Save the training configuration next to the model it produced.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<PathBuf> {
        let path = self.config_path(cfg.model);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(path)
    }
}
