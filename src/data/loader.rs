// ============================================================
// Layer 4 — MNIST Loader
// ============================================================
// Loads the four MNIST IDX files from a local cache directory:
//
//   train-images-idx3-ubyte   60,000 images
//   train-labels-idx1-ubyte   60,000 labels
//   t10k-images-idx3-ubyte    10,000 images
//   t10k-labels-idx1-ubyte    10,000 labels
//
// Each file may be stored raw or gzip-compressed (".gz").
// When a file is missing and downloading is enabled, the gzip
// is fetched from the CVDF mirror into the cache first; later
// calls find it on disk and never touch the network again.
//
// IDX format (all integers big-endian):
//   u32 magic   2049 = labels (1 dim), 2051 = images (3 dims)
//   u32 × dims  sizes of each dimension
//   u8 × ...    payload, row-major
//
// Reference: Rust Book §9 (Error Handling)
//            byteorder / flate2 crate documentation

use std::{
    fs,
    io::{Cursor, Read},
    path::{Path, PathBuf},
};

use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::GzDecoder;

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::image::{DatasetPartition, ImageSample, IMAGE_SIDE};
use crate::domain::traits::DatasetSource;

// CVDF mirror of http://yann.lecun.com/exdb/mnist/
const MIRROR_URL: &str = "https://storage.googleapis.com/cvdf-datasets/mnist/";

const LABELS_MAGIC: u32 = 2049;
const IMAGES_MAGIC: u32 = 2051;

pub const TRAIN_SIZE: usize = 60_000;
pub const TEST_SIZE: usize = 10_000;

/// Which half of the dataset a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn images_file(&self) -> &'static str {
        match self {
            Split::Train => "train-images-idx3-ubyte",
            Split::Test => "t10k-images-idx3-ubyte",
        }
    }

    fn labels_file(&self) -> &'static str {
        match self {
            Split::Train => "train-labels-idx1-ubyte",
            Split::Test => "t10k-labels-idx1-ubyte",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

/// Loads MNIST from IDX files in `cache_dir`.
/// Implements the DatasetSource trait from Layer 3.
#[derive(Debug, Clone)]
pub struct MnistLoader {
    cache_dir: PathBuf,
    download:  bool,
    /// (train, test) sample counts to enforce, None to accept any size
    expected:  Option<(usize, usize)>,
}

impl MnistLoader {
    /// Create a loader for the canonical dataset in `cache_dir`.
    /// Downloading on cache miss is enabled by default.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            download:  true,
            expected:  Some((TRAIN_SIZE, TEST_SIZE)),
        }
    }

    pub fn with_download(mut self, download: bool) -> Self {
        self.download = download;
        self
    }

    #[cfg(test)]
    pub fn with_expected_sizes(mut self, expected: Option<(usize, usize)>) -> Self {
        self.expected = expected;
        self
    }

    /// Load one split as a DatasetPartition.
    pub fn load_split(&self, split: Split) -> PipelineResult<DatasetPartition> {
        let images_path = self.ensure_file(split.images_file())?;
        let labels_path = self.ensure_file(split.labels_file())?;

        let images = read_idx(&images_path)?;
        let labels = read_idx(&labels_path)?;

        let location = images_path.display().to_string();
        if images.magic != IMAGES_MAGIC {
            return Err(PipelineError::data_unavailable(
                location,
                format!("expected image magic {IMAGES_MAGIC}, found {}", images.magic),
            ));
        }
        if labels.magic != LABELS_MAGIC {
            return Err(PipelineError::data_unavailable(
                labels_path.display().to_string(),
                format!("expected label magic {LABELS_MAGIC}, found {}", labels.magic),
            ));
        }

        let (count, rows, cols) = (images.dims[0], images.dims[1], images.dims[2]);
        if rows != IMAGE_SIDE || cols != IMAGE_SIDE {
            return Err(PipelineError::data_unavailable(
                location,
                format!("expected {IMAGE_SIDE}x{IMAGE_SIDE} images, found {rows}x{cols}"),
            ));
        }
        if labels.dims[0] != count {
            return Err(PipelineError::data_unavailable(
                location,
                format!("{count} images but {} labels", labels.dims[0]),
            ));
        }
        if let Some(expected) = self.expected_size(split) {
            if count != expected {
                return Err(PipelineError::data_unavailable(
                    location,
                    format!("expected {expected} samples in the {} split, found {count}", split.name()),
                ));
            }
        }

        let samples = images
            .data
            .chunks_exact(rows * cols)
            .map(|chunk| ImageSample::new(rows, cols, chunk.to_vec()))
            .collect::<PipelineResult<Vec<_>>>()?;

        let partition = DatasetPartition::new(split.name(), samples, labels.data)
            .map_err(|e| PipelineError::data_unavailable(labels_path.display().to_string(), e))?;

        tracing::info!("Loaded {} split: {} samples", split.name(), partition.len());
        Ok(partition)
    }

    fn expected_size(&self, split: Split) -> Option<usize> {
        self.expected.map(|(train, test)| match split {
            Split::Train => train,
            Split::Test => test,
        })
    }

    /// Path of the cached file (raw preferred over .gz),
    /// downloading the .gz first if neither exists.
    fn ensure_file(&self, name: &str) -> PipelineResult<PathBuf> {
        let raw = self.cache_dir.join(name);
        if raw.is_file() {
            return Ok(raw);
        }
        let gz = self.cache_dir.join(format!("{name}.gz"));
        if gz.is_file() {
            return Ok(gz);
        }

        if !self.download {
            return Err(PipelineError::data_unavailable(
                raw.display().to_string(),
                "file not found in cache and downloading is disabled",
            ));
        }

        self.download_file(name, &gz)?;
        Ok(gz)
    }

    fn download_file(&self, name: &str, dest: &Path) -> PipelineResult<()> {
        let url = format!("{MIRROR_URL}{name}.gz");
        tracing::info!("Downloading {url}");

        let bytes = reqwest::blocking::get(&url)
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes())
            .map_err(|e| PipelineError::data_unavailable(&url, e))?;

        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| PipelineError::data_unavailable(self.cache_dir.display().to_string(), e))?;
        fs::write(dest, &bytes)
            .map_err(|e| PipelineError::data_unavailable(dest.display().to_string(), e))?;

        tracing::debug!("Cached {} bytes at '{}'", bytes.len(), dest.display());
        Ok(())
    }
}

impl DatasetSource for MnistLoader {
    fn load(&self) -> PipelineResult<(DatasetPartition, DatasetPartition)> {
        let train = self.load_split(Split::Train)?;
        let test  = self.load_split(Split::Test)?;
        Ok((train, test))
    }

    fn load_test(&self) -> PipelineResult<DatasetPartition> {
        self.load_split(Split::Test)
    }
}

// ─── IDX parsing ──────────────────────────────────────────────────────────────
#[derive(Debug)]
struct IdxFile {
    magic: u32,
    dims:  Vec<usize>,
    data:  Vec<u8>,
}

/// Read an IDX file from disk, transparently gunzipping it.
fn read_idx(path: &Path) -> PipelineResult<IdxFile> {
    let location = path.display().to_string();
    let bytes = fs::read(path).map_err(|e| PipelineError::data_unavailable(&location, e))?;

    // gzip streams start with 0x1f 0x8b
    let bytes = if bytes.starts_with(&[0x1f, 0x8b]) {
        let mut decoded = Vec::new();
        GzDecoder::new(&bytes[..])
            .read_to_end(&mut decoded)
            .map_err(|e| PipelineError::data_unavailable(&location, e))?;
        decoded
    } else {
        bytes
    };

    parse_idx(&bytes).map_err(|reason| PipelineError::data_unavailable(location, reason))
}

fn parse_idx(bytes: &[u8]) -> Result<IdxFile, String> {
    let mut r = Cursor::new(bytes);
    let header_err = |e: std::io::Error| format!("truncated IDX header: {e}");

    let magic = r.read_u32::<BigEndian>().map_err(header_err)?;
    let num_dims = match magic {
        LABELS_MAGIC => 1,
        IMAGES_MAGIC => 3,
        other => return Err(format!("unknown IDX magic number {other}")),
    };

    let mut dims = Vec::with_capacity(num_dims);
    for _ in 0..num_dims {
        dims.push(r.read_u32::<BigEndian>().map_err(header_err)? as usize);
    }

    let expected: usize = dims.iter().product();
    let mut data = Vec::with_capacity(expected);
    r.read_to_end(&mut data).map_err(|e| e.to_string())?;

    if data.len() != expected {
        return Err(format!(
            "payload holds {} bytes, header announces {expected}",
            data.len()
        ));
    }

    Ok(IdxFile { magic, dims, data })
}
