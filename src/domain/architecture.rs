// ============================================================
// Layer 3 — Model Architecture Descriptors
// ============================================================
// Describes a model as an ordered list of layer descriptors,
// independent of any tensor library:
//
//   Architecture { input_shape, layers: [LayerSpec, ...] }
//
// LayerSpec is a closed set of layer kinds. Each kind knows how
// it transforms the shape of the data flowing through it, so a
// whole architecture can be checked before any tensor exists.
//
// Shape rules (valid padding, pool stride = pool size):
//   Conv2d     Image(c,h,w)  → Image(filters, h-k+1, w-k+1)
//   MaxPool2d  Image(c,h,w)  → Image(c, h/p, w/p)
//   Flatten    Image(c,h,w)  → Flat(c*h*w)      Flat(n) → Flat(n)
//   Dense      Flat(n)       → Flat(units)
//   Relu       any           → same
//   Dropout    any           → same
//   Softmax    Flat(n)       → Flat(n)
//
// The ML layer (Layer 5) turns a validated Architecture into a
// Burn network; the checkpoint stores it as JSON next to the
// weights so a model can be rebuilt without external config.
//
// Reference: Rust Book §6 (Enums and Pattern Matching)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::image::{IMAGE_PIXELS, IMAGE_SIDE, NUM_CLASSES};

// ─── DataShape ────────────────────────────────────────────────────────────────
/// Shape of one sample (without the batch dimension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataShape {
    /// Channel-first image: (channels, height, width)
    Image { channels: usize, height: usize, width: usize },
    /// Feature vector of the given length
    Flat(usize),
}

impl DataShape {
    /// Total number of scalar values per sample
    pub fn num_elements(&self) -> usize {
        match *self {
            DataShape::Image { channels, height, width } => channels * height * width,
            DataShape::Flat(n) => n,
        }
    }

    fn is_degenerate(&self) -> bool {
        self.num_elements() == 0
    }
}

impl fmt::Display for DataShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataShape::Image { channels, height, width } => {
                write!(f, "({channels}, {height}, {width})")
            }
            DataShape::Flat(n) => write!(f, "({n})"),
        }
    }
}

// ─── InputLayout ──────────────────────────────────────────────────────────────
/// How the preprocessor lays out each image for a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputLayout {
    /// (1, 28, 28) — used by the CNN
    ChannelFirstImage,
    /// (784) — used by the linear model
    FlattenedVector,
}

impl InputLayout {
    pub fn data_shape(&self) -> DataShape {
        match self {
            InputLayout::ChannelFirstImage => DataShape::Image {
                channels: 1,
                height:   IMAGE_SIDE,
                width:    IMAGE_SIDE,
            },
            InputLayout::FlattenedVector => DataShape::Flat(IMAGE_PIXELS),
        }
    }

    /// The layout whose shape equals `shape`, if any.
    pub fn for_shape(shape: DataShape) -> Option<Self> {
        [InputLayout::ChannelFirstImage, InputLayout::FlattenedVector]
            .into_iter()
            .find(|layout| layout.data_shape() == shape)
    }
}

// ─── LayerSpec ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Softmax,
}

/// One layer descriptor with its hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LayerSpec {
    Conv2d { filters: usize, kernel_size: usize },
    Activation(Activation),
    MaxPool2d { pool_size: usize },
    Dropout { rate: f64 },
    Flatten,
    Dense { units: usize },
}

impl LayerSpec {
    /// Shape produced by this layer for the given input shape.
    /// `index` is only used to label the error.
    pub fn output_shape(&self, index: usize, input: DataShape) -> PipelineResult<DataShape> {
        let fail = |reason: String| Err(PipelineError::incompatible_layer(index, reason));

        match (*self, input) {
            (LayerSpec::Conv2d { filters, kernel_size }, DataShape::Image { height, width, .. }) => {
                if filters == 0 || kernel_size == 0 {
                    return fail("conv2d needs non-zero filters and kernel size".into());
                }
                if kernel_size > height || kernel_size > width {
                    return fail(format!(
                        "conv2d kernel {kernel_size}x{kernel_size} does not fit input {input}"
                    ));
                }
                Ok(DataShape::Image {
                    channels: filters,
                    height:   height - kernel_size + 1,
                    width:    width - kernel_size + 1,
                })
            }
            (LayerSpec::MaxPool2d { pool_size }, DataShape::Image { channels, height, width }) => {
                if pool_size == 0 || pool_size > height || pool_size > width {
                    return fail(format!(
                        "max-pool {pool_size}x{pool_size} does not fit input {input}"
                    ));
                }
                Ok(DataShape::Image {
                    channels,
                    height: height / pool_size,
                    width:  width / pool_size,
                })
            }
            (LayerSpec::Conv2d { .. } | LayerSpec::MaxPool2d { .. }, DataShape::Flat(_)) => {
                fail(format!("{self} needs an image input, found {input}"))
            }
            (LayerSpec::Dense { units }, DataShape::Flat(_)) => {
                if units == 0 {
                    return fail("dense needs at least one unit".into());
                }
                Ok(DataShape::Flat(units))
            }
            (LayerSpec::Dense { .. }, DataShape::Image { .. }) => {
                fail(format!("dense needs a flat input, found {input}; add a flatten layer"))
            }
            (LayerSpec::Flatten, shape) => Ok(DataShape::Flat(shape.num_elements())),
            (LayerSpec::Dropout { rate }, shape) => {
                if !(0.0..1.0).contains(&rate) {
                    return fail(format!("dropout rate {rate} is outside [0, 1)"));
                }
                Ok(shape)
            }
            (LayerSpec::Activation(Activation::Relu), shape) => Ok(shape),
            (LayerSpec::Activation(Activation::Softmax), DataShape::Flat(n)) => Ok(DataShape::Flat(n)),
            (LayerSpec::Activation(Activation::Softmax), DataShape::Image { .. }) => {
                fail(format!("softmax needs a flat input, found {input}"))
            }
        }
    }
}

impl fmt::Display for LayerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerSpec::Conv2d { filters, kernel_size } => {
                write!(f, "conv2d({filters}, {kernel_size}x{kernel_size})")
            }
            LayerSpec::Activation(Activation::Relu) => write!(f, "relu"),
            LayerSpec::Activation(Activation::Softmax) => write!(f, "softmax"),
            LayerSpec::MaxPool2d { pool_size } => write!(f, "max-pool({pool_size}x{pool_size})"),
            LayerSpec::Dropout { rate } => write!(f, "dropout({rate})"),
            LayerSpec::Flatten => write!(f, "flatten"),
            LayerSpec::Dense { units } => write!(f, "dense({units})"),
        }
    }
}

// ─── Architecture ─────────────────────────────────────────────────────────────
/// A declared input shape plus an ordered stack of layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub input_shape: DataShape,
    pub layers:      Vec<LayerSpec>,
}

impl Architecture {
    pub fn new(input_shape: DataShape, layers: Vec<LayerSpec>) -> Self {
        Self { input_shape, layers }
    }

    /// conv(64,3x3) → relu → conv(32,3x3) → relu → max-pool(2x2) → dropout(0.25)
    /// → flatten → dense(256) → relu → dropout(0.5) → dense(10) → softmax
    pub fn cnn() -> Self {
        let relu = LayerSpec::Activation(Activation::Relu);
        Self::new(
            InputLayout::ChannelFirstImage.data_shape(),
            vec![
                LayerSpec::Conv2d { filters: 64, kernel_size: 3 },
                relu,
                LayerSpec::Conv2d { filters: 32, kernel_size: 3 },
                relu,
                LayerSpec::MaxPool2d { pool_size: 2 },
                LayerSpec::Dropout { rate: 0.25 },
                LayerSpec::Flatten,
                LayerSpec::Dense { units: 256 },
                relu,
                LayerSpec::Dropout { rate: 0.5 },
                LayerSpec::Dense { units: NUM_CLASSES },
                LayerSpec::Activation(Activation::Softmax),
            ],
        )
    }

    /// dense(10) → softmax on flattened pixels (logistic regression)
    pub fn linear() -> Self {
        Self::new(
            InputLayout::FlattenedVector.data_shape(),
            vec![
                LayerSpec::Dense { units: NUM_CLASSES },
                LayerSpec::Activation(Activation::Softmax),
            ],
        )
    }

    /// Walk the layers and return the output shape of each one.
    ///
    /// Fails with IncompatibleLayer naming the first layer that
    /// cannot accept its input. An empty stack fails at index 0.
    pub fn validate(&self) -> PipelineResult<Vec<DataShape>> {
        if self.layers.is_empty() {
            return Err(PipelineError::incompatible_layer(0, "architecture has no layers"));
        }
        if self.input_shape.is_degenerate() {
            return Err(PipelineError::incompatible_layer(
                0,
                format!("declared input shape {} is empty", self.input_shape),
            ));
        }

        let mut shapes = Vec::with_capacity(self.layers.len());
        let mut current = self.input_shape;
        for (index, layer) in self.layers.iter().enumerate() {
            current = layer.output_shape(index, current)?;
            shapes.push(current);
        }

        if let DataShape::Image { .. } = current {
            return Err(PipelineError::incompatible_layer(
                self.layers.len() - 1,
                format!("final output {current} must be flat class scores"),
            ));
        }

        Ok(shapes)
    }

    /// Width of the final class-score vector (validates first).
    pub fn num_classes(&self) -> PipelineResult<usize> {
        let shapes = self.validate()?;
        // validate() guarantees at least one shape and a flat output
        Ok(shapes.last().map(DataShape::num_elements).unwrap_or_default())
    }

    /// The preprocessing layout matching the declared input, if canonical.
    pub fn input_layout(&self) -> Option<InputLayout> {
        InputLayout::for_shape(self.input_shape)
    }

    /// True when the last layer is a softmax, i.e. the model emits
    /// probabilities rather than raw scores.
    pub fn ends_with_softmax(&self) -> bool {
        matches!(self.layers.last(), Some(LayerSpec::Activation(Activation::Softmax)))
    }

    /// One line per layer, e.g. for logging a model summary
    pub fn summary(&self) -> PipelineResult<String> {
        let shapes = self.validate()?;
        let mut lines = vec![format!("input {}", self.input_shape)];
        for (i, (layer, shape)) in self.layers.iter().zip(shapes).enumerate() {
            lines.push(format!("{i:>2}: {:<20} → {shape}", layer.to_string()));
        }
        Ok(lines.join("\n"))
    }
}

// ─── ModelKind ────────────────────────────────────────────────────────────────
/// The two canonical model variants of the experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    Cnn,
    Linear,
}

impl ModelKind {
    pub fn architecture(&self) -> Architecture {
        match self {
            ModelKind::Cnn => Architecture::cnn(),
            ModelKind::Linear => Architecture::linear(),
        }
    }

    pub fn layout(&self) -> InputLayout {
        match self {
            ModelKind::Cnn => InputLayout::ChannelFirstImage,
            ModelKind::Linear => InputLayout::FlattenedVector,
        }
    }

    /// Epoch count used by the reference experiment
    pub fn default_epochs(&self) -> usize {
        match self {
            ModelKind::Cnn => 10,
            ModelKind::Linear => 50,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Cnn => "cnn",
            ModelKind::Linear => "linear",
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cnn_shapes() {
        let shapes = Architecture::cnn().validate().unwrap();
        assert_eq!(shapes[0], DataShape::Image { channels: 64, height: 26, width: 26 });
        assert_eq!(shapes[2], DataShape::Image { channels: 32, height: 24, width: 24 });
        assert_eq!(shapes[4], DataShape::Image { channels: 32, height: 12, width: 12 });
        assert_eq!(shapes[6], DataShape::Flat(32 * 12 * 12));
        assert_eq!(*shapes.last().unwrap(), DataShape::Flat(10));
    }

    #[test]
    fn test_linear_shapes() {
        let arch = Architecture::linear();
        assert_eq!(arch.validate().unwrap(), vec![DataShape::Flat(10), DataShape::Flat(10)]);
        assert_eq!(arch.num_classes().unwrap(), 10);
        assert_eq!(arch.input_layout(), Some(InputLayout::FlattenedVector));
    }

    #[test]
    fn test_empty_architecture_fails_at_index_zero() {
        let arch = Architecture::new(DataShape::Flat(784), vec![]);
        match arch.validate() {
            Err(PipelineError::IncompatibleLayer { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected IncompatibleLayer, got {other:?}"),
        }
    }

    #[test]
    fn test_first_layer_mismatch_names_index_zero() {
        // CNN layers fed with a flattened vector
        let arch = Architecture::new(DataShape::Flat(784), Architecture::cnn().layers);
        match arch.validate() {
            Err(PipelineError::IncompatibleLayer { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected IncompatibleLayer, got {other:?}"),
        }
    }

    #[test]
    fn test_dense_after_conv_without_flatten_is_rejected() {
        let arch = Architecture::new(
            InputLayout::ChannelFirstImage.data_shape(),
            vec![
                LayerSpec::Conv2d { filters: 4, kernel_size: 3 },
                LayerSpec::Dense { units: 10 },
            ],
        );
        match arch.validate() {
            Err(PipelineError::IncompatibleLayer { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected IncompatibleLayer, got {other:?}"),
        }
    }

    #[test]
    fn test_kernel_larger_than_input_is_rejected() {
        let arch = Architecture::new(
            DataShape::Image { channels: 1, height: 2, width: 2 },
            vec![LayerSpec::Conv2d { filters: 1, kernel_size: 3 }, LayerSpec::Flatten],
        );
        assert!(arch.validate().is_err());
    }

    #[test]
    fn test_image_output_is_rejected() {
        let arch = Architecture::new(
            InputLayout::ChannelFirstImage.data_shape(),
            vec![LayerSpec::Conv2d { filters: 2, kernel_size: 3 }],
        );
        assert!(matches!(
            arch.validate(),
            Err(PipelineError::IncompatibleLayer { index: 0, .. })
        ));
    }

    #[test]
    fn test_dropout_rate_bounds() {
        let ok = LayerSpec::Dropout { rate: 0.0 }.output_shape(0, DataShape::Flat(3));
        let bad = LayerSpec::Dropout { rate: 1.0 }.output_shape(5, DataShape::Flat(3));
        assert_eq!(ok.unwrap(), DataShape::Flat(3));
        assert!(matches!(bad, Err(PipelineError::IncompatibleLayer { index: 5, .. })));
    }

    #[test]
    fn test_architecture_json_roundtrip() {
        let arch = Architecture::cnn();
        let json = serde_json::to_string(&arch).unwrap();
        let back: Architecture = serde_json::from_str(&json).unwrap();
        assert_eq!(arch, back);
    }

    #[test]
    fn test_summary_lists_every_layer() {
        let summary = Architecture::cnn().summary().unwrap();
        assert_eq!(summary.lines().count(), 1 + Architecture::cnn().layers.len());
        assert!(summary.contains("max-pool(2x2)"));
    }
}
