use burn::{
    module::{AutodiffModule, Param},
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::MaxPool2dConfig,
        DropoutConfig, Linear, LinearConfig,
    },
    prelude::*,
    tensor::{activation, backend::AutodiffBackend},
};

use crate::domain::architecture::{Activation, Architecture, DataShape, LayerSpec};
use crate::domain::error::PipelineResult;

/// Whether stochastic layers are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Dropout masks activations (needs an autodiff backend)
    Train,
    /// Dropout is the identity; outputs are deterministic
    Inference,
}

/// Dropout as a standalone step: random masking with survivor rescaling
/// in `Mode::Train`, pass-through in `Mode::Inference`.
pub fn dropout<B: Backend, const D: usize>(x: Tensor<B, D>, rate: f64, mode: Mode) -> Tensor<B, D> {
    match mode {
        Mode::Train => DropoutConfig::new(rate).init().forward(x),
        Mode::Inference => x,
    }
}

/// Categorical cross-entropy between raw class scores and one-hot targets,
/// averaged over the batch. Softmax is folded in as log-softmax.
pub fn cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let log_probs = activation::log_softmax(logits, 1);
    (log_probs * targets).sum_dim(1).mean().neg()
}

// ─── Network ──────────────────────────────────────────────────────────────────
// Learnable parameters only, in layer order per kind. The order in
// which they are consumed comes from the Architecture that built them.
#[derive(Module, Debug)]
pub struct Network<B: Backend> {
    pub convs:  Vec<Conv2d<B>>,
    pub denses: Vec<Linear<B>>,
}

impl<B: Backend> Network<B> {
    /// Allocate randomly initialized parameters for a validated architecture.
    fn init(architecture: &Architecture, device: &B::Device) -> Self {
        let mut convs  = Vec::new();
        let mut denses = Vec::new();
        let mut shape  = architecture.input_shape;

        for (index, layer) in architecture.layers.iter().enumerate() {
            match (*layer, shape) {
                (LayerSpec::Conv2d { filters, kernel_size }, DataShape::Image { channels, .. }) => {
                    convs.push(
                        Conv2dConfig::new([channels, filters], [kernel_size, kernel_size]).init(device),
                    );
                }
                (LayerSpec::Dense { units }, DataShape::Flat(features)) => {
                    denses.push(LinearConfig::new(features, units).init(device));
                }
                _ => {}
            }
            if let Ok(next) = layer.output_shape(index, shape) {
                shape = next;
            }
        }

        Self { convs, denses }
    }

    /// Dimensions of every parameter tensor, grouped per layer.
    pub fn param_shapes(&self) -> ParamShapes {
        ParamShapes {
            convs:  self.convs.iter().map(|c| LayerShapes::of(&c.weight, &c.bias)).collect(),
            denses: self.denses.iter().map(|d| LayerShapes::of(&d.weight, &d.bias)).collect(),
        }
    }
}

/// Weight and optional bias dimensions of one parameterized layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerShapes {
    pub weight: Vec<usize>,
    pub bias:   Option<Vec<usize>>,
}

impl LayerShapes {
    fn of<B: Backend, const D: usize>(weight: &Param<Tensor<B, D>>, bias: &Option<Param<Tensor<B, 1>>>) -> Self {
        Self {
            weight: weight.val().dims().to_vec(),
            bias:   bias.as_ref().map(|b| b.val().dims().to_vec()),
        }
    }
}

/// Parameter layout of a Network or of a NetworkRecord. Two layouts
/// compare equal only when a record can be loaded into the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamShapes {
    pub convs:  Vec<LayerShapes>,
    pub denses: Vec<LayerShapes>,
}

impl ParamShapes {
    pub fn of_record<B: Backend>(record: &NetworkRecord<B>) -> Self {
        Self {
            convs:  record.convs.iter().map(|c| LayerShapes::of(&c.weight, &c.bias)).collect(),
            denses: record.denses.iter().map(|d| LayerShapes::of(&d.weight, &d.bias)).collect(),
        }
    }
}

/// Tensor flowing between layers: rank changes at Flatten.
enum Activations<B: Backend> {
    Image(Tensor<B, 4>),
    Flat(Tensor<B, 2>),
}

// ─── Model ────────────────────────────────────────────────────────────────────
/// A trainable classifier: architecture, parameters, and mode.
#[derive(Debug, Clone)]
pub struct Model<B: Backend> {
    architecture: Architecture,
    network:      Network<B>,
    mode:         Mode,
    device:       B::Device,
}

impl<B: Backend> Model<B> {
    /// Validate `architecture` and allocate fresh parameters on `device`.
    /// The model starts in Mode::Train.
    pub fn build(architecture: Architecture, device: &B::Device) -> PipelineResult<Self> {
        architecture.validate()?;
        let network = Network::init(&architecture, device);

        tracing::debug!(
            "Built model with {} layers, {} parameters",
            architecture.layers.len(),
            network.num_params()
        );

        Ok(Self { architecture, network, mode: Mode::Train, device: device.clone() })
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    pub fn network(&self) -> &Network<B> {
        &self.network
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    #[cfg(test)]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn num_params(&self) -> usize {
        self.network.num_params()
    }

    /// Width of the class-score output
    pub fn num_classes(&self) -> usize {
        self.architecture.num_classes().unwrap_or_default()
    }

    /// Swap the parameters through `update`, e.g. one optimizer step.
    pub(crate) fn map_network(self, update: impl FnOnce(Network<B>) -> Network<B>) -> Self {
        let Self { architecture, network, mode, device } = self;
        Self { architecture, network: update(network), mode, device }
    }

    /// Full forward pass in the model's current mode.
    /// `images`: [batch, features] → [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        self.run(images, self.mode, true)
    }

    /// Forward pass that stops before a trailing softmax, returning the
    /// raw class scores the loss is computed from.
    pub fn forward_logits(&self, images: Tensor<B, 2>, mode: Mode) -> Tensor<B, 2> {
        self.run(images, mode, false)
    }

    /// Class probabilities (or scores) with dropout disabled.
    pub fn infer(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        self.run(images, Mode::Inference, true)
    }

    fn run(&self, images: Tensor<B, 2>, mode: Mode, final_softmax: bool) -> Tensor<B, 2> {
        let [batch, _] = images.dims();
        let mut x = match self.architecture.input_shape {
            DataShape::Image { channels, height, width } => {
                Activations::Image(images.reshape([batch, channels, height, width]))
            }
            DataShape::Flat(_) => Activations::Flat(images),
        };

        let layers = &self.architecture.layers;
        let depth = if !final_softmax && self.architecture.ends_with_softmax() {
            layers.len() - 1
        } else {
            layers.len()
        };

        let mut convs  = self.network.convs.iter();
        let mut denses = self.network.denses.iter();

        for layer in &layers[..depth] {
            x = match (*layer, x) {
                (LayerSpec::Conv2d { .. }, Activations::Image(t)) => {
                    let conv = convs.next().expect("validated: one conv per conv2d layer");
                    Activations::Image(conv.forward(t))
                }
                (LayerSpec::Dense { .. }, Activations::Flat(t)) => {
                    let dense = denses.next().expect("validated: one linear per dense layer");
                    Activations::Flat(dense.forward(t))
                }
                (LayerSpec::MaxPool2d { pool_size }, Activations::Image(t)) => {
                    let pool = MaxPool2dConfig::new([pool_size, pool_size])
                        .with_strides([pool_size, pool_size])
                        .init();
                    Activations::Image(pool.forward(t))
                }
                (LayerSpec::Flatten, Activations::Image(t)) => Activations::Flat(t.flatten(1, 3)),
                (LayerSpec::Flatten, flat @ Activations::Flat(_)) => flat,
                (LayerSpec::Dropout { rate }, Activations::Image(t)) => {
                    Activations::Image(dropout(t, rate, mode))
                }
                (LayerSpec::Dropout { rate }, Activations::Flat(t)) => {
                    Activations::Flat(dropout(t, rate, mode))
                }
                (LayerSpec::Activation(Activation::Relu), Activations::Image(t)) => {
                    Activations::Image(activation::relu(t))
                }
                (LayerSpec::Activation(Activation::Relu), Activations::Flat(t)) => {
                    Activations::Flat(activation::relu(t))
                }
                (LayerSpec::Activation(Activation::Softmax), Activations::Flat(t)) => {
                    Activations::Flat(activation::softmax(t, 1))
                }
                (layer, _) => unreachable!("validated architecture cannot route {layer} here"),
            };
        }

        match x {
            Activations::Flat(t) => t,
            Activations::Image(t) => t.flatten(1, 3),
        }
    }
}

impl<B: AutodiffBackend> Model<B> {
    /// Copy of the model on the inner (non-autodiff) backend,
    /// in Mode::Inference. Gradients are not tracked.
    pub fn valid(&self) -> Model<B::InnerBackend> {
        Model {
            architecture: self.architecture.clone(),
            network:      self.network.valid(),
            mode:         Mode::Inference,
            device:       self.device.clone(),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::architecture::InputLayout;
    use crate::domain::error::PipelineError;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;
    type TestAutodiffBackend = Autodiff<NdArray>;

    fn to_vec<B: Backend>(t: Tensor<B, 2>) -> Vec<f32> {
        t.into_data().convert::<f32>().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_cnn_output_shape_and_probabilities() {
        let device = Default::default();
        let model = Model::<TestBackend>::build(Architecture::cnn(), &device).unwrap();

        let input = Tensor::<TestBackend, 2>::ones([3, 784], &device) * 0.5;
        let probs = model.infer(input);

        assert_eq!(probs.dims(), [3, 10]);
        for row in to_vec(probs).chunks(10) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_cnn_parameter_count() {
        let device = Default::default();
        let model = Model::<TestBackend>::build(Architecture::cnn(), &device).unwrap();

        let conv1 = 64 * 9 + 64;
        let conv2 = 32 * 64 * 9 + 32;
        let dense1 = 4608 * 256 + 256;
        let dense2 = 256 * 10 + 10;
        assert_eq!(model.num_params(), conv1 + conv2 + dense1 + dense2);
    }

    #[test]
    fn test_linear_logits_skip_softmax() {
        let device = Default::default();
        let model = Model::<TestBackend>::build(Architecture::linear(), &device).unwrap();
        let input = Tensor::<TestBackend, 2>::ones([2, 784], &device);

        let logits = model.forward_logits(input.clone(), Mode::Inference);
        let probs  = model.infer(input);
        let expected = activation::softmax(logits, 1);

        for (a, b) in to_vec(probs).iter().zip(to_vec(expected)) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_build_rejects_empty_architecture() {
        let device = Default::default();
        let arch = Architecture::new(InputLayout::FlattenedVector.data_shape(), vec![]);
        let err = Model::<TestBackend>::build(arch, &device).unwrap_err();
        assert!(matches!(err, PipelineError::IncompatibleLayer { index: 0, .. }));
    }

    #[test]
    fn test_build_rejects_wrong_input_shape() {
        let device = Default::default();
        let arch = Architecture::new(
            InputLayout::ChannelFirstImage.data_shape(),
            Architecture::linear().layers,
        );
        let err = Model::<TestBackend>::build(arch, &device).unwrap_err();
        assert!(matches!(err, PipelineError::IncompatibleLayer { index: 0, .. }));
    }

    #[test]
    fn test_dropout_is_identity_in_inference() {
        let device = Default::default();
        let x = Tensor::<TestAutodiffBackend, 2>::ones([4, 250], &device);
        let y = dropout(x.clone(), 0.5, Mode::Inference);
        assert_eq!(to_vec(x), to_vec(y));
    }

    #[test]
    fn test_dropout_masks_and_rescales_in_training() {
        let device = Default::default();
        let x = Tensor::<TestAutodiffBackend, 2>::ones([4, 250], &device);
        let y = to_vec(dropout(x, 0.5, Mode::Train));

        let zeros = y.iter().filter(|&&v| v == 0.0).count();
        assert!(zeros > 300 && zeros < 700, "zeroed {zeros} of 1000");
        assert!(y.iter().all(|&v| v == 0.0 || (v - 2.0).abs() < 1e-6));
    }

    #[test]
    fn test_inference_forward_is_deterministic() {
        let device = Default::default();
        let model = Model::<TestAutodiffBackend>::build(Architecture::cnn(), &device).unwrap();
        let input = Tensor::<TestAutodiffBackend, 2>::ones([2, 784], &device);

        let a = to_vec(model.infer(input.clone()));
        let b = to_vec(model.infer(input));
        assert_eq!(a, b);
    }

    #[test]
    fn test_valid_switches_to_inference_mode() {
        let device = Default::default();
        let model = Model::<TestAutodiffBackend>::build(Architecture::linear(), &device).unwrap();
        assert_eq!(model.mode(), Mode::Train);
        assert_eq!(model.valid().mode(), Mode::Inference);
    }

    #[test]
    fn test_cross_entropy_of_confident_correct_prediction_is_small() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats([[10.0, 0.0, 0.0], [0.0, 0.0, 10.0]], &device);
        let targets = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]], &device);
        let loss: f32 = cross_entropy(logits, targets).into_scalar().elem();
        assert!(loss < 1e-3);

        // Uniform scores give ln(3)
        let logits = Tensor::<TestBackend, 2>::zeros([1, 3], &device);
        let targets = Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0, 0.0]], &device);
        let loss: f32 = cross_entropy(logits, targets).into_scalar().elem();
        assert!((loss - 3f32.ln()).abs() < 1e-5);
    }
}
