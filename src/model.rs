use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};

/// Hyper-parameters of the [digit classifier](DigitClassifier).
///
/// The defaults describe the architecture the shipped weights were trained with;
/// other values only exist to produce artifacts that deliberately do not fit.
#[derive(Config, Debug)]
pub struct DigitClassifierConfig {
    #[config(default = 16)]
    pub conv1_channels: usize,
    #[config(default = 32)]
    pub conv2_channels: usize,
    #[config(default = 128)]
    pub hidden_size: usize,
    #[config(default = 10)]
    pub num_classes: usize,
}

/// Two convolution blocks followed by two dense layers.
///
/// ```text
/// [B, 1, 28, 28] -> conv 3x3 (pad 1) -> relu -> max pool 2x2 -> [B, 16, 14, 14]
///                -> conv 3x3 (pad 1) -> relu -> max pool 2x2 -> [B, 32, 7, 7]
///                -> flatten [B, 1568] -> linear -> relu -> [B, 128] -> linear -> [B, 10]
/// ```
#[derive(Module, Debug)]
pub struct DigitClassifier<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub pool: MaxPool2d,
    pub fc1: Linear<B>,
    pub fc2: Linear<B>,
    pub activation: Relu,
}

/// Spatial side length after both pooling layers.
pub const POOLED_SIZE: usize = 7;

impl DigitClassifierConfig {
    /// Returns the initialized classifier with random weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> DigitClassifier<B> {
        let conv = |channels: [usize; 2]| {
            Conv2dConfig::new(channels, [3, 3])
                .with_stride([1, 1])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };

        DigitClassifier {
            conv1: conv([1, self.conv1_channels]),
            conv2: conv([self.conv1_channels, self.conv2_channels]),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1: LinearConfig::new(self.flattened_size(), self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.num_classes).init(device),
            activation: Relu::new(),
        }
    }

    /// Length of the vector entering the first dense layer.
    pub fn flattened_size(&self) -> usize {
        self.conv2_channels * POOLED_SIZE * POOLED_SIZE
    }
}

impl<B: Backend> DigitClassifier<B> {
    /// # Shapes
    ///
    /// - images: `[batch_size, 1, 28, 28]`
    /// - output: `[batch_size, num_classes]`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(images);
        let x = self.activation.forward(x);
        let x = self.pool.forward(x); // [batch_size, 16, 14, 14]

        let x = self.conv2.forward(x);
        let x = self.activation.forward(x);
        let x = self.pool.forward(x); // [batch_size, 32, 7, 7]

        let x: Tensor<B, 2> = x.flatten(1, 3);

        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);

        self.fc2.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn default_architecture_has_1568_flattened_features() {
        assert_eq!(DigitClassifierConfig::new().flattened_size(), 1568);
    }

    #[test]
    fn forward_returns_ten_scores_per_image() {
        let device = Default::default();
        let model = DigitClassifierConfig::new().init::<TestBackend>(&device);

        let output = model.forward(Tensor::zeros([3, 1, 28, 28], &device));

        assert_eq!(output.dims(), [3, 10]);
    }

    #[test]
    fn parameter_shapes_match_architecture() {
        let device = Default::default();
        let model = DigitClassifierConfig::new().init::<TestBackend>(&device);

        assert_eq!(model.conv1.weight.dims(), [16, 1, 3, 3]);
        assert_eq!(model.conv2.weight.dims(), [32, 16, 3, 3]);
        assert_eq!(model.fc1.weight.dims(), [1568, 128]);
        assert_eq!(model.fc2.weight.dims(), [128, 10]);
    }

    #[test]
    fn forward_is_pure() {
        let device = Default::default();
        let model = DigitClassifierConfig::new().init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 4>::ones([1, 1, 28, 28], &device);

        let first = model.forward(input.clone()).into_data();
        let second = model.forward(input).into_data();

        first.assert_eq(&second, true);
    }
}
