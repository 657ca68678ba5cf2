use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, BiLstm, BiLstmConfig, Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{log_softmax, relu},
};

use crate::ml::ctc_loss::CtcLossConfig;

// Convolutional feature-extractor widths; the last one sets the
// per-column feature depth handed to the recurrent stack.
const CONV_CHANNELS: [usize; 3] = [64, 128, 256];

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct CrnnConfig {
    pub num_classes:  usize,
    pub blank:        usize,
    pub image_height: usize,
    pub image_width:  usize,
    #[config(default = 256)]
    pub lstm_hidden:  usize,
}

impl CrnnConfig {
    /// Output sequence length for this input width: both pooling
    /// stages halve the width, so every 4 pixel columns become one
    /// timestep.
    pub fn time_steps(&self) -> usize {
        self.image_width / 4
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Crnn<B> {
        assert!(
            self.image_height % 4 == 0 && self.image_width % 4 == 0,
            "image dimensions must be divisible by 4 (two 2x2 poolings)"
        );
        assert!(
            self.blank < self.num_classes,
            "blank index {} must be less than num_classes {}",
            self.blank,
            self.num_classes
        );

        let conv1 = Conv2dConfig::new([1, CONV_CHANNELS[0]], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let conv2 = Conv2dConfig::new([CONV_CHANNELS[0], CONV_CHANNELS[1]], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let conv3 = Conv2dConfig::new([CONV_CHANNELS[1], CONV_CHANNELS[2]], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let norm3 = BatchNormConfig::new(CONV_CHANNELS[2]).init(device);
        let pool1 = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let pool2 = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        // After two poolings each image column group carries
        // channels × (height / 4) features.
        let feature_size = CONV_CHANNELS[2] * (self.image_height / 4);
        let rnn = BiLstmConfig::new(feature_size, self.lstm_hidden, true).init(device);
        let head = LinearConfig::new(2 * self.lstm_hidden, self.num_classes).init(device);

        Crnn {
            conv1, conv2, conv3,
            norm3, pool1, pool2,
            rnn, head,
            num_classes: self.num_classes,
            blank:       self.blank,
        }
    }
}

/// Convolutional-recurrent text-line recognizer.
/// Images in, per-timestep class log-probabilities out.
#[derive(Module, Debug)]
pub struct Crnn<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub conv3: Conv2d<B>,
    pub norm3: BatchNorm<B, 2>,
    pub pool1: MaxPool2d,
    pub pool2: MaxPool2d,
    pub rnn:   BiLstm<B>,
    pub head:  Linear<B>,
    pub num_classes: usize,
    pub blank:       usize,
}

impl<B: Backend> Crnn<B> {
    /// images: [batch, 1, height, width] → log-probs: [batch, time, classes]
    /// with a valid distribution over the class axis at every timestep.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 3> {
        let x = self.pool1.forward(relu(self.conv1.forward(images)));
        let x = self.pool2.forward(relu(self.conv2.forward(x)));
        let x = relu(self.norm3.forward(self.conv3.forward(x)));

        // [batch, channels, h', w'] → a width-major feature sequence
        // [batch, w', channels * h']: each pooled pixel column is one
        // timestep for the recurrent stack.
        let [batch_size, channels, height, width] = x.dims();
        let x = x
            .permute([0, 3, 1, 2])
            .reshape([batch_size, width, channels * height]);

        let (x, _state) = self.rnn.forward(x, None);
        let logits = self.head.forward(x); // [batch, time, classes]
        log_softmax(logits, 2)
    }

    /// Forward pass plus CTC loss against the encoded targets.
    /// Every row uses the full output width as its input length —
    /// line images are right-padded to a fixed width upstream.
    ///
    /// Returns (batch-mean loss, log-probs) so callers can decode
    /// the same predictions they scored.
    pub fn forward_loss(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 2, Int>,
        target_lengths: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let log_probs = self.forward(images);
        let [batch_size, time_steps, _] = log_probs.dims();
        let device = log_probs.device();

        let input_lengths =
            Tensor::<B, 1, Int>::full([batch_size], time_steps as i32, &device);

        let ctc = CtcLossConfig::new().with_blank(self.blank).init();
        // CTC wants time-major log-probs: [time, batch, classes]
        let loss = ctc.forward_mean(
            log_probs.clone().swap_dims(0, 1),
            targets,
            input_lengths,
            target_lengths,
        );
        (loss, log_probs)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_forward_shape_and_distribution() {
        let device = NdArrayDevice::Cpu;
        let config = CrnnConfig::new(5, 4, 8, 16).with_lstm_hidden(8);
        let model: Crnn<TestBackend> = config.init(&device);

        let images = Tensor::zeros([2, 1, 8, 16], &device);
        let out = model.forward(images);
        // width 16 → 4 timesteps
        assert_eq!(out.dims(), [2, 4, 5]);

        // log-probs: exp sums to 1 over the class axis
        let sums: Vec<f32> = out.exp().sum_dim(2).into_data().iter::<f32>().collect();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_forward_loss_is_finite() {
        let device = NdArrayDevice::Cpu;
        let config = CrnnConfig::new(5, 4, 8, 16).with_lstm_hidden(8);
        let model: Crnn<TestBackend> = config.init(&device);

        let images = Tensor::zeros([1, 1, 8, 16], &device);
        let targets = Tensor::from_data([[1, 2]], &device);
        let lengths = Tensor::from_ints([2], &device);
        let (loss, log_probs) = model.forward_loss(images, targets, lengths);

        let loss: f32 = loss.into_data().iter::<f32>().next().unwrap();
        assert!(loss.is_finite());
        assert!(loss >= 0.0);
        assert_eq!(log_probs.dims(), [1, 4, 5]);
    }

    #[test]
    fn test_time_steps_follows_width() {
        let config = CrnnConfig::new(10, 9, 32, 128);
        assert_eq!(config.time_steps(), 32);
    }
}
