use anyhow::{bail, Context, Result};
use burn::{
    module::{Ignored, Param},
    prelude::*,
    tensor::{activation, TensorData},
};
use rand::{distributions::Uniform, rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::data::batcher::RwaBatch;
use crate::ml::cell::cross_entropy;

/// Pointwise nonlinearity applied to the running average to form the
/// hidden state (and to the initial-state bias).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Tanh,
    Sigmoid,
    Relu,
    Identity,
}

impl Activation {
    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Tanh     => activation::tanh(x),
            Activation::Sigmoid  => activation::sigmoid(x),
            Activation::Relu     => activation::relu(x),
            Activation::Identity => x,
        }
    }
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct RwaConfig {
    pub num_features: usize,
    pub num_cells:    usize,
    pub num_classes:  usize,
    /// Scales the variance of every random initializer
    #[config(default = 1.0)]
    pub initialization_factor: f64,
    #[config(default = "Activation::Tanh")]
    pub activation: Activation,
}

impl RwaConfig {
    /// Allocate the parameter set. Values come from a `StdRng` seeded with
    /// `seed`, so the same seed yields the same parameters on any backend.
    pub fn init<B: Backend>(&self, device: &B::Device, seed: u64) -> Result<RwaModel<B>> {
        if !(self.initialization_factor > 0.0) {
            bail!("initialization factor must be positive, got {}", self.initialization_factor);
        }
        let (f, c, k) = (self.num_features, self.num_cells, self.num_classes);
        if f == 0 || c == 0 || k == 0 {
            bail!("model dimensions must be non-zero (features={f}, cells={c}, classes={k})");
        }
        let factor  = self.initialization_factor;
        let glorot  = |fan: usize| (6.0 * factor / fan as f64).sqrt();
        let mut rng = StdRng::seed_from_u64(seed);

        let s   = normal(&mut rng, [c], factor.sqrt(), device)?;
        let w_g = uniform(&mut rng, [f + c, c], glorot(f + 2 * c), device);
        let w_u = uniform(&mut rng, [f, c], glorot(f + c), device);
        let w_a = uniform(&mut rng, [f + c, c], glorot(f + 2 * c), device);
        let w_o = uniform(&mut rng, [c, k], glorot(c + k), device);

        Ok(RwaModel {
            s,
            w_g,
            b_g: zeros([c], device),
            w_u,
            b_u: zeros([c], device),
            w_a,
            w_o,
            b_o: zeros([k], device),
            activation: Ignored(self.activation),
        })
    }
}

fn uniform<B: Backend, const D: usize>(
    rng:    &mut StdRng,
    shape:  [usize; D],
    limit:  f64,
    device: &B::Device,
) -> Param<Tensor<B, D>> {
    let dist = Uniform::new_inclusive(-limit as f32, limit as f32);
    let len: usize = shape.iter().product();
    let values: Vec<f32> = (0..len).map(|_| dist.sample(rng)).collect();
    Param::from_tensor(Tensor::from_data(TensorData::new(values, shape), device))
}

fn normal<B: Backend, const D: usize>(
    rng:    &mut StdRng,
    shape:  [usize; D],
    stddev: f64,
    device: &B::Device,
) -> Result<Param<Tensor<B, D>>> {
    let dist = Normal::new(0.0f32, stddev as f32)
        .with_context(|| format!("invalid standard deviation {stddev}"))?;
    let len: usize = shape.iter().product();
    let values: Vec<f32> = (0..len).map(|_| dist.sample(rng)).collect();
    Ok(Param::from_tensor(Tensor::from_data(TensorData::new(values, shape), device)))
}

fn zeros<B: Backend, const D: usize>(shape: [usize; D], device: &B::Device) -> Param<Tensor<B, D>> {
    Param::from_tensor(Tensor::zeros(shape, device))
}

/// The trainable parameters of one RWA cell plus its output projection.
///
/// Field names are the names stored in the checkpoint record.
#[derive(Module, Debug)]
pub struct RwaModel<B: Backend> {
    /// Initial state bias; the hidden state at step 0 is `activation(s)`
    pub s:   Param<Tensor<B, 1>>,
    pub w_g: Param<Tensor<B, 2>>,
    pub b_g: Param<Tensor<B, 1>>,
    pub w_u: Param<Tensor<B, 2>>,
    pub b_u: Param<Tensor<B, 1>>,
    /// Attention weights. No bias: it cancels between numerator and denominator.
    pub w_a: Param<Tensor<B, 2>>,
    pub w_o: Param<Tensor<B, 2>>,
    pub b_o: Param<Tensor<B, 1>>,
    pub activation: Ignored<Activation>,
}

/// Result of unrolling the cell over one batch. Per-step logits are not kept.
pub struct RwaOutput<B: Backend> {
    /// Length-masked summed cross-entropy per example — [batch]
    pub error: Tensor<B, 1>,
    /// mean(error / length) — [1]
    pub cost: Tensor<B, 1>,
}

impl<B: Backend> RwaModel<B> {
    pub fn num_cells(&self) -> usize {
        self.s.val().dims()[0]
    }

    /// h · W_o + b_o
    pub fn output(&self, hidden: Tensor<B, 2>) -> Tensor<B, 2> {
        hidden.matmul(self.w_o.val()) + self.b_o.val().unsqueeze::<2>()
    }

    /// Unroll the cell over every time step of the batch and accumulate the
    /// masked cross-entropy. Steps at or beyond an example's length add
    /// nothing to its error, but the recurrent state keeps running through
    /// them.
    pub fn forward(&self, batch: &RwaBatch<B>) -> RwaOutput<B> {
        let [n, steps, f] = batch.features.dims();
        let k      = batch.labels.dims()[2];
        let device = batch.features.device();

        let mut state = self.initial_state(n, &device);
        let mut error = Tensor::<B, 1>::zeros([n], &device);

        for i in 0..steps {
            let x_t = batch.features.clone().slice([0..n, i..i + 1, 0..f]).reshape([n, f]);
            let y_t = batch.labels.clone().slice([0..n, i..i + 1, 0..k]).reshape([n, k]);

            state = self.step(x_t, state);
            let step_logits = self.output(state.hidden.clone());
            let step_error  = cross_entropy(step_logits, y_t);

            // select, not multiply: masked steps contribute no gradient
            let keep = batch.lengths.clone().greater_elem(i as f32);
            error = error + step_error.zeros_like().mask_where(keep, step_error);
        }

        let cost = (error.clone() / batch.lengths.clone()).mean();
        RwaOutput { error, cost }
    }
}

/// Natural-log cost expressed in bits.
pub fn to_bits(cost_nats: f64) -> f64 {
    cost_nats / std::f64::consts::LN_2
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TB = NdArray;

    fn values<const D: usize>(p: &Param<Tensor<TB, D>>) -> Vec<f32> {
        p.val().into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_parameter_shapes() {
        let model: RwaModel<TB> = RwaConfig::new(3, 5, 4).init(&Default::default(), 0).unwrap();
        assert_eq!(model.s.val().dims(), [5]);
        assert_eq!(model.w_g.val().dims(), [8, 5]);
        assert_eq!(model.w_u.val().dims(), [3, 5]);
        assert_eq!(model.w_a.val().dims(), [8, 5]);
        assert_eq!(model.w_o.val().dims(), [5, 4]);
        assert_eq!(model.b_o.val().dims(), [4]);
        assert_eq!(model.num_cells(), 5);
    }

    #[test]
    fn test_same_seed_same_parameters() {
        let cfg    = RwaConfig::new(2, 6, 3);
        let device = Default::default();
        let a: RwaModel<TB> = cfg.init(&device, 42).unwrap();
        let b: RwaModel<TB> = cfg.init(&device, 42).unwrap();
        let c: RwaModel<TB> = cfg.init(&device, 43).unwrap();
        assert_eq!(values(&a.s), values(&b.s));
        assert_eq!(values(&a.w_g), values(&b.w_g));
        assert_eq!(values(&a.w_u), values(&b.w_u));
        assert_eq!(values(&a.w_a), values(&b.w_a));
        assert_eq!(values(&a.w_o), values(&b.w_o));
        assert_ne!(values(&a.w_g), values(&c.w_g));
    }

    #[test]
    fn test_initializer_ranges() {
        let model: RwaModel<TB> = RwaConfig::new(4, 10, 3).init(&Default::default(), 9).unwrap();
        let limit_g = (6.0f32 / (4.0 + 20.0)).sqrt();
        let limit_u = (6.0f32 / (4.0 + 10.0)).sqrt();
        let limit_o = (6.0f32 / (10.0 + 3.0)).sqrt();
        assert!(values(&model.w_g).iter().all(|v| v.abs() <= limit_g + 1e-6));
        assert!(values(&model.w_a).iter().all(|v| v.abs() <= limit_g + 1e-6));
        assert!(values(&model.w_u).iter().all(|v| v.abs() <= limit_u + 1e-6));
        assert!(values(&model.w_o).iter().all(|v| v.abs() <= limit_o + 1e-6));
        assert!(values(&model.b_g).iter().all(|&v| v == 0.0));
        assert!(values(&model.b_u).iter().all(|&v| v == 0.0));
        assert!(values(&model.b_o).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rejects_bad_config() {
        let device = Default::default();
        let bad_factor = RwaConfig::new(2, 2, 2).with_initialization_factor(0.0);
        assert!(bad_factor.init::<TB>(&device, 0).is_err());
        assert!(RwaConfig::new(0, 2, 2).init::<TB>(&device, 0).is_err());
    }

    #[test]
    fn test_activations() {
        let device = Default::default();
        let x = Tensor::<TB, 1>::from_floats([-1.0, 0.0, 2.0], &device);
        let relu = Activation::Relu.apply(x.clone()).into_data().to_vec::<f32>().unwrap();
        assert_eq!(relu, vec![0.0, 0.0, 2.0]);
        let id = Activation::Identity.apply(x.clone()).into_data().to_vec::<f32>().unwrap();
        assert_eq!(id, vec![-1.0, 0.0, 2.0]);
        let sig = Activation::Sigmoid.apply(x).into_data().to_vec::<f32>().unwrap();
        assert!((sig[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_cost_is_mean_error_per_valid_step() {
        use crate::data::batcher::RwaBatcher;
        use crate::domain::batch::{SequenceBatch, SequenceExample};

        let device = Default::default();
        let model: RwaModel<TB> = RwaConfig::new(1, 4, 2).init(&device, 6).unwrap();
        let examples = vec![
            SequenceExample::new(vec![0.3, -0.1, 0.8], vec![0, 1, 1], 2),
            SequenceExample::new(vec![0.5, 0.2, -0.4], vec![1, 1, 0], 3),
        ];
        let batch  = SequenceBatch::from_examples(&examples, 3, 1, 2).unwrap();
        let output = model.forward(&RwaBatcher::<TB>::new(device).batch(&batch));

        let error = output.error.into_data().to_vec::<f32>().unwrap();
        let cost  = output.cost.into_scalar();
        assert_eq!(error.len(), 2);
        assert!(error.iter().all(|e| e.is_finite() && *e > 0.0));
        assert!((cost - (error[0] / 2.0 + error[1] / 3.0) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_to_bits() {
        assert!((to_bits(std::f64::consts::LN_2) - 1.0).abs() < 1e-12);
        assert!((to_bits(2.0 * std::f64::consts::LN_2) - 2.0).abs() < 1e-12);
    }
}
