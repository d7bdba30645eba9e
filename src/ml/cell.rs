// ============================================================
// Layer 5 — RWA Cell Recurrence
// ============================================================
// One step of the Recurrent Weighted Average cell:
//
//   xh    = [x_t, h]
//   u     = x_t·W_u + b_u          (update value, features only)
//   g     = xh·W_g + b_g           (gate)
//   a     = xh·W_a                 (attention score, no bias)
//   z     = u ⊙ tanh(g)            (candidate contribution)
//
// The hidden state is the activation of a softmax-weighted
// average of every z seen so far, weighted by exp(a). Kept as
// a running numerator / denominator, rescaled by the running
// maximum score so no exponential ever exceeds 1:
//
//   a_new = max(a_max, a)
//   n     = n·exp(a_max - a_new) + z·exp(a - a_new)
//   d     = d·exp(a_max - a_new) +   exp(a - a_new)
//   h     = activation(n / d)
//
// d is always ≥ 1 after the first step (the term for the
// current maximum contributes exp(0)), so n / d is safe.
//
// Reference: Ostmeyer & Cowell (2017) Machine Learning on
//            Sequential Data Using a Recurrent Weighted Average

use burn::{prelude::*, tensor::activation};

use crate::ml::model::RwaModel;

/// Starting value of the running maximum: lower than any real score.
pub const MAX_SCORE_SENTINEL: f32 = -1e38;

/// Recurrent state carried from one step to the next, each [batch, cells].
#[derive(Clone, Debug)]
pub struct RwaState<B: Backend> {
    pub numerator:   Tensor<B, 2>,
    pub denominator: Tensor<B, 2>,
    pub hidden:      Tensor<B, 2>,
    pub max_score:   Tensor<B, 2>,
}

/// Fold one step's candidates `z` with scores `a` into the running
/// weighted average. Returns `(numerator, denominator, max_score)`.
pub fn running_average_update<B: Backend>(
    numerator:   Tensor<B, 2>,
    denominator: Tensor<B, 2>,
    max_score:   Tensor<B, 2>,
    z:           Tensor<B, 2>,
    a:           Tensor<B, 2>,
) -> (Tensor<B, 2>, Tensor<B, 2>, Tensor<B, 2>) {
    let raised    = a.clone().greater(max_score.clone());
    let new_max   = max_score.clone().mask_where(raised, a.clone());
    let exp_diff  = (max_score - new_max.clone()).exp();
    let exp_scale = (a - new_max.clone()).exp();

    let numerator   = numerator * exp_diff.clone() + z * exp_scale.clone();
    let denominator = denominator * exp_diff + exp_scale;
    (numerator, denominator, new_max)
}

/// Per-example cross-entropy of one step: −Σ_c y_c · log_softmax(logits)_c.
pub fn cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let [n, _] = logits.dims();
    (targets * activation::log_softmax(logits, 1))
        .sum_dim(1)
        .reshape([n])
        .neg()
}

impl<B: Backend> RwaModel<B> {
    /// State before the first step: zero accumulators, sentinel maximum,
    /// and the trainable initial hidden state broadcast over the batch.
    pub fn initial_state(&self, batch_size: usize, device: &B::Device) -> RwaState<B> {
        let shape  = [batch_size, self.num_cells()];
        let hidden = Tensor::zeros(shape, device)
            + self.activation.0.apply(self.s.val()).unsqueeze::<2>();

        RwaState {
            numerator:   Tensor::zeros(shape, device),
            denominator: Tensor::zeros(shape, device),
            hidden,
            max_score:   Tensor::full(shape, MAX_SCORE_SENTINEL, device),
        }
    }

    /// Advance the cell by one time step. `x` is [batch, num_features].
    pub fn step(&self, x: Tensor<B, 2>, state: RwaState<B>) -> RwaState<B> {
        let xh = Tensor::cat(vec![x.clone(), state.hidden], 1);

        let u = x.matmul(self.w_u.val()) + self.b_u.val().unsqueeze::<2>();
        let g = xh.clone().matmul(self.w_g.val()) + self.b_g.val().unsqueeze::<2>();
        let a = xh.matmul(self.w_a.val());
        let z = u * activation::tanh(g);

        let (numerator, denominator, max_score) = running_average_update(
            state.numerator,
            state.denominator,
            state.max_score,
            z,
            a,
        );
        let hidden = self.activation.0.apply(numerator.clone() / denominator.clone());

        RwaState { numerator, denominator, hidden, max_score }
    }
}
