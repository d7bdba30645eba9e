// ============================================================
// Layer 5 — Training Loop
// ============================================================
// INIT → (train step → [every eval_every: eval step])* → SAVE
//
//   - every iteration draws one train batch, runs forward +
//     backward + Adam update and reports the cost in bits
//   - every eval_every-th iteration (0 included) draws one test
//     batch and runs a forward pass on model.valid()
//     (inner backend, no gradients, parameters untouched)
//   - after the fixed number of iterations the parameters are
//     written to the checkpoint directory
//
// There is no early stopping and no learning-rate schedule.
// One step fully completes, update included, before the next.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::RwaBatcher;
use crate::domain::{batch::SequenceBatch, traits::BatchSource};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{IterationMetrics, MetricsLogger},
};
use crate::ml::{
    evaluator::Evaluator,
    model::{to_bits, RwaModel},
    TrainBackend,
};

/// Keeps batch sampling independent of the parameter initialization stream.
const BATCH_SEED_OFFSET: u64 = 0x5eed;

/// Owns the parameters and optimizer state of one training run.
pub struct Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<RwaModel<B>, B>,
{
    model:         RwaModel<B>,
    optim:         O,
    learning_rate: f64,
    device:        B::Device,
    batcher:       RwaBatcher<B>,
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<RwaModel<B>, B>,
{
    pub fn new(model: RwaModel<B>, optim: O, learning_rate: f64, device: B::Device) -> Self {
        let batcher = RwaBatcher::new(device.clone());
        Self { model, optim, learning_rate, device, batcher }
    }

    /// One forward + backward + update pass. Returns the batch cost in nats,
    /// as computed before the update.
    pub fn train_step(&mut self, batch: &SequenceBatch) -> Result<f64> {
        let output = self.model.forward(&self.batcher.batch(batch));
        let cost: f64 = output.cost.clone().into_scalar().elem::<f64>();
        if !cost.is_finite() {
            bail!("training cost is not finite ({cost})");
        }

        // Backward pass + Adam update
        let grads = output.cost.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.learning_rate, self.model.clone(), grads);
        Ok(cost)
    }

    /// Forward-only pass on the inner backend; returns the cost in bits.
    pub fn eval_step(&self, batch: &SequenceBatch) -> Result<f64> {
        Evaluator::<B::InnerBackend>::new(self.model.valid(), self.device.clone()).cost_bits(batch)
    }

    pub fn model(&self) -> &RwaModel<B> {
        &self.model
    }

    pub fn into_model(self) -> RwaModel<B> {
        self.model
    }
}

/// What a finished run hands back besides the checkpoint on disk.
pub struct TrainOutcome<B: AutodiffBackend> {
    pub model:           RwaModel<B>,
    pub last_train_bits: f64,
    pub last_test_bits:  Option<f64>,
}

pub fn run_training(
    cfg:     &TrainConfig,
    train:   &dyn BatchSource,
    test:    &dyn BatchSource,
    ckpt:    &CheckpointManager,
    metrics: &mut MetricsLogger,
) -> Result<()> {
    let device = <TrainBackend as Backend>::Device::default();
    tracing::info!("Using device: {:?}", device);
    let outcome = train_loop::<TrainBackend>(cfg, train, test, ckpt, metrics, device)?;
    tracing::info!(
        "Final costs: train {:.4} bits, test {} ({} cells); metrics in '{}'",
        outcome.last_train_bits,
        outcome.last_test_bits.map_or("n/a".to_string(), |b| format!("{b:.4} bits")),
        outcome.model.num_cells(),
        metrics.csv_path().display(),
    );
    Ok(())
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:     &TrainConfig,
    train:   &dyn BatchSource,
    test:    &dyn BatchSource,
    ckpt:    &CheckpointManager,
    metrics: &mut MetricsLogger,
    device:  B::Device,
) -> Result<TrainOutcome<B>> {
    cfg.validate()?;
    check_compatible(train, test)?;

    // ── INIT ──────────────────────────────────────────────────────────────────
    let model_cfg = cfg.model_config(train.num_features(), train.num_classes());
    let model: RwaModel<B> = model_cfg.init(&device, cfg.seed)?;
    tracing::info!(
        "Model ready: {} features → {} cells → {} classes over {} steps",
        train.num_features(), cfg.num_cells, train.num_classes(), train.max_steps(),
    );

    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let optim = AdamConfig::new()
        .with_epsilon(1e-8)
        .init::<B, RwaModel<B>>();
    let mut trainer = Trainer::new(model, optim, cfg.learning_rate, device);
    let mut rng     = StdRng::seed_from_u64(cfg.seed.wrapping_add(BATCH_SEED_OFFSET));

    let mut last_train_bits = f64::NAN;
    let mut last_test_bits  = None;

    // ── Iterations ────────────────────────────────────────────────────────────
    for iteration in 0..cfg.num_iterations {
        let batch = train.batch(cfg.batch_size, &mut rng)?;
        last_train_bits = to_bits(trainer.train_step(&batch)?);
        report(metrics, iteration, train.name(), last_train_bits)?;

        if iteration % cfg.eval_every == 0 {
            let batch = test.batch(cfg.batch_size, &mut rng)?;
            let bits  = trainer.eval_step(&batch)?;
            report(metrics, iteration, test.name(), bits)?;
            last_test_bits = Some(bits);
        }
    }

    // ── SAVE ──────────────────────────────────────────────────────────────────
    ckpt.save_model(trainer.model())?;
    tracing::info!("Training complete after {} iterations", cfg.num_iterations);

    Ok(TrainOutcome {
        model: trainer.into_model(),
        last_train_bits,
        last_test_bits,
    })
}

/// The console line printed for every reported cost.
fn report_line(iteration: usize, dataset: &str, bits: f64) -> String {
    format!("Iteration: {} Dataset: {} Cost: {}", iteration, dataset, bits)
}

fn report(metrics: &mut MetricsLogger, iteration: usize, dataset: &str, bits: f64) -> Result<()> {
    println!("{}", report_line(iteration, dataset, bits));
    metrics.log(&IterationMetrics::new(iteration, dataset, bits))
}

/// Both splits must describe the same problem or the model cannot be
/// shared between them.
fn check_compatible(train: &dyn BatchSource, test: &dyn BatchSource) -> Result<()> {
    let dims = |s: &dyn BatchSource| (s.num_features(), s.max_steps(), s.num_classes());
    if dims(train) != dims(test) {
        bail!(
            "train split is (features, steps, classes) = {:?} but test split is {:?}",
            dims(train), dims(test),
        );
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use rand::RngCore;

    use crate::data::copy_problem::CopyProblemConfig;
    use crate::domain::batch::SequenceExample;
    use crate::ml::{cell::cross_entropy, model::RwaConfig};

    type Inner = NdArray;
    type AD    = Autodiff<NdArray>;

    /// Always returns the same batch; lets tests pin exact inputs.
    struct FixedSource {
        name:  &'static str,
        batch: SequenceBatch,
    }

    impl BatchSource for FixedSource {
        fn name(&self) -> &str { self.name }
        fn num_features(&self) -> usize { self.batch.num_features }
        fn max_steps(&self) -> usize { self.batch.max_steps }
        fn num_classes(&self) -> usize { self.batch.num_classes }
        fn num_examples(&self) -> usize { self.batch.batch_size }
        fn batch(&self, size: usize, _rng: &mut dyn RngCore) -> Result<SequenceBatch> {
            assert_eq!(size, self.batch.batch_size);
            Ok(self.batch.clone())
        }
    }

    fn two_example_batch(first_tail: f32) -> SequenceBatch {
        let examples = vec![
            SequenceExample::new(vec![0.4, first_tail, -first_tail], vec![1, 0, 1], 1),
            SequenceExample::new(vec![-0.2, 0.7, 0.1], vec![0, 1, 1], 3),
        ];
        SequenceBatch::from_examples(&examples, 3, 1, 2).unwrap()
    }

    fn adam_trainer(model: RwaModel<AD>, lr: f64) -> Trainer<AD, impl Optimizer<RwaModel<AD>, AD>> {
        let optim = AdamConfig::new().with_epsilon(1e-8).init::<AD, RwaModel<AD>>();
        Trainer::new(model, optim, lr, Default::default())
    }

    /// Cost built by hand from the steps that should count:
    /// step 0 of example 0 and steps 0..3 of example 1.
    fn expected_cost(model: &RwaModel<Inner>, batch: &SequenceBatch) -> f64 {
        let device  = Default::default();
        let tensors = RwaBatcher::<Inner>::new(device).batch(batch);
        let mut state = model.initial_state(2, &device);
        let mut per_step = Vec::new();
        for i in 0..3 {
            let x = tensors.features.clone().slice([0..2, i..i + 1, 0..1]).reshape([2, 1]);
            let y = tensors.labels.clone().slice([0..2, i..i + 1, 0..2]).reshape([2, 2]);
            state = model.step(x, state);
            let ce = cross_entropy(model.output(state.hidden.clone()), y);
            per_step.push(ce.into_data().to_vec::<f32>().unwrap());
        }
        let first  = per_step[0][0] as f64;
        let second = (per_step[0][1] + per_step[1][1] + per_step[2][1]) as f64 / 3.0;
        (first + second) / 2.0
    }

    #[test]
    fn test_one_step_cost_uses_only_valid_steps() {
        let device = Default::default();
        let cfg    = RwaConfig::new(1, 4, 2);
        let model: RwaModel<AD> = cfg.init(&device, 5).unwrap();
        let before = model.valid();
        let batch  = two_example_batch(0.9);

        let mut trainer = adam_trainer(model, 1e-3);
        let cost = trainer.train_step(&batch).unwrap();
        assert!(cost.is_finite());
        assert!((cost - expected_cost(&before, &batch)).abs() < 1e-5);

        // Padding of the short example does not move the cost
        let mut other = adam_trainer(cfg.init(&device, 5).unwrap(), 1e-3);
        let padded_cost = other.train_step(&two_example_batch(-5.0)).unwrap();
        assert!((cost - padded_cost).abs() < 1e-6);

        // The update changed the parameters
        let after_w = trainer.model().w_o.val().into_data().to_vec::<f32>().unwrap();
        let init_w  = before.w_o.val().into_data().to_vec::<f32>().unwrap();
        assert_ne!(after_w, init_w);
    }

    #[test]
    fn test_eval_step_leaves_parameters_alone() {
        let device  = Default::default();
        let model: RwaModel<AD> = RwaConfig::new(1, 3, 2).init(&device, 1).unwrap();
        let trainer = adam_trainer(model, 1e-3);
        let before  = trainer.model().w_g.val().into_data().to_vec::<f32>().unwrap();
        let bits    = trainer.eval_step(&two_example_batch(0.0)).unwrap();
        assert!(bits.is_finite() && bits > 0.0);
        let after   = trainer.model().w_g.val().into_data().to_vec::<f32>().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_repeated_steps_reduce_cost_on_fixed_batch() {
        let device = Default::default();
        let model: RwaModel<AD> = RwaConfig::new(1, 8, 2).init(&device, 2).unwrap();
        let mut trainer = adam_trainer(model, 0.05);
        let batch = two_example_batch(0.3);

        let first = trainer.train_step(&batch).unwrap();
        let mut last = first;
        for _ in 0..40 {
            last = trainer.train_step(&batch).unwrap();
        }
        assert!(last < first, "cost went from {first} to {last}");
    }

    #[test]
    fn test_train_loop_reports_saves_and_evaluates() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            checkpoint_dir: tmp.path().join("bin").display().to_string(),
            num_cells:      4,
            num_iterations: 5,
            batch_size:     3,
            eval_every:     2,
            copy_problem:   CopyProblemConfig {
                num_symbols:    2,
                pattern_length: 1,
                delay:          2,
                num_train:      10,
                num_test:       5,
                seed:           4,
            },
            ..TrainConfig::default()
        };
        let (train, test) = cfg.copy_problem.build().unwrap();
        let ckpt        = CheckpointManager::new(&cfg.checkpoint_dir);
        let mut metrics = MetricsLogger::create(&cfg.checkpoint_dir).unwrap();

        let outcome = train_loop::<AD>(&cfg, &train, &test, &ckpt, &mut metrics, Default::default())
            .unwrap();
        assert!(outcome.last_train_bits.is_finite());
        assert!(outcome.last_test_bits.is_some());
        assert!(tmp.path().join("bin").join("train.mpk").exists());

        // 5 train rows + evals at iterations 0, 2, 4 + header
        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 1 + 5 + 3);
        assert_eq!(csv.lines().filter(|l| l.contains(",test,")).count(), 3);

        // The saved weights are the trained ones
        let device = Default::default();
        let fresh  = cfg.model_config(train.num_features(), train.num_classes())
            .init::<Inner>(&device, 77)
            .unwrap();
        let loaded = ckpt.load_model(fresh, &device).unwrap();
        assert_eq!(
            loaded.w_a.val().into_data().to_vec::<f32>().unwrap(),
            outcome.model.valid().w_a.val().into_data().to_vec::<f32>().unwrap(),
        );
    }

    #[test]
    fn test_report_line_format() {
        assert_eq!(report_line(0, "train", 3.25), "Iteration: 0 Dataset: train Cost: 3.25");
        assert_eq!(report_line(1200, "test", 0.5), "Iteration: 1200 Dataset: test Cost: 0.5");
    }

    #[test]
    fn test_mismatched_splits_rejected() {
        let tmp   = tempfile::tempdir().unwrap();
        let train = FixedSource { name: "train", batch: two_example_batch(0.0) };
        let wide  = SequenceBatch::from_examples(
            &[SequenceExample::new(vec![0.0; 6], vec![0, 0, 0], 3)], 3, 2, 2,
        ).unwrap();
        let test  = FixedSource { name: "test", batch: wide };
        let cfg   = TrainConfig { batch_size: 2, num_iterations: 1, ..TrainConfig::default() };
        let ckpt  = CheckpointManager::new(tmp.path());
        let mut metrics = MetricsLogger::create(tmp.path()).unwrap();

        let result = train_loop::<AD>(&cfg, &train, &test, &ckpt, &mut metrics, Default::default());
        assert!(result.is_err());
    }
}
