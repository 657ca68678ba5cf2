// ============================================================
// Layer 5 — CTC Loss
// ============================================================
// Connectionist Temporal Classification loss between
// per-timestep class log-probabilities and variable-length
// target sequences, marginalized over every frame alignment
// that collapses to the target.
//
// The whole computation is log-space: the forward (alpha)
// variable is carried as log α and combined with a masked
// log-sum-exp. A linear-space product over T frames underflows
// long before realistic sequence lengths, so this is a
// correctness requirement, not an optimization.
//
// Everything here is built from Burn tensor ops — no loops over
// batch rows, no manual backward pass. Running it on an
// Autodiff backend yields gradients for free.
//
// Recursion (eq. 6-7 of the paper), over the extended sequence
// l' = (blank, l1, blank, l2, ..., lS, blank) of length 2S+1:
//
//   α_t(s) = [α_{t-1}(s) + α_{t-1}(s-1) + maybe α_{t-1}(s-2)]
//            · y_t(l'_s)
//
// where the s-2 "skip" term is allowed only when l'_s is a real
// label different from l'_{s-2}: a blank frame is mandatory
// between repeated symbols.
//
// Reference: Graves et al. (2006) — Connectionist Temporal
//            Classification: Labelling Unsegmented Sequence Data
//            with Recurrent Neural Networks

use burn::prelude::*;

// ─── Configuration ────────────────────────────────────────────────────────────
/// Configuration for the [CTC loss](CtcLoss).
#[derive(Config, Debug)]
pub struct CtcLossConfig {
    /// Class index of the blank symbol. A caller-defined
    /// convention — never assumed to be first or last.
    #[config(default = 0)]
    pub blank: usize,

    /// Replace +inf losses (targets that cannot be aligned within
    /// the available timesteps) with 0.0 instead of letting them
    /// poison the batch mean.
    #[config(default = false)]
    pub zero_infinity: bool,
}

impl CtcLossConfig {
    /// Initialize a new [CTC loss](CtcLoss) module.
    pub fn init(&self) -> CtcLoss {
        CtcLoss {
            blank: self.blank,
            zero_infinity: self.zero_infinity,
        }
    }
}

// ─── CtcLoss ──────────────────────────────────────────────────────────────────
/// Computes the CTC loss.
///
/// Inputs are log-probabilities (e.g. from `log_softmax`), shaped
/// `[time, batch, classes]`. Targets hold class indices WITHOUT
/// blanks, padded to the longest row; the true length of every
/// row travels separately in `target_lengths`, so the padding
/// value itself is never read.
///
/// A row whose target cannot be aligned in the available frames
/// (fewer than `2L-1`-style minimum, see `min_alignment_steps`)
/// gets a `+inf` loss; see [`CtcLossConfig::zero_infinity`].
#[derive(Module, Clone, Debug)]
pub struct CtcLoss {
    blank: usize,
    zero_infinity: bool,
}

impl CtcLoss {
    /// Per-sample loss: `-log P(target | prediction)`, shape `[batch]`.
    ///
    /// # Shapes
    /// - `log_probs`:      `[time, batch, classes]` (classes include blank)
    /// - `targets`:        `[batch, max_target_len]`
    /// - `input_lengths`:  `[batch]` — valid frames per row
    /// - `target_lengths`: `[batch]` — valid labels per row
    ///
    /// # Panics
    /// On malformed inputs: `blank >= classes`, or any batch
    /// dimension disagreeing with `log_probs`.
    pub fn forward<B: Backend>(
        &self,
        log_probs: Tensor<B, 3>,
        targets: Tensor<B, 2, Int>,
        input_lengths: Tensor<B, 1, Int>,
        target_lengths: Tensor<B, 1, Int>,
    ) -> Tensor<B, 1> {
        let device = log_probs.device();
        let [time_steps, batch_size, num_classes] = log_probs.dims();
        let max_target_len = targets.dims()[1];
        self.check_shapes(
            batch_size,
            num_classes,
            targets.dims()[0],
            input_lengths.dims()[0],
            target_lengths.dims()[0],
        );

        // The padded tail of a target row may hold any sentinel
        // (e.g. -1); clamp into class range so it is safe to
        // gather with. Masking keeps those lanes out of the math.
        let targets = targets.clamp(0, num_classes as i32 - 1);

        // Extended sequence l' = blanks interleaved around labels,
        // identical padded width 2S+1 for every row.
        let extended = self.extend_with_blanks(targets, batch_size, max_target_len, &device);
        let ext_len = 2 * max_target_len + 1;

        // ── α at t = 0 ────────────────────────────────────────────────────────
        // Only the first blank and the first label are reachable:
        //   log α_0(0) = log y_0(blank)
        //   log α_0(1) = log y_0(l_1)
        //   log α_0(s) = -inf for s > 1
        let lp_0 = time_slice(&log_probs, 0, batch_size, num_classes);
        let mut alpha =
            Tensor::<B, 2>::full([batch_size, ext_len], f32::NEG_INFINITY, &device);
        alpha = alpha.slice_assign(
            [0..batch_size, 0..1],
            lp_0.clone()
                .gather(1, extended.clone().slice([0..batch_size, 0..1])),
        );
        if ext_len > 1 {
            alpha = alpha.slice_assign(
                [0..batch_size, 1..2],
                lp_0.gather(1, extended.clone().slice([0..batch_size, 1..2])),
            );
        }

        // Lanes where the s-2 skip transition is legal: a real
        // label that differs from the label two lanes back.
        let skip_allowed = self.skip_mask(&extended, &device);
        // Lanes inside each row's own 2L+1 extended length.
        let lane_valid = self.lane_mask(ext_len, batch_size, &target_lengths, &device);

        // ── α recursion over time ─────────────────────────────────────────────
        // Rows whose input ended (t >= input_length) freeze their α,
        // so the final read-out below sees each row's own last frame.
        for t in 1..time_steps {
            let prev = alpha.clone();
            let from_same = prev.clone();
            let from_prev = shift_lanes(prev.clone(), 1, &device);
            let from_skip = shift_lanes(prev, 2, &device);

            let two_way = log_add(from_same, from_prev);
            let three_way = log_add(two_way.clone(), from_skip);
            let reachable = two_way.mask_where(skip_allowed.clone(), three_way);

            let lp_t = time_slice(&log_probs, t, batch_size, num_classes);
            let stepped = reachable.add(lp_t.gather(1, extended.clone()));

            let row_active = input_lengths
                .clone()
                .greater_elem(t as i32)
                .reshape([batch_size, 1])
                .expand([batch_size, ext_len]);
            let active = row_active.bool_and(lane_valid.clone());
            alpha = alpha.mask_where(active, stepped);
        }

        // ── Read-out ──────────────────────────────────────────────────────────
        // P(target) ends in the last blank (lane 2L) or the last
        // label (lane 2L-1).
        let last_blank = target_lengths
            .clone()
            .mul_scalar(2)
            .reshape([batch_size, 1]);
        let last_label = last_blank.clone().sub_scalar(1);

        let ll_blank = alpha
            .clone()
            .gather(1, last_blank)
            .reshape([batch_size]);
        // clamp guards rows with an empty target (lane -1 does not
        // exist); their label term is masked out below.
        let ll_label = alpha
            .gather(1, last_label.clamp_min(0))
            .reshape([batch_size]);
        let empty_target = target_lengths.equal_elem(0);
        let ll_label = ll_label.mask_fill(empty_target, f32::NEG_INFINITY);

        let log_likelihood = log_add(ll_blank, ll_label);
        let mut loss = log_likelihood.neg();

        if self.zero_infinity {
            let inf = loss.clone().equal_elem(f32::INFINITY);
            loss = loss.mask_fill(inf, 0.0);
        }

        loss
    }

    /// Batch-mean loss: each row's loss divided by its target
    /// length, then averaged — the reduction the reference
    /// framework implementations apply. Shape `[1]`.
    pub fn forward_mean<B: Backend>(
        &self,
        log_probs: Tensor<B, 3>,
        targets: Tensor<B, 2, Int>,
        input_lengths: Tensor<B, 1, Int>,
        target_lengths: Tensor<B, 1, Int>,
    ) -> Tensor<B, 1> {
        let per_sample = self.forward(log_probs, targets, input_lengths, target_lengths.clone());
        // clamp keeps an empty-target row from dividing by zero
        per_sample
            .div(target_lengths.clamp_min(1).float())
            .mean()
    }

    fn check_shapes(
        &self,
        batch_size: usize,
        num_classes: usize,
        targets_batch: usize,
        input_lengths_len: usize,
        target_lengths_len: usize,
    ) {
        assert!(
            self.blank < num_classes,
            "blank index {} must be less than num_classes {}",
            self.blank,
            num_classes
        );
        assert_eq!(
            targets_batch, batch_size,
            "targets batch dimension {} must equal batch_size {}",
            targets_batch, batch_size
        );
        assert_eq!(
            input_lengths_len, batch_size,
            "input_lengths length {} must equal batch_size {}",
            input_lengths_len, batch_size
        );
        assert_eq!(
            target_lengths_len, batch_size,
            "target_lengths length {} must equal batch_size {}",
            target_lengths_len, batch_size
        );
    }

    /// Build l': `[l1, l2, .., lS]` → `[b, l1, b, l2, .., b, lS, b]`.
    ///
    /// Interleaves a blank column before every label column
    /// (pair-and-reshape), then appends the trailing blank.
    fn extend_with_blanks<B: Backend>(
        &self,
        targets: Tensor<B, 2, Int>,
        batch_size: usize,
        max_target_len: usize,
        device: &B::Device,
    ) -> Tensor<B, 2, Int> {
        let blank_col =
            Tensor::<B, 2, Int>::full([batch_size, 1], self.blank as i32, device);
        if max_target_len == 0 {
            return blank_col;
        }

        let blanks =
            Tensor::<B, 2, Int>::full([batch_size, max_target_len], self.blank as i32, device);
        // [N, S, 2] with pairs (blank, label_i), flattened row-major
        // to blank, l1, blank, l2, ...
        let interleaved = Tensor::cat(
            vec![
                blanks.reshape([batch_size, max_target_len, 1]),
                targets.reshape([batch_size, max_target_len, 1]),
            ],
            2,
        )
        .reshape([batch_size, 2 * max_target_len]);

        Tensor::cat(vec![interleaved, blank_col], 1)
    }

    /// True where α_{t-1}(s-2) may contribute: l'_s is a real label
    /// and differs from l'_{s-2}. Lanes 0 and 1 have no s-2
    /// predecessor; their shifted α is -inf anyway, so the mask
    /// value there is irrelevant.
    fn skip_mask<B: Backend>(
        &self,
        extended: &Tensor<B, 2, Int>,
        device: &B::Device,
    ) -> Tensor<B, 2, Bool> {
        let [batch_size, ext_len] = extended.dims();
        if ext_len < 3 {
            // No lane has an s-2 predecessor
            return Tensor::<B, 2, Int>::zeros([batch_size, ext_len], device).equal_elem(1);
        }
        let pad = Tensor::<B, 2, Int>::full([batch_size, 2], self.blank as i32, device);
        let two_back = Tensor::cat(
            vec![pad, extended.clone().slice([0..batch_size, 0..ext_len - 2])],
            1,
        );

        let is_label = extended.clone().not_equal_elem(self.blank as i32);
        let differs = extended.clone().not_equal(two_back);
        is_label.bool_and(differs)
    }

    /// True for lanes `s < 2*target_len + 1`, i.e. inside the row's
    /// own extended sequence rather than the batch padding.
    fn lane_mask<B: Backend>(
        &self,
        ext_len: usize,
        batch_size: usize,
        target_lengths: &Tensor<B, 1, Int>,
        device: &B::Device,
    ) -> Tensor<B, 2, Bool> {
        let lanes = Tensor::<B, 1, Int>::arange(0..ext_len as i64, device)
            .reshape([1, ext_len])
            .expand([batch_size, ext_len]);
        let row_ext_lens = target_lengths
            .clone()
            .mul_scalar(2)
            .add_scalar(1)
            .reshape([batch_size, 1])
            .expand([batch_size, ext_len]);
        lanes.lower(row_ext_lens)
    }
}

/// `log_probs[t]` as a `[batch, classes]` tensor.
fn time_slice<B: Backend>(
    log_probs: &Tensor<B, 3>,
    t: usize,
    batch_size: usize,
    num_classes: usize,
) -> Tensor<B, 2> {
    log_probs
        .clone()
        .slice([t..t + 1, 0..batch_size, 0..num_classes])
        .reshape([batch_size, num_classes])
}

/// Shift every row right by `by` lanes, filling vacated lanes with
/// -inf (an unreachable predecessor contributes nothing).
fn shift_lanes<B: Backend>(
    alpha: Tensor<B, 2>,
    by: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let [rows, cols] = alpha.dims();
    let pad = Tensor::<B, 2>::full([rows, by], f32::NEG_INFINITY, device);
    Tensor::cat(vec![pad, alpha.slice([0..rows, 0..cols - by])], 1)
}

/// Elementwise `log(exp(a) + exp(b))`, safe around -inf.
///
/// The naive `max + ln(1 + exp(-|a-b|))` turns into NaN when both
/// operands are -inf (`-inf - -inf`), so lanes where either operand
/// is -inf take the plain max instead — which is exactly right
/// there: `log_add(x, -inf) = x`.
fn log_add<B: Backend, const D: usize>(a: Tensor<B, D>, b: Tensor<B, D>) -> Tensor<B, D> {
    let a_inf = a.clone().equal_elem(f32::NEG_INFINITY);
    let b_inf = b.clone().equal_elem(f32::NEG_INFINITY);
    let degenerate = a_inf.clone().bool_or(b_inf.clone());

    let fallback = a.clone().max_pair(b.clone());

    // Sanitized operands keep the masked-out lanes NaN-free.
    let a_safe = a.mask_fill(a_inf, 0.0);
    let b_safe = b.mask_fill(b_inf, 0.0);
    let max = a_safe.clone().max_pair(b_safe.clone());
    let smooth = a_safe
        .sub(b_safe)
        .abs()
        .neg()
        .exp()
        .add_scalar(1.0)
        .log()
        .add(max);

    smooth.mask_where(degenerate, fallback)
}
