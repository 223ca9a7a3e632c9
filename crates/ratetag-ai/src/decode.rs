//! Raw score → label decoding.
//!
//! Two policies, chosen by class count:
//!
//! - **binary** (2 labels): one logit per row; `sigmoid(logit) >= 0.5` picks
//!   `labels[1]`, otherwise `labels[0]`.
//! - **multiclass** (> 2 labels): `labels.len()` logits per row, row-major;
//!   softmax then epsilon-gated argmax.
//!
//! Rows without enough scores decode to the empty string.

/// Minimum margin by which a later probability must exceed the running
/// maximum to take over the argmax.
pub const ARGMAX_EPS: f64 = 1e-8;

/// Decision boundary for binary categories; ties go to the positive class.
pub const BINARY_THRESHOLD: f64 = 0.5;

/// Probabilities are clamped to `[PROB_FLOOR, 1 - PROB_FLOOR]` before taking logs.
pub const PROB_FLOOR: f64 = 1e-15;

/// Map class probabilities back onto the logit scale [`decode_scores`] expects.
///
/// `width` is the number of probabilities per row:
///
/// - 1: positive-class probability, one logit `ln(p / (1 - p))` per row
/// - 2: `[p0, p1]` from a binary model, one logit from `p1` per row
/// - more: `ln p` per class (softmax of these recovers the probabilities)
///
/// A trailing partial row is dropped so the decoder reports it as undecoded.
pub fn probabilities_to_logits(probs: &[f64], width: usize) -> Vec<f64> {
    let logit = |p: f64| {
        let p = p.clamp(PROB_FLOOR, 1.0 - PROB_FLOOR);
        (p / (1.0 - p)).ln()
    };
    match width {
        0 | 1 => probs.iter().map(|&p| logit(p)).collect(),
        2 => probs.chunks_exact(2).map(|row| logit(row[1])).collect(),
        n => probs
            .chunks_exact(n)
            .flatten()
            .map(|&p| p.max(PROB_FLOOR).ln())
            .collect(),
    }
}

/// Labels for every row plus the rows that could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub labels: Vec<String>,
    pub undecoded: Vec<usize>,
}

pub fn sigmoid(logit: f64) -> f64 {
    1.0 / (1.0 + (-logit).exp())
}

/// Numerically stable softmax (max-shifted).
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let Some(max) = logits.iter().copied().reduce(f64::max) else {
        return Vec::new();
    };
    let exps: Vec<f64> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the maximum value; a later value only wins if it beats the
/// current maximum by more than [`ARGMAX_EPS`].
pub fn argmax(values: &[f64]) -> Option<usize> {
    let (&first, rest) = values.split_first()?;
    let mut best = (0, first);
    for (i, &v) in rest.iter().enumerate() {
        if v > best.1 + ARGMAX_EPS {
            best = (i + 1, v);
        }
    }
    Some(best.0)
}

/// Decode `rows` predictions from a flat raw-score sequence.
///
/// `labels` must hold at least two classes.
pub fn decode_scores(scores: &[f64], labels: &[String], rows: usize) -> Decoded {
    let mut decoded = Decoded {
        labels: Vec::with_capacity(rows),
        undecoded: Vec::new(),
    };

    if labels.len() == 2 {
        for row in 0..rows {
            match scores.get(row) {
                Some(&logit) => {
                    let idx = usize::from(sigmoid(logit) >= BINARY_THRESHOLD);
                    decoded.labels.push(labels[idx].clone());
                }
                None => {
                    decoded.labels.push(String::new());
                    decoded.undecoded.push(row);
                }
            }
        }
        return decoded;
    }

    let classes = labels.len();
    for row in 0..rows {
        let label = scores
            .get(row * classes..(row + 1) * classes)
            .and_then(|logits| argmax(&softmax(logits)))
            .and_then(|idx| labels.get(idx));
        match label {
            Some(label) => decoded.labels.push(label.clone()),
            None => {
                decoded.labels.push(String::new());
                decoded.undecoded.push(row);
            }
        }
    }
    decoded
}
