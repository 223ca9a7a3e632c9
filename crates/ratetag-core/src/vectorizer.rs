//! Character n-gram TF-IDF vectorizer.
//!
//! Turns one rate name into a fixed-length feature vector aligned with a
//! [`VocabularyStore`]:
//!
//! 1. lowercase, then strip diacritics (NFD → drop combining marks → NFC)
//! 2. split on whitespace, pad each word with one space on both sides
//! 3. emit every character n-gram for n in 1..=3
//! 4. sublinear term frequency `1 + ln(count)` times the term's IDF
//! 5. L2-normalize (all-zero vectors stay all-zero)
//!
//! Arithmetic is done in `f64`; the output is `f32` to match the width the
//! inference engine expects.

use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::vocabulary::VocabularyStore;

/// Inclusive n-gram length range.
pub const NGRAM_RANGE: (usize, usize) = (1, 3);

/// Lowercase and fold accented characters onto their base letters.
///
/// Case mapping is per character, so a final capital sigma folds to `σ`
/// like every other sigma.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .nfc()
        .collect()
}

/// Character n-grams of every whitespace-separated word, padded with one
/// leading and one trailing space.
///
/// Lengths longer than the padded word are skipped.
pub fn char_ngrams(text: &str, min_n: usize, max_n: usize) -> Vec<String> {
    let mut ngrams = Vec::new();
    for word in text.split_whitespace() {
        let mut padded: Vec<char> = Vec::with_capacity(word.len() + 2);
        padded.push(' ');
        padded.extend(word.chars());
        padded.push(' ');

        for n in min_n.max(1)..=max_n {
            if padded.len() < n {
                continue;
            }
            ngrams.extend(padded.windows(n).map(|w| w.iter().collect::<String>()));
        }
    }
    ngrams
}

/// Count each distinct n-gram of the normalized text.
pub fn term_counts(text: &str) -> HashMap<String, u32> {
    let normalized = normalize_text(text);
    let ngrams = char_ngrams(&normalized, NGRAM_RANGE.0, NGRAM_RANGE.1);

    let mut counts = HashMap::with_capacity(ngrams.len());
    for ngram in ngrams {
        *counts.entry(ngram).or_insert(0u32) += 1;
    }
    counts
}

/// Non-zero, L2-normalized TF-IDF weights as `(index, weight)` pairs sorted by index.
///
/// Only n-grams present in both the text and the vocabulary contribute.
pub fn sparse_weights(text: &str, store: &VocabularyStore) -> Vec<(usize, f64)> {
    let mut weights: Vec<(usize, f64)> = term_counts(text)
        .into_iter()
        .filter_map(|(term, count)| {
            let index = store.index_of(&term)?;
            let tf = 1.0 + (count as f64).ln();
            Some((index, tf * store.idf(index)))
        })
        .collect();
    weights.sort_unstable_by_key(|&(index, _)| index);

    let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in &mut weights {
            *w /= norm;
        }
    }
    weights
}

/// Vectorize one text into a freshly allocated feature vector of `store.len()` entries.
pub fn vectorize(text: &str, store: &VocabularyStore) -> Vec<f32> {
    let mut out = vec![0.0f32; store.len()];
    vectorize_into(text, store, &mut out);
    out
}

/// Vectorize one text into a caller-provided slot of exactly `store.len()` entries.
///
/// The slot is fully overwritten.
pub fn vectorize_into(text: &str, store: &VocabularyStore, out: &mut [f32]) {
    debug_assert_eq!(out.len(), store.len(), "feature slot width mismatch");
    out.fill(0.0);
    for (index, weight) in sparse_weights(text, store) {
        out[index] = weight as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pairs: &[(&str, u32)], idf: &[f64]) -> VocabularyStore {
        let vocab = pairs.iter().map(|&(t, i)| (t.to_string(), i)).collect();
        VocabularyStore::from_parts(vocab, idf.to_vec()).unwrap()
    }

    fn l2(v: &[f32]) -> f64 {
        v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt()
    }

    fn room_store() -> VocabularyStore {
        store(
            &[
                (" d", 0),
                ("dou", 1),
                ("ble", 2),
                ("sea", 3),
                ("ea ", 4),
                ("caf", 5),
                ("afe", 6),
                ("e", 7),
            ],
            &[1.2, 2.0, 1.7, 2.4, 1.1, 3.0, 2.9, 0.4],
        )
    }

    #[test]
    fn ngrams_of_short_word() {
        let grams = char_ngrams("ab", 1, 3);
        assert_eq!(
            grams,
            vec![" ", "a", "b", " ", " a", "ab", "b ", " ab", "ab "]
        );
    }

    #[test]
    fn ngrams_skip_lengths_longer_than_word() {
        // Padded single char is 3 long; n=4 has nothing to emit.
        let grams = char_ngrams("x", 4, 4);
        assert!(grams.is_empty());
    }

    #[test]
    fn ngrams_split_on_any_whitespace() {
        let a = char_ngrams("sea  view", 1, 3);
        let b = char_ngrams("sea\tview\n", 1, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn normalize_strips_accents_and_lowercases() {
        assert_eq!(normalize_text("Café Crème"), "cafe creme");
        assert_eq!(normalize_text("SUPÉRIEURE"), "superieure");
        // Decomposed input folds the same way as precomposed.
        assert_eq!(normalize_text("Cafe\u{0301}"), "cafe");
    }

    #[test]
    fn length_matches_vocabulary_for_any_input() {
        let s = room_store();
        for text in ["", "   ", "double sea view", "\u{1F600}", "ñandú"] {
            assert_eq!(vectorize(text, &s).len(), s.len(), "input {text:?}");
        }
    }

    #[test]
    fn norm_is_zero_or_one() {
        let s = room_store();
        for text in ["", "zzz", "double", "Sea View Double Room", "café"] {
            let norm = l2(&vectorize(text, &s));
            assert!(
                norm == 0.0 || (norm - 1.0).abs() < 1e-6,
                "input {text:?}: norm {norm}"
            );
        }
    }

    #[test]
    fn out_of_vocabulary_is_all_zero() {
        let s = room_store();
        let v = vectorize("qqq", &s);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let s = room_store();
        let a = vectorize("Double Room, sea view", &s);
        let b = vectorize("Double Room, sea view", &s);
        let bits_a: Vec<u32> = a.iter().map(|x| x.to_bits()).collect();
        let bits_b: Vec<u32> = b.iter().map(|x| x.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn accented_and_plain_spellings_collide() {
        let s = room_store();
        assert_eq!(vectorize("CAFÉ", &s), vectorize("cafe", &s));
    }

    #[test]
    fn sublinear_weighting_scenario() {
        let s = store(&[("a", 0), ("an", 1)], &[1.0, 1.0]);
        let v = vectorize("a an a", &s);

        // "a" occurs three times across " a ", " an ", " a "; "an" once.
        let w0 = 1.0 + 3.0f64.ln();
        let w1 = 1.0;
        let norm = (w0 * w0 + w1 * w1).sqrt();

        assert!(v[0] > v[1] && v[1] > 0.0, "got {v:?}");
        assert!((v[0] as f64 - w0 / norm).abs() < 1e-6);
        assert!((v[1] as f64 - w1 / norm).abs() < 1e-6);
        let sum_sq = (v[0] * v[0] + v[1] * v[1]) as f64;
        assert!((sum_sq - 1.0).abs() < 1e-6);
    }

    #[test]
    fn idf_scales_components() {
        let s = store(&[("a", 0), ("b", 1)], &[1.0, 3.0]);
        let v = vectorize("a b", &s);
        assert!((v[1] / v[0] - 3.0).abs() < 1e-5, "got {v:?}");
    }

    #[test]
    fn vectorize_into_overwrites_slot() {
        let s = room_store();
        let mut slot = vec![9.0f32; s.len()];
        vectorize_into("", &s, &mut slot);
        assert!(slot.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn sparse_weights_sorted_and_normalized() {
        let s = room_store();
        let w = sparse_weights("double sea", &s);
        assert!(w.windows(2).all(|p| p[0].0 < p[1].0));
        let norm: f64 = w.iter().map(|(_, x)| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn final_sigma_folds_like_any_sigma() {
        assert_eq!(normalize_text("ΟΔΟΣ"), "οδοσ");
        let store = store(&[("σ", 0), ("ς", 1)], &[1.0, 1.0]);
        assert_eq!(vectorize("ΟΔΟΣ", &store), vectorize("οδοσ", &store));
        assert_eq!(vectorize("ΟΔΟΣ", &store), vec![1.0, 0.0]);
    }
}
