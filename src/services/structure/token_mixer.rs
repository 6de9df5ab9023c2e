// Token Mixer
// Deterministic hash-based sentence embedding used when no sentence encoder is available.
//
// E'_i = (E_{i-1} + E_i + E_{i+1}) / k, where k is the number of neighbours present.

pub const FALLBACK_DIMENSION: usize = 128;

/// 32-bit polynomial string hash over UTF-16 code units (h = 31 * h + unit, wrapping).
/// Stable across platforms and toolchain versions, unlike `DefaultHasher`.
pub fn token_hash(token: &str) -> i32 {
    token
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

/// L2-normalized 128-dim vector for a single token
pub fn token_embedding(token: &str) -> Vec<f64> {
    let hash = token_hash(token);
    let mut embedding: Vec<f64> = (0..FALLBACK_DIMENSION)
        .map(|i| {
            let scaled = hash.wrapping_mul(i as i32 + 1) as f64;
            scaled.sin() * (hash as f64 / (i as f64 + 1.0)).cos()
        })
        .collect();

    let norm = embedding.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for v in embedding.iter_mut() {
            *v /= norm;
        }
    }
    embedding
}

pub fn tokenize(text: &str) -> Vec<Vec<f64>> {
    text.split_whitespace().map(token_embedding).collect()
}

/// 3-point moving average; edge tokens average over the neighbours they have
pub fn mix_tokens(embeddings: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = embeddings.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(1);
            let hi = (i + 1).min(n - 1);
            let window = &embeddings[lo..=hi];
            let count = window.len() as f64;
            (0..embeddings[i].len())
                .map(|d| window.iter().map(|e| e[d]).sum::<f64>() / count)
                .collect()
        })
        .collect()
}

pub fn average_embeddings(embeddings: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = embeddings.first() else {
        return Vec::new();
    };
    let mut averaged = vec![0.0; first.len()];
    for embedding in embeddings {
        for (acc, v) in averaged.iter_mut().zip(embedding) {
            *acc += v;
        }
    }
    let n = embeddings.len() as f64;
    averaged.iter_mut().for_each(|v| *v /= n);
    averaged
}

/// Sentence embedding: tokenize, mix neighbours, average. Empty text gives a zero vector.
pub fn sentence_embedding(text: &str) -> Vec<f64> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return vec![0.0; FALLBACK_DIMENSION];
    }
    average_embeddings(&mix_tokens(&tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hash_matches_known_values() {
        assert_eq!(token_hash(""), 0);
        assert_eq!(token_hash("a"), 97);
        assert_eq!(token_hash("hello"), 99162322);
    }

    #[test]
    fn test_token_embedding_is_unit_length() {
        let e = token_embedding("resonance");
        assert_eq!(e.len(), FALLBACK_DIMENSION);
        let norm: f64 = e.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mix_tokens_divides_by_neighbour_count() {
        let input = vec![vec![3.0], vec![6.0], vec![9.0]];
        let mixed = mix_tokens(&input);
        assert_eq!(mixed[0], vec![4.5]);
        assert_eq!(mixed[1], vec![6.0]);
        assert_eq!(mixed[2], vec![7.5]);

        let single = mix_tokens(&[vec![2.0]]);
        assert_eq!(single, vec![vec![2.0]]);
    }

    #[test]
    fn test_sentence_embedding_is_deterministic() {
        let a = sentence_embedding("The quick brown fox");
        let b = sentence_embedding("The  quick brown\nfox");
        assert_eq!(a, b);
        assert_ne!(a, sentence_embedding("fox brown quick The extra"));
    }

    #[test]
    fn test_empty_text_gives_zero_vector() {
        let e = sentence_embedding("   ");
        assert_eq!(e.len(), FALLBACK_DIMENSION);
        assert!(e.iter().all(|v| *v == 0.0));
    }
}
