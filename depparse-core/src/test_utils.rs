//! Utilitários compartilhados pelos testes: força bruta e estratégias proptest.

use proptest::prelude::*;

use crate::matrix::ScoreMatrix;
use crate::tree::{is_projective, validate_heads};

/// Scores inteiros pequenos (muitos empates) e, às vezes, arcos mascarados.
fn score_value() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => (-5i32..=5).prop_map(f64::from),
        1 => Just(f64::NEG_INFINITY),
    ]
}

/// Gera `(n, matriz)` com `1 ≤ n ≤ max_len` e até duas posições de padding
/// preenchidas com lixo, que a máscara precisa descartar.
pub(crate) fn score_matrix_strategy(max_len: usize) -> impl Strategy<Value = (usize, ScoreMatrix)> {
    (1..=max_len, 0..=2usize).prop_flat_map(|(n, pad)| {
        let size = n + pad;
        (Just(n), proptest::collection::vec(score_value(), size * size)).prop_map(
            move |(n, values)| (n, ScoreMatrix::from_fn(size, |h, d| values[h * size + d])),
        )
    })
}

/// Score da melhor árvore encontrada por enumeração exaustiva de todos os vetores de heads.
pub(crate) fn best_tree_score(scores: &ScoreMatrix, n: usize, projective_only: bool) -> f64 {
    let mut best = f64::NEG_INFINITY;
    let mut heads = vec![0usize; n];
    loop {
        if validate_heads(&heads, n).is_ok() && (!projective_only || is_projective(&heads)) {
            let score = scores.tree_score(&heads, n);
            if score > best {
                best = score;
            }
        }
        // odômetro sobre heads[1..n]
        let mut d = 1;
        while d < n {
            heads[d] += 1;
            if heads[d] < n {
                break;
            }
            heads[d] = 0;
            d += 1;
        }
        if d >= n {
            return best;
        }
    }
}

/// Checagem clássica de aninhamento de intervalos: dois arcos se cruzam?
pub(crate) fn has_crossing_arcs(heads: &[usize]) -> bool {
    let spans: Vec<(usize, usize)> = heads
        .iter()
        .enumerate()
        .skip(1)
        .map(|(d, &h)| (h.min(d), h.max(d)))
        .collect();
    for (i, &(l1, r1)) in spans.iter().enumerate() {
        for &(l2, r2) in &spans[i + 1..] {
            if (l1 < l2 && l2 < r1 && r1 < r2) || (l2 < l1 && l1 < r2 && r2 < r1) {
                return true;
            }
        }
    }
    false
}
