//! # Chu-Liu/Edmonds — Arborescência Geradora Máxima
//!
//! Encontra a árvore de score máximo **sem** restrição de projetividade:
//! arcos podem se cruzar, o que é necessário para línguas com ordem de
//! palavras livre.
//!
//! ## Algoritmo
//!
//! 1. Cada token escolhe o seu melhor head (ignorando auto-laços e a raiz como dependente).
//! 2. Se essas escolhas não formam ciclo, já são a árvore ótima.
//! 3. Se há um ciclo `C`, ele é contraído num supervértice. Um arco `u → v`
//!    que entra no ciclo em `v` é repontuado como
//!
//!    ```text
//!    S'(u, C) = S(u, v) - S(head(v), v) + Σ_{c ∈ C} S(head(c), c)
//!    ```
//!
//!    ou seja, paga-se o arco novo e devolve-se o arco interno que `v`
//!    deixaria de usar. Arcos que saem do ciclo ficam com o melhor por destino.
//! 4. Repete no grafo menor até não haver ciclos.
//! 5. Expande as contrações em ordem reversa: o arco que entrou no
//!    supervértice substitui o arco interno do vértice em que entra,
//!    quebrando o ciclo exatamente ali.
//!
//! Em vez de recursão, as contrações são empilhadas num `Vec` de níveis e
//! desfeitas no final, o que limita a profundidade de pilha para entradas
//! patológicas. O custo é `O(n²)` por nível e no máximo `n` níveis.
//!
//! A matriz de trabalho é uma cópia: os scores contraídos são gravados na
//! linha/coluna do representante de cada ciclo. Como a matriz é densa, só o
//! melhor arco paralelo é guardado, o que não muda o resultado.

use crate::error::DecodeError;
use crate::matrix::{is_selectable, ScoreMatrix, ROOT};
use crate::tree::DependencyTree;

/// Um nível de contração, guardado para a expansão.
#[derive(Debug)]
struct Contraction {
    /// Vértice que representa o ciclo no grafo contraído.
    representative: usize,
    /// Vértices do ciclo, seguindo os heads a partir do representante.
    cycle: Vec<usize>,
    /// Head de cada vértice do ciclo no momento da contração.
    cycle_heads: Vec<usize>,
    /// `entry[u]`: vértice do ciclo onde entra o melhor arco vindo de `u`.
    entry: Vec<usize>,
    /// `exit[w]`: vértice do ciclo de onde sai o melhor arco para `w`.
    exit: Vec<usize>,
}

/// Executa Chu-Liu/Edmonds sobre uma matriz já mascarada de dimensão `n × n`.
pub(crate) fn chu_liu_edmonds(scores: &ScoreMatrix) -> Result<DependencyTree, DecodeError> {
    let n = scores.size();
    if n <= 1 {
        return Ok(DependencyTree::root_only());
    }

    let mut weights = scores.clone();
    let mut active = vec![true; n];
    let mut levels: Vec<Contraction> = Vec::new();

    let mut heads = loop {
        let best = best_incoming(&weights, &active)?;
        match find_cycle(&best, &active) {
            None => break best,
            Some(cycle) => {
                let level = contract(&mut weights, &best, &mut active, cycle);
                levels.push(level);
            }
        }
    };

    while let Some(level) = levels.pop() {
        expand(&mut heads, &level);
    }

    Ok(DependencyTree::from_heads_unchecked(heads))
}

/// Melhor head de cada vértice ativo (empate: menor índice de head).
///
/// Vértices inativos e a raiz recebem `ROOT` como marcador.
fn best_incoming(weights: &ScoreMatrix, active: &[bool]) -> Result<Vec<usize>, DecodeError> {
    let n = weights.size();
    let mut heads = vec![ROOT; n];
    for d in 1..n {
        if !active[d] {
            continue;
        }
        let mut best: Option<(usize, f64)> = None;
        for h in 0..n {
            if h == d || !active[h] {
                continue;
            }
            let score = weights.get(h, d);
            if !is_selectable(score) {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((h, score)),
            }
        }
        match best {
            Some((h, _)) => heads[d] = h,
            None => {
                return Err(DecodeError::invalid_input(format!(
                    "token {d} não tem nenhum arco de entrada selecionável \
                     (todos os scores são -∞, ou o ciclo que ele representa é inalcançável)"
                )))
            }
        }
    }
    Ok(heads)
}

/// Procura um ciclo entre os heads escolhidos, sem recursão.
///
/// Devolve os vértices do ciclo na ordem dos heads (`c, head(c), ...`).
fn find_cycle(heads: &[usize], active: &[bool]) -> Option<Vec<usize>> {
    let n = heads.len();
    // 0 = não visitado, 1 = no caminho atual, 2 = resolvido
    let mut state = vec![0u8; n];
    let mut path = Vec::with_capacity(n);

    for start in 1..n {
        if !active[start] || state[start] != 0 {
            continue;
        }
        let mut current = start;
        while current != ROOT && state[current] == 0 {
            state[current] = 1;
            path.push(current);
            current = heads[current];
        }
        if current != ROOT && state[current] == 1 {
            let pos = path.iter().position(|&v| v == current).unwrap_or(0);
            return Some(path[pos..].to_vec());
        }
        for &v in &path {
            state[v] = 2;
        }
        path.clear();
    }
    None
}

/// Contrai `cycle` no seu primeiro vértice, atualizando pesos e vértices ativos.
fn contract(
    weights: &mut ScoreMatrix,
    heads: &[usize],
    active: &mut [bool],
    cycle: Vec<usize>,
) -> Contraction {
    let n = weights.size();
    let representative = cycle[0];

    let mut in_cycle = vec![false; n];
    for &c in &cycle {
        in_cycle[c] = true;
    }
    let cycle_heads: Vec<usize> = cycle.iter().map(|&c| heads[c]).collect();
    let internal: Vec<f64> = cycle.iter().map(|&c| weights.get(heads[c], c)).collect();
    let cycle_sum: f64 = internal.iter().sum();

    let mut entry = vec![representative; n];
    let mut exit = vec![representative; n];

    for v in 0..n {
        if !active[v] || in_cycle[v] {
            continue;
        }

        // v → C
        let mut best_in = f64::NEG_INFINITY;
        for (i, &c) in cycle.iter().enumerate() {
            let score = reweight(weights.get(v, c), internal[i], cycle_sum);
            if score > best_in {
                best_in = score;
                entry[v] = c;
            }
        }

        // C → v (nunca para a raiz)
        let mut best_out = f64::NEG_INFINITY;
        if v != ROOT {
            for &c in &cycle {
                let score = weights.get(c, v);
                if score > best_out {
                    best_out = score;
                    exit[v] = c;
                }
            }
        }

        weights.set(v, representative, best_in);
        weights.set(representative, v, best_out);
    }

    for &c in &cycle[1..] {
        active[c] = false;
    }

    Contraction {
        representative,
        cycle,
        cycle_heads,
        entry,
        exit,
    }
}

/// `S(u, v) - S(head(v), v) + soma do ciclo`, saturando em vez de produzir NaN.
fn reweight(entering: f64, internal: f64, cycle_sum: f64) -> f64 {
    if !is_selectable(entering) {
        return f64::NEG_INFINITY;
    }
    let score = cycle_sum + entering - internal;
    if score.is_nan() {
        f64::MAX
    } else {
        score
    }
}

/// Desfaz uma contração sobre a solução do grafo contraído.
fn expand(heads: &mut [usize], level: &Contraction) {
    let rep = level.representative;
    let entering_from = heads[rep];
    let broken_at = level.entry[entering_from];

    // Arcos que saíam do supervértice voltam a sair do vértice original
    for w in 0..heads.len() {
        if heads[w] == rep && w != rep && !level.cycle.contains(&w) {
            heads[w] = level.exit[w];
        }
    }

    for (&c, &h) in level.cycle.iter().zip(&level.cycle_heads) {
        heads[c] = h;
    }
    heads[broken_at] = entering_from;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{best_tree_score, score_matrix_strategy};
    use proptest::prelude::*;

    fn decode(rows: Vec<Vec<f64>>) -> Vec<usize> {
        let n = rows.len();
        let masked = ScoreMatrix::from_rows(rows).unwrap().masked(n).unwrap();
        chu_liu_edmonds(&masked).unwrap().into_heads()
    }

    fn range_matrix(n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|h| (0..n).map(|d| (h * n + d + 1) as f64).collect())
            .collect()
    }

    #[test]
    fn test_example_sentence_has_no_cycle() {
        let mut s = ScoreMatrix::new(3);
        s.set(0, 1, 2.0);
        s.set(2, 1, 5.0);
        s.set(0, 2, 3.0);
        s.set(1, 2, 1.0);
        let masked = s.masked(3).unwrap();
        let tree = chu_liu_edmonds(&masked).unwrap();
        assert_eq!(tree.heads(), &[0, 2, 0]);
        assert_eq!(tree.score(&masked), 8.0);
    }

    #[test]
    fn test_toy_matrices() {
        assert_eq!(decode(vec![vec![0.0]]), vec![0]);
        // 1 ↔ 2 formam ciclo; quebrar em 2 é mais barato
        assert_eq!(decode(range_matrix(3)), vec![0, 2, 0]);
        // dois níveis de contração
        assert_eq!(decode(range_matrix(4)), vec![0, 3, 3, 0]);
    }

    #[test]
    fn test_non_projective_optimum() {
        let mut s = ScoreMatrix::new(4);
        s.set(0, 1, 10.0);
        s.set(1, 3, 10.0);
        s.set(0, 2, 10.0);
        s.set(1, 2, 1.0);
        s.set(2, 3, 1.0);
        let masked = s.masked(4).unwrap();
        let tree = chu_liu_edmonds(&masked).unwrap();
        assert_eq!(tree.heads(), &[0, 0, 0, 1]);
        assert!(!tree.is_projective());
        assert_eq!(tree.score(&masked), 30.0);
    }

    #[test]
    fn test_two_disjoint_cycles() {
        // 1 ↔ 2 e 3 ↔ 4 são as melhores escolhas locais
        let mut s = ScoreMatrix::new(5);
        s.set(1, 2, 10.0);
        s.set(2, 1, 10.0);
        s.set(3, 4, 10.0);
        s.set(4, 3, 10.0);
        s.set(0, 1, 1.0);
        s.set(0, 3, 2.0);
        s.set(0, 4, 1.0);
        let masked = s.masked(5).unwrap();
        let tree = chu_liu_edmonds(&masked).unwrap();
        assert_eq!(tree.heads(), &[0, 0, 1, 0, 3]);
        assert_eq!(tree.score(&masked), 23.0);
    }

    #[test]
    fn test_unreachable_token_is_invalid_input() {
        let mut s = ScoreMatrix::new(3);
        s.set(0, 1, 1.0);
        let err = chu_liu_edmonds(&s.masked(3).unwrap()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidInput { .. }));
    }

    #[test]
    fn test_unreachable_cycle_is_invalid_input() {
        // 2 e 3 só recebem arcos um do outro
        let mut s = ScoreMatrix::new(4);
        s.set(0, 1, 1.0);
        s.set(2, 3, 1.0);
        s.set(3, 2, 1.0);
        let err = chu_liu_edmonds(&s.masked(4).unwrap()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidInput { .. }));
    }

    #[test]
    fn test_find_cycle() {
        let all = [true; 5];
        assert_eq!(find_cycle(&[0, 0, 1, 2, 3], &all), None);
        assert_eq!(find_cycle(&[0, 4, 4, 4, 3], &all), Some(vec![4, 3]));
        assert_eq!(find_cycle(&[0, 4, 1, 2, 3], &all), Some(vec![1, 4, 3, 2]));
    }

    #[test]
    fn test_random_large_matrix() {
        let rows = vec![
            vec![0.15154335, 0.21364425, 0.02926004, 0.24640401, 0.05929783, 0.98366485, 0.53015432, 0.07778964, 0.00989446, 0.17998191],
            vec![0.68921352, 0.33551225, 0.91974265, 0.08476561, 0.48800752, 0.87661821, 0.31723634, 0.51386131, 0.97963044, 0.36960274],
            vec![0.13969799, 0.46092784, 0.75821582, 0.78823102, 0.63945137, 0.42556879, 0.81997744, 0.12978648, 0.40536874, 0.4744205],
            vec![0.40688978, 0.25514681, 0.59851297, 0.82950985, 0.46627791, 0.05888491, 0.97450763, 0.90287058, 0.35996474, 0.6448661],
            vec![0.30530523, 0.76566773, 0.64714425, 0.1424588, 0.14283951, 0.00153444, 0.9688441, 0.87582559, 0.63371798, 0.67004456],
            vec![0.88822529, 0.26780501, 0.61901697, 0.35049028, 0.06430303, 0.44334551, 0.15308377, 0.42145127, 0.87420229, 0.3309963],
            vec![0.31808055, 0.35399265, 0.31438455, 0.63534316, 0.36917357, 0.7707749, 0.1686939, 0.66622048, 0.67872444, 0.28663183],
            vec![0.82167446, 0.15910145, 0.6654594, 0.54279563, 0.19068867, 0.17368633, 0.07199292, 0.29239669, 0.60002772, 0.75121407],
            vec![0.74016819, 0.28619099, 0.71608573, 0.64490596, 0.05975497, 0.8792097, 0.85888953, 0.90590799, 0.62783992, 0.12660846],
            vec![0.80810707, 0.10910174, 0.11777376, 0.36885688, 0.88732921, 0.82053854, 0.84096041, 0.53546477, 0.49554398, 0.21705035],
        ];
        assert_eq!(decode(rows), vec![0, 4, 1, 2, 9, 0, 3, 8, 5, 7]);
    }

    proptest! {
        #[test]
        fn chu_liu_matches_brute_force((n, scores) in score_matrix_strategy(6)) {
            let masked = scores.masked(n).unwrap();
            let best = best_tree_score(&masked, n, false);
            match chu_liu_edmonds(&masked) {
                Ok(tree) => {
                    prop_assert!(crate::tree::validate_heads(tree.heads(), n).is_ok());
                    prop_assert_eq!(tree.score(&masked), best);
                }
                Err(err) => {
                    let invalid = matches!(err, DecodeError::InvalidInput { .. });
                    prop_assert!(invalid, "esperado InvalidInput: {:?}", err);
                    prop_assert_eq!(best, f64::NEG_INFINITY);
                }
            }
        }
    }
}
