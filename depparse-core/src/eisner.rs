//! # Algoritmo de Eisner — Árvore Projetiva de Score Máximo
//!
//! Assim como o Viterbi encontra a melhor sequência de tags sem enumerar
//! todas as `T^N` possibilidades, o algoritmo de Eisner encontra a melhor
//! árvore **projetiva** sem enumerar as árvores (que crescem
//! exponencialmente com `n`).
//!
//! ## Intuição
//!
//! Numa árvore projetiva nenhum arco cruza outro. Logo, a melhor subárvore
//! sobre um span `[s, t]` se decompõe em duas metades independentes
//! unidas num ponto de corte `r`: nenhum arco atravessa o corte.
//!
//! ## Tabelas
//!
//! Para cada span `[s, t]` e direção (head à esquerda `→` ou à direita `←`):
//!
//! ```text
//! complete[s][t][→]   head em s, subárvore fechada cobrindo s..t
//! complete[s][t][←]   head em t, subárvore fechada cobrindo s..t
//! incomplete[s][t][→] arco s → t acabou de ser criado, t ainda aceita filhos
//! incomplete[s][t][←] arco t → s acabou de ser criado, s ainda aceita filhos
//! ```
//!
//! ## Recorrências
//!
//! ```text
//! incomplete[s][t][←] = max_{s≤r<t} complete[s][r][→] + complete[r+1][t][←] + S[t][s]
//! incomplete[s][t][→] = max_{s≤r<t} complete[s][r][→] + complete[r+1][t][←] + S[s][t]
//! complete[s][t][←]   = max_{s≤r<t} complete[s][r][←] + incomplete[r][t][←]
//! complete[s][t][→]   = max_{s<r≤t} incomplete[s][r][→] + complete[r][t][→]
//! ```
//!
//! Cada célula depende apenas de spans menores (preenchimento por largura),
//! então o tempo é `O(n³)` e o espaço `O(n²)`. A resposta é
//! `complete[0][n-1][→]`, reconstruída de cima para baixo pelos back-pointers.
//!
//! A raiz (posição 0) nunca é dependente: as células `[0][t][←]` com `t > 0`
//! são estruturalmente impossíveis e ficam fora das recorrências.

use crate::matrix::{add_scores, ScoreMatrix, ROOT};
use crate::tree::DependencyTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Head na ponta direita do span (`←`).
    Left = 0,
    /// Head na ponta esquerda do span (`→`).
    Right = 1,
}

/// Tabelas da programação dinâmica com back-pointers (ponto de corte).
struct Chart {
    n: usize,
    complete: Vec<f64>,
    incomplete: Vec<f64>,
    complete_split: Vec<usize>,
    incomplete_split: Vec<usize>,
}

impl Chart {
    fn new(n: usize) -> Self {
        let cells = n * n * 2;
        let mut chart = Self {
            n,
            complete: vec![f64::NEG_INFINITY; cells],
            incomplete: vec![f64::NEG_INFINITY; cells],
            complete_split: vec![0; cells],
            incomplete_split: vec![0; cells],
        };
        // Spans de largura zero: subárvore vazia
        for s in 0..n {
            for dir in [Direction::Left, Direction::Right] {
                let idx = chart.idx(s, s, dir);
                chart.complete[idx] = 0.0;
                chart.complete_split[idx] = s;
            }
        }
        chart
    }

    #[inline]
    fn idx(&self, s: usize, t: usize, dir: Direction) -> usize {
        (s * self.n + t) * 2 + dir as usize
    }

    #[inline]
    fn complete(&self, s: usize, t: usize, dir: Direction) -> f64 {
        self.complete[self.idx(s, t, dir)]
    }

    #[inline]
    fn incomplete(&self, s: usize, t: usize, dir: Direction) -> f64 {
        self.incomplete[self.idx(s, t, dir)]
    }

    fn set_complete(&mut self, s: usize, t: usize, dir: Direction, (score, split): (f64, usize)) {
        let idx = self.idx(s, t, dir);
        self.complete[idx] = score;
        self.complete_split[idx] = split;
    }

    fn set_incomplete(&mut self, s: usize, t: usize, dir: Direction, (score, split): (f64, usize)) {
        let idx = self.idx(s, t, dir);
        self.incomplete[idx] = score;
        self.incomplete_split[idx] = split;
    }
}

/// Melhor ponto de corte num intervalo crescente de candidatos.
///
/// Em empate vence o menor `r` (só troca com score estritamente maior), o
/// que torna a decodificação determinística. O primeiro candidato é sempre
/// registrado, mesmo com score `-∞`, para que os back-pointers formem uma
/// árvore válida em qualquer caso.
fn best_split(splits: impl Iterator<Item = usize>, score: impl Fn(usize) -> f64) -> (f64, usize) {
    let mut best: Option<(f64, usize)> = None;
    for r in splits {
        let candidate = score(r);
        match best {
            Some((best_score, _)) if candidate <= best_score => {}
            _ => best = Some((candidate, r)),
        }
    }
    best.unwrap_or((f64::NEG_INFINITY, 0))
}

/// Executa Eisner sobre uma matriz já mascarada de dimensão `n × n`.
///
/// `n = 1` devolve a árvore que só contém a raiz.
pub(crate) fn eisner(scores: &ScoreMatrix) -> DependencyTree {
    let n = scores.size();
    if n <= 1 {
        return DependencyTree::root_only();
    }

    let mut chart = Chart::new(n);

    for width in 1..n {
        for s in 0..n - width {
            let t = s + width;

            // Junta duas subárvores completas viradas uma para a outra
            let join = best_split(s..t, |r| {
                add_scores(
                    chart.complete(s, r, Direction::Right),
                    chart.complete(r + 1, t, Direction::Left),
                )
            });
            if s != ROOT {
                chart.set_incomplete(s, t, Direction::Left, (add_scores(join.0, scores.get(t, s)), join.1));
            }
            chart.set_incomplete(s, t, Direction::Right, (add_scores(join.0, scores.get(s, t)), join.1));

            if s != ROOT {
                let left = best_split(s..t, |r| {
                    add_scores(
                        chart.complete(s, r, Direction::Left),
                        chart.incomplete(r, t, Direction::Left),
                    )
                });
                chart.set_complete(s, t, Direction::Left, left);
            }

            let right = best_split(s + 1..t + 1, |r| {
                add_scores(
                    chart.incomplete(s, r, Direction::Right),
                    chart.complete(r, t, Direction::Right),
                )
            });
            chart.set_complete(s, t, Direction::Right, right);
        }
    }

    DependencyTree::from_heads_unchecked(backtrack(&chart))
}

/// Reconstrói os arcos de cima para baixo com uma pilha explícita.
fn backtrack(chart: &Chart) -> Vec<usize> {
    let n = chart.n;
    let mut heads = vec![ROOT; n];
    // (s, t, direção, completo?)
    let mut stack = vec![(ROOT, n - 1, Direction::Right, true)];

    while let Some((s, t, dir, complete)) = stack.pop() {
        if s == t {
            continue;
        }
        let idx = chart.idx(s, t, dir);
        if complete {
            let r = chart.complete_split[idx];
            match dir {
                Direction::Right => {
                    stack.push((s, r, Direction::Right, false));
                    stack.push((r, t, Direction::Right, true));
                }
                Direction::Left => {
                    stack.push((s, r, Direction::Left, true));
                    stack.push((r, t, Direction::Left, false));
                }
            }
        } else {
            let r = chart.incomplete_split[idx];
            match dir {
                Direction::Right => heads[t] = s,
                Direction::Left => heads[s] = t,
            }
            stack.push((s, r, Direction::Right, true));
            stack.push((r + 1, t, Direction::Left, true));
        }
    }

    heads
}
