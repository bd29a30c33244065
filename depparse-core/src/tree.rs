//! # Árvores de Dependência
//!
//! Uma árvore é representada pelo vetor de heads: `heads[d]` é o head do
//! token `d`. A posição 0 é a raiz virtual e seu valor é apenas um
//! marcador (`ROOT`). Para uma sentença só com a raiz (`n = 1`) o vetor é
//! `[ROOT]` e não há nenhum arco.
//!
//! ```text
//!   heads = [_, 2, 0]
//!
//!   ROOT ──► 2 ──► 1
//! ```
//!
//! ## Projetividade
//!
//! Uma árvore é projetiva se, para todo arco `(h, d)`, todo token entre `h`
//! e `d` é descendente de `h`. Com a raiz na posição 0 isso equivale a
//! nenhum par de arcos se cruzar quando desenhados acima da sentença.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::matrix::{ScoreMatrix, ROOT};

/// Árvore de dependência validada, produzida por um decodificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyTree {
    heads: Vec<usize>,
}

impl DependencyTree {
    /// Valida e constrói a árvore. `heads[0]` é ignorado e normalizado para `ROOT`.
    pub fn from_heads(mut heads: Vec<usize>) -> Result<Self, DecodeError> {
        validate_heads(&heads, heads.len())?;
        heads[ROOT] = ROOT;
        Ok(Self { heads })
    }

    /// Construção sem validação, para uso dos decodificadores (que garantem a estrutura).
    pub(crate) fn from_heads_unchecked(heads: Vec<usize>) -> Self {
        debug_assert!(validate_heads(&heads, heads.len()).is_ok());
        Self { heads }
    }

    /// Árvore de uma sentença que só contém a raiz.
    pub fn root_only() -> Self {
        Self { heads: vec![ROOT] }
    }

    /// Número de tokens, incluindo a raiz.
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    /// Verdadeiro quando não há nenhum dependente (só a raiz).
    pub fn is_root_only(&self) -> bool {
        self.heads.len() <= 1
    }

    pub fn heads(&self) -> &[usize] {
        &self.heads
    }

    pub fn into_heads(self) -> Vec<usize> {
        self.heads
    }

    /// Head do token `dependent`, ou `None` para a raiz / índice fora da árvore.
    pub fn head(&self, dependent: usize) -> Option<usize> {
        if dependent == ROOT {
            return None;
        }
        self.heads.get(dependent).copied()
    }

    /// Itera sobre os arcos `(head, dependente)` em ordem de dependente.
    pub fn arcs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.heads
            .iter()
            .enumerate()
            .skip(1)
            .map(|(d, &h)| (h, d))
    }

    /// Dependentes diretos de `head`, em ordem da sentença.
    pub fn children(&self, head: usize) -> Vec<usize> {
        self.arcs()
            .filter(|&(h, _)| h == head)
            .map(|(_, d)| d)
            .collect()
    }

    pub fn is_projective(&self) -> bool {
        is_projective(&self.heads)
    }

    /// Score total da árvore na matriz dada.
    pub fn score(&self, scores: &ScoreMatrix) -> f64 {
        scores.tree_score(&self.heads, self.heads.len())
    }
}

/// Verifica que `heads[1..length]` forma uma árvore enraizada em 0.
///
/// Cada dependente precisa de um head dentro da sentença, diferente de si
/// mesmo, e todo caminho de heads precisa chegar à raiz sem ciclos.
pub fn validate_heads(heads: &[usize], length: usize) -> Result<(), DecodeError> {
    if length == 0 {
        return Err(DecodeError::invalid_input("árvore sem raiz (comprimento zero)"));
    }
    if heads.len() < length {
        return Err(DecodeError::invalid_input(format!(
            "esperado {length} heads, recebido {}",
            heads.len()
        )));
    }
    for (d, &h) in heads.iter().enumerate().take(length).skip(1) {
        if h >= length {
            return Err(DecodeError::invalid_input(format!(
                "head {h} do token {d} está fora da sentença (comprimento {length})"
            )));
        }
        if h == d {
            return Err(DecodeError::invalid_input(format!(
                "token {d} é head de si mesmo"
            )));
        }
    }

    // 0 = não visitado, 1 = no caminho atual, 2 = chega à raiz
    let mut state = vec![0u8; length];
    state[ROOT] = 2;
    let mut path = Vec::with_capacity(length);
    for start in 1..length {
        let mut current = start;
        while state[current] == 0 {
            state[current] = 1;
            path.push(current);
            current = heads[current];
        }
        if state[current] == 1 {
            return Err(DecodeError::invalid_input(format!(
                "ciclo de heads passando pelo token {current}"
            )));
        }
        for &v in &path {
            state[v] = 2;
        }
        path.clear();
    }
    Ok(())
}

/// Projetividade: todo token entre `h` e `d` deve ser descendente de `h`.
///
/// Assume que `heads` já é uma árvore válida.
pub fn is_projective(heads: &[usize]) -> bool {
    for (d, &h) in heads.iter().enumerate().skip(1) {
        if h == ROOT {
            continue;
        }
        let (lo, hi) = if h < d { (h, d) } else { (d, h) };
        for between in lo + 1..hi {
            if !is_descendant(heads, between, h) {
                return false;
            }
        }
    }
    true
}

fn is_descendant(heads: &[usize], mut node: usize, ancestor: usize) -> bool {
    // no máximo `len` passos numa árvore válida
    for _ in 0..heads.len() {
        if node == ancestor {
            return true;
        }
        if node == ROOT {
            return false;
        }
        node = heads[node];
    }
    false
}

/// UAS (Unlabeled Attachment Score): fração de dependentes com o head correto.
///
/// Uma sentença só com a raiz conta como totalmente correta.
pub fn attachment_score(gold: &[usize], predicted: &[usize], length: usize) -> f64 {
    if length <= 1 {
        return 1.0;
    }
    let correct = (1..length)
        .filter(|&d| gold.get(d).is_some() && gold.get(d) == predicted.get(d))
        .count();
    correct as f64 / (length - 1) as f64
}
