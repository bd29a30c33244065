//! # Matriz de Scores de Arcos
//!
//! O scorer externo (embeddings + BiLSTM + projeção biafim) produz, para cada
//! sentença, uma matriz quadrada `L × L` onde `S[h][d]` é o score de ligar o
//! dependente `d` ao head `h`. `L` é o comprimento do lote (com padding);
//! a sentença real ocupa apenas os índices `0..n`.
//!
//! ```text
//!            d=0   d=1   d=2   d=3 (pad)
//!   h=0 (ROOT) -∞   2.0   3.0   -∞
//!   h=1        -∞   -∞    1.0   -∞
//!   h=2        -∞   5.0   -∞    -∞
//!   h=3 (pad)  -∞   -∞    -∞    -∞
//! ```
//!
//! Entradas com `-∞` nunca são escolhidas pelos decodificadores. A coluna da
//! raiz, a diagonal (auto-laços) e o padding são sempre mascarados.

use crate::error::DecodeError;

/// Índice da raiz virtual. Nunca é dependente.
pub const ROOT: usize = 0;

/// Matriz densa de scores `[head][dependente]`, armazenada linha a linha.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrix {
    size: usize,
    data: Vec<f64>,
}

impl ScoreMatrix {
    /// Cria uma matriz `size × size` com todos os arcos mascarados (`-∞`).
    pub fn new(size: usize) -> Self {
        Self {
            size,
            data: vec![f64::NEG_INFINITY; size * size],
        }
    }

    /// Cria uma matriz a partir de uma função `(head, dependente) -> score`.
    pub fn from_fn(size: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(size * size);
        for h in 0..size {
            for d in 0..size {
                data.push(f(h, d));
            }
        }
        Self { size, data }
    }

    /// Constrói a matriz a partir de linhas (uma por head). Falha se não for quadrada.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, DecodeError> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);
        for (h, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(DecodeError::invalid_input(format!(
                    "matriz não é quadrada: linha {h} tem {} colunas, esperado {size}",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Ok(Self { size, data })
    }

    /// Dimensão `L` da matriz (comprimento com padding).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Score do arco `head → dependent`.
    #[inline]
    pub fn get(&self, head: usize, dependent: usize) -> f64 {
        self.data[head * self.size + dependent]
    }

    /// Define o score do arco `head → dependent`.
    #[inline]
    pub fn set(&mut self, head: usize, dependent: usize, score: f64) {
        self.data[head * self.size + dependent] = score;
    }

    /// Linha de um head: scores de todos os dependentes possíveis.
    pub fn row(&self, head: usize) -> &[f64] {
        &self.data[head * self.size..(head + 1) * self.size]
    }

    /// Converte de volta para linhas (útil para serialização).
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.size.max(1)).map(|r| r.to_vec()).collect()
    }

    /// Verifica se a matriz comporta uma sentença de comprimento `length`.
    pub fn check_length(&self, length: usize) -> Result<(), DecodeError> {
        if length == 0 {
            return Err(DecodeError::invalid_input(
                "comprimento da sentença deve ser ≥ 1 (a raiz conta como token)",
            ));
        }
        if self.size < length {
            return Err(DecodeError::invalid_input(format!(
                "matriz {0}×{0} é menor que o comprimento declarado {length}",
                self.size
            )));
        }
        Ok(())
    }

    /// Cópia `length × length` pronta para decodificação.
    ///
    /// - descarta linhas/colunas de padding (`índice ≥ length`);
    /// - mascara auto-laços e arcos que entram na raiz;
    /// - NaN vira `-∞` e `+∞` satura em `f64::MAX`, para que somas nunca gerem NaN.
    pub fn masked(&self, length: usize) -> Result<ScoreMatrix, DecodeError> {
        self.check_length(length)?;
        Ok(ScoreMatrix::from_fn(length, |h, d| {
            if h == d || d == ROOT {
                return f64::NEG_INFINITY;
            }
            sanitize(self.get(h, d))
        }))
    }

    /// Score total de uma árvore: `Σ_{d=1}^{length-1} S[heads[d]][d]`.
    pub fn tree_score(&self, heads: &[usize], length: usize) -> f64 {
        (1..length)
            .map(|d| self.get(heads[d], d))
            .fold(0.0, add_scores)
    }
}

/// Um arco é selecionável se seu score não for `-∞`.
#[inline]
pub fn is_selectable(score: f64) -> bool {
    score > f64::NEG_INFINITY
}

/// Soma saturada: `-∞` absorve tudo, nunca produz NaN com as entradas sanitizadas.
#[inline]
pub(crate) fn add_scores(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY || b == f64::NEG_INFINITY {
        f64::NEG_INFINITY
    } else {
        a + b
    }
}

fn sanitize(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else if score == f64::INFINITY {
        f64::MAX
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err = ScoreMatrix::from_rows(vec![vec![0.0, 1.0], vec![2.0]]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidInput { .. }));
    }

    #[test]
    fn test_masked_drops_padding_root_column_and_diagonal() {
        let s = ScoreMatrix::from_fn(4, |h, d| (h * 4 + d) as f64);
        let m = s.masked(3).unwrap();
        assert_eq!(m.size(), 3);
        for h in 0..3 {
            assert_eq!(m.get(h, ROOT), f64::NEG_INFINITY);
            assert_eq!(m.get(h, h), f64::NEG_INFINITY);
        }
        assert_eq!(m.get(0, 1), 1.0);
        assert_eq!(m.get(2, 1), 9.0);
    }

    #[test]
    fn test_masked_sanitizes_nan_and_inf() {
        let mut s = ScoreMatrix::new(3);
        s.set(0, 1, f64::NAN);
        s.set(0, 2, f64::INFINITY);
        let m = s.masked(3).unwrap();
        assert_eq!(m.get(0, 1), f64::NEG_INFINITY);
        assert_eq!(m.get(0, 2), f64::MAX);
    }

    #[test]
    fn test_check_length() {
        let s = ScoreMatrix::new(2);
        assert!(s.check_length(0).is_err());
        assert!(s.check_length(3).is_err());
        assert!(s.check_length(2).is_ok());
    }

    #[test]
    fn test_add_scores_never_nan() {
        assert_eq!(add_scores(f64::NEG_INFINITY, f64::INFINITY), f64::NEG_INFINITY);
        assert_eq!(add_scores(1.5, 2.0), 3.5);
    }

    #[test]
    fn test_tree_score() {
        let mut s = ScoreMatrix::new(3);
        s.set(2, 1, 5.0);
        s.set(0, 2, 3.0);
        assert_eq!(s.tree_score(&[0, 2, 0], 3), 8.0);
    }
}
