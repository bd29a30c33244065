//! # Hinge Loss Estruturada (Max-Margin)
//!
//! Para cada sentença compara o score da árvore gold com o da melhor árvore
//! encontrada pelo decodificador:
//!
//! ```text
//! loss_i = max(0, 1 - real_i + decoded_i)
//! real_i    = Σ_{d=1}^{n-1} S[gold(d)][d]
//! decoded_i = Σ_{d=1}^{n-1} S[decoded(d)][d]
//! ```
//!
//! A loss do lote é a soma. Ela é zero (sem pressão de gradiente) quando a
//! gold supera a árvore decodificada por pelo menos 1.
//!
//! A diferença `decoded_i - real_i` é acumulada só sobre os dependentes em
//! que as duas árvores divergem; `real_score` e `decoded_score` são apenas
//! informativos.
//!
//! ## Gradiente
//!
//! A decodificação é um argmax combinatório: os **índices** da árvore
//! decodificada são constantes, só os **scores** somados carregam gradiente.
//! Com `loss > 0`:
//!
//! ```text
//! ∂loss/∂S[gold(d)][d]    = -1
//! ∂loss/∂S[decoded(d)][d] = +1
//! ```
//!
//! e os dois se cancelam quando `gold(d) == decoded(d)`.
//!
//! Note que a decodificação aqui é a de score máximo puro, sem custo
//! estrutural somado aos scores. Quando o decodificador acerta a gold, a
//! loss fica em 1 com gradiente nulo.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::matrix::{is_selectable, ScoreMatrix};
use crate::tree::{validate_heads, DependencyTree};

/// Margem exigida entre a árvore gold e a decodificada.
pub const MARGIN: f64 = 1.0;

/// Derivada da loss em relação a uma entrada da matriz de scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcGradient {
    pub head: usize,
    pub dependent: usize,
    pub value: f64,
}

/// Loss de uma sentença, com os scores que a compõem e o gradiente esparso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceLoss {
    pub loss: f64,
    pub real_score: f64,
    pub decoded_score: f64,
    /// Entradas não-nulas de `∂loss/∂S`.
    pub gradient: Vec<ArcGradient>,
}

impl SentenceLoss {
    pub fn margin_satisfied(&self) -> bool {
        self.loss == 0.0
    }
}

/// Loss acumulada de um lote.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchLoss {
    pub total: f64,
    pub sentences: Vec<SentenceLoss>,
}

/// `max(0, 1 - real + decoded)` para uma sentença.
pub fn margin_loss(
    scores: &ScoreMatrix,
    gold: &[usize],
    decoded: &[usize],
    length: usize,
) -> Result<f64, DecodeError> {
    sentence_margin_loss(scores, gold, decoded, length).map(|l| l.loss)
}

/// Loss completa de uma sentença, incluindo o gradiente por arco.
///
/// A gold precisa ser uma árvore sobre `0..length` que só usa arcos
/// selecionáveis; caso contrário a loss seria infinita e o erro é reportado.
pub fn sentence_margin_loss(
    scores: &ScoreMatrix,
    gold: &[usize],
    decoded: &[usize],
    length: usize,
) -> Result<SentenceLoss, DecodeError> {
    let masked = scores.masked(length)?;
    validate_heads(gold, length)
        .map_err(|e| DecodeError::invalid_input(format!("árvore gold inválida: {e}")))?;
    validate_heads(decoded, length)
        .map_err(|e| DecodeError::invalid_input(format!("árvore decodificada inválida: {e}")))?;

    if let Some(d) = (1..length).find(|&d| !is_selectable(masked.get(gold[d], d))) {
        return Err(DecodeError::invalid_input(format!(
            "arco gold {} → {d} está mascarado (-∞)",
            gold[d]
        )));
    }

    let real_score = masked.tree_score(gold, length);
    let decoded_score = masked.tree_score(decoded, length);
    let loss = hinge(&masked, gold, decoded, length);

    let mut gradient = Vec::new();
    if loss > 0.0 {
        for d in 1..length {
            if gold[d] != decoded[d] {
                gradient.push(ArcGradient {
                    head: gold[d],
                    dependent: d,
                    value: -1.0,
                });
                gradient.push(ArcGradient {
                    head: decoded[d],
                    dependent: d,
                    value: 1.0,
                });
            }
        }
    }

    Ok(SentenceLoss {
        loss,
        real_score,
        decoded_score,
        gradient,
    })
}

/// `max(0, 1 + Σ_{d: gold(d) ≠ decoded(d)} S[decoded(d)][d] - S[gold(d)][d])`.
///
/// Arcos compartilhados se cancelam antes de somar, então totais saturados
/// (`f64::MAX`, `+∞`) nas duas árvores não escondem a margem.
fn hinge(masked: &ScoreMatrix, gold: &[usize], decoded: &[usize], length: usize) -> f64 {
    let mut diff = 0.0;
    for d in (1..length).filter(|&d| gold[d] != decoded[d]) {
        let decoded_arc = masked.get(decoded[d], d);
        if decoded_arc == f64::NEG_INFINITY {
            // a decodificada usa um arco proibido: a gold vence por infinito
            return 0.0;
        }
        diff += decoded_arc - masked.get(gold[d], d);
    }
    if diff.is_nan() {
        // overflow nos dois sentidos (+∞ e -∞): diferença indeterminada, conta como empate
        return MARGIN;
    }
    (MARGIN + diff).max(0.0)
}

/// Soma a loss de todas as sentenças do lote, alinhadas por posição.
pub fn batch_margin_loss(
    batch: &[ScoreMatrix],
    gold: &[Vec<usize>],
    decoded: &[DependencyTree],
    lengths: &[usize],
) -> Result<BatchLoss, DecodeError> {
    let n = batch.len();
    if gold.len() != n || decoded.len() != n || lengths.len() != n {
        return Err(DecodeError::invalid_input(format!(
            "lote desalinhado: {n} matrizes, {} golds, {} árvores, {} comprimentos",
            gold.len(),
            decoded.len(),
            lengths.len()
        )));
    }

    let mut result = BatchLoss::default();
    for i in 0..n {
        let sentence = sentence_margin_loss(&batch[i], &gold[i], decoded[i].heads(), lengths[i])
            .map_err(|e| DecodeError::BatchFailure {
                sentence: i,
                source: Box::new(e),
            })?;
        result.total += sentence.loss;
        result.sentences.push(sentence);
    }
    Ok(result)
}
