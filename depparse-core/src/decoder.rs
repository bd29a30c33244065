//! # Decodificadores de Árvores
//!
//! Ponto de entrada público dos dois algoritmos:
//!
//! | Modo            | Algoritmo          | Restrição   | Custo  |
//! |-----------------|--------------------|-------------|--------|
//! | `Projective`    | Eisner             | sem cruzar  | `O(n³)` |
//! | `Arborescence`  | Chu-Liu/Edmonds    | nenhuma     | `O(n³)` pior caso |
//!
//! Ambos recebem a matriz do lote (com padding) e o comprimento real da
//! sentença, criam uma cópia mascarada `n × n` e nunca alteram a entrada.

use serde::{Deserialize, Serialize};

use crate::chu_liu::chu_liu_edmonds;
use crate::eisner::eisner;
use crate::error::DecodeError;
use crate::matrix::{is_selectable, ScoreMatrix, ROOT};
use crate::tree::DependencyTree;

/// Algoritmo usado para transformar a matriz de scores numa árvore.
///
/// Fixo por execução (não varia por sentença).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderMode {
    /// **Eisner**: melhor árvore projetiva (arcos não se cruzam).
    #[serde(alias = "eisner")]
    Projective,
    /// **Chu-Liu/Edmonds**: melhor árvore sem restrição de projetividade.
    #[serde(alias = "chuliu", alias = "chu_liu")]
    Arborescence,
}

impl Default for DecoderMode {
    fn default() -> Self {
        DecoderMode::Projective
    }
}

impl DecoderMode {
    /// Nome curto para logs e UI.
    pub fn name(&self) -> &'static str {
        match self {
            DecoderMode::Projective => "eisner",
            DecoderMode::Arborescence => "chu_liu_edmonds",
        }
    }
}

/// Qualquer coisa capaz de decodificar uma sentença isolada.
///
/// O coordenador de lote é genérico sobre esta trait; cada chamada recebe
/// só leitura da matriz e devolve uma árvore nova.
pub trait TreeDecoder: Sync {
    fn decode(&self, scores: &ScoreMatrix, length: usize) -> Result<DependencyTree, DecodeError>;
}

impl TreeDecoder for DecoderMode {
    fn decode(&self, scores: &ScoreMatrix, length: usize) -> Result<DependencyTree, DecodeError> {
        match self {
            DecoderMode::Projective => decode_projective(scores, length),
            DecoderMode::Arborescence => decode_arborescence(scores, length),
        }
    }
}

/// Melhor árvore projetiva sobre os tokens `0..length`.
///
/// Falha apenas com `length == 0` ou matriz menor que `length × length`;
/// scores `-∞` ou extremos nunca causam erro.
pub fn decode_projective(scores: &ScoreMatrix, length: usize) -> Result<DependencyTree, DecodeError> {
    let masked = scores.masked(length)?;
    Ok(eisner(&masked))
}

/// Melhor árvore geradora (não necessariamente projetiva) sobre os tokens `0..length`.
///
/// Falha também quando algum token não tem arco de entrada selecionável.
pub fn decode_arborescence(scores: &ScoreMatrix, length: usize) -> Result<DependencyTree, DecodeError> {
    let masked = scores.masked(length)?;
    chu_liu_edmonds(&masked)
}

/// Escolha gulosa: para cada dependente, o head de maior score (empate: menor índice).
///
/// O resultado **não** é necessariamente uma árvore (pode ter ciclos). Serve
/// para diagnóstico: comparar com a árvore decodificada mostra quantas
/// escolhas locais a restrição estrutural precisou desfazer.
/// Dependentes sem nenhum arco selecionável ficam com `ROOT`.
pub fn greedy_heads(scores: &ScoreMatrix, length: usize) -> Result<Vec<usize>, DecodeError> {
    let masked = scores.masked(length)?;
    let mut heads = vec![ROOT; length];
    for (d, head) in heads.iter_mut().enumerate().skip(1) {
        let mut best = f64::NEG_INFINITY;
        for h in 0..length {
            let score = masked.get(h, d);
            if is_selectable(score) && score > best {
                best = score;
                *head = h;
            }
        }
    }
    Ok(heads)
}
