//! # depparse-core — Decodificação de Árvores de Dependência
//!
//! Este crate transforma matrizes de scores de arcos `S[h][d]` (produzidas por
//! um modelo qualquer) em árvores de dependência e calcula a hinge loss
//! estruturada usada no treino.
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Entrada**: lote de matrizes `[head][dependente]` com padding e o comprimento real de cada sentença.
//! 2.  **Máscara** ([`matrix`]): cópia `n × n` por sentença, sem padding, laços ou arcos para o `ROOT`.
//! 3.  **Decodificação** ([`decoder`]):
//!     *   **Eisner** ([`eisner`]): melhor árvore projetiva, `O(n³)`.
//!     *   **Chu-Liu/Edmonds** ([`chu_liu`]): melhor árvore sem restrição de cruzamento.
//! 4.  **Lote** ([`batch`]): uma tarefa por sentença num pool `rayon`, resultados na ordem de entrada.
//! 5.  **Loss** ([`loss`]): `max(0, 1 - real + decoded)` por sentença, somada no lote.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use depparse_core::{decode_batch, margin_loss, DecoderMode, ScoreMatrix};
//!
//! // 1. Matriz de um lote com padding (tamanho 4, sentença de 3 posições)
//! let mut scores = ScoreMatrix::new(4);
//! scores.set(0, 1, 2.0);
//! scores.set(2, 1, 5.0);
//! scores.set(0, 2, 3.0);
//! scores.set(1, 2, 1.0);
//!
//! // 2. Decodifica o lote
//! let trees = decode_batch(&[scores.clone()], &[3], DecoderMode::Projective).unwrap();
//! assert_eq!(trees[0].heads(), &[0, 2, 0]);
//!
//! // 3. Compara com a árvore gold
//! let loss = margin_loss(&scores, &[0, 2, 0], trees[0].heads(), 3).unwrap();
//! assert_eq!(loss, 1.0);
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: Orquestrador que conecta scorer, decodificação e loss.
//! - [`scorer`]: Origem das matrizes de scores.
//! - [`treebank`]: Sentenças anotadas para demonstração e testes.

pub mod batch;
pub mod chu_liu;
pub mod decoder;
pub mod eisner;
pub mod error;
pub mod loss;
pub mod matrix;
pub mod pipeline;
pub mod scorer;
pub mod tree;
pub mod treebank;

#[cfg(test)]
mod test_utils;

pub use batch::{decode_batch, BatchDecoder, DecodeConfig};
pub use decoder::{decode_arborescence, decode_projective, greedy_heads, DecoderMode, TreeDecoder};
pub use error::DecodeError;
pub use loss::{batch_margin_loss, margin_loss, sentence_margin_loss, BatchLoss, SentenceLoss};
pub use matrix::{ScoreMatrix, ROOT};
pub use pipeline::{ParseReport, ParsedSentence, ParserPipeline, PipelineEvent, SentenceInput};
pub use scorer::{ArcScorer, DistanceScorer};
pub use tree::DependencyTree;
