//! # Pipeline de Parsing — Orquestrador com Eventos Observáveis
//!
//! O pipeline coordena scorer, decodificação em lote e hinge loss, e emite
//! eventos via um canal Rust (`mpsc`), permitindo que o servidor WebSocket
//! transmita o resultado de cada sentença para o cliente.
//!
//! A decodificação é uma barreira: os eventos por sentença só saem depois
//! que o lote inteiro terminou, sempre na ordem de entrada.

use std::sync::mpsc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::batch::{BatchDecoder, DecodeConfig};
use crate::decoder::greedy_heads;
use crate::error::DecodeError;
use crate::loss::{sentence_margin_loss, SentenceLoss};
use crate::matrix::ScoreMatrix;
use crate::scorer::{ArcScorer, DistanceScorer};
use crate::tree::attachment_score;
use crate::treebank::TreebankSentence;

/// Uma sentença de entrada: palavras, classes gramaticais e, opcionalmente, a árvore gold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceInput {
    pub words: Vec<String>,
    pub pos: Vec<String>,
    /// Heads gold com `gold[0] = ROOT`. Quando presente, o pipeline calcula loss e UAS.
    #[serde(default)]
    pub gold: Option<Vec<usize>>,
}

impl SentenceInput {
    /// Comprimento incluindo o `ROOT`.
    pub fn len(&self) -> usize {
        self.words.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl From<&TreebankSentence> for SentenceInput {
    fn from(sentence: &TreebankSentence) -> Self {
        Self {
            words: sentence.words().into_iter().map(String::from).collect(),
            pos: sentence.pos_tags().into_iter().map(String::from).collect(),
            gold: Some(sentence.gold_heads()),
        }
    }
}

/// Resultado de uma sentença.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedSentence {
    pub index: usize,
    pub words: Vec<String>,
    /// `heads[d]` é o head do token `d`; `heads[0] = ROOT`.
    pub heads: Vec<usize>,
    pub score: f64,
    pub projective: bool,
    /// Quantos dependentes receberam um head diferente da escolha gulosa.
    pub greedy_overrides: usize,
    pub uas: Option<f64>,
    pub loss: Option<SentenceLoss>,
}

/// Eventos emitidos pelo pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// **Passo 1**: matrizes de scores produzidas para todo o lote.
    BatchScored {
        sentences: usize,
        /// Tamanho comum das matrizes (maior sentença do lote).
        padded_size: usize,
        scorer: String,
        decoder: String,
    },
    /// **Passo 2**: árvore final de uma sentença, em ordem de entrada.
    SentenceDecoded { sentence: ParsedSentence },
    /// **Conclusão**: lote inteiro processado.
    Done {
        total_sentences: usize,
        /// Soma das losses (apenas sentenças com gold).
        total_loss: Option<f64>,
        mean_uas: Option<f64>,
        processing_ms: u64,
    },
    /// **Falha**: o lote foi descartado.
    Error {
        message: String,
        sentence: Option<usize>,
    },
}

/// Resumo de uma execução síncrona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseReport {
    pub sentences: Vec<ParsedSentence>,
    pub total_loss: Option<f64>,
    pub mean_uas: Option<f64>,
}

/// O pipeline de parsing.
///
/// # Modos de Uso
/// - **Sync**: [`ParserPipeline::run`] para scripts e chamadas diretas.
/// - **Streaming**: [`ParserPipeline::run_streaming`] para UIs reativas (via WebSocket).
pub struct ParserPipeline {
    scorer: Box<dyn ArcScorer>,
    decoder: BatchDecoder,
}

impl ParserPipeline {
    /// Pipeline com o scorer heurístico padrão.
    pub fn new(config: DecodeConfig) -> Result<Self, DecodeError> {
        Self::with_scorer(Box::new(DistanceScorer::build()), config)
    }

    pub fn with_scorer(scorer: Box<dyn ArcScorer>, config: DecodeConfig) -> Result<Self, DecodeError> {
        Ok(Self {
            scorer,
            decoder: BatchDecoder::new(config)?,
        })
    }

    pub fn config(&self) -> &DecodeConfig {
        self.decoder.config()
    }

    /// Coordenador de lote usado pelo pipeline, para decodificar matrizes já prontas.
    pub fn batch_decoder(&self) -> &BatchDecoder {
        &self.decoder
    }

    /// Processa o lote de forma síncrona.
    pub fn run(&self, inputs: &[SentenceInput]) -> Result<ParseReport, DecodeError> {
        let start = Instant::now();
        let (report, _) = self.parse(inputs)?;
        info!(
            sentences = report.sentences.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "lote processado"
        );
        Ok(report)
    }

    /// Executa o pipeline enviando eventos pelo canal `tx`.
    ///
    /// # Fluxo de Eventos
    /// 1. `BatchScored`: matrizes prontas.
    /// 2. `SentenceDecoded` (Loop): uma por sentença, na ordem de entrada.
    /// 3. `Done`: totais do lote.
    ///
    /// Qualquer falha gera um único `Error` e nenhum resultado parcial.
    pub fn run_streaming(&self, inputs: &[SentenceInput], tx: mpsc::Sender<PipelineEvent>) {
        let start = Instant::now();

        match self.parse(inputs) {
            Ok((report, padded_size)) => {
                let _ = tx.send(PipelineEvent::BatchScored {
                    sentences: report.sentences.len(),
                    padded_size,
                    scorer: self.scorer.name().to_string(),
                    decoder: self.config().mode.name().to_string(),
                });
                let total_sentences = report.sentences.len();
                for sentence in report.sentences {
                    let _ = tx.send(PipelineEvent::SentenceDecoded { sentence });
                }
                let _ = tx.send(PipelineEvent::Done {
                    total_sentences,
                    total_loss: report.total_loss,
                    mean_uas: report.mean_uas,
                    processing_ms: start.elapsed().as_millis() as u64,
                });
            }
            Err(e) => {
                warn!(error = %e, "pipeline falhou");
                let _ = tx.send(PipelineEvent::Error {
                    message: e.to_string(),
                    sentence: e.failed_sentence(),
                });
            }
        }
    }

    fn parse(&self, inputs: &[SentenceInput]) -> Result<(ParseReport, usize), DecodeError> {
        // === Passo 1: Scoring (uma matriz por sentença, todas do mesmo tamanho) ===
        let padded_size = inputs.iter().map(SentenceInput::len).max().unwrap_or(1);
        let mut batch = Vec::with_capacity(inputs.len());
        let mut lengths = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            if input.pos.len() != input.words.len() {
                return Err(DecodeError::BatchFailure {
                    sentence: i,
                    source: Box::new(DecodeError::invalid_input(format!(
                        "{} palavras mas {} classes gramaticais",
                        input.words.len(),
                        input.pos.len()
                    ))),
                });
            }
            let words: Vec<&str> = input.words.iter().map(String::as_str).collect();
            let pos: Vec<&str> = input.pos.iter().map(String::as_str).collect();
            batch.push(self.scorer.score(&words, &pos, padded_size));
            lengths.push(input.len());
        }

        // === Passo 2: Decodificação (barreira) ===
        let trees = self.decoder.decode_batch(&batch, &lengths)?;

        // === Passo 3: Diagnóstico e loss ===
        let mut sentences = Vec::with_capacity(trees.len());
        for (i, tree) in trees.into_iter().enumerate() {
            let length = lengths[i];
            let scores: &ScoreMatrix = &batch[i];
            let greedy = greedy_heads(scores, length)?;
            let greedy_overrides = (1..length).filter(|&d| greedy[d] != tree.heads()[d]).count();

            let (uas, loss) = match &inputs[i].gold {
                Some(gold) => {
                    let loss = sentence_margin_loss(scores, gold, tree.heads(), length).map_err(
                        |e| DecodeError::BatchFailure {
                            sentence: i,
                            source: Box::new(e),
                        },
                    )?;
                    (Some(attachment_score(gold, tree.heads(), length)), Some(loss))
                }
                None => (None, None),
            };

            sentences.push(ParsedSentence {
                index: i,
                words: inputs[i].words.clone(),
                score: tree.score(scores),
                projective: tree.is_projective(),
                greedy_overrides,
                uas,
                loss,
                heads: tree.into_heads(),
            });
        }

        let losses: Vec<f64> = sentences
            .iter()
            .filter_map(|s| s.loss.as_ref().map(|l| l.loss))
            .collect();
        let total_loss = (!losses.is_empty()).then(|| losses.iter().sum::<f64>());
        let uas: Vec<f64> = sentences.iter().filter_map(|s| s.uas).collect();
        let mean_uas = (!uas.is_empty()).then(|| uas.iter().sum::<f64>() / uas.len() as f64);

        Ok((
            ParseReport {
                sentences,
                total_loss,
                mean_uas,
            },
            padded_size,
        ))
    }
}
