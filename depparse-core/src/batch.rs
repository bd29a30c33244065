//! # Decodificação em Lote
//!
//! Decodificar é puramente CPU (a programação dinâmica e as contrações não
//! ganham nada com o acelerador usado pelo scorer) e cada sentença é
//! independente das demais. O coordenador então:
//!
//! 1. cria, para cada sentença, uma cópia própria e mascarada da sua matriz;
//! 2. despacha uma tarefa por sentença num pool `rayon` de tamanho fixo;
//! 3. espera **todas** terminarem (barreira completa, sem resultados parciais);
//! 4. remonta os resultados pelo índice original, não pela ordem de conclusão.
//!
//! Se qualquer sentença falhar, o lote inteiro falha com
//! [`DecodeError::BatchFailure`] apontando o índice: uma árvore faltando
//! desalinharia o lote em relação às árvores gold.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decoder::{DecoderMode, TreeDecoder};
use crate::error::DecodeError;
use crate::matrix::ScoreMatrix;
use crate::tree::DependencyTree;

/// Configuração da decodificação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Algoritmo usado em todo o lote.
    pub mode: DecoderMode,
    /// Número de workers. `None` (ou 0) usa o paralelismo disponível na máquina.
    pub workers: Option<usize>,
}

impl DecodeConfig {
    pub fn new(mode: DecoderMode) -> Self {
        Self { mode, workers: None }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Lê a configuração de um JSON (campos ausentes assumem o padrão).
    ///
    /// ```json
    /// { "mode": "chuliu", "workers": 4 }
    /// ```
    pub fn from_json(json: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(json)
            .map_err(|e| DecodeError::invalid_input(format!("configuração inválida: {e}")))
    }

    /// Tamanho efetivo do pool.
    pub fn worker_count(&self) -> usize {
        match self.workers {
            Some(n) if n > 0 => n,
            _ => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Coordenador de decodificação em lote com pool de workers próprio.
///
/// O pool é criado uma vez e reutilizado; cada lote o ocupa do despacho
/// até a barreira final.
pub struct BatchDecoder {
    config: DecodeConfig,
    pool: ThreadPool,
}

impl BatchDecoder {
    pub fn new(config: DecodeConfig) -> Result<Self, DecodeError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_count())
            .thread_name(|i| format!("depparse-decode-{i}"))
            .build()
            .map_err(|e| DecodeError::WorkerPool {
                reason: e.to_string(),
            })?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decodifica o lote com o algoritmo configurado.
    pub fn decode_batch(
        &self,
        batch: &[ScoreMatrix],
        lengths: &[usize],
    ) -> Result<Vec<DependencyTree>, DecodeError> {
        self.decode_batch_with(&self.config.mode, batch, lengths)
    }

    /// Decodifica o lote com um decodificador arbitrário.
    ///
    /// A saída `i` corresponde sempre à entrada `i`.
    pub fn decode_batch_with<D: TreeDecoder + ?Sized>(
        &self,
        decoder: &D,
        batch: &[ScoreMatrix],
        lengths: &[usize],
    ) -> Result<Vec<DependencyTree>, DecodeError> {
        if batch.len() != lengths.len() {
            return Err(DecodeError::invalid_input(format!(
                "lote com {} matrizes mas {} comprimentos",
                batch.len(),
                lengths.len()
            )));
        }

        // Cada tarefa recebe a sua cópia; nada mutável é compartilhado.
        let jobs = batch
            .iter()
            .zip(lengths)
            .enumerate()
            .map(|(i, (scores, &length))| {
                scores
                    .masked(length)
                    .map(|owned| (owned, length))
                    .map_err(|e| batch_failure(i, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            sentences = jobs.len(),
            workers = self.pool.current_num_threads(),
            "decodificando lote"
        );

        let results: Vec<Result<DependencyTree, DecodeError>> = self.pool.install(|| {
            jobs.into_par_iter()
                .map(|(scores, length)| decoder.decode(&scores, length))
                .collect()
        });

        let mut trees = Vec::with_capacity(results.len());
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(tree) => trees.push(tree),
                Err(e) => {
                    warn!(sentence = i, error = %e, "sentença falhou; lote descartado");
                    return Err(batch_failure(i, e));
                }
            }
        }
        Ok(trees)
    }
}

fn batch_failure(sentence: usize, source: DecodeError) -> DecodeError {
    DecodeError::BatchFailure {
        sentence,
        source: Box::new(source),
    }
}

/// Atalho: cria um pool para este lote, decodifica e o libera.
pub fn decode_batch(
    batch: &[ScoreMatrix],
    lengths: &[usize],
    mode: DecoderMode,
) -> Result<Vec<DependencyTree>, DecodeError> {
    BatchDecoder::new(DecodeConfig::new(mode))?.decode_batch(batch, lengths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    /// Decodificador lento: quanto menor a sentença, mais demora, invertendo a ordem de conclusão.
    struct SlowDecoder {
        finished: Mutex<Vec<usize>>,
    }

    impl TreeDecoder for SlowDecoder {
        fn decode(&self, scores: &ScoreMatrix, length: usize) -> Result<DependencyTree, DecodeError> {
            thread::sleep(Duration::from_millis(40 * (8 - length as u64)));
            let tree = DecoderMode::Projective.decode(scores, length)?;
            self.finished.lock().unwrap().push(length);
            Ok(tree)
        }
    }

    fn chain_matrix(size: usize) -> ScoreMatrix {
        // Prefere a cadeia ROOT → 1 → 2 → ...
        ScoreMatrix::from_fn(size, |h, d| if d == h + 1 { 1.0 } else { 0.0 })
    }

    #[test]
    fn test_batch_preserves_input_order() {
        let lengths = vec![2, 3, 4, 5, 6];
        let batch: Vec<ScoreMatrix> = lengths.iter().map(|_| chain_matrix(6)).collect();
        let decoder = SlowDecoder {
            finished: Mutex::new(Vec::new()),
        };
        let coordinator = BatchDecoder::new(DecodeConfig::default().with_workers(5)).unwrap();

        let trees = coordinator.decode_batch_with(&decoder, &batch, &lengths).unwrap();

        assert_eq!(trees.len(), 5);
        for (tree, &length) in trees.iter().zip(&lengths) {
            assert_eq!(tree.len(), length);
            let expected: Vec<usize> = (0..length).map(|d| d.saturating_sub(1)).collect();
            assert_eq!(tree.heads(), expected.as_slice());
        }
        // a conclusão saiu invertida (a menor sentença, mais lenta, por último)
        let finished = decoder.finished.lock().unwrap().clone();
        assert_eq!(finished.len(), 5);
        assert_eq!(finished[0], 6);
        assert_ne!(finished, lengths);
    }

    #[test]
    fn test_batch_failure_names_sentence() {
        let mut broken = ScoreMatrix::new(3);
        broken.set(0, 1, 1.0);
        let batch = vec![chain_matrix(3), broken, chain_matrix(3)];
        let err = decode_batch(&batch, &[3, 3, 3], DecoderMode::Arborescence).unwrap_err();
        assert_eq!(err.failed_sentence(), Some(1));
        match err {
            DecodeError::BatchFailure { source, .. } => {
                assert!(matches!(*source, DecodeError::InvalidInput { .. }))
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_length_fails_before_dispatch() {
        let batch = vec![chain_matrix(3), chain_matrix(3)];
        let err = decode_batch(&batch, &[3, 4], DecoderMode::Projective).unwrap_err();
        assert_eq!(err.failed_sentence(), Some(1));
    }

    #[test]
    fn test_mismatched_lengths_vector() {
        let batch = vec![chain_matrix(3)];
        let err = decode_batch(&batch, &[3, 3], DecoderMode::Projective).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidInput { .. }));
    }

    #[test]
    fn test_empty_batch() {
        assert!(decode_batch(&[], &[], DecoderMode::Projective).unwrap().is_empty());
    }

    #[test]
    fn test_batch_matches_sequential() {
        let batch: Vec<ScoreMatrix> = (0..8)
            .map(|k| ScoreMatrix::from_fn(5, |h, d| ((h * 7 + d * 3 + k) % 5) as f64))
            .collect();
        let lengths = vec![5, 4, 3, 5, 2, 1, 5, 4];
        for mode in [DecoderMode::Projective, DecoderMode::Arborescence] {
            let parallel = decode_batch(&batch, &lengths, mode).unwrap();
            for (i, tree) in parallel.iter().enumerate() {
                assert_eq!(tree, &mode.decode(&batch[i], lengths[i]).unwrap());
            }
        }
    }

    #[test]
    fn test_config_from_json() {
        let config = DecodeConfig::from_json(r#"{"mode": "chuliu", "workers": 2}"#).unwrap();
        assert_eq!(config.mode, DecoderMode::Arborescence);
        assert_eq!(config.worker_count(), 2);
        let config = DecodeConfig::from_json("{}").unwrap();
        assert_eq!(config, DecodeConfig::default());
        assert!(config.worker_count() >= 1);
        assert!(DecodeConfig::from_json("{\"mode\": 3}").is_err());
    }
}
