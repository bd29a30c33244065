//! # Erros de Decodificação
//!
//! Decodificar é uma função pura e determinística: repetir a chamada com a
//! mesma entrada reproduz a mesma falha. Por isso nenhum erro aqui é
//! recuperável internamente. O chamador precisa corrigir a entrada
//! (ex: refazer a máscara de padding) e tentar de novo.

use thiserror::Error;

/// Erros que podem ocorrer ao decodificar árvores ou calcular a loss.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Entrada malformada: comprimento zero, matriz menor que o comprimento
    /// declarado, token sem nenhum arco de entrada selecionável, ou árvore gold inválida.
    #[error("Entrada inválida: {reason}")]
    InvalidInput { reason: String },

    /// Uma sentença do lote falhou; o lote inteiro é descartado para não
    /// desalinhar as árvores das sentenças gold.
    #[error("Falha no lote: sentença {sentence}: {source}")]
    BatchFailure {
        sentence: usize,
        #[source]
        source: Box<DecodeError>,
    },

    /// O pool de workers não pôde ser criado.
    #[error("Falha ao criar o pool de workers: {reason}")]
    WorkerPool { reason: String },
}

impl DecodeError {
    /// Atalho para construir um [`DecodeError::InvalidInput`].
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        DecodeError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Índice da sentença que derrubou o lote, se houver.
    pub fn failed_sentence(&self) -> Option<usize> {
        match self {
            DecodeError::BatchFailure { sentence, .. } => Some(*sentence),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_failure_message_names_sentence() {
        let err = DecodeError::BatchFailure {
            sentence: 3,
            source: Box::new(DecodeError::invalid_input("comprimento zero")),
        };
        let msg = err.to_string();
        assert!(msg.contains("sentença 3"));
        assert!(msg.contains("comprimento zero"));
        assert_eq!(err.failed_sentence(), Some(3));
    }
}
