//! # Scorer de Arcos
//!
//! Os decodificadores só enxergam a matriz `S[h][d]`. Quem a produz é um
//! [`ArcScorer`]: em produção seria a rede neural (biaffine sobre embeddings),
//! aqui há um scorer heurístico, determinístico, com pesos escritos à mão.
//!
//! ## Como os pesos foram escolhidos
//!
//! O [`DistanceScorer`] combina três sinais:
//! - **Afinidade de classes gramaticais**: `DET → NOUN`, `NOUN → VERB`, ...
//! - **Direção**: determinantes e preposições precedem o núcleo; adjetivos o seguem.
//! - **Distância**: arcos longos são penalizados linearmente.
//!
//! Os valores refletem intuições sobre o português, não foram treinados.

use std::collections::HashMap;

use crate::matrix::{ScoreMatrix, ROOT};

/// Produz a matriz de scores de uma sentença.
///
/// `words` e `pos` não incluem o `ROOT`; a matriz devolvida tem o `ROOT` na
/// posição 0, os tokens em `1..=words.len()` e padding até `size`. O padding
/// pode conter qualquer valor: os decodificadores o mascaram.
pub trait ArcScorer: Send + Sync {
    fn name(&self) -> &'static str;
    fn score(&self, words: &[&str], pos: &[&str], size: usize) -> ScoreMatrix;
}

/// Scorer heurístico baseado em classes gramaticais e distância.
pub struct DistanceScorer {
    /// `(pos do head, pos do dependente) → peso`
    affinity: HashMap<(String, String), f64>,
    /// Peso de cada classe como filha direta do `ROOT`.
    root_affinity: HashMap<String, f64>,
    /// Bônus quando o dependente está do lado "esperado" do head.
    direction_bonus: f64,
    /// Penalidade por posição de distância além da primeira.
    distance_penalty: f64,
}

impl DistanceScorer {
    pub fn new() -> Self {
        Self {
            affinity: HashMap::new(),
            root_affinity: HashMap::new(),
            direction_bonus: 1.0,
            distance_penalty: 0.4,
        }
    }

    /// Constrói o scorer padrão com pesos heurísticos para o português.
    pub fn build() -> Self {
        let mut scorer = Self::new();

        // --- Núcleo da oração ---
        scorer.set_root_affinity("VERB", 4.0);
        scorer.set_root_affinity("AUX", 1.5);
        scorer.set_root_affinity("NOUN", 0.5);

        // --- Argumentos do verbo ---
        scorer.set_affinity("VERB", "NOUN", 2.5);
        scorer.set_affinity("VERB", "PROPN", 2.5);
        scorer.set_affinity("VERB", "PRON", 2.5);
        scorer.set_affinity("VERB", "ADV", 2.0);
        scorer.set_affinity("VERB", "AUX", 2.0);
        scorer.set_affinity("VERB", "PUNCT", 1.5);
        scorer.set_affinity("VERB", "VERB", 1.0);
        scorer.set_affinity("VERB", "SCONJ", 0.5);

        // --- Sintagma nominal ---
        scorer.set_affinity("NOUN", "DET", 3.0);
        scorer.set_affinity("PROPN", "DET", 3.0);
        scorer.set_affinity("NOUN", "ADJ", 2.5);
        scorer.set_affinity("PROPN", "PROPN", 1.5);
        scorer.set_affinity("NOUN", "NOUN", 1.0);

        // UD: a preposição depende do nome que ela introduz
        scorer.set_affinity("NOUN", "ADP", 2.0);
        scorer.set_affinity("PROPN", "ADP", 2.0);

        // Coordenação e subordinação ficam presas ao verbo seguinte
        scorer.set_affinity("VERB", "CCONJ", 1.5);

        scorer
    }

    pub fn set_affinity(&mut self, head_pos: &str, dep_pos: &str, weight: f64) {
        self.affinity
            .insert((head_pos.to_string(), dep_pos.to_string()), weight);
    }

    pub fn set_root_affinity(&mut self, pos: &str, weight: f64) {
        self.root_affinity.insert(pos.to_string(), weight);
    }

    fn arc_score(&self, pos: &[&str], head: usize, dep: usize) -> f64 {
        let dep_pos = pos.get(dep - 1).copied().unwrap_or("X");
        if head == ROOT {
            return self.root_affinity.get(dep_pos).copied().unwrap_or(-1.0);
        }
        let head_pos = pos.get(head - 1).copied().unwrap_or("X");
        let mut score = self
            .affinity
            .get(&(head_pos.to_string(), dep_pos.to_string()))
            .copied()
            .unwrap_or(0.0);

        let dep_precedes = dep < head;
        let expected = match dep_pos {
            "DET" | "ADP" | "PRON" | "CCONJ" | "SCONJ" => Some(true),
            "ADJ" | "PUNCT" => Some(false),
            _ => None,
        };
        if expected == Some(dep_precedes) {
            score += self.direction_bonus;
        }

        let distance = head.abs_diff(dep) as f64;
        score - self.distance_penalty * (distance - 1.0)
    }
}

impl Default for DistanceScorer {
    fn default() -> Self {
        Self::build()
    }
}

impl ArcScorer for DistanceScorer {
    fn name(&self) -> &'static str {
        "distance"
    }

    fn score(&self, words: &[&str], pos: &[&str], size: usize) -> ScoreMatrix {
        let n = words.len() + 1;
        let size = size.max(n);
        ScoreMatrix::from_fn(size, |h, d| {
            if h >= n || d >= n || d == ROOT || h == d {
                // padding, arcos para o ROOT e laços: a máscara descarta
                0.0
            } else {
                self.arc_score(pos, h, d)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{DecoderMode, TreeDecoder};

    #[test]
    fn test_matrix_shape_and_padding() {
        let scorer = DistanceScorer::build();
        let s = scorer.score(&["Ela", "leu"], &["PRON", "VERB"], 5);
        assert_eq!(s.size(), 5);
        assert_eq!(scorer.score(&["Ela", "leu"], &["PRON", "VERB"], 0).size(), 3);
    }

    #[test]
    fn test_verb_is_preferred_root() {
        let scorer = DistanceScorer::build();
        let s = scorer.score(&["Ela", "leu"], &["PRON", "VERB"], 3);
        assert!(s.get(ROOT, 2) > s.get(ROOT, 1));
        assert!(s.get(2, 1) > s.get(1, 2));
    }

    #[test]
    fn test_simple_sentence_is_parsed() {
        let scorer = DistanceScorer::build();
        let words = ["Ela", "leu", "o", "livro", "."];
        let pos = ["PRON", "VERB", "DET", "NOUN", "PUNCT"];
        let s = scorer.score(&words, &pos, 6);
        let tree = DecoderMode::Projective.decode(&s, 6).unwrap();
        assert_eq!(tree.heads(), &[0, 2, 0, 4, 2, 2]);
    }

    #[test]
    fn test_distance_penalty() {
        let scorer = DistanceScorer::build();
        let words = ["a", "b", "c", "d"];
        let pos = ["NOUN", "X", "X", "VERB"];
        let s = scorer.score(&words, &pos, 5);
        let near = scorer.score(&["a", "d"], &["NOUN", "VERB"], 3);
        assert!(near.get(2, 1) > s.get(4, 1));
    }
}
