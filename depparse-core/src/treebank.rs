//! # Amostras de Treebank em Português
//!
//! Sentenças anotadas manualmente no estilo Universal Dependencies: classe
//! gramatical (UPOS) e head de cada token. O `ROOT` é o índice 0 e não
//! aparece na lista de tokens.
//!
//! Usadas pela demonstração web e pelos testes do pipeline. A última sentença
//! não-projetiva existe para mostrar a diferença entre os dois decodificadores.

/// Uma sentença anotada com a árvore gold.
pub struct TreebankSentence {
    /// Texto original.
    pub text: &'static str,
    /// Domínio temático.
    pub domain: &'static str,
    /// Triplas (palavra, UPOS, head). Tokens numerados a partir de 1.
    /// Exemplo: `[("Ela", "PRON", 2), ("leu", "VERB", 0)]`
    pub tokens: &'static [(&'static str, &'static str, usize)],
}

impl TreebankSentence {
    /// Comprimento incluindo o `ROOT`.
    pub fn len(&self) -> usize {
        self.tokens.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn words(&self) -> Vec<&'static str> {
        self.tokens.iter().map(|&(w, _, _)| w).collect()
    }

    pub fn pos_tags(&self) -> Vec<&'static str> {
        self.tokens.iter().map(|&(_, p, _)| p).collect()
    }

    /// Vetor de heads completo, com `heads[0] = ROOT`.
    pub fn gold_heads(&self) -> Vec<usize> {
        std::iter::once(0)
            .chain(self.tokens.iter().map(|&(_, _, h)| h))
            .collect()
    }
}

/// Retorna todas as sentenças de amostra.
pub fn get_treebank() -> Vec<TreebankSentence> {
    vec![
        // ===== SAÚDE =====
        TreebankSentence {
            text: "A Fiocruz desenvolveu a vacina.",
            domain: "saúde",
            tokens: &[
                ("A", "DET", 2), ("Fiocruz", "PROPN", 3), ("desenvolveu", "VERB", 0),
                ("a", "DET", 5), ("vacina", "NOUN", 3), (".", "PUNCT", 3),
            ],
        },
        TreebankSentence {
            text: "Pesquisadores brasileiros publicaram um estudo sobre vacinas.",
            domain: "ciência",
            tokens: &[
                ("Pesquisadores", "NOUN", 3), ("brasileiros", "ADJ", 1), ("publicaram", "VERB", 0),
                ("um", "DET", 5), ("estudo", "NOUN", 3), ("sobre", "ADP", 7),
                ("vacinas", "NOUN", 5), (".", "PUNCT", 3),
            ],
        },
        // ===== ESPORTES =====
        TreebankSentence {
            text: "O Brasil venceu a Argentina no Maracanã.",
            domain: "esportes",
            tokens: &[
                ("O", "DET", 2), ("Brasil", "PROPN", 3), ("venceu", "VERB", 0),
                ("a", "DET", 5), ("Argentina", "PROPN", 3), ("no", "ADP", 7),
                ("Maracanã", "PROPN", 3), (".", "PUNCT", 3),
            ],
        },
        // ===== ECONOMIA =====
        TreebankSentence {
            text: "O Banco Central manteve a taxa de juros.",
            domain: "economia",
            tokens: &[
                ("O", "DET", 2), ("Banco", "PROPN", 4), ("Central", "PROPN", 2),
                ("manteve", "VERB", 0), ("a", "DET", 6), ("taxa", "NOUN", 4),
                ("de", "ADP", 8), ("juros", "NOUN", 6), (".", "PUNCT", 4),
            ],
        },
        // ===== COTIDIANO =====
        TreebankSentence {
            text: "Ela leu o livro ontem.",
            domain: "cotidiano",
            tokens: &[
                ("Ela", "PRON", 2), ("leu", "VERB", 0), ("o", "DET", 4),
                ("livro", "NOUN", 2), ("ontem", "ADV", 2), (".", "PUNCT", 2),
            ],
        },
        TreebankSentence {
            text: "A estudante chegou cedo e saiu tarde.",
            domain: "cotidiano",
            tokens: &[
                ("A", "DET", 2), ("estudante", "NOUN", 3), ("chegou", "VERB", 0),
                ("cedo", "ADV", 3), ("e", "CCONJ", 6), ("saiu", "VERB", 3),
                ("tarde", "ADV", 6), (".", "PUNCT", 3),
            ],
        },
        TreebankSentence {
            text: "Chove.",
            domain: "cotidiano",
            tokens: &[("Chove", "VERB", 0), (".", "PUNCT", 1)],
        },
        // ===== NÃO-PROJETIVA =====
        // "Que livro" é objeto de "leu", mas o arco cruza o de "disse".
        TreebankSentence {
            text: "Que livro você disse que leu?",
            domain: "não-projetiva",
            tokens: &[
                ("Que", "DET", 2), ("livro", "NOUN", 6), ("você", "PRON", 4),
                ("disse", "VERB", 0), ("que", "SCONJ", 6), ("leu", "VERB", 4),
                ("?", "PUNCT", 4),
            ],
        },
    ]
}
