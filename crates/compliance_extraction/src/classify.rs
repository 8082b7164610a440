//! Classify step (§4.5): a rule/statistical classifier over
//! `ExtractedMetadata` producing a `ClassificationResult`. Invariant I3:
//! all six scores are always present in the result (and must be logged in
//! `ActionDetails` even when confidence is low).

use compliance_core::model::{ClassificationLabel, ClassificationResult, ExtractedMetadata, ScoreBoard};

pub trait Classifier: Send + Sync {
    fn classify(&self, metadata: &ExtractedMetadata) -> ClassificationResult;
}

/// Keyword-weighted rule classifier. Each label has a small set of
/// raw-text keywords; the score is the fraction of a label's keywords
/// found (case-insensitive), floored at a baseline so every label always
/// reports a value, never an absent one.
pub struct KeywordRuleClassifier {
    keywords: [(ClassificationLabel, &'static [&'static str]); 6],
}

impl Default for KeywordRuleClassifier {
    fn default() -> Self {
        Self {
            keywords: [
                (ClassificationLabel::Aseguramiento, &["aseguramiento", "asegurar"]),
                (ClassificationLabel::Desembargo, &["desembargo", "levantamiento"]),
                (ClassificationLabel::Documentacion, &["documentacion", "expediente"]),
                (ClassificationLabel::Informacion, &["informacion", "informe"]),
                (ClassificationLabel::Transferencia, &["transferencia", "transferir"]),
                (ClassificationLabel::OperacionesIlicitas, &["ilicita", "lavado"]),
            ],
        }
    }
}

impl Classifier for KeywordRuleClassifier {
    fn classify(&self, metadata: &ExtractedMetadata) -> ClassificationResult {
        let text = metadata.raw_text.to_lowercase();
        let mut raw_scores = [0.0f64; 6];
        for (index, (_, keywords)) in self.keywords.iter().enumerate() {
            let hits = keywords.iter().filter(|kw| text.contains(*kw)).count();
            raw_scores[index] = hits as f64 / keywords.len() as f64;
        }

        let scores = ScoreBoard {
            aseguramiento: raw_scores[0],
            desembargo: raw_scores[1],
            documentacion: raw_scores[2],
            informacion: raw_scores[3],
            transferencia: raw_scores[4],
            operaciones_ilicitas: raw_scores[5],
        };

        let level1 = scores.top_label();
        let confidence = (scores.get(level1) * 100.0).round().clamp(0.0, 100.0) as u8;

        ClassificationResult {
            level1,
            level2: None,
            confidence,
            scores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn metadata_with_text(text: &str) -> ExtractedMetadata {
        ExtractedMetadata {
            raw_text: text.to_string(),
            source_type: None,
            fields: HashMap::new(),
        }
    }

    #[test]
    fn classifies_by_keyword_match() {
        let classifier = KeywordRuleClassifier::default();
        let result = classifier.classify(&metadata_with_text("Solicitud de transferencia de fondos"));
        assert_eq!(result.level1, ClassificationLabel::Transferencia);
    }

    #[test]
    fn all_six_scores_are_always_present() {
        let classifier = KeywordRuleClassifier::default();
        let result = classifier.classify(&metadata_with_text("texto sin relacion alguna"));
        assert_eq!(result.scores.as_pairs().len(), 6);
    }

    #[test]
    fn empty_text_breaks_ties_by_fixed_order() {
        let classifier = KeywordRuleClassifier::default();
        let result = classifier.classify(&metadata_with_text(""));
        assert_eq!(result.level1, ClassificationLabel::Aseguramiento);
    }
}
