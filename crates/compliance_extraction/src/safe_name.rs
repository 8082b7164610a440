//! SafeName step (§4.5): derive a collision-safe filename from
//! {OriginalName, Classification.Level1/Level2, a short token from
//! Expediente}.

use compliance_core::model::ClassificationResult;

const MAX_LEN: usize = 120;

fn strip_forbidden(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

fn short_token(expediente_hint: Option<&str>) -> String {
    match expediente_hint {
        Some(hint) if !hint.trim().is_empty() => {
            let cleaned = strip_forbidden(hint.trim());
            cleaned.chars().take(12).collect()
        }
        _ => "sinexp".to_string(),
    }
}

/// Build `{level1}[_{level2}]_{expediente-token}_{original-stem}.{ext}`,
/// stripped of forbidden characters and clamped to [`MAX_LEN`].
pub fn safe_name(original_name: &str, classification: &ClassificationResult, expediente_hint: Option<&str>) -> String {
    let (stem, ext) = match original_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (original_name, None),
    };

    let level1 = format!("{:?}", classification.level1).to_lowercase();
    let mut parts = vec![level1];
    if let Some(level2) = &classification.level2 {
        parts.push(strip_forbidden(level2));
    }
    parts.push(short_token(expediente_hint));
    parts.push(strip_forbidden(stem));

    let mut name = parts.join("_");
    if let Some(ext) = ext {
        name.push('.');
        name.push_str(&strip_forbidden(ext));
    }

    if name.len() > MAX_LEN {
        name.truncate(MAX_LEN);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_core::model::{ClassificationLabel, ScoreBoard};

    fn sample_classification() -> ClassificationResult {
        ClassificationResult {
            level1: ClassificationLabel::Transferencia,
            level2: Some("internacional".to_string()),
            confidence: 80,
            scores: ScoreBoard {
                aseguramiento: 0.0,
                desembargo: 0.0,
                documentacion: 0.0,
                informacion: 0.0,
                transferencia: 0.9,
                operaciones_ilicitas: 0.0,
            },
        }
    }

    #[test]
    fn builds_a_name_with_all_components() {
        let name = safe_name("oficio 2025.pdf", &sample_classification(), Some("A/AS1-2025-001"));
        assert!(name.starts_with("transferencia_internacional_A_AS1-2025-0"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn strips_forbidden_characters() {
        let name = safe_name("ofi/cio:2025*.pdf", &sample_classification(), None);
        assert!(!name.contains('/'));
        assert!(!name.contains(':'));
        assert!(!name.contains('*'));
    }

    #[test]
    fn clamps_length() {
        let long_name = format!("{}.pdf", "a".repeat(500));
        let name = safe_name(&long_name, &sample_classification(), None);
        assert!(name.len() <= MAX_LEN);
    }

    #[test]
    fn missing_expediente_hint_falls_back() {
        let name = safe_name("oficio.pdf", &sample_classification(), None);
        assert!(name.contains("sinexp"));
    }
}
