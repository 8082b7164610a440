//! Reference `compliance_decision` collaborators (§6). Identity resolution
//! is real normalization (RFC uppercasing/de-hyphenation, name trimming)
//! rather than a call to an external registry; directive classification is
//! the same keyword-weighted approach
//! `compliance_extraction::classify::KeywordRuleClassifier` uses for
//! document classification, aimed at `ComplianceActionType` instead of
//! `ClassificationLabel`.

use async_trait::async_trait;
use compliance_core::model::{ComplianceAction, ComplianceActionType, Cuenta, Expediente, Persona};
use compliance_decision::{DirectiveError, IdentityError, LegalDirectiveClassifier, PersonIdentityResolver};

/// Normalizes a persona's RFC into its canonical (hyphen-free, uppercase)
/// form and folds it into `rfc_variants`, without calling out to any
/// external registry — a real resolver would look the party up in a
/// government identity service; this is the "enough to exercise dedup" seam.
pub struct NormalizingIdentityResolver;

#[async_trait]
impl PersonIdentityResolver for NormalizingIdentityResolver {
    async fn resolve_identity(&self, persona: &Persona) -> Result<Persona, IdentityError> {
        let mut resolved = persona.clone();
        resolved.nombre = resolved.nombre.trim().to_string();
        if let Some(rfc) = &resolved.rfc {
            let canonical: String = rfc.chars().filter(|c| !c.is_whitespace() && *c != '-').collect::<String>().to_uppercase();
            if !canonical.is_empty() {
                resolved.rfc_variants.insert(canonical.clone());
                resolved.rfc_variants.insert(rfc.trim().to_uppercase());
                resolved.rfc = Some(canonical);
            }
        }
        Ok(resolved)
    }
}

const BLOCK_KEYWORDS: &[&str] = &["asegurar", "bloqueo", "congelar"];
const UNBLOCK_KEYWORDS: &[&str] = &["desembargo", "levantamiento", "liberar"];
const TRANSFER_KEYWORDS: &[&str] = &["transferencia", "transferir"];
const DOCUMENT_KEYWORDS: &[&str] = &["documentacion", "expediente"];
const INFORMATION_KEYWORDS: &[&str] = &["informacion", "informe"];

fn score(text: &str, keywords: &[&str]) -> u8 {
    let hits = keywords.iter().filter(|kw| text.contains(*kw)).count();
    ((hits as f64 / keywords.len() as f64) * 100.0).round() as u8
}

/// Keyword-weighted directive classifier. Picks the highest-scoring action
/// type; ties fall back to `Unknown` with zero confidence rather than
/// guessing, since §4.7 gives no tie-break rule for compliance actions the
/// way §4.5 does for `ClassificationLabel`.
pub struct KeywordDirectiveClassifier;

#[async_trait]
impl LegalDirectiveClassifier for KeywordDirectiveClassifier {
    async fn detect_instruments(&self, text: &str) -> Result<Vec<String>, DirectiveError> {
        let lower = text.to_lowercase();
        let mut instruments = Vec::new();
        for (label, keywords) in [
            ("oficio_bloqueo", BLOCK_KEYWORDS),
            ("oficio_desembargo", UNBLOCK_KEYWORDS),
            ("oficio_transferencia", TRANSFER_KEYWORDS),
        ] {
            if keywords.iter().any(|kw| lower.contains(kw)) {
                instruments.push(label.to_string());
            }
        }
        Ok(instruments)
    }

    async fn classify_directives(
        &self,
        text: &str,
        expediente: Option<&Expediente>,
    ) -> Result<Vec<ComplianceAction>, DirectiveError> {
        let lower = text.to_lowercase();
        let candidates = [
            (ComplianceActionType::Block, score(&lower, BLOCK_KEYWORDS)),
            (ComplianceActionType::Unblock, score(&lower, UNBLOCK_KEYWORDS)),
            (ComplianceActionType::Transfer, score(&lower, TRANSFER_KEYWORDS)),
            (ComplianceActionType::Document, score(&lower, DOCUMENT_KEYWORDS)),
            (ComplianceActionType::Information, score(&lower, INFORMATION_KEYWORDS)),
        ];

        let (action_type, confidence) = candidates
            .into_iter()
            .max_by_key(|(_, score)| *score)
            .filter(|(_, score)| *score > 0)
            .unwrap_or((ComplianceActionType::Unknown, 0));

        if action_type == ComplianceActionType::Unknown {
            return Ok(Vec::new());
        }

        let account_number = extract_account_number(text);
        Ok(vec![ComplianceAction {
            action_type,
            confidence,
            account_number: account_number.clone(),
            amount: None,
            expediente_origen: expediente.and_then(|e| e.numero_expediente.clone()),
            oficio_origen: expediente.and_then(|e| e.numero_oficio.clone()),
            cuenta: account_number.map(|numero| Cuenta { numero: Some(numero), institucion: None }),
        }])
    }
}

fn extract_account_number(text: &str) -> Option<String> {
    let re = regex::Regex::new(r"(?i)cuenta\s*:?\s*([0-9]{6,20})").ok()?;
    re.captures(text).map(|c| c[1].to_string())
}
