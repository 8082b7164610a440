//! `ProcessDecisionLogic` (§4.7 "Combined entry point"): runs sub-flow A
//! (identity resolution) then sub-flow B (directive classification),
//! merging their outcomes per the contract: a Warned from A carries
//! forward; a cancellation in B after A completed downgrades the combined
//! result to Warned rather than discarding A's work.

use std::sync::Arc;

use compliance_core::cancel::StageContext;
use compliance_core::model::{ComplianceAction, Expediente, Persona};
use compliance_core::outcome::{Outcome, Warned};
use compliance_db::AuditRepository;

use crate::directive::{classify_legal_directives, LegalDirectiveClassifier};
use crate::identity::{resolve_personas, PersonIdentityResolver};

/// Combined output of sub-flows A and B.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionLogicResult {
    pub personas: Vec<Persona>,
    pub actions: Vec<ComplianceAction>,
}

/// Run sub-flow A then sub-flow B. See module docs for the merge contract.
pub async fn process_decision_logic(
    resolver: &dyn PersonIdentityResolver,
    classifier: &dyn LegalDirectiveClassifier,
    audit: &Arc<dyn AuditRepository>,
    stage_ctx: &StageContext,
    personas: &[Persona],
    directive_text: &str,
    expediente: Option<&Expediente>,
) -> Outcome<DecisionLogicResult> {
    let identity_outcome = resolve_personas(resolver, stage_ctx, personas).await;

    let (resolved_personas, mut warnings, mut confidence, mut is_warned) = match identity_outcome {
        Outcome::Cancelled => return Outcome::Cancelled,
        Outcome::Failure(e) => return Outcome::Failure(e),
        Outcome::Success(resolved) => (resolved, Vec::new(), 1.0, false),
        Outcome::Warned(Warned {
            value,
            warnings,
            confidence,
            ..
        }) => (value, warnings, confidence, true),
    };

    let directive_outcome =
        classify_legal_directives(classifier, audit, stage_ctx, directive_text, expediente).await;

    match directive_outcome {
        Outcome::Cancelled => {
            // B cancelled mid-run but A completed: downgrade to Warned
            // rather than discarding A's resolved personas (§4.7).
            warnings.push("classification cancelled".to_string());
            Outcome::Warned(Warned::new(
                DecisionLogicResult {
                    personas: resolved_personas,
                    actions: Vec::new(),
                },
                warnings,
                confidence,
            ))
        }
        Outcome::Failure(e) => Outcome::Failure(e),
        Outcome::Success(actions) => {
            let result = DecisionLogicResult {
                personas: resolved_personas,
                actions,
            };
            if is_warned {
                Outcome::Warned(Warned::new(result, warnings, confidence))
            } else {
                Outcome::Success(result)
            }
        }
        Outcome::Warned(w) => {
            // Directive classification itself does not currently synthesize
            // Warned outcomes (it is not enumerative, §4.3 contract 3), but
            // the merge handles it defensively: warnings union, confidence
            // takes the minimum of the two stages.
            warnings.extend(w.warnings);
            confidence = confidence.min(w.confidence);
            Outcome::Warned(Warned::new(
                DecisionLogicResult {
                    personas: resolved_personas,
                    actions: w.value,
                },
                warnings,
                confidence,
            ))
        }
    }
}
