//! Cross-module integration tests for the Decision Logic stage (§4.7),
//! exercising the combined entry point plus the review queue it feeds.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use compliance_core::cancel::StageContext;
use compliance_core::model::{
    ComplianceAction, ComplianceActionType, Expediente, Persona, PersonaTipo, ValidationState,
};
use compliance_core::outcome::Outcome;
use compliance_db::{AuditRepository, InMemoryAuditRepository, InMemoryReviewCaseRepository, ReviewCaseRepository};
use compliance_decision::{
    identify_review_cases, process_decision_logic, process_review_decision, queue_review_cases,
    DirectiveError, IdentityError, LegalDirectiveClassifier, PersonIdentityResolver,
};
use compliance_ids::{DecisionId, ParteId};

fn persona(nombre: &str) -> Persona {
    Persona {
        parte_id: ParteId::new(),
        nombre: nombre.to_string(),
        paterno: None,
        materno: None,
        rfc: None,
        rfc_variants: HashSet::new(),
        persona_tipo: PersonaTipo::Fisica,
        caracter: None,
        relacion: None,
        domicilio: None,
        complementarios: HashMap::new(),
        validation: ValidationState::default(),
    }
}

/// Resolver that cancels the shared token once `cancel_after` items have
/// been resolved, modelling S5's "cancel fires after item 4 of 10".
struct CancelAfterN {
    cancel_after: usize,
    seen: AtomicUsize,
    token: compliance_core::cancel::CancellationToken,
}

#[async_trait]
impl PersonIdentityResolver for CancelAfterN {
    async fn resolve_identity(&self, persona: &Persona) -> Result<Persona, IdentityError> {
        let count = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        if count == self.cancel_after {
            self.token.cancel();
        }
        Ok(persona.clone())
    }
}

struct NoDirectives;
#[async_trait]
impl LegalDirectiveClassifier for NoDirectives {
    async fn detect_instruments(&self, _text: &str) -> Result<Vec<String>, DirectiveError> {
        Ok(Vec::new())
    }
    async fn classify_directives(
        &self,
        _text: &str,
        _expediente: Option<&Expediente>,
    ) -> Result<Vec<ComplianceAction>, DirectiveError> {
        Ok(vec![ComplianceAction {
            action_type: ComplianceActionType::Block,
            confidence: 88,
            account_number: Some("001122".to_string()),
            amount: None,
            expediente_origen: None,
            oficio_origen: None,
            cuenta: None,
        }])
    }
}

/// S5 — cancelled mid-batch: a 10-person list, cancellation fires once
/// the resolver returns for item 4. The combined result must be Warned,
/// confidence=0.4, missingDataRatio=0.6, and mention "cancelled".
#[tokio::test]
async fn cancelled_mid_batch_person_resolution_yields_warned_with_exact_confidence() {
    let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::default());
    let stage_ctx = StageContext::new_stage();
    let personas: Vec<Persona> = (0..10).map(|i| persona(&format!("Persona {i}"))).collect();

    let resolver = CancelAfterN {
        cancel_after: 4,
        seen: AtomicUsize::new(0),
        token: stage_ctx.cancellation.clone(),
    };

    let outcome = process_decision_logic(&resolver, &NoDirectives, &audit, &stage_ctx, &personas, "", None).await;

    match outcome {
        Outcome::Warned(w) => {
            assert!(w.value.personas.len() <= 4);
            assert_eq!(w.confidence, 0.4);
            assert!((w.missing_data_ratio - 0.6).abs() < 1e-9);
            assert!(w.warnings.iter().any(|msg| msg.contains("cancelled")));
            // B never ran: the token was already cancelled before that call.
            assert!(w.value.actions.is_empty());
        }
        other => panic!("expected Warned, got {other:?}"),
    }
}

struct AlwaysOk;
#[async_trait]
impl PersonIdentityResolver for AlwaysOk {
    async fn resolve_identity(&self, persona: &Persona) -> Result<Persona, IdentityError> {
        Ok(persona.clone())
    }
}

/// Full success path: both sub-flows complete, producing resolved
/// personas and a Block action with account evidence.
#[tokio::test]
async fn full_decision_logic_run_resolves_personas_and_classifies_directives() {
    let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::default());
    let stage_ctx = StageContext::new_stage();
    let personas = vec![persona("Maria Lopez")];

    let outcome = process_decision_logic(
        &AlwaysOk,
        &NoDirectives,
        &audit,
        &stage_ctx,
        &personas,
        "bloquear la cuenta referida",
        None,
    )
    .await;

    let result = match outcome {
        Outcome::Success(result) => result,
        other => panic!("expected Success, got {other:?}"),
    };
    assert_eq!(result.personas.len(), 1);
    assert_eq!(result.actions.len(), 1);
    assert!(result.actions[0].has_account_evidence());

    let records = audit
        .query(
            chrono::Utc::now() - chrono::Duration::minutes(1),
            chrono::Utc::now() + chrono::Duration::minutes(1),
            None,
            None,
        )
        .await
        .unwrap();
    assert!(!records.is_empty());
}

/// Sub-flow C: a low-confidence/invalid record produces review cases,
/// which a reviewer can then resolve.
#[tokio::test]
async fn review_case_lifecycle_from_identification_to_resolution() {
    use compliance_core::model::UnifiedMetadataRecord;

    let mut record = UnifiedMetadataRecord::default();
    record.matched_fields.conflicting_fields = vec!["NumeroExpediente".to_string()];
    let reasons = identify_review_cases(&record, None, 60);
    assert!(!reasons.is_empty());

    let review_repo: Arc<dyn ReviewCaseRepository> = Arc::new(InMemoryReviewCaseRepository::default());
    let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::default());
    let stage_ctx = StageContext::new_stage();
    let file_id = compliance_ids::FileId::new();

    let cases = queue_review_cases(&review_repo, &audit, &stage_ctx, &file_id, &reasons).await;
    assert_eq!(cases.len(), reasons.len());

    let decision = compliance_core::model::ReviewDecision {
        decision_id: DecisionId::new(),
        case_id: cases[0].case_id.clone(),
        file_id: file_id.clone(),
        decision_type: "approve".to_string(),
        review_reason: cases[0].reason.clone(),
        reviewer_id: "analyst-7".to_string(),
    };
    process_review_decision(&review_repo, &audit, &stage_ctx, &decision).await.unwrap();

    let updated = review_repo.get_by_id(&cases[0].case_id).await.unwrap().unwrap();
    assert_eq!(updated.status, compliance_core::model::ReviewStatus::Resolved);
}
