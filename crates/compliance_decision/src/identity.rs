//! Sub-flow A (§4.7): resolve person identities, then deduplicate the
//! resolved list by RFC-variant equivalence, falling back to name-triplet
//! equality when neither side has an RFC (Open Question (b)).

use async_trait::async_trait;
use compliance_core::cancel::StageContext;
use compliance_core::model::Persona;
use compliance_core::outcome::{partial_cancelled, Outcome};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity resolution failed: {0}")]
    ResolutionFailed(String),
}

/// External identity resolver collaborator (§6 `PersonIdentityResolver`).
#[async_trait]
pub trait PersonIdentityResolver: Send + Sync {
    async fn resolve_identity(&self, persona: &Persona) -> Result<Persona, IdentityError>;
}

/// Two personas collide iff their `RfcVariants` sets intersect on a
/// non-empty RFC; otherwise they collide iff their name triplets match.
fn collides(a: &Persona, b: &Persona) -> bool {
    let shared_rfc = a
        .rfc_variants
        .iter()
        .any(|rfc| !rfc.is_empty() && b.rfc_variants.contains(rfc));
    if !a.rfc_variants.is_empty() && !b.rfc_variants.is_empty() {
        return shared_rfc;
    }
    a.name_triplet_key() == b.name_triplet_key()
}

/// Merge `resolved` into a deduplicated list, keeping the first-seen
/// persona of each collision group and folding later RFC variants into it.
pub fn deduplicate(resolved: Vec<Persona>) -> Vec<Persona> {
    let mut groups: Vec<Persona> = Vec::new();
    for persona in resolved {
        match groups.iter_mut().find(|existing| collides(existing, &persona)) {
            Some(existing) => {
                existing.rfc_variants.extend(persona.rfc_variants);
            }
            None => groups.push(persona),
        }
    }
    groups
}

/// Sub-flow A: resolve every persona's identity, logging a warning and
/// continuing on a per-item failure, then deduplicate the resolved list.
pub async fn resolve_personas(
    resolver: &dyn PersonIdentityResolver,
    stage_ctx: &StageContext,
    personas: &[Persona],
) -> Outcome<Vec<Persona>> {
    let total = personas.len();
    let mut resolved = Vec::with_capacity(total);

    for (index, persona) in personas.iter().enumerate() {
        if stage_ctx.cancellation.is_cancelled() {
            let deduped = deduplicate(resolved);
            return partial_cancelled(deduped, index, total, "identity resolution cancelled");
        }

        match resolver.resolve_identity(persona).await {
            Ok(resolved_persona) => resolved.push(resolved_persona),
            Err(e) => warn!(persona = %persona.nombre, error = %e, "per-persona resolution failure, continuing"),
        }
    }

    Outcome::Success(deduplicate(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    use compliance_core::model::{PersonaTipo, ValidationState};
    use compliance_ids::ParteId;

    fn persona(nombre: &str, rfc_variants: &[&str]) -> Persona {
        Persona {
            parte_id: ParteId::new(),
            nombre: nombre.to_string(),
            paterno: None,
            materno: None,
            rfc: rfc_variants.first().map(|s| s.to_string()),
            rfc_variants: rfc_variants.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
            persona_tipo: PersonaTipo::Fisica,
            caracter: None,
            relacion: None,
            domicilio: None,
            complementarios: HashMap::new(),
            validation: ValidationState::default(),
        }
    }

    struct AlwaysOk;
    #[async_trait]
    impl PersonIdentityResolver for AlwaysOk {
        async fn resolve_identity(&self, persona: &Persona) -> Result<Persona, IdentityError> {
            Ok(persona.clone())
        }
    }

    struct FailsOn(String);
    #[async_trait]
    impl PersonIdentityResolver for FailsOn {
        async fn resolve_identity(&self, persona: &Persona) -> Result<Persona, IdentityError> {
            if persona.nombre == self.0 {
                Err(IdentityError::ResolutionFailed("stub failure".to_string()))
            } else {
                Ok(persona.clone())
            }
        }
    }

    #[test]
    fn personas_sharing_an_rfc_variant_collide() {
        let a = persona("Juan Perez", &["AAAA800101XXX"]);
        let b = persona("J. Perez", &["AAAA800101XXX", "AAAA800101YYY"]);
        assert!(collides(&a, &b));
    }

    #[test]
    fn personas_with_no_rfc_fall_back_to_name_triplet() {
        let a = persona("Juan Perez", &[]);
        let b = persona("juan perez", &[]);
        assert!(collides(&a, &b));
    }

    #[test]
    fn different_rfcs_do_not_collide_even_with_similar_names() {
        let a = persona("Juan Perez", &["AAAA800101XXX"]);
        let b = persona("Juan Perez", &["BBBB800101XXX"]);
        assert!(!collides(&a, &b));
    }

    #[tokio::test]
    async fn per_persona_failure_is_logged_and_skipped() {
        let resolver = FailsOn("Bad Persona".to_string());
        let personas = vec![persona("Good Persona", &[]), persona("Bad Persona", &[])];
        let stage_ctx = StageContext::new_stage();
        let outcome = resolve_personas(&resolver, &stage_ctx, &personas).await;
        match outcome {
            Outcome::Success(resolved) => assert_eq!(resolved.len(), 1),
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_after_some_progress_is_warned_with_confidence() {
        let resolver = AlwaysOk;
        let personas = vec![persona("A", &[]), persona("B", &[])];
        let stage_ctx = StageContext::new_stage();
        stage_ctx.cancellation.cancel();
        let outcome = resolve_personas(&resolver, &stage_ctx, &personas).await;
        assert!(outcome.is_cancelled());
    }
}
