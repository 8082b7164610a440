//! Field Matching (§4.6, C6): per-field reconciliation across every
//! source's observations, plus the two derived fields that depend on the
//! reconciled result.

use std::collections::HashMap;

use chrono::NaiveDate;
use compliance_core::calendar::add_business_days;
use compliance_core::model::{FieldMatch, FieldValue, MatchedFields};

/// Field-specific normalization (§4.6 step 2): trim, case-fold, and strip
/// the hyphens an RFC is sometimes copied with.
fn normalize(field_name: &str, value: &str) -> String {
    let trimmed = value.trim();
    if field_name.eq_ignore_ascii_case("rfc") {
        trimmed.replace('-', "").to_uppercase()
    } else {
        trimmed.to_lowercase()
    }
}

/// Reconcile one field's observations into a [`FieldMatch`], or `None` if
/// there were no observations (the field belongs in `MissingFields`).
pub fn match_field(field_name: &str, observations: &[FieldValue]) -> Option<FieldMatch> {
    if observations.is_empty() {
        return None;
    }

    let mut counts: HashMap<String, (usize, String)> = HashMap::new();
    for obs in observations {
        let key = normalize(field_name, &obs.value);
        counts.entry(key).or_insert_with(|| (0, obs.value.clone())).0 += 1;
    }

    let total = observations.len();
    let (matched_value, mode_count) = counts
        .values()
        .max_by_key(|(count, _)| *count)
        .map(|(count, original)| (original.clone(), *count))
        .expect("observations is non-empty");

    let agreement_level = mode_count as f64 / total as f64;
    let has_conflict = counts.len() > 1;

    Some(FieldMatch {
        matched_value,
        agreement_level,
        has_conflict,
        contributing_sources: observations.iter().map(|o| o.source_type).collect(),
    })
}

/// Reconcile a whole batch of fields, keyed by field name, into
/// [`MatchedFields`] (§4.6 steps 1-6).
pub fn match_fields(observations_by_field: &HashMap<String, Vec<FieldValue>>) -> MatchedFields {
    let mut fields = HashMap::new();
    let mut missing_fields = Vec::new();
    let mut conflicting_fields = Vec::new();

    for (field_name, observations) in observations_by_field {
        match match_field(field_name, observations) {
            Some(field_match) => {
                if field_match.has_conflict {
                    conflicting_fields.push(field_name.clone());
                }
                fields.insert(field_name.clone(), field_match);
            }
            None => missing_fields.push(field_name.clone()),
        }
    }

    let overall_agreement = if fields.is_empty() {
        0.0
    } else {
        fields.values().map(|m| m.agreement_level).sum::<f64>() / fields.len() as f64
    };

    missing_fields.sort();
    conflicting_fields.sort();

    MatchedFields {
        fields,
        missing_fields,
        conflicting_fields,
        overall_agreement,
    }
}

/// `FechaRecepcion <- AdditionalFields["FechaPublicacion"]`, if
/// `fecha_recepcion` is absent and the source value parses as a date
/// (§4.6 "Derived fields").
pub fn derive_fecha_recepcion(
    fecha_recepcion: Option<NaiveDate>,
    additional_fields: &HashMap<String, String>,
) -> Option<NaiveDate> {
    if fecha_recepcion.is_some() {
        return fecha_recepcion;
    }
    additional_fields
        .get("FechaPublicacion")
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
}

/// `FechaEstimadaConclusion <- FechaRecepcion + businessDays(DiasPlazo)`,
/// if both inputs are present.
pub fn derive_fecha_estimada_conclusion(
    fecha_recepcion: Option<NaiveDate>,
    additional_fields: &HashMap<String, String>,
    holidays: &[NaiveDate],
) -> Option<NaiveDate> {
    let start = fecha_recepcion?;
    let dias_plazo: i64 = additional_fields.get("DiasPlazo")?.trim().parse().ok()?;
    Some(add_business_days(start, dias_plazo, holidays))
}
