//! Shared completeness gate for the three Export operations (§4.8):
//! "Validation is recomputed before every export; any failed requirement
//! is a Failure with a description listing missing fields, before
//! touching the stream."

use compliance_core::model::UnifiedMetadataRecord;

/// Revalidate a copy of `record` and return it, or the list of missing
/// fields if it is not yet exportable.
pub fn revalidated(record: &UnifiedMetadataRecord) -> Result<UnifiedMetadataRecord, Vec<String>> {
    let mut copy = record.clone();
    copy.revalidate();
    if copy.validation.is_valid() {
        Ok(copy)
    } else {
        Err(copy.validation.missing.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_core::model::LegalSubdivisionKind;

    #[test]
    fn blank_numero_oficio_is_rejected_before_any_write() {
        let mut record = UnifiedMetadataRecord::default();
        record.expediente.numero_expediente = Some("A/AS1-2025-001".to_string());
        record.expediente.subdivision = LegalSubdivisionKind::Fiscal;
        record.expediente.fecha_recepcion = Some(chrono::NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
        // numero_oficio left blank

        let err = revalidated(&record).unwrap_err();
        assert!(err.contains(&"NumeroOficio".to_string()));
    }

    #[test]
    fn complete_record_passes() {
        let mut record = UnifiedMetadataRecord::default();
        record.expediente.numero_expediente = Some("A/AS1-2025-001".to_string());
        record.expediente.numero_oficio = Some("OF-001".to_string());
        record.expediente.subdivision = LegalSubdivisionKind::Fiscal;
        record.expediente.fecha_recepcion = Some(chrono::NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
        assert!(revalidated(&record).is_ok());
    }
}
