//! The PII pattern catalog.
//!
//! The standard catalog covers general identifiers (phone, email, SSN, …)
//! plus the care-context extensions (medications, diagnosis terms, facility
//! names, insurance and medical-record numbers).

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Kind of personally identifying information a pattern detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PiiKind {
    Phone,
    Email,
    Ssn,
    CreditCard,
    IpAddress,
    Name,
    Address,
    Date,
    ZipCode,
    Medication,
    Diagnosis,
    HealthcareFacility,
    Insurance,
    MedicalRecord,
}

impl PiiKind {
    /// The fixed replacement token for this kind.
    pub fn token(&self) -> &'static str {
        match self {
            PiiKind::Phone => "[PHONE]",
            PiiKind::Email => "[EMAIL]",
            PiiKind::Ssn => "[SSN]",
            PiiKind::CreditCard => "[CREDIT_CARD]",
            PiiKind::IpAddress => "[IP_ADDRESS]",
            PiiKind::Name => "[NAME]",
            PiiKind::Address => "[ADDRESS]",
            PiiKind::Date => "[DATE]",
            PiiKind::ZipCode => "[ZIP_CODE]",
            PiiKind::Medication => "[MEDICATION]",
            PiiKind::Diagnosis => "[DIAGNOSIS]",
            PiiKind::HealthcareFacility => "[HEALTHCARE_FACILITY]",
            PiiKind::Insurance => "[INSURANCE]",
            PiiKind::MedicalRecord => "[MEDICAL_RECORD]",
        }
    }
}

impl std::fmt::Display for PiiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Token without the brackets, e.g. `PHONE`.
        let token = self.token();
        write!(f, "{}", &token[1..token.len() - 1])
    }
}

/// A compiled pattern catalog: one regex per [`PiiKind`].
pub struct PatternCatalog {
    patterns: Vec<(PiiKind, Regex)>,
}

impl PatternCatalog {
    /// The full standard catalog, care-context extensions included.
    pub fn standard() -> Self {
        let table: &[(PiiKind, &str)] = &[
            (
                PiiKind::Phone,
                r"\b(?:\+?1[-.]?)?\(?[0-9]{3}\)?[-.]?[0-9]{3}[-.]?[0-9]{4}\b",
            ),
            (
                PiiKind::Email,
                r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            ),
            (PiiKind::Ssn, r"\b\d{3}-\d{2}-\d{4}\b"),
            (
                PiiKind::CreditCard,
                r"\b\d{4}[- ]?\d{4}[- ]?\d{4}[- ]?\d{4}\b",
            ),
            (PiiKind::IpAddress, r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b"),
            (PiiKind::Name, r"\b[A-Z][a-z]+ [A-Z][a-z]+\b"),
            (
                PiiKind::Address,
                r"\b\d+\s+[A-Za-z\s]+(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive|Dr)\b",
            ),
            (
                PiiKind::Date,
                r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b|\b\d{4}-\d{2}-\d{2}\b",
            ),
            (PiiKind::ZipCode, r"\b\d{5}(?:-\d{4})?\b"),
            (
                PiiKind::Medication,
                r"(?i)\b(?:Prozac|Zoloft|Lexapro|Celexa|Paxil|Wellbutrin|Effexor|Cymbalta|Abilify|Risperdal|Seroquel|Zyprexa|Depakote|Lithium|Xanax|Ativan|Klonopin|Valium|Adderall|Ritalin|Vyvanse)\b",
            ),
            (
                PiiKind::Diagnosis,
                r"(?i)\b(?:depression|anxiety|bipolar|PTSD|OCD|ADHD|autism|schizophrenia|borderline|narcissistic|antisocial|paranoid|schizoid|histrionic)\b",
            ),
            (
                PiiKind::HealthcareFacility,
                r"\b(?:Hospital|Clinic|Medical Center|Health Center|Mental Health|Psychiatric|Behavioral Health)\b",
            ),
            (PiiKind::Insurance, r"\b[A-Z]{2,3}\d{6,10}\b"),
            (PiiKind::MedicalRecord, r"\bMRN[:\s]*\d{6,10}\b"),
        ];

        let patterns = table
            .iter()
            .map(|(kind, pattern)| {
                // Static literals; a failure here is a build defect.
                (*kind, Regex::new(pattern).expect("catalog pattern compiles"))
            })
            .collect();

        Self { patterns }
    }

    pub fn patterns(&self) -> &[(PiiKind, Regex)] {
        &self.patterns
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
