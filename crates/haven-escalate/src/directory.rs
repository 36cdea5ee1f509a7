//! Resource directory contract and the built-in static set.

use std::collections::HashMap;

use async_trait::async_trait;
use haven_types::{
    ContactChannel, Resource, ResourceCategory, ResourceId, ResourceKind,
};

use crate::error::EscalationError;

/// Lookup contract for support resources. Implementations are typically
/// remote and may fail; the coordinator handles that.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    /// Resources serving a location, optionally filtered by category.
    async fn resources(
        &self,
        location: &str,
        categories: Option<&[ResourceCategory]>,
    ) -> Result<Vec<Resource>, EscalationError>;

    /// Crisis-category resources for a location.
    async fn crisis_resources(&self, location: &str) -> Result<Vec<Resource>, EscalationError> {
        self.resources(
            location,
            Some(&[
                ResourceCategory::SuicidePrevention,
                ResourceCategory::CrisisIntervention,
            ]),
        )
        .await
    }
}

/// Built-in, always-available resource set.
///
/// This is both a standalone directory for local development and the
/// degraded-mode fallback when a remote directory is unreachable. Unknown
/// locations fall back to the US set.
pub struct StaticDirectory {
    by_region: HashMap<String, Vec<Resource>>,
}

impl StaticDirectory {
    pub fn builtin() -> Self {
        let mut by_region = HashMap::new();
        by_region.insert("US".to_string(), us_resources());
        by_region.insert("CA".to_string(), ca_resources());
        Self { by_region }
    }

    fn for_region(&self, location: &str) -> &[Resource] {
        let key = location.to_uppercase();
        self.by_region
            .get(&key)
            .or_else(|| self.by_region.get("US"))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Synchronous lookup for fallback paths.
    pub fn lookup(
        &self,
        location: &str,
        categories: Option<&[ResourceCategory]>,
    ) -> Vec<Resource> {
        self.for_region(location)
            .iter()
            .filter(|r| {
                categories
                    .map(|cats| cats.contains(&r.category))
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    /// Crisis-category subset for fallback paths.
    pub fn crisis_lookup(&self, location: &str) -> Vec<Resource> {
        self.lookup(
            location,
            Some(&[
                ResourceCategory::SuicidePrevention,
                ResourceCategory::CrisisIntervention,
            ]),
        )
    }
}

impl Default for StaticDirectory {
    fn default() -> Self {
        Self::builtin()
    }
}

#[async_trait]
impl ResourceDirectory for StaticDirectory {
    async fn resources(
        &self,
        location: &str,
        categories: Option<&[ResourceCategory]>,
    ) -> Result<Vec<Resource>, EscalationError> {
        Ok(self.lookup(location, categories))
    }
}

fn us_resources() -> Vec<Resource> {
    vec![
        Resource {
            id: ResourceId::new("crisis-text-line"),
            name: "Crisis Text Line".into(),
            kind: ResourceKind::CrisisLine,
            category: ResourceCategory::SuicidePrevention,
            channels: vec![ContactChannel::Text],
            phone: None,
            text_line: Some("988".into()),
            website: None,
            description: "24/7 crisis support via text message".into(),
            hours: Some("24/7".into()),
            languages: vec!["English".into(), "Spanish".into()],
            regions: vec!["US".into()],
            verified: true,
        },
        Resource {
            id: ResourceId::new("suicide-crisis-lifeline"),
            name: "988 Suicide & Crisis Lifeline".into(),
            kind: ResourceKind::Hotline,
            category: ResourceCategory::SuicidePrevention,
            channels: vec![ContactChannel::Phone],
            phone: Some("988".into()),
            text_line: None,
            website: None,
            description: "24/7 suicide prevention and crisis support".into(),
            hours: Some("24/7".into()),
            languages: vec!["English".into(), "Spanish".into()],
            regions: vec!["US".into()],
            verified: true,
        },
        Resource {
            id: ResourceId::new("domestic-violence-hotline"),
            name: "National Domestic Violence Hotline".into(),
            kind: ResourceKind::Hotline,
            category: ResourceCategory::DomesticViolence,
            channels: vec![ContactChannel::Phone, ContactChannel::Chat],
            phone: Some("1-800-799-7233".into()),
            text_line: None,
            website: Some("https://www.thehotline.org".into()),
            description: "24/7 support for domestic violence survivors".into(),
            hours: Some("24/7".into()),
            languages: vec!["English".into(), "Spanish".into()],
            regions: vec!["US".into()],
            verified: true,
        },
        Resource {
            id: ResourceId::new("samhsa-helpline"),
            name: "SAMHSA National Helpline".into(),
            kind: ResourceKind::Hotline,
            category: ResourceCategory::SubstanceAbuse,
            channels: vec![ContactChannel::Phone],
            phone: Some("1-800-662-4357".into()),
            text_line: None,
            website: None,
            description: "Treatment referral and information service".into(),
            hours: Some("24/7".into()),
            languages: vec!["English".into(), "Spanish".into()],
            regions: vec!["US".into()],
            verified: true,
        },
        Resource {
            id: ResourceId::new("mentalhealth-gov"),
            name: "MentalHealth.gov".into(),
            kind: ResourceKind::Information,
            category: ResourceCategory::MentalHealth,
            channels: vec![ContactChannel::Website],
            phone: None,
            text_line: None,
            website: Some("https://www.mentalhealth.gov".into()),
            description: "Government information and resources on mental health".into(),
            hours: Some("24/7".into()),
            languages: vec!["English".into()],
            regions: vec!["US".into()],
            verified: true,
        },
    ]
}

fn ca_resources() -> Vec<Resource> {
    vec![
        Resource {
            id: ResourceId::new("crisis-services-canada"),
            name: "Crisis Services Canada".into(),
            kind: ResourceKind::CrisisLine,
            category: ResourceCategory::SuicidePrevention,
            channels: vec![ContactChannel::Phone],
            phone: Some("1-833-456-4566".into()),
            text_line: None,
            website: None,
            description: "24/7 crisis support for Canadians".into(),
            hours: Some("24/7".into()),
            languages: vec!["English".into(), "French".into()],
            regions: vec!["CA".into()],
            verified: true,
        },
        Resource {
            id: ResourceId::new("kids-help-phone"),
            name: "Kids Help Phone".into(),
            kind: ResourceKind::Hotline,
            category: ResourceCategory::MentalHealth,
            channels: vec![ContactChannel::Phone, ContactChannel::Text],
            phone: Some("1-800-668-6868".into()),
            text_line: Some("686868".into()),
            website: None,
            description: "24/7 support for young people".into(),
            hours: Some("24/7".into()),
            languages: vec!["English".into(), "French".into()],
            regions: vec!["CA".into()],
            verified: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_location_falls_back_to_us() {
        let dir = StaticDirectory::builtin();
        let resources = dir.resources("XX", None).await.unwrap();
        assert!(!resources.is_empty());
        assert!(resources.iter().all(|r| r.serves_region("US")));
    }

    #[tokio::test]
    async fn crisis_resources_are_crisis_categories_only() {
        let dir = StaticDirectory::builtin();
        let crisis = dir.crisis_resources("US").await.unwrap();
        assert!(!crisis.is_empty());
        assert!(crisis.iter().all(|r| r.category.is_crisis()));
    }

    #[tokio::test]
    async fn category_filter_applies() {
        let dir = StaticDirectory::builtin();
        let dv = dir
            .resources("US", Some(&[ResourceCategory::DomesticViolence]))
            .await
            .unwrap();
        assert_eq!(dv.len(), 1);
        assert_eq!(dv[0].id, ResourceId::new("domestic-violence-hotline"));
    }

    #[tokio::test]
    async fn canadian_set_serves_ca() {
        let dir = StaticDirectory::builtin();
        let ca = dir.resources("ca", None).await.unwrap();
        assert!(ca.iter().all(|r| r.serves_region("CA")));
    }
}
