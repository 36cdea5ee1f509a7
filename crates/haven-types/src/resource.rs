//! Support resource records — the lookup contract for directories.

use serde::{Deserialize, Serialize};

use crate::ids::ResourceId;

/// What kind of service a resource provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Hotline,
    CrisisLine,
    Emergency,
    Information,
    Referral,
}

/// The situation a resource serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceCategory {
    SuicidePrevention,
    MentalHealth,
    DomesticViolence,
    SubstanceAbuse,
    CrisisIntervention,
    GeneralSupport,
}

impl ResourceCategory {
    /// Categories consulted first when urgency is flagged.
    pub fn is_crisis(&self) -> bool {
        matches!(
            self,
            ResourceCategory::SuicidePrevention | ResourceCategory::CrisisIntervention
        )
    }
}

/// How a resource can be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactChannel {
    Phone,
    Text,
    Chat,
    Website,
}

/// A human support resource a session can be handed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub kind: ResourceKind,
    pub category: ResourceCategory,
    pub channels: Vec<ContactChannel>,
    pub phone: Option<String>,
    pub text_line: Option<String>,
    pub website: Option<String>,
    pub description: String,
    pub hours: Option<String>,
    pub languages: Vec<String>,
    /// Region tags the resource serves, e.g. `US`, `CA`.
    pub regions: Vec<String>,
    pub verified: bool,
}

impl Resource {
    pub fn serves_region(&self, region: &str) -> bool {
        self.regions.iter().any(|r| r.eq_ignore_ascii_case(region))
    }
}
