use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cost::CloudProvider;

/// Resource category as reported by the provider inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Compute,
    Storage,
    Database,
    Network,
    Container,
    Serverless,
    Other,
}

impl Default for ResourceType {
    fn default() -> Self {
        ResourceType::Compute
    }
}

/// Average utilization over the observation window, in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    pub cpu: f64,
    pub memory: f64,
}

impl Utilization {
    pub fn new(cpu: f64, memory: f64) -> Self {
        Self { cpu, memory }
    }

    /// Higher of the two dimensions
    pub fn peak(&self) -> f64 {
        self.cpu.max(self.memory)
    }
}

/// Provisioned cloud resource, read-only input to the recommendation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub resource_type: ResourceType,
    #[serde(default)]
    pub provider: CloudProvider,
    #[serde(default)]
    pub region: Option<String>,
    pub utilization: Utilization,
    #[serde(alias = "cost")]
    pub monthly_cost: Decimal,
}

impl Resource {
    pub fn new(
        id: impl Into<String>,
        resource_type: ResourceType,
        utilization: Utilization,
        monthly_cost: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type,
            provider: CloudProvider::Other,
            region: None,
            utilization,
            monthly_cost: monthly_cost.max(Decimal::ZERO),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_provider(mut self, provider: CloudProvider) -> Self {
        self.provider = provider;
        self
    }
}
