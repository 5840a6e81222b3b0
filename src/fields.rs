//! Enumerations used to classify weekly updates.
//!
//! `ActivityType` is attached to every submission and is only ever used for
//! filtering and reporting. The log stores the snake_case value; the CLI
//! accepts the kebab-case spelling.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Closed classification label for a weekly update.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    #[default]
    CampaignExecution,
    ProductDesign,
    EngineeringDelivery,
    TrainingEnablement,
    OpsCompliance,
    PerformanceReporting,
}

impl ActivityType {
    /// Every variant, in declaration order.
    pub const ALL: [ActivityType; 6] = [
        ActivityType::CampaignExecution,
        ActivityType::ProductDesign,
        ActivityType::EngineeringDelivery,
        ActivityType::TrainingEnablement,
        ActivityType::OpsCompliance,
        ActivityType::PerformanceReporting,
    ];

    /// Value written to the log's `activity_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::CampaignExecution => "campaign_execution",
            ActivityType::ProductDesign => "product_design",
            ActivityType::EngineeringDelivery => "engineering_delivery",
            ActivityType::TrainingEnablement => "training_enablement",
            ActivityType::OpsCompliance => "ops_compliance",
            ActivityType::PerformanceReporting => "performance_reporting",
        }
    }

    /// Human-readable name, e.g. "Campaign Execution".
    pub fn display_name(self) -> &'static str {
        match self {
            ActivityType::CampaignExecution => "Campaign Execution",
            ActivityType::ProductDesign => "Product Design",
            ActivityType::EngineeringDelivery => "Engineering Delivery",
            ActivityType::TrainingEnablement => "Training Enablement",
            ActivityType::OpsCompliance => "Ops Compliance",
            ActivityType::PerformanceReporting => "Performance Reporting",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            ActivityType::CampaignExecution => "📣",
            ActivityType::ProductDesign => "🎨",
            ActivityType::EngineeringDelivery => "⚙️",
            ActivityType::TrainingEnablement => "🎓",
            ActivityType::OpsCompliance => "🛡️",
            ActivityType::PerformanceReporting => "📊",
        }
    }

    /// Parse a stored or typed value. Accepts snake_case and kebab-case.
    pub fn parse(s: &str) -> Option<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|a| a.as_str() == wanted)
    }

    /// Next variant in declaration order, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|a| *a == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}
