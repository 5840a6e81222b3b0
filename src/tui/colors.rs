//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::ActivityType;

/// Header and status bar background.
pub const SLATE: Color = Color::Rgb(38, 50, 56);
/// Used for Ops Compliance
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Used for Training Enablement
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
/// Used for Performance Reporting
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Used for Product Design
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);

// Native Color::Blue is used for Campaign Execution and Color::Cyan for
// Engineering Delivery.

/// Accent color for rows and badges of the given activity.
pub fn activity_color(activity: ActivityType) -> Color {
    match activity {
        ActivityType::CampaignExecution => Color::Blue,
        ActivityType::ProductDesign => DARK_PURPLE,
        ActivityType::EngineeringDelivery => Color::Cyan,
        ActivityType::TrainingEnablement => DARK_GREEN,
        ActivityType::OpsCompliance => DARK_RED,
        ActivityType::PerformanceReporting => GOLD,
    }
}

/// Readable foreground on top of `background`.
pub fn text_on(background: Color) -> Color {
    match background {
        GOLD | Color::Cyan => Color::Rgb(20, 20, 20),
        _ => Color::White,
    }
}
