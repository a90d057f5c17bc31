//! Color constants for the terminal user interface.

use ratatui::style::Color;

// These support the status accents used across
// the dashboard panels

// Native Color::Blue is used for Not Started

/// Used for In Progress
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Used for On Hold and warning indicators
pub const AMBER: Color = Color::Rgb(204, 119, 0);
/// Used for Complete and healthy indicators
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
/// Used for critical indicators
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
