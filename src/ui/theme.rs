use ratatui::style::Color;

// Chrome: dark bars and borders with a single accent.
pub const BAR_BG: Color = Color::Indexed(236);
pub const FG: Color = Color::Indexed(252);
pub const DIM: Color = Color::Indexed(245);
pub const BORDER: Color = Color::Indexed(240);
pub const ACCENT: Color = Color::Indexed(39);
pub const SELECTED_BG: Color = Color::Indexed(24);

// Tree node kinds.
pub const ORGANIZATION: Color = Color::Indexed(220);
pub const REPOSITORY: Color = Color::Indexed(220);
pub const BRANCH: Color = Color::Indexed(114);
pub const SESSION: Color = Color::Indexed(39);
pub const AGENT: Color = Color::Indexed(141);

// Transcript roles.
pub const USER_MSG: Color = Color::Indexed(39);
pub const ASSISTANT_MSG: Color = Color::Indexed(213);
pub const THINKING_MSG: Color = Color::Indexed(245);
pub const TOOL_MSG: Color = Color::Indexed(172);
pub const SUMMARY_MSG: Color = Color::Indexed(114);

pub const STREAMING: Color = Color::Indexed(214);
pub const NOTICE: Color = Color::Indexed(221);
