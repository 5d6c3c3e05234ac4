use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use tracing::{info, warn};

use crate::common::collections::{HashMap, HashSet};
use crate::reactor::Command;
use crate::sys::event::{KeyBinding, Modifiers};

const MAX_WORKSPACES: usize = 32;
const DEFAULT_CONFIG: &str = include_str!("../../skiff.default.toml");

pub fn config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skiff").join("skiff.toml"))
}

/// Geometry algorithm used to tile the Normal clients of a workspace.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayoutMode {
    #[default]
    MasterStack,
    Fibonacci,
    /// Main client in the middle with the others orbiting it.
    #[serde(alias = "euler")]
    Radial,
    Scrolling,
}

impl LayoutMode {
    pub fn next(self) -> LayoutMode {
        match self {
            LayoutMode::MasterStack => LayoutMode::Fibonacci,
            LayoutMode::Fibonacci => LayoutMode::Radial,
            LayoutMode::Radial => LayoutMode::Scrolling,
            LayoutMode::Scrolling => LayoutMode::MasterStack,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    keys: HashMap<String, Command>,
    /// Named modifier groups usable as the first token of a key, e.g.
    /// `hyper = "Mod4 + Control + Shift"`.
    #[serde(default)]
    modifier_combinations: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub settings: Settings,
    pub keys: Vec<(KeyBinding, Command)>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub workspaces: WorkspaceSettings,
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub columns: ColumnSettings,
    #[serde(default)]
    pub scroll: ScrollSettings,
    #[serde(default)]
    pub interaction: InteractionSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceSettings {
    #[serde(default = "default_workspace_count")]
    pub count: usize,
    /// Maximum number of clients a single workspace will manage.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub default_layout: LayoutMode,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    #[serde(default = "default_gap")]
    pub gap: i32,
    #[serde(default)]
    pub border: i32,
    #[serde(default = "default_ratio_step")]
    pub ratio_step: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ColumnSettings {
    #[serde(default = "default_column_width")]
    pub default_width: i32,
    #[serde(default = "default_min_column_width")]
    pub min_width: i32,
    #[serde(default = "default_max_column_width")]
    pub max_width: i32,
    #[serde(default = "default_column_step")]
    pub step: i32,
    #[serde(default)]
    pub rules: Vec<ColumnRule>,
}

/// Initial column width for every window of an application class.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ColumnRule {
    /// Matched case-insensitively against the window class.
    pub class: String,
    pub width: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScrollSettings {
    #[serde(default = "default_scroll_steps")]
    pub steps: u32,
    #[serde(default = "default_scroll_step_delay")]
    pub step_delay_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InteractionSettings {
    /// Modifier held while dragging with the primary or secondary button.
    #[serde(default = "default_modifier")]
    pub modifier: String,
    #[serde(default = "default_resize_interval")]
    pub resize_interval_ms: u64,
    #[serde(default = "yes")]
    pub rubber_band: bool,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            count: default_workspace_count(),
            capacity: default_capacity(),
            default_layout: LayoutMode::default(),
        }
    }
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            gap: default_gap(),
            border: 0,
            ratio_step: default_ratio_step(),
        }
    }
}

impl Default for ColumnSettings {
    fn default() -> Self {
        Self {
            default_width: default_column_width(),
            min_width: default_min_column_width(),
            max_width: default_max_column_width(),
            step: default_column_step(),
            rules: Vec::new(),
        }
    }
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            steps: default_scroll_steps(),
            step_delay_ms: default_scroll_step_delay(),
        }
    }
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            modifier: default_modifier(),
            resize_interval_ms: default_resize_interval(),
            rubber_band: true,
        }
    }
}

impl WorkspaceSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.count == 0 {
            issues.push("workspaces.count must be at least 1".to_string());
        }
        if self.count > MAX_WORKSPACES {
            issues.push(format!("workspaces.count should not exceed {MAX_WORKSPACES}"));
        }
        if self.capacity == 0 {
            issues.push("workspaces.capacity must be at least 1".to_string());
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;
        if self.count == 0 || self.count > MAX_WORKSPACES {
            self.count = self.count.clamp(1, MAX_WORKSPACES);
            fixes += 1;
        }
        if self.capacity == 0 {
            self.capacity = default_capacity();
            fixes += 1;
        }
        fixes
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.gap < 0 {
            issues.push(format!("layout.gap must be non-negative, got {}", self.gap));
        }
        if self.border < 0 {
            issues.push(format!("layout.border must be non-negative, got {}", self.border));
        }
        if !(self.ratio_step > 0.0 && self.ratio_step <= 0.9) {
            issues.push(format!(
                "layout.ratio_step must be in (0, 0.9], got {}",
                self.ratio_step
            ));
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;
        if self.gap < 0 {
            self.gap = default_gap();
            fixes += 1;
        }
        if self.border < 0 {
            self.border = 0;
            fixes += 1;
        }
        if !(self.ratio_step > 0.0 && self.ratio_step <= 0.9) {
            self.ratio_step = default_ratio_step();
            fixes += 1;
        }
        fixes
    }
}

impl ColumnSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.min_width < 1 {
            issues.push("columns.min_width must be at least 1".to_string());
        }
        if self.max_width < self.min_width {
            issues.push(format!(
                "columns.max_width ({}) is smaller than columns.min_width ({})",
                self.max_width, self.min_width
            ));
        } else if !(self.min_width..=self.max_width).contains(&self.default_width) {
            issues.push(format!(
                "columns.default_width ({}) is outside [{}, {}]",
                self.default_width, self.min_width, self.max_width
            ));
        }
        if self.step < 1 {
            issues.push("columns.step must be at least 1".to_string());
        }

        let mut seen = HashSet::default();
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.class.trim().is_empty() {
                issues.push(format!("Column rule {index} has an empty class"));
            } else if !seen.insert(rule.class.to_lowercase()) {
                issues.push(format!("Duplicate column rule for class '{}'", rule.class));
            }
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;
        if self.min_width < 1 {
            self.min_width = default_min_column_width();
            fixes += 1;
        }
        if self.max_width < self.min_width {
            self.max_width = self.min_width.max(default_max_column_width());
            fixes += 1;
        }
        if !(self.min_width..=self.max_width).contains(&self.default_width) {
            self.default_width = self.default_width.clamp(self.min_width, self.max_width);
            fixes += 1;
        }
        if self.step < 1 {
            self.step = default_column_step();
            fixes += 1;
        }

        let before = self.rules.len();
        let mut seen = HashSet::default();
        self.rules
            .retain(|rule| !rule.class.trim().is_empty() && seen.insert(rule.class.to_lowercase()));
        fixes + (before - self.rules.len())
    }

    /// Initial width for a client of `class`, clamped to the column bounds.
    pub fn width_for(&self, class: Option<&str>) -> i32 {
        let rule = class.and_then(|class| {
            self.rules.iter().find(|rule| rule.class.eq_ignore_ascii_case(class))
        });
        self.clamp(rule.map_or(self.default_width, |rule| rule.width))
    }

    pub fn clamp(&self, width: i32) -> i32 {
        width.clamp(self.min_width, self.max_width.max(self.min_width))
    }
}

impl ScrollSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.steps == 0 {
            issues.push("scroll.steps must be at least 1".to_string());
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        if self.steps == 0 {
            self.steps = default_scroll_steps();
            return 1;
        }
        0
    }

    pub fn step_delay(&self) -> Duration { Duration::from_millis(self.step_delay_ms) }
}

impl InteractionSettings {
    /// The drag modifier, if it is one that survives lock-state masking.
    /// Caps lock and num lock are ignored when matching, so they cannot
    /// start a drag.
    fn drag_modifier(&self) -> Option<Modifiers> {
        Modifiers::from_key_name(&self.modifier).filter(|m| !m.keyboard().is_empty())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.drag_modifier().is_none() {
            issues.push(format!(
                "interaction.modifier '{}' cannot be used to start a drag",
                self.modifier
            ));
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        if self.drag_modifier().is_none() {
            self.modifier = default_modifier();
            return 1;
        }
        0
    }

    pub fn modifier(&self) -> Modifiers { self.drag_modifier().unwrap_or(Modifiers::MOD4) }

    pub fn resize_interval(&self) -> Duration { Duration::from_millis(self.resize_interval_ms) }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.workspaces.validate();
        issues.extend(self.layout.validate());
        issues.extend(self.columns.validate());
        issues.extend(self.scroll.validate());
        issues.extend(self.interaction.validate());
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        self.workspaces.auto_fix_values()
            + self.layout.auto_fix_values()
            + self.columns.auto_fix_values()
            + self.scroll.auto_fix_values()
            + self.interaction.auto_fix_values()
    }
}

fn yes() -> bool { true }

fn default_workspace_count() -> usize { 5 }

fn default_capacity() -> usize { 64 }

fn default_gap() -> i32 { 10 }

fn default_ratio_step() -> f64 { 0.05 }

fn default_column_width() -> i32 { 600 }

fn default_min_column_width() -> i32 { 200 }

fn default_max_column_width() -> i32 { 1600 }

fn default_column_step() -> i32 { 50 }

fn default_scroll_steps() -> u32 { 8 }

fn default_scroll_step_delay() -> u64 { 10 }

fn default_resize_interval() -> u64 { 16 }

fn default_modifier() -> String { "mod4".to_string() }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn default() -> Config {
        Self::parse(DEFAULT_CONFIG).expect("bundled default configuration is valid")
    }

    /// Reads the configuration at `path` (or the per-user default location),
    /// falling back to the bundled defaults when it is missing or unreadable.
    /// Invalid values are reported and repaired.
    pub fn load_or_default(path: Option<&Path>) -> Config {
        let path = path.map(Path::to_path_buf).or_else(config_file);
        let mut config = match path.as_deref() {
            Some(path) if path.exists() => match Self::read(path) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to load configuration, using defaults");
                    Config::default()
                }
            },
            _ => {
                info!("No configuration file found, using defaults");
                Config::default()
            }
        };

        for issue in config.validate() {
            warn!("Configuration issue: {issue}");
        }
        let fixes = config.auto_fix_values();
        if fixes > 0 {
            info!(fixes, "Repaired invalid configuration values");
        }
        config
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.settings.validate();
        for (binding, command) in &self.keys {
            if let Some(index) = command.workspace_index() {
                if index >= self.settings.workspaces.count {
                    issues.push(format!(
                        "Key {} targets workspace {index}, but only {} exist",
                        binding.keysym, self.settings.workspaces.count
                    ));
                }
            }
        }
        issues
    }

    /// Attempts to fix configuration values automatically.
    /// Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize { self.settings.auto_fix_values() }

    fn expand_modifier_combinations(key: &str, combinations: &HashMap<String, String>) -> String {
        if let Some((head, rest)) = key.split_once('+') {
            if let Some(combo) = combinations.get(head.trim()) {
                return format!("{} + {}", combo, rest.trim());
            }
        }
        key.to_string()
    }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        let c: ConfigFile = toml::from_str(buf)?;
        let mut keys = Vec::new();
        for (key, cmd) in c.keys {
            let expanded = Self::expand_modifier_combinations(&key, &c.modifier_combinations);
            let binding: KeyBinding = match expanded.parse() {
                Ok(binding) => binding,
                Err(e) => bail!("Could not parse key binding {key}: {e}"),
            };
            keys.push((binding, cmd));
        }
        keys.sort_by_key(|(binding, _)| (binding.keysym, binding.modifiers.bits()));
        Ok(Config { settings: c.settings, keys })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sys::keysym::Keysym;

    #[test]
    fn default_config_parses() {
        let config = Config::default();
        assert_eq!(config.settings, Settings::default());
        assert!(config.validate().is_empty());
        assert!(config.keys.iter().any(|(binding, command)| {
            binding.keysym == Keysym(0x71) && *command == Command::Close
        }));
    }

    #[test]
    fn parses_settings_and_commands() {
        let config = Config::parse(
            r#"
            [settings.layout]
            gap = 4

            [settings.workspaces]
            default_layout = "euler"

            [[settings.columns.rules]]
            class = "Firefox"
            width = 900

            [keys]
            "Mod4 + Return" = "cycle_layout"
            "Mod4 + 3" = { switch_workspace = 2 }
            "Mod4 + s" = { set_layout = "scrolling" }
            "#,
        )
        .unwrap();

        assert_eq!(config.settings.layout.gap, 4);
        assert_eq!(config.settings.workspaces.default_layout, LayoutMode::Radial);
        assert_eq!(config.settings.columns.width_for(Some("firefox")), 900);
        assert_eq!(config.settings.columns.width_for(Some("xterm")), 600);
        assert_eq!(config.keys.len(), 3);
        assert!(config.keys.contains(&(
            "Mod4+3".parse().unwrap(),
            Command::SwitchWorkspace(2)
        )));
        assert!(config.keys.contains(&(
            "Mod4+s".parse().unwrap(),
            Command::SetLayout(LayoutMode::Scrolling)
        )));
    }

    #[test]
    fn modifier_combinations_expand() {
        let config = Config::parse(
            r#"
            [modifier_combinations]
            hyper = "Mod4 + Control + Shift"

            [keys]
            "hyper + q" = "close"
            "#,
        )
        .unwrap();
        let (binding, _) = config.keys[0];
        assert_eq!(
            binding.modifiers,
            Modifiers::MOD4 | Modifiers::CONTROL | Modifiers::SHIFT
        );
    }

    #[test]
    fn rejects_unknown_fields_and_bad_keys() {
        assert!(Config::parse("[settings]\nanimate = true").is_err());
        assert!(Config::parse("[keys]\n\"Hyper + q\" = \"close\"").is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.settings.layout.gap = -3;
        config.settings.columns.default_width = 5000;
        config.settings.interaction.modifier = "hyper".to_string();
        let issues = config.validate();
        assert_eq!(issues.len(), 3);
        assert!(issues[0].contains("layout.gap must be non-negative"));

        let fixes = config.auto_fix_values();
        assert_eq!(fixes, 3);
        assert_eq!(config.settings.layout.gap, 10);
        assert_eq!(config.settings.columns.default_width, 1600);
        assert_eq!(config.settings.interaction.modifier(), Modifiers::MOD4);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn workspace_count_is_clamped() {
        let mut settings = WorkspaceSettings { count: 100, ..Default::default() };
        assert_eq!(settings.validate().len(), 1);
        assert_eq!(settings.auto_fix_values(), 1);
        assert_eq!(settings.count, MAX_WORKSPACES);
    }

    #[test]
    fn lock_modifiers_cannot_start_drags() {
        for name in ["lock", "mod2"] {
            let mut interaction =
                InteractionSettings { modifier: name.to_string(), ..Default::default() };
            assert_eq!(interaction.validate().len(), 1, "{name}");
            assert_eq!(interaction.auto_fix_values(), 1);
            assert_eq!(interaction.modifier(), Modifiers::MOD4);
        }
        let alt = InteractionSettings { modifier: "alt".to_string(), ..Default::default() };
        assert!(alt.validate().is_empty());
        assert_eq!(alt.modifier(), Modifiers::MOD1);
    }

    #[test]
    fn duplicate_column_rules_are_dropped() {
        let mut columns = ColumnSettings {
            rules: vec![
                ColumnRule { class: "Emacs".into(), width: 800 },
                ColumnRule { class: "emacs".into(), width: 700 },
                ColumnRule { class: " ".into(), width: 700 },
            ],
            ..Default::default()
        };
        assert_eq!(columns.validate().len(), 2);
        assert_eq!(columns.auto_fix_values(), 2);
        assert_eq!(columns.width_for(Some("EMACS")), 800);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default(Some(Path::new("/nonexistent/skiff.toml")));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn layout_modes_cycle() {
        use strum::IntoEnumIterator;
        for mode in LayoutMode::iter() {
            let mut next = mode.next();
            let mut steps = 1;
            while next != mode {
                next = next.next();
                steps += 1;
            }
            assert_eq!(steps, 4);
        }
        assert_eq!(LayoutMode::Radial.to_string(), "radial");
    }
}
