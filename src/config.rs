//! # Config Module
//!
//! Typed statusline configuration. Compiled defaults are layered under an
//! optional JSON file and then CLI overrides; the result is immutable for the
//! rest of the run.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{Args, PathModeArg};

const CONFIG_FILE_NAME: &str = "statusline.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathDisplayMode {
    Full,
    Truncated,
    Basename,
}

/// Glyphs accepted as section and info separators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Separator {
    #[serde(rename = "|")]
    Pipe,
    #[serde(rename = "•")]
    Bullet,
    #[serde(rename = "·")]
    MiddleDot,
    #[serde(rename = "⋅")]
    DotOperator,
    #[serde(rename = "●")]
    Circle,
    #[serde(rename = "◆")]
    Diamond,
    #[serde(rename = "▪")]
    Square,
    #[serde(rename = "▸")]
    Triangle,
    #[serde(rename = "›")]
    Angle,
    #[serde(rename = "→")]
    Arrow,
}

impl Separator {
    pub fn as_str(self) -> &'static str {
        match self {
            Separator::Pipe => "|",
            Separator::Bullet => "•",
            Separator::MiddleDot => "·",
            Separator::DotOperator => "⋅",
            Separator::Circle => "●",
            Separator::Diamond => "◆",
            Separator::Square => "▪",
            Separator::Triangle => "▸",
            Separator::Angle => "›",
            Separator::Arrow => "→",
        }
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarColorMode {
    /// gray < 50%, yellow < 70%, orange < 90%, red otherwise
    Progressive,
    Green,
    Yellow,
    Red,
}

/// Progress bar length; only 5 and 10 cells are supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum BarLength {
    Short,
    Long,
}

impl BarLength {
    pub fn cells(self) -> usize {
        match self {
            BarLength::Short => 5,
            BarLength::Long => 10,
        }
    }
}

impl TryFrom<u8> for BarLength {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            5 => Ok(BarLength::Short),
            10 => Ok(BarLength::Long),
            other => Err(format!("progressBarLength must be 5 or 10, got {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GitConfig {
    pub show_branch: bool,
    /// `*` after the branch when the tree has changes
    pub show_dirty_indicator: bool,
    /// Added/deleted line totals
    pub show_changes: bool,
    pub show_staged: bool,
    pub show_unstaged: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            show_branch: true,
            show_dirty_indicator: true,
            show_changes: false,
            show_staged: true,
            show_unstaged: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// `None` joins session items with a single space
    pub info_separator: Option<Separator>,
    pub show_cost: bool,
    pub show_tokens: bool,
    pub show_max_tokens: bool,
    pub show_token_decimals: bool,
    pub show_percentage: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            info_separator: None,
            show_cost: false,
            show_tokens: true,
            show_max_tokens: false,
            show_token_decimals: false,
            show_percentage: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextConfig {
    pub max_context_tokens: u64,
    pub autocompact_buffer_tokens: u64,
    pub use_usable_context_only: bool,
    /// System prompt, tool and memory file cost not visible in the transcript
    pub overhead_tokens: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 200_000,
            autocompact_buffer_tokens: 45_000,
            use_usable_context_only: true,
            overhead_tokens: 0,
        }
    }
}

impl ContextConfig {
    /// Denominator for the context percentage
    pub fn budget(&self) -> u64 {
        if self.use_usable_context_only {
            self.max_context_tokens
                .saturating_sub(self.autocompact_buffer_tokens)
        } else {
            self.max_context_tokens
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitsConfig {
    pub show_progress_bar: bool,
    pub progress_bar_length: BarLength,
    pub color: BarColorMode,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            show_progress_bar: true,
            progress_bar_length: BarLength::Short,
            color: BarColorMode::Progressive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatuslineConfig {
    /// Everything on one line followed by a blank line
    pub one_line: bool,
    /// Show the model name even for the default Sonnet family
    pub show_sonnet_model: bool,
    pub path_display_mode: PathDisplayMode,
    pub separator: Separator,
    pub git: GitConfig,
    pub session: SessionConfig,
    pub context: ContextConfig,
    pub limits: LimitsConfig,
}

impl Default for StatuslineConfig {
    fn default() -> Self {
        Self {
            one_line: true,
            show_sonnet_model: false,
            path_display_mode: PathDisplayMode::Truncated,
            separator: Separator::Bullet,
            git: GitConfig::default(),
            session: SessionConfig::default(),
            context: ContextConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl StatuslineConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("invalid statusline config")
    }

    /// Load the config file (if any) and apply CLI overrides.
    ///
    /// An explicitly requested file must exist and parse; the implicit
    /// `~/.claude/statusline.json` is optional.
    pub fn load(args: &Args) -> Result<Self> {
        let mut config = match args.config.as_deref() {
            Some(path) => Self::from_file(Path::new(path))?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_overrides(args)?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    fn apply_overrides(&mut self, args: &Args) -> Result<()> {
        if args.one_line && args.two_line {
            bail!("--one-line and --two-line are mutually exclusive");
        }
        if args.one_line {
            self.one_line = true;
        }
        if args.two_line {
            self.one_line = false;
        }
        if let Some(mode) = args.path_mode {
            self.path_display_mode = match mode {
                PathModeArg::Full => PathDisplayMode::Full,
                PathModeArg::Truncated => PathDisplayMode::Truncated,
                PathModeArg::Basename => PathDisplayMode::Basename,
            };
        }
        Ok(())
    }
}

fn default_config_path() -> Option<PathBuf> {
    let base = directories::BaseDirs::new()?;
    Some(base.home_dir().join(".claude").join(CONFIG_FILE_NAME))
}
