#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathModeArg {
    /// Complete path with ~ substitution
    Full,
    /// Last two path segments
    Truncated,
    /// Directory name only
    Basename,
}

#[derive(clap::Parser, Debug, Default)]
#[command(name = "blueprint-statusline", version, about)]
pub struct Args {
    /// Statusline config file (JSON). Defaults to ~/.claude/statusline.json when present
    #[arg(long, env = "CLAUDE_STATUSLINE_CONFIG")]
    pub config: Option<String>,

    /// Force Claude data path(s), comma-separated. Defaults to ~/.config/claude and ~/.claude
    #[arg(long, env = "CLAUDE_CONFIG_DIR")]
    pub claude_config_dir: Option<String>,

    /// Path display: full|truncated|basename (overrides config)
    #[arg(long, value_enum)]
    pub path_mode: Option<PathModeArg>,

    /// Render everything on a single line (overrides config)
    #[arg(long)]
    pub one_line: bool,

    /// Render branch/path and usage on separate lines (overrides config)
    #[arg(long)]
    pub two_line: bool,

    /// Debug mode: log data-source diagnostics to stderr
    #[arg(long, env = "CLAUDE_DEBUG")]
    pub debug: bool,
}

impl Args {
    pub fn parse() -> Self {
        <Args as clap::Parser>::parse()
    }
}
