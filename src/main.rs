use anyhow::Result;
use tracing_subscriber::EnvFilter;

use blueprint_statusline::cli::Args;
use blueprint_statusline::config::StatuslineConfig;
use blueprint_statusline::display::{color_disabled, render_error, strip_ansi};
use blueprint_statusline::statusline::{parse_hook, render};
use blueprint_statusline::utils::{claude_paths, read_stdin};

/// Diagnostics go to stderr only; stdout is reserved for the statusline.
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "off" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(args: &Args) -> Result<Vec<String>> {
    let config = StatuslineConfig::load(args)?;
    let stdin = read_stdin()?;
    let hook = parse_hook(&stdin)?;
    let paths = claude_paths(args.claude_config_dir.as_deref());
    Ok(render(&hook, &config, &paths))
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    let lines = match run(&args) {
        Ok(lines) => lines,
        Err(err) => {
            tracing::debug!(error = ?err, "render failed");
            render_error(&format!("{err:#}"))
        }
    };

    let plain = color_disabled();
    for line in lines {
        if plain {
            println!("{}", strip_ansi(&line));
        } else {
            println!("{line}");
        }
    }
}
