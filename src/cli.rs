//! Command line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "phosphor", version, about = "CRT-style text effects renderer")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Command>,
}

impl Cli {
    /// The subcommand to run; a bare `phosphor` opens the preview
    pub fn command(self) -> Command {
        self.cmd
            .unwrap_or_else(|| Command::Preview(CommonArgs::default()))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the interactive preview window (S = still, G = animation, Esc = quit).
    Preview(CommonArgs),
    /// Export still PNG images without opening a window.
    Still(CommonArgs),
    /// Export an animated GIF without opening a window.
    Animate(CommonArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct CommonArgs {
    /// Config file (default: ~/.phosphor/config.toml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Text to render, overriding the config. `\n` starts a new line.
    #[arg(long)]
    pub text: Option<String>,

    /// Reveal the text word by word.
    #[arg(long)]
    pub typing: bool,

    /// Renderer for headless exports.
    #[arg(long, value_enum, default_value_t = Backend::Gpu)]
    pub backend: Backend,

    /// Font file, overriding the configured families.
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    #[default]
    Gpu,
    Cpu,
}

/// Turn literal `\n` sequences typed on a shell into line breaks
pub fn unescape_text(text: &str) -> String {
    text.replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_is_preview() {
        let cli = Cli::try_parse_from(["phosphor"]).unwrap();
        assert!(matches!(cli.command(), Command::Preview(_)));
    }

    #[test]
    fn test_animate_flags() {
        let cli = Cli::try_parse_from([
            "phosphor", "animate", "--text", "HI THERE", "--typing", "--backend", "cpu", "--out",
            "exports",
        ])
        .unwrap();
        let Command::Animate(args) = cli.command() else {
            panic!("expected animate");
        };
        assert_eq!(args.text.as_deref(), Some("HI THERE"));
        assert!(args.typing);
        assert_eq!(args.backend, Backend::Cpu);
        assert_eq!(args.out, Some(PathBuf::from("exports")));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(Cli::try_parse_from(["phosphor", "still", "--backend", "metal"]).is_err());
    }

    #[test]
    fn test_unescape_text() {
        assert_eq!(unescape_text("A\\nB"), "A\nB");
    }
}
