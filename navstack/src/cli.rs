use anyhow::{Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use navstack::{ScreenKind, Transition};

#[derive(Parser)]
#[command(name = "navstack")]
#[command(about = "Drive a headless navigator from the command line")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a comma-separated navigation script, e.g. "go:home,forward:detail,popup:menu,hide,back"
    Run(RunArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Steps: go:<kind>, forward:<kind>, back, popup:<kind>, hide, reload, warm:<kind>, evict, hardware-back
    pub script: String,

    /// Navigation config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Screen kinds that are kept in the cache
    #[arg(long, value_delimiter = ',')]
    pub keep: Vec<String>,

    /// Transition used by go/forward/popup steps
    #[arg(long, default_value = "slide-forward")]
    pub transition: TransitionArg,

    /// Skip animation time
    #[arg(long)]
    pub instant: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Navigation config file (TOML); defaults when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub struct TransitionArg(pub Transition);

impl FromStr for TransitionArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let transition = match s {
            "none" => Transition::None,
            "fade" => Transition::Fade,
            "slide-forward" => Transition::SlideForward,
            "slide-back" => Transition::SlideBack,
            "slide-up" => Transition::SlideUp,
            "slide-down" => Transition::SlideDown,
            "drop-up" => Transition::DropUp,
            "drop-down" => Transition::DropDown,
            other => bail!("Unknown transition '{}'", other),
        };
        Ok(TransitionArg(transition))
    }
}

/// One scripted navigator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Go(String),
    Forward(String),
    Back,
    Popup(String),
    Hide,
    Reload,
    WarmUp(String),
    Evict,
    HardwareBack,
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (verb, arg) = match s.split_once(':') {
            Some((verb, arg)) => (verb, Some(arg.trim().to_string())),
            None => (s, None),
        };
        let kind = |arg: Option<String>| arg.filter(|a| !a.is_empty()).ok_or_else(|| anyhow!("'{}' needs a screen kind", verb));

        Ok(match verb {
            "go" => Step::Go(kind(arg)?),
            "forward" => Step::Forward(kind(arg)?),
            "popup" => Step::Popup(kind(arg)?),
            "warm" => Step::WarmUp(kind(arg)?),
            "back" => Step::Back,
            "hide" => Step::Hide,
            "reload" => Step::Reload,
            "evict" => Step::Evict,
            "hardware-back" => Step::HardwareBack,
            other => bail!("Unknown step '{}'", other),
        })
    }
}

impl Step {
    pub fn kind_name(&self) -> Option<&str> {
        match self {
            Step::Go(kind) | Step::Forward(kind) | Step::Popup(kind) | Step::WarmUp(kind) => Some(kind),
            _ => None,
        }
    }
}

pub fn parse_script(script: &str) -> Result<Vec<Step>> {
    script
        .split(',')
        .filter(|step| !step.trim().is_empty())
        .map(Step::from_str)
        .collect()
}

/// Screen kinds are `'static`; names from the command line live for the whole run
fn leak_kind(name: &str) -> ScreenKind {
    ScreenKind::new(Box::leak(name.to_string().into_boxed_str()))
}

/// One kind per distinct name in the script, each name leaked once
pub fn script_kinds(steps: &[Step]) -> HashMap<String, ScreenKind> {
    let mut kinds = HashMap::new();
    for name in steps.iter().filter_map(Step::kind_name) {
        if !kinds.contains_key(name) {
            kinds.insert(name.to_string(), leak_kind(name));
        }
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let steps = parse_script("go:home, forward:detail,popup:menu,hide,back,hardware-back").unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Go("home".into()),
                Step::Forward("detail".into()),
                Step::Popup("menu".into()),
                Step::Hide,
                Step::Back,
                Step::HardwareBack,
            ]
        );
    }

    #[test]
    fn test_parse_script_errors() {
        assert!(parse_script("go").is_err());
        assert!(parse_script("jump:home").is_err());
    }

    #[test]
    fn test_script_kinds_leak_each_name_once() {
        let steps = parse_script("go:home,forward:detail,back,go:home,popup:menu,forward:detail").unwrap();
        let kinds = script_kinds(&steps);

        assert_eq!(kinds.len(), 3);
        assert_eq!(kinds["home"], ScreenKind::new("home"));
        assert_eq!(kinds["menu"].name(), "menu");
        assert!(!kinds.contains_key("back"));
    }

    #[test]
    fn test_transition_arg() {
        assert_eq!(TransitionArg::from_str("drop-up").unwrap().0, Transition::DropUp);
        assert!(TransitionArg::from_str("spin").is_err());
    }
}
