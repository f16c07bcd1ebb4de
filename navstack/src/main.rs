use anyhow::Result;
use clap::Parser;
use log::info;
use std::collections::{HashMap, HashSet};

use navstack::nav::headless::HeadlessHost;
use navstack::{CachePolicy, HardwareBackOutcome, NavConfig, NavEvent, Navigator, Params, ScreenKind, Topic};

mod cli;

use cli::{Cli, Commands, RunArgs, Step, parse_script, script_kinds};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_command(args).await?,
        Commands::Config(args) => {
            let config = load_config(args.config.as_deref())?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<NavConfig> {
    match path {
        Some(path) => NavConfig::load(path),
        None => Ok(NavConfig::default()),
    }
}

async fn run_command(args: RunArgs) -> Result<()> {
    let steps = parse_script(&args.script)?;
    let mut config = load_config(args.config.as_deref())?;
    if args.instant {
        config = NavConfig {
            close_app_on_back: config.close_app_on_back,
            ..NavConfig::instant()
        };
    }
    let disposal_delay = config.disposal_delay;

    let headless = HeadlessHost::new();
    let navigator = headless.navigator(config);
    let kinds = script_kinds(&steps);
    register_kinds(&navigator, &kinds, &args.keep);
    log_events(&navigator);

    let transition = args.transition.0;
    for step in &steps {
        info!("▶️ {:?}", step);
        let kind = step.kind_name().and_then(|name| kinds.get(name).copied());
        let outcome = match (step, kind) {
            (Step::Go(_), Some(kind)) => navigator.go(kind, Params::new(), transition, false).await.map(|_| ()),
            (Step::Forward(_), Some(kind)) => navigator.forward(kind, Params::new(), transition).await.map(|_| ()),
            (Step::Popup(_), Some(kind)) => navigator.show_popup(kind, Params::new(), transition).await.map(|_| ()),
            (Step::WarmUp(_), Some(kind)) => navigator.warm_up(kind).await,
            (Step::Back, _) => navigator.back().await.map(|_| ()),
            (Step::Hide, _) => navigator.hide_popup().await,
            (Step::Reload, _) => navigator.reload().await.map(|_| ()),
            (Step::Evict, _) => {
                navigator.dispose_cache(None).await;
                Ok(())
            }
            (Step::HardwareBack, _) => {
                let outcome = navigator.on_hardware_back().await;
                if outcome == HardwareBackOutcome::Failed {
                    Err(anyhow::anyhow!("hardware back failed"))
                } else {
                    info!("Hardware back: {:?}", outcome);
                    Ok(())
                }
            }
            _ => Ok(()),
        };

        if let Err(err) = outcome {
            eprintln!("❌ {:?}: {:#}", step, err);
        }
        println!("{:?}", navigator.snapshot());
    }

    // Let pending disposals run before the report
    tokio::time::sleep(disposal_delay * 2).await;
    println!("view operations: {}", headless.view_tree.records().len());
    println!("app closed: {} time(s)", headless.platform.close_count());

    navigator.shutdown().await;
    Ok(())
}

fn register_kinds(navigator: &Navigator, kinds: &HashMap<String, ScreenKind>, keep: &[String]) {
    let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();

    for (name, kind) in kinds {
        let policy = if keep.contains(name.as_str()) {
            CachePolicy::Keep
        } else {
            CachePolicy::Dispose
        };
        navigator.register_blank(*kind, policy);
    }
}

fn log_events(navigator: &Navigator) {
    for topic in [Topic::Navigating, Topic::AnimationStarted, Topic::Navigated, Topic::Revisited] {
        navigator.subscribe(topic, |event| {
            match event {
                NavEvent::Navigating { from, to } | NavEvent::Navigated { from, to } => {
                    info!("{:?}: {:?} -> {}", event.topic(), from.as_ref().map(|s| s.kind()), to.kind())
                }
                NavEvent::AnimationStarted { to, duration, .. } => info!("Animating to {} for {:?}", to.kind(), duration),
                NavEvent::Revisited { screen, mode, .. } => info!("Revisited {} ({:?})", screen.kind(), mode),
                _ => {}
            }
            Ok(())
        });
    }
}
