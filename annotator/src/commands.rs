//! Command execution
//!
//! Every invocation rebuilds the tree from markup and activates a session,
//! so stored annotations are replayed exactly as a host would on reload.

use crate::cli::{Cli, Command};
use annotation_engine::{ContainerKey, ContainerSession, PersistenceGateway, RestoreReport};
use annotation_store::{JsonFileGateway, SettingsManager};
use anyhow::{anyhow, bail, Context, Result};
use content_tree::{parse_markup, DocumentTree};
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

/// Run a command and return what should be printed
pub fn run(cli: &Cli) -> Result<String> {
    let key = match &cli.key {
        Some(key) => key.clone(),
        None => key_from_path(&cli.markup)?,
    };
    let markup = std::fs::read_to_string(&cli.markup)
        .with_context(|| format!("failed to read {}", cli.markup.display()))?;
    let tree = parse_markup(&markup).with_context(|| format!("failed to parse {}", cli.markup.display()))?;

    let mut settings = SettingsManager::new(&cli.store);
    let config = *settings.load().context("failed to load settings")?;

    let gateway: Arc<dyn PersistenceGateway> = Arc::new(JsonFileGateway::new(&cli.store));
    let root = tree.root_id();
    let mut session = ContainerSession::new(key, tree, root, gateway, config);
    let report = session.activate();
    tracing::info!(
        key = %session.key(),
        restored = report.applied.len(),
        skipped = report.skipped.len(),
        "session activated"
    );

    match &cli.command {
        Command::List => Ok(list(&session, &report)),
        Command::Apply { start, end, style } => {
            let descriptor = session
                .annotate(*start, *end, *style)
                .map_err(|rejection| anyhow!("nothing annotated: {}", rejection))?;
            Ok(format!("{} {} {:?}\n", descriptor.id, descriptor.style, descriptor.verification_text))
        }
        Command::Remove { id } => {
            if !session.unannotate(*id) {
                bail!("no annotation {}", id);
            }
            Ok(format!("removed {}\n", id))
        }
        Command::Restyle { id, style } => {
            if !session.restyle(*id, *style) {
                bail!("no annotation {}", id);
            }
            Ok(format!("{} {}\n", id, style))
        }
        Command::Glossary { start, end } => {
            let capture = session
                .capture_word(*start, *end)
                .map_err(|rejection| anyhow!("nothing captured: {}", rejection))?;
            Ok(format!("{} {:?} {}..{}\n", capture.annotation_id, capture.word, capture.start, capture.end))
        }
        Command::Render => Ok(format!("{}\n", session.tree().render_html())),
    }
}

fn list(session: &ContainerSession<DocumentTree>, report: &RestoreReport) -> String {
    let mut out = String::new();
    for descriptor in session.descriptors() {
        let status = match report.skipped.iter().find(|(id, _)| *id == descriptor.id) {
            Some((_, reason)) => format!("skipped: {}", reason),
            None => "applied".to_string(),
        };
        let _ = writeln!(
            out,
            "{} {} {:?} [{}]",
            descriptor.id, descriptor.style, descriptor.verification_text, status
        );
    }
    out
}

fn key_from_path(path: &Path) -> Result<ContainerKey> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("cannot derive a container key from {}", path.display()))?;
    ContainerKey::new(stem, None).with_context(|| format!("pass --key; {:?} is not a valid key", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(dir: &TempDir, args: &[&str]) -> Cli {
        let store = dir.path().join("store");
        let markup = dir.path().join("story.xml");
        let mut argv = vec![
            "annotator".to_string(),
            "--store".to_string(),
            store.display().to_string(),
            markup.display().to_string(),
        ];
        argv.extend(args.iter().map(|s| s.to_string()));
        Cli::parse_from(argv)
    }

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("story.xml"), "<p>The <em>quick</em> brown fox</p>").unwrap();
        dir
    }

    #[test]
    fn test_apply_then_render_replays() {
        let dir = setup();
        let applied = run(&cli(&dir, &["apply", "4", "9", "--style", "highlight_a"])).unwrap();
        assert!(applied.contains("\"quick\""));

        let html = run(&cli(&dir, &["render"])).unwrap();
        assert!(html.contains("class=\"hl-a\">quick</mark>"));

        let listed = run(&cli(&dir, &["list"])).unwrap();
        assert!(listed.contains("[applied]"));
    }

    #[test]
    fn test_remove_and_restyle() {
        let dir = setup();
        let applied = run(&cli(&dir, &["glossary", "11", "12"])).unwrap();
        let id = applied.split_whitespace().next().unwrap().to_string();
        assert!(applied.contains("\"brown\""));

        run(&cli(&dir, &["restyle", &id, "highlight_b"])).unwrap();
        assert!(run(&cli(&dir, &["render"])).unwrap().contains("hl-b"));

        run(&cli(&dir, &["remove", &id])).unwrap();
        assert!(run(&cli(&dir, &["list"])).unwrap().is_empty());
        assert!(run(&cli(&dir, &["remove", &id])).is_err());
    }

    #[test]
    fn test_rejection_is_reported() {
        let dir = setup();
        let err = run(&cli(&dir, &["apply", "9", "4"])).unwrap_err();
        assert!(err.to_string().contains("nothing annotated"));
    }

    #[test]
    fn test_key_from_file_stem() {
        assert_eq!(
            key_from_path(Path::new("/tmp/chapter-1.xml")).unwrap().to_string(),
            "chapter-1"
        );
        assert_eq!(
            key_from_path(Path::new("/tmp/Unit 4.xml")).unwrap().to_string(),
            "Unit 4"
        );
        assert!(key_from_path(Path::new("/tmp/bad\u{7}name.xml")).is_err());
    }
}
