//! Subcommand implementations

use crate::cli::{Cli, Command};
use crate::views::{LoggingFormView, LoggingTreeView};
use anyhow::{bail, Context};
use doc_model::example::{example_document, example_registry};
use doc_model::{Document, TypeRegistry};
use edit_engine::CommandTable;
use serde_json::Value;
use session::{EditorSession, SessionOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::{serializer, EditorSettings, FileResource, Resource, SettingsManager};

type FileSession = EditorSession<FileResource>;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let registry = Arc::new(load_registry(cli.registry.as_deref())?);
    let settings = load_settings(cli.settings)?;

    match cli.command {
        Command::Init { file, force } => {
            if file.exists() && !force {
                bail!("{} already exists, pass --force to overwrite", file.display());
            }
            let document = Document::new(example_document());
            FileResource::new(&file)
                .write(serializer::serialize(&document)?)
                .await?;
            println!("Wrote {}", file.display());
        }
        Command::Show { file } => {
            let session = open(&file, &registry, &settings).await?;
            for line in outline(&session) {
                println!("{}", line);
            }
        }
        Command::Commands { file, node } => {
            let mut session = open(&file, &registry, &settings).await?;
            let node = session.resolve(&node)?;
            for command in session.visible_commands(&node) {
                println!("{}\t{}", command.command_id, command.label);
            }
        }
        Command::Add {
            file,
            parent,
            property,
            child_type,
            dry_run,
        } => {
            let mut session = open(&file, &registry, &settings).await?;
            let parent = session.resolve(&parent)?.path;
            let created = session.request_add(&parent, &property, &child_type)?;
            println!("Added {} at {}", child_type, created.path);
            finish(session, dry_run).await?;
        }
        Command::Delete {
            file,
            path,
            dry_run,
        } => {
            let mut session = open(&file, &registry, &settings).await?;
            let node = session.resolve(&path)?;
            session.request_delete(&node.path)?;
            println!("Deleted {}", node.path);
            finish(session, dry_run).await?;
        }
        Command::Set {
            file,
            path,
            data,
            dry_run,
        } => {
            let data: Value = serde_json::from_str(&data).context("node data is not valid JSON")?;
            let mut session = open(&file, &registry, &settings).await?;
            let node = session.resolve(&path)?;
            session.select(&node.path)?;
            session.form_changed(data);
            if !session.flush_form_edit() {
                println!("{} unchanged", node.path);
                return Ok(());
            }
            println!("Updated {}", node.path);
            finish(session, dry_run).await?;
        }
        Command::ValidateRegistry => {
            let table = CommandTable::build(&registry);
            println!(
                "{} types, {} add commands",
                registry.type_ids().count(),
                table.len()
            );
            for command in table.iter() {
                println!("{}\t{}", command.command_id, command.label);
            }
        }
    }
    Ok(())
}

fn load_registry(path: Option<&Path>) -> anyhow::Result<TypeRegistry> {
    match path {
        Some(path) => TypeRegistry::load_sync(path)
            .with_context(|| format!("failed to load registry {}", path.display())),
        None => Ok(example_registry()?),
    }
}

fn load_settings(path: Option<PathBuf>) -> anyhow::Result<EditorSettings> {
    let Some(path) = path else {
        return Ok(EditorSettings::default());
    };
    let mut manager = SettingsManager::with_path(path);
    Ok(manager.load_sync()?.clone())
}

async fn open(
    file: &Path,
    registry: &Arc<TypeRegistry>,
    settings: &EditorSettings,
) -> anyhow::Result<FileSession> {
    let session = EditorSession::open(
        Arc::new(FileResource::new(file)),
        Arc::clone(registry),
        Box::new(LoggingTreeView),
        Box::new(LoggingFormView),
        SessionOptions::from_settings("tree-editor", settings),
    )
    .await;
    if let Some(error) = session.load_error() {
        bail!("cannot open {}: {}", file.display(), error);
    }
    Ok(session)
}

/// Save, or print the document when `dry_run` is set
async fn finish(mut session: FileSession, dry_run: bool) -> anyhow::Result<()> {
    if dry_run {
        println!("{}", session.document().to_pretty_string()?);
    } else {
        session.save().await?;
    }
    session.close();
    Ok(())
}

/// Indented outline of the document, one line per node
fn outline(session: &FileSession) -> Vec<String> {
    session
        .projection()
        .walk(session.document())
        .map(|(depth, node)| {
            let label = session
                .label_for(&node)
                .unwrap_or_else(|| "(untyped)".to_string());
            format!("{}{}  {}", "  ".repeat(depth), label, node.path)
        })
        .collect()
}
