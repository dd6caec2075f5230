use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use dadm_editor::{
    ChannelSink, EditorConfig, EditorError, FieldBinding, FieldStatus, PropertiesEditor,
    SharedDocument,
};
use dadm_model::{lock, shared};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::load_document;
use crate::script::{self, Step};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Document JSON file
    pub document: PathBuf,

    /// Editing script (JSON array of steps)
    pub script: PathBuf,

    /// Directory holding dadm.config.json (defaults to current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the final serialized document here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub async fn replay(args: ReplayArgs) -> Result<()> {
    let config_dir = args.config.as_deref().unwrap_or_else(|| Path::new("."));
    let config = EditorConfig::load(config_dir)?;
    let document = shared(load_document(&args.document)?);
    let steps = script::load(&args.script)?;

    println!("{}", "▶ Replaying editing script...".bright_blue().bold());

    let (sink, mut revisions) = ChannelSink::channel();
    let editor = PropertiesEditor::new(config, Arc::new(sink));
    editor.attach(Arc::clone(&document));

    for (index, step) in steps.iter().enumerate() {
        debug!(step = index + 1, ?step, "Running script step");
        run_step(&editor, &document, step)
            .await
            .map_err(|e| anyhow!("Step {} failed: {:#}", index + 1, e))?;
    }
    editor.settle().await;

    println!();
    print_summary(&editor.bindings());

    let mut last = None;
    let mut count = 0;
    while let Ok(text) = revisions.try_recv() {
        count += 1;
        if args.out.is_none() {
            println!();
            println!("{}", format!("── revision {} ──", count).dimmed());
            print!("{}", text);
        }
        last = Some(text);
    }
    editor.shutdown();

    println!();
    match (last, &args.out) {
        (Some(text), Some(out)) => {
            std::fs::write(out, text)?;
            println!(
                "{} {} revision(s), final document written to {}",
                "✓".green(),
                count,
                out.display()
            );
        }
        (Some(_), None) => println!("{} {} revision(s)", "✓".green(), count),
        (None, _) => println!("{}", "No changes were committed".yellow()),
    }

    Ok(())
}

async fn run_step(editor: &PropertiesEditor, document: &SharedDocument, step: &Step) -> Result<()> {
    match step {
        Step::Select(Some(id)) => {
            let key = lock(document)?
                .find_by_id(id)
                .map(|el| el.key.clone())
                .ok_or_else(|| anyhow!("No element with id {}", id))?;
            editor.select(Some(key));
            println!("  {} select {}", "→".cyan(), id);
        }
        Step::Select(None) => {
            editor.select(None);
            println!("  {} clear selection", "→".cyan());
        }
        Step::Focus(path) => {
            editor.focus(path);
            println!("  {} focus {}", "→".cyan(), path);
        }
        Step::Edit { path, value } => match editor.edit(path, value) {
            Ok(()) => println!("  {} edit {} = {:?}", "→".cyan(), path, value),
            Err(EditorError::Validation(e)) => {
                println!("  {} edit {} = {:?} ({})", "!".yellow(), path, value, e.message)
            }
            Err(e) => return Err(e.into()),
        },
        Step::Blur(path) => {
            if editor.blur(path) {
                println!("  {} blur {} (commit scheduled)", "→".cyan(), path);
            } else {
                println!("  {} blur {} (nothing scheduled)", "!".yellow(), path);
            }
        }
        Step::Wait(ms) => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            println!("  {} wait {}ms", "…".dimmed(), ms);
        }
    }
    Ok(())
}

fn print_summary(bindings: &[FieldBinding]) {
    if bindings.is_empty() {
        println!("{}", "No element selected".dimmed());
        return;
    }

    for binding in bindings {
        let status = match &binding.status {
            FieldStatus::Saved => binding.status.to_string().green(),
            FieldStatus::Error(_) => binding.status.to_string().red(),
            FieldStatus::Idle => binding.status.to_string().dimmed(),
            _ => binding.status.to_string().yellow(),
        };
        println!("  {:<28} {:<32} {}", binding.path.to_string(), format!("{:?}", binding.value), status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dadm_model::Document;

    fn write_inputs(dir: &Path, script: &str) -> (PathBuf, PathBuf) {
        let doc = Document::builder("Definitions_1", "Process_1")
            .service_task("Task_1")
            .name("Ask assistant")
            .build();
        let doc_path = dir.join("doc.json");
        let script_path = dir.join("script.json");
        std::fs::write(&doc_path, doc.to_json().unwrap()).unwrap();
        std::fs::write(&script_path, script).unwrap();
        (doc_path, script_path)
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_writes_final_document() {
        let dir = tempfile::tempdir().unwrap();
        let (document, script) = write_inputs(
            dir.path(),
            r#"[
                {"select": "Task_1"},
                {"edit": {"path": "id", "value": "Task_2"}},
                {"blur": "id"}
            ]"#,
        );
        let out = dir.path().join("out.bpmn");

        replay(ReplayArgs {
            document,
            script,
            config: Some(dir.path().to_path_buf()),
            out: Some(out.clone()),
        })
        .await
        .unwrap();

        let xml = std::fs::read_to_string(out).unwrap();
        assert!(xml.contains(r#"id="Task_2""#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_unknown_element_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (document, script) = write_inputs(dir.path(), r#"[{"select": "Missing"}]"#);

        let result = replay(ReplayArgs {
            document,
            script,
            config: Some(dir.path().to_path_buf()),
            out: None,
        })
        .await;

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Step 1"));
        assert!(message.contains("Missing"));
    }
}
