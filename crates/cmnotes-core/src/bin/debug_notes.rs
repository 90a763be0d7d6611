use std::path::PathBuf;

use anyhow::{Context, Result};
use cmnotes_core::tracing_setup::init_tracing;
use cmnotes_core::{CoreConfig, NotesRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let project = std::env::args()
        .nth(1)
        .context("usage: debug_notes <project>")?;

    let config = match std::env::var_os("CMNOTES_CONFIG") {
        Some(path) => CoreConfig::load(&PathBuf::from(path))?,
        None => CoreConfig::default(),
    };
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

    println!("Loading project '{}' from {}...", project, config.graphql_url);
    let runtime = NotesRuntime::http(config)?;
    let data = runtime.load_project(&project).await?;

    println!(
        "Found {} visible notes ({} of {} author blobs failed)\n",
        data.notes.len(),
        data.report.failed.len(),
        data.report.attempted
    );

    println!("=== Community managers ===");
    for cm in data.views.cms.iter().chain(data.views.dapps.iter()) {
        println!(
            "{} (@{}){}: {} notes, last active {:?}",
            cm.name,
            cm.handle,
            if cm.is_dapp { " [dapp]" } else { "" },
            cm.note_count,
            cm.last_activity
        );
        if !cm.historical_names.is_empty() {
            println!("  formerly: {:?}", cm.historical_names);
        }
    }

    println!("\n=== Users ===");
    for user in data.views.users.iter().take(20) {
        println!("{}: {} notes", user.label, user.note_count);
    }

    println!("\n=== Latest notes ===");
    for note in data.notes.iter().take(10) {
        let preview: String = note.content.chars().take(60).collect();
        println!("[{}] {} on @{}: {}", note.timestamp, note.author_name, note.subject_handle, preview);
    }

    let stats = runtime.stats();
    println!(
        "\nBlob failure rate: {:.1}%",
        stats.blob_failure_rate() * 100.0
    );

    Ok(())
}
