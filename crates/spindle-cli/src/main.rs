use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use spindle_core::{Engine, InMemoryStory, OutputFormatter, PlainText, StoryManifest, StorySource};

#[derive(Parser)]
#[command(name = "spindle", about = "Harlowe passage interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Display story manifest info.
    Info {
        /// Path to the story manifest.
        #[arg(long, default_value = "story.json")]
        manifest: PathBuf,
    },
    /// Play a story interactively, choosing links by number.
    Run {
        /// Path to the story manifest.
        #[arg(long, default_value = "story.json")]
        manifest: PathBuf,
        /// Passage to start from instead of the manifest's start passage.
        #[arg(long)]
        passage: Option<String>,
        /// Seed for (random:) and (either:), for reproducible runs.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Render a single passage and exit.
    Render {
        /// Path to the story manifest.
        #[arg(long, default_value = "story.json")]
        manifest: PathBuf,
        /// Passage to render; defaults to the manifest's start passage.
        passage: Option<String>,
        /// Seed for (random:) and (either:), for reproducible runs.
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn load_manifest(path: &Path) -> Result<StoryManifest> {
    let file = File::open(path).with_context(|| format!("failed to open manifest: {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).with_context(|| format!("failed to parse manifest: {}", path.display()))
}

fn build_engine(manifest_path: &Path, seed: Option<u64>) -> Result<Engine> {
    let manifest = load_manifest(manifest_path)?;
    let story: InMemoryStory = manifest.into();
    let mut engine = Engine::new(Box::new(story));
    if let Some(seed) = seed {
        engine.seed_random(seed);
    }
    Ok(engine)
}

fn cmd_info(manifest_path: &Path) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let story: InMemoryStory = manifest.into();
    println!("Start:    {}", story.start_passage());
    println!("Passages:");
    for name in story.passage_names() {
        let tags = story.passage_tags(name);
        if tags.is_empty() {
            println!("  - {name}");
        } else {
            println!("  - {name} [{}]", tags.join(", "));
        }
    }
    Ok(())
}

fn cmd_render(manifest_path: &Path, passage: Option<&str>, seed: Option<u64>) -> Result<()> {
    let mut engine = build_engine(manifest_path, seed)?;
    match passage {
        Some(name) => engine.goto(name)?,
        None => engine.start()?,
    }
    let out = PlainText.format(engine.document());
    println!("{}", out.text);
    Ok(())
}

fn cmd_run(manifest_path: &Path, passage: Option<&str>, seed: Option<u64>) -> Result<()> {
    let mut engine = build_engine(manifest_path, seed)?;
    match passage {
        Some(name) => engine.goto(name)?,
        None => engine.start()?,
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let out = PlainText.format(engine.document());
        println!("{}", out.text.trim_end());
        if out.links.is_empty() {
            println!("\n(the end)");
            return Ok(());
        }
        println!();
        for link in &out.links {
            println!("  {}) {}", link.id + 1, link.text);
        }
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line.context("failed to read input")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "q" || trimmed == "quit" {
            return Ok(());
        }
        let choice: usize = match trimmed.parse() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("enter a link number, or \"q\" to quit");
                continue;
            }
        };
        let Some(link) = out.links.iter().find(|l| l.id + 1 == choice) else {
            eprintln!("no link numbered {choice}");
            continue;
        };
        if let Err(e) = engine.click(link.node) {
            bail!("render error: {e}");
        }
        println!();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Command::Info { manifest } => cmd_info(manifest),
        Command::Run {
            manifest,
            passage,
            seed,
        } => cmd_run(manifest, passage.as_deref(), *seed),
        Command::Render {
            manifest,
            passage,
            seed,
        } => cmd_render(manifest, passage.as_deref(), *seed),
    }
}
