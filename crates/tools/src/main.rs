use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use foundation::math::{Vec2, Vec3};
use formats::{ExplorerConfig, LoadedPapers, PaperDocument, TopicIndex, ingest_document};
use scene::explorer::{ClickOutcome, Explorer, ExplorerOptions, NoopObserver};
use scene::mesh::AtlasGrid;
use scene::neighbors::nearest_neighbors;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and query embedding point-cloud documents")]
struct Args {
    /// Explorer configuration JSON (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a paper document
    Inspect {
        document: PathBuf,
    },

    /// Nearest neighbors of one paper, in scan order
    Neighbors {
        document: PathBuf,

        #[arg(long)]
        doi: String,

        /// Defaults to the configured neighbor count
        #[arg(long)]
        count: Option<usize>,
    },

    /// Atlas cell and texture rectangle for a paper index
    AtlasCell {
        #[arg(long)]
        index: usize,
    },

    /// Simulate a click from the initial view
    Pick {
        document: PathBuf,

        #[arg(long)]
        x: f64,

        #[arg(long)]
        y: f64,

        #[arg(long, default_value_t = 1280.0)]
        width: f64,

        #[arg(long, default_value_t = 720.0)]
        height: f64,
    },

    /// Highlight one topic and report the framing target
    Topic {
        document: PathBuf,

        topics: PathBuf,

        #[arg(long)]
        id: String,
    },
}

#[derive(Debug, Serialize, PartialEq)]
struct Summary {
    papers: usize,
    skipped: usize,
    means: Option<[f64; 3]>,
    min: Option<[f64; 3]>,
    max: Option<[f64; 3]>,
    dominant_categories: BTreeMap<String, usize>,
    uncategorized: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let options = match &args.config {
        Some(path) => ExplorerConfig::load(path)?.to_options()?,
        None => ExplorerOptions::default(),
    };

    match args.command {
        Command::Inspect { document } => {
            let loaded = load(&document)?;
            println!("{}", serde_json::to_string_pretty(&summarize(&loaded))?);
        }
        Command::Neighbors {
            document,
            doi,
            count,
        } => {
            let loaded = load(&document)?;
            let index = loaded
                .papers
                .index_of(&doi)
                .ok_or_else(|| format!("unknown doi: {doi}"))?;
            let count = count.unwrap_or(options.neighbor_count);
            let target = loaded.papers.as_slice()[index].point;
            for i in nearest_neighbors(loaded.papers.as_slice(), index, count) {
                if let Some(p) = loaded.papers.get(i) {
                    println!("{i}\t{}\t{:.6}", p.doi, target.distance(p.point));
                }
            }
        }
        Command::AtlasCell { index } => {
            let grid: AtlasGrid = options.mesh.atlas;
            let (col, row) = grid.cell(index);
            let uv = grid.uv_rect(index);
            println!(
                "index {index}: column {col}, row {row}, u [{:.4}, {:.4}], v [{:.4}, {:.4}]",
                uv.u0, uv.u1, uv.v0, uv.v1
            );
        }
        Command::Pick {
            document,
            x,
            y,
            width,
            height,
        } => {
            let loaded = load(&document)?;
            let mut explorer =
                Explorer::new(loaded.papers, loaded.means, options, Box::new(NoopObserver));
            explorer.initialize(width, height);
            match explorer.click(Vec2::new(x, y)) {
                ClickOutcome::Picked(ticket) => {
                    println!("picked {} ({})", ticket.paper, ticket.dois.join(", "));
                    let _ = explorer.finish_selection(ticket);
                }
                ClickOutcome::Deselected => println!("miss"),
                ClickOutcome::Drag | ClickOutcome::Dropped => println!("ignored"),
            }
        }
        Command::Topic {
            document,
            topics,
            id,
        } => {
            let loaded = load(&document)?;
            let index = TopicIndex::load(&topics)?;
            let dois = index
                .get(&id)
                .ok_or_else(|| format!("unknown topic: {id}"))?
                .to_vec();
            let mut explorer =
                Explorer::new(loaded.papers, loaded.means, options, Box::new(NoopObserver));
            explorer.initialize(1280.0, 720.0);
            explorer.add_topic(&id, dois);
            let target = explorer.camera().animation_target();
            println!(
                "topic {id}: {} papers highlighted, camera target {}",
                explorer.selection().highlighted().len(),
                target.map_or_else(|| "unchanged".to_string(), format_vec3)
            );
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<LoadedPapers, Box<dyn std::error::Error>> {
    let document = PaperDocument::load(path)?;
    let loaded = ingest_document(&document);
    info!(
        papers = loaded.papers.len(),
        skipped = loaded.report.skipped.len(),
        "document loaded"
    );
    Ok(loaded)
}

fn summarize(loaded: &LoadedPapers) -> Summary {
    let bounds = loaded.papers.bounds();
    let (min, max) = if bounds.is_empty() {
        (None, None)
    } else {
        (Some(bounds.min.to_array()), Some(bounds.max.to_array()))
    };

    let mut dominant_categories = BTreeMap::new();
    let mut uncategorized = 0;
    for paper in loaded.papers.iter() {
        match paper.dominant_category() {
            Some(name) => *dominant_categories.entry(name.to_string()).or_insert(0) += 1,
            None => uncategorized += 1,
        }
    }

    Summary {
        papers: loaded.papers.len(),
        skipped: loaded.report.skipped.len(),
        means: loaded.means.map(Vec3::to_array),
        min,
        max,
        dominant_categories,
        uncategorized,
    }
}

fn format_vec3(v: Vec3) -> String {
    format!("({:.4}, {:.4}, {:.4})", v.x, v.y, v.z)
}
