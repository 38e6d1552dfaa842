use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use schemaview_app::LayoutOrchestrator;
use schemaview_core::{LayoutMode, LayoutSettings, NodeId, PositionMap, Relationship};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute entity positions for one or more schema files
    Layout(LayoutArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct LayoutArgs {
    /// Layout mode: force, grid, hierarchical or manual
    #[arg(short, long, default_value = "force")]
    mode: LayoutMode,

    /// Seed for placing entities that have no prior position
    #[arg(long)]
    seed: Option<u64>,

    /// Layout settings file (defaults to the per-user settings)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Position map from a previous run, reused as the force-layout seed
    #[arg(short, long)]
    positions: Option<PathBuf>,

    /// Directory for `<name>.positions.json` output (defaults to next to each schema)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Schema files to lay out
    #[arg(required = true)]
    schemas: Vec<PathBuf>,
}

/// An entity is either a bare id or a record carrying one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntityEntry {
    Id(NodeId),
    Record { id: NodeId },
}

impl EntityEntry {
    fn into_id(self) -> NodeId {
        match self {
            Self::Id(id) | Self::Record { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    entities: Vec<EntityEntry>,
    #[serde(default)]
    relationships: Vec<Relationship>,
    /// Subset of entities to place; all of them when absent.
    #[serde(default)]
    visible: Option<Vec<NodeId>>,
}

impl SchemaFile {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid schema {:?}", path))
    }

    fn visible_nodes(self) -> (Vec<NodeId>, Vec<Relationship>) {
        let nodes = match self.visible {
            Some(visible) => visible,
            None => self.entities.into_iter().map(EntityEntry::into_id).collect(),
        };
        (nodes, self.relationships)
    }
}

#[derive(Debug, PartialEq)]
enum LayoutOutput {
    Written { path: PathBuf, node_count: usize },
    NoOp,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    match args.command {
        Command::Layout(layout) => run_layout(&layout),
    }
}

fn load_settings(args: &LayoutArgs) -> Result<LayoutSettings> {
    let mut settings = match &args.settings {
        Some(path) => LayoutSettings::load(path)
            .with_context(|| format!("Failed to load layout settings {:?}", path))?,
        None => LayoutSettings::load_or_default(),
    };
    if args.seed.is_some() {
        settings.force.seed = args.seed;
    }
    Ok(settings)
}

fn load_prior(path: Option<&Path>) -> Result<PositionMap> {
    let Some(path) = path else {
        return Ok(PositionMap::new());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read positions {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid positions {:?}", path))
}

fn output_path(schema: &Path, out_dir: Option<&Path>) -> PathBuf {
    let stem = schema
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "schema".to_string());
    let file_name = format!("{stem}.positions.json");
    match out_dir {
        Some(dir) => dir.join(file_name),
        None => schema.with_file_name(file_name),
    }
}

fn run_layout(args: &LayoutArgs) -> Result<()> {
    let orchestrator = LayoutOrchestrator::new(load_settings(args)?);
    let prior = load_prior(args.positions.as_deref())?;
    if let Some(dir) = &args.out {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
    }

    let results: Vec<(PathBuf, Result<LayoutOutput>)> = args
        .schemas
        .par_iter()
        .map(|schema| {
            let result = layout_schema(&orchestrator, args, &prior, schema);
            (schema.clone(), result)
        })
        .collect();

    let mut failures = 0usize;
    for (schema, result) in results {
        match result {
            Ok(LayoutOutput::Written { path, node_count }) => {
                println!("{:?}: placed {} entities -> {:?}", schema, node_count, path);
            }
            Ok(LayoutOutput::NoOp) => {
                println!("{:?}: nothing to place in {} mode, no output written", schema, args.mode);
            }
            Err(e) => {
                failures += 1;
                eprintln!("{:?}: {:#}", schema, e);
            }
        }
    }

    anyhow::ensure!(failures == 0, "{} schema file(s) failed", failures);
    Ok(())
}

fn layout_schema(
    orchestrator: &LayoutOrchestrator,
    args: &LayoutArgs,
    prior: &PositionMap,
    schema: &Path,
) -> Result<LayoutOutput> {
    let (nodes, relationships) = SchemaFile::load(schema)?.visible_nodes();
    tracing::debug!(
        "Laying out {:?}: {} entities, {} relationships",
        schema,
        nodes.len(),
        relationships.len()
    );

    let Some(positions) = orchestrator.recompute(args.mode, &nodes, &relationships, prior) else {
        return Ok(LayoutOutput::NoOp);
    };

    let path = output_path(schema, args.out.as_deref());
    let content = serde_json::to_string_pretty(&positions)?;
    std::fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(LayoutOutput::Written {
        path,
        node_count: positions.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaview_core::Position;
    use tempfile::tempdir;

    const CRM: &str = r#"{
        "entities": ["account", {"id": "contact"}, "opportunity"],
        "relationships": [
            {"from": "contact", "to": "account", "cardinality": "N:1"},
            {"from": "opportunity", "to": "account", "cardinality": "N:1"}
        ]
    }"#;

    /// Arguments pinned to a settings file inside `dir`, so runs never pick up
    /// the per-user settings of the machine running the tests.
    fn args(
        dir: &Path,
        settings: &LayoutSettings,
        mode: LayoutMode,
        schemas: Vec<PathBuf>,
        out: Option<PathBuf>,
    ) -> LayoutArgs {
        let settings_path = dir.join("layout.json");
        settings.save(&settings_path).unwrap();
        LayoutArgs {
            mode,
            seed: Some(1),
            settings: Some(settings_path),
            positions: None,
            out,
            schemas,
        }
    }

    #[test]
    fn test_cli_parses_layout_command() {
        let parsed = Args::try_parse_from([
            "schemaview-cli",
            "layout",
            "--mode",
            "hierarchical",
            "--seed",
            "7",
            "crm.json",
        ])
        .unwrap();
        let Command::Layout(layout) = parsed.command;
        assert_eq!(layout.mode, LayoutMode::Hierarchical);
        assert_eq!(layout.seed, Some(7));
        assert_eq!(layout.schemas, vec![PathBuf::from("crm.json")]);

        assert!(Args::try_parse_from(["schemaview-cli", "layout", "--mode", "spiral", "a.json"]).is_err());
    }

    #[test]
    fn test_layout_writes_position_map() {
        let dir = tempdir().unwrap();
        let schema = dir.path().join("crm.json");
        std::fs::write(&schema, CRM).unwrap();
        let out = dir.path().join("out");

        let args = args(
            dir.path(),
            &LayoutSettings::default(),
            LayoutMode::Hierarchical,
            vec![schema],
            Some(out.clone()),
        );
        run_layout(&args).unwrap();

        let written: PositionMap =
            serde_json::from_str(&std::fs::read_to_string(out.join("crm.positions.json")).unwrap())
                .unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(written[&NodeId::from("account")], Position::new(410.0, 80.0));
    }

    #[test]
    fn test_settings_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let schema = dir.path().join("crm.json");
        std::fs::write(&schema, CRM).unwrap();

        let mut settings = LayoutSettings::default();
        settings.hierarchical.canvas_width = 2000.0;
        let args = args(dir.path(), &settings, LayoutMode::Hierarchical, vec![schema], None);
        run_layout(&args).unwrap();

        let written: PositionMap = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("crm.positions.json")).unwrap(),
        )
        .unwrap();
        // A single node on level 0 is centered in the wider canvas.
        assert_eq!(written[&NodeId::from("account")], Position::new(810.0, 80.0));
    }

    #[test]
    fn test_manual_mode_writes_nothing() {
        let dir = tempdir().unwrap();
        let schema = dir.path().join("crm.json");
        std::fs::write(&schema, CRM).unwrap();

        let orchestrator = LayoutOrchestrator::default();
        let args = args(
            dir.path(),
            &LayoutSettings::default(),
            LayoutMode::Manual,
            vec![schema.clone()],
            None,
        );
        let output = layout_schema(&orchestrator, &args, &PositionMap::new(), &schema).unwrap();
        assert_eq!(output, LayoutOutput::NoOp);
        assert!(!dir.path().join("crm.positions.json").exists());
    }

    #[test]
    fn test_visible_subset_is_respected() {
        let schema: SchemaFile = serde_json::from_str(
            r#"{"entities": ["a", "b", "c"], "visible": ["c"]}"#,
        )
        .unwrap();
        let (nodes, relationships) = schema.visible_nodes();
        assert_eq!(nodes, vec![NodeId::from("c")]);
        assert!(relationships.is_empty());
    }

    #[test]
    fn test_invalid_schema_is_reported() {
        let dir = tempdir().unwrap();
        let schema = dir.path().join("broken.json");
        std::fs::write(&schema, "{ not json").unwrap();

        let args = args(
            dir.path(),
            &LayoutSettings::default(),
            LayoutMode::Grid,
            vec![schema],
            None,
        );
        assert!(run_layout(&args).is_err());
    }

    #[test]
    fn test_output_path_defaults_next_to_schema() {
        assert_eq!(
            output_path(Path::new("/tmp/models/crm.json"), None),
            PathBuf::from("/tmp/models/crm.positions.json")
        );
        assert_eq!(
            output_path(Path::new("crm.json"), Some(Path::new("out"))),
            PathBuf::from("out/crm.positions.json")
        );
    }
}
