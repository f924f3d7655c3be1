//! cubegraph CLI - edit and inspect a cube model database
//!
//! Usage:
//!   cubegraph init [--sample]
//!   cubegraph graph [--pretty]
//!   cubegraph cube add <name> <columns>...
//!   cubegraph relation add <left> <left_column> <right> <right_column> [--cardinality <c>]
//!   cubegraph sql <cube.column>...
//!
//! Examples:
//!   cubegraph init --sample
//!   cubegraph relation add orders customer_id customers id --cardinality many-to-one
//!   cubegraph sql orders.total customers.name

use clap::{Parser, Subcommand, ValueEnum};
use cubegraph::config::Settings;
use cubegraph::{Cardinality, CubeStore, CubeUpdate, ModelController, RelationEdit, RelationId};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cubegraph")]
#[command(about = "cubegraph - model cubes and their relations as a graph")]
#[command(version)]
struct Cli {
    /// Database file (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (defaults to CUBEGRAPH_CONFIG, ./cubegraph.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init {
        /// Seed the sample e-commerce model if the database is empty
        #[arg(long)]
        sample: bool,
    },

    /// Print the graph snapshot as JSON
    Graph {
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Edit cubes
    #[command(subcommand)]
    Cube(CubeCommand),

    /// Edit relations
    #[command(subcommand)]
    Relation(RelationCommand),

    /// Print SQL joining the cubes of the selected columns
    Sql {
        /// Columns as cube.column
        #[arg(required = true)]
        columns: Vec<String>,
    },

    /// Print cubes in dependency order
    Order,
}

#[derive(Subcommand)]
enum CubeCommand {
    /// Create a cube
    Add {
        name: String,
        columns: Vec<String>,
    },
    /// Rename a cube
    Rename { name: String, new_name: String },
    /// Append a column
    AddColumn { cube: String, column: String },
    /// Remove a column (fails if a relation uses it)
    RemoveColumn { cube: String, column: String },
    /// Delete a cube and its relations
    Delete { name: String },
}

#[derive(Subcommand)]
enum RelationCommand {
    /// Create a relation left.left_column -> right.right_column
    Add {
        left: String,
        left_column: String,
        right: String,
        right_column: String,
        #[arg(short, long, default_value = "one-to-many")]
        cardinality: CardinalityArg,
    },
    /// Change a relation's columns or cardinality
    Update {
        id: RelationId,
        #[arg(long)]
        left_column: Option<String>,
        #[arg(long)]
        right_column: Option<String>,
        #[arg(short, long)]
        cardinality: Option<CardinalityArg>,
    },
    /// Delete a relation
    Delete { id: RelationId },
    /// List relations
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum CardinalityArg {
    OneToOne,
    OneToMany,
    ManyToOne,
}

impl From<CardinalityArg> for Cardinality {
    fn from(arg: CardinalityArg) -> Self {
        match arg {
            CardinalityArg::OneToOne => Cardinality::OneToOne,
            CardinalityArg::OneToMany => Cardinality::OneToMany,
            CardinalityArg::ManyToOne => Cardinality::ManyToOne,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings);

    let db_path = match cli.db.clone() {
        Some(p) => Ok(p),
        None => settings.database_path(),
    };
    let db_path = match db_path {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error resolving database path: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = match CubeStore::open(&db_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error opening '{}': {}", db_path.display(), e);
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(path = %db_path.display(), "opened cube store");

    let mut controller = ModelController::new(store);
    if settings.database.sample_data {
        if let Err(e) = controller.init_sample_data() {
            eprintln!("Error seeding sample data: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match run(cli.command, &settings, &mut controller) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(
    command: Commands,
    settings: &Settings,
    ctl: &mut ModelController,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Init { sample } => {
            // Opening the store already created the schema.
            if sample && ctl.init_sample_data()? {
                println!("Seeded sample model");
            }
            if ctl.model()?.name() != settings.model.name {
                ctl.set_model_name(&settings.model.name)?;
            }
            let model = ctl.model()?;
            println!(
                "{}: {} cubes, {} relations",
                model.name(),
                model.cubes().len(),
                model.relation_count()
            );
        }
        Commands::Graph { pretty } => {
            let data = ctl.model()?.to_graph_data();
            let json = if pretty {
                serde_json::to_string_pretty(&data)?
            } else {
                serde_json::to_string(&data)?
            };
            println!("{}", json);
        }
        Commands::Cube(cmd) => cmd_cube(cmd, ctl)?,
        Commands::Relation(cmd) => cmd_relation(cmd, ctl)?,
        Commands::Sql { columns } => {
            println!("{}", ctl.model()?.generate_sql(columns.as_slice())?);
        }
        Commands::Order => {
            for name in ctl.model()?.topological_order()? {
                println!("{}", name);
            }
        }
    }
    Ok(())
}

fn cmd_cube(cmd: CubeCommand, ctl: &mut ModelController) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        CubeCommand::Add { name, columns } => {
            let cube = ctl.create_cube(&name, &columns)?;
            println!("Created cube '{}' ({})", cube.name(), cube.columns().join(", "));
        }
        CubeCommand::Rename { name, new_name } => {
            let update = CubeUpdate {
                new_name: Some(new_name),
                columns: None,
            };
            let cube = ctl.update_cube(&name, &update)?;
            println!("Renamed '{}' to '{}'", name, cube.name());
        }
        CubeCommand::AddColumn { cube, column } => {
            let cube = ctl.add_column(&cube, &column)?;
            println!("{}: {}", cube.name(), cube.columns().join(", "));
        }
        CubeCommand::RemoveColumn { cube, column } => {
            let cube = ctl.remove_column(&cube, &column)?;
            println!("{}: {}", cube.name(), cube.columns().join(", "));
        }
        CubeCommand::Delete { name } => {
            let removed = ctl.delete_cube(&name)?;
            println!("Deleted cube '{}' and {} relation(s)", name, removed.len());
        }
    }
    Ok(())
}

fn cmd_relation(
    cmd: RelationCommand,
    ctl: &mut ModelController,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        RelationCommand::Add {
            left,
            left_column,
            right,
            right_column,
            cardinality,
        } => {
            let id = ctl.create_relation(
                &left,
                &right,
                &left_column,
                &right_column,
                cardinality.into(),
            )?;
            println!("Created relation {}", id);
        }
        RelationCommand::Update {
            id,
            left_column,
            right_column,
            cardinality,
        } => {
            let edit = RelationEdit {
                left_column,
                right_column,
                cardinality: cardinality.map(Into::into),
                ..RelationEdit::default()
            };
            if edit.is_empty() {
                return Err("nothing to update".into());
            }
            ctl.update_relation(id, &edit)?;
            println!("Updated relation {}", id);
        }
        RelationCommand::Delete { id } => {
            let rel = ctl.delete_relation(id)?;
            println!("Deleted relation {}: {}", id, rel.label());
        }
        RelationCommand::List => {
            for row in ctl.list_relations()? {
                println!(
                    "{:>4}  {}.{} -> {}.{} ({})",
                    row.id,
                    row.left_cube,
                    row.left_column,
                    row.right_cube,
                    row.right_column,
                    row.cardinality
                );
            }
        }
    }
    Ok(())
}
