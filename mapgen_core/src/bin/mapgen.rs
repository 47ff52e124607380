use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;

use mapgen_core::{
    load_start_biases_from_env, load_tunables_from_env, run_generation, DefaultTerrain,
    MapDimensions, MapgenSeed, MapgenTunables, PlayerRosterResource, StartBiasCatalog, Terrain,
    TerrainQuery, TileGrid,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a strategy map and report what each stage did", long_about = None)]
struct Args {
    /// Numeric map seed
    #[arg(long, default_value_t = MapgenSeed::default().0)]
    seed: u64,

    /// Seed phrase, hashed into the numeric seed (overrides --seed)
    #[arg(long)]
    seed_phrase: Option<String>,

    #[arg(long, default_value_t = MapDimensions::default().width)]
    width: u32,

    #[arg(long, default_value_t = MapDimensions::default().height)]
    height: u32,

    /// Number of major players to place
    #[arg(long, default_value_t = 6)]
    players: u32,

    /// Make player 0 human
    #[arg(long)]
    human: bool,

    /// Tunables JSON (defaults to MAPGEN_TUNABLES_PATH, then the builtin table)
    #[arg(long)]
    tunables: Option<PathBuf>,

    /// Start bias catalog JSON (defaults to START_BIASES_PATH, then the builtin table)
    #[arg(long)]
    biases: Option<PathBuf>,

    /// Print an ASCII rendering of the map after the report
    #[arg(long)]
    ascii: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let tunables: Arc<MapgenTunables> = match &args.tunables {
        Some(path) => MapgenTunables::from_file(path)
            .with_context(|| format!("Failed to load tunables from {}", path.display()))?
            .into(),
        None => load_tunables_from_env().0,
    };
    let catalog: Arc<StartBiasCatalog> = match &args.biases {
        Some(path) => StartBiasCatalog::from_file(path)
            .with_context(|| format!("Failed to load start biases from {}", path.display()))?
            .into(),
        None => load_start_biases_from_env(),
    };
    let seed = args
        .seed_phrase
        .as_deref()
        .map(MapgenSeed::from_phrase)
        .unwrap_or(MapgenSeed(args.seed));
    let dims = MapDimensions {
        width: args.width.max(1),
        height: args.height.max(1),
    };
    let roster = PlayerRosterResource::sample(&catalog, args.players, args.human);

    let map = run_generation(seed.0, dims, &tunables, &catalog, &roster.0, &DefaultTerrain);
    info!(
        target: "mapgen::cli",
        seed = seed.0,
        placed = map.report.placed,
        failed = map.report.failed,
        "cli.generated"
    );

    let starts: Vec<_> = map
        .starts
        .placements
        .iter()
        .map(|(player, placement)| {
            json!({
                "player": player,
                "x": placement.tile.x,
                "y": placement.tile.y,
                "group": placement.group,
                "region": placement.region,
                "fallback": placement.fallback,
            })
        })
        .collect();
    let output = json!({
        "report": map.report,
        "starts": starts,
        "failures": map.starts.failures,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if args.ascii {
        let starts = map.starts.placed_tiles();
        println!("{}", render_ascii(&map.grid, &starts));
    }
    Ok(())
}

fn render_ascii(grid: &TileGrid, starts: &[bevy::prelude::UVec2]) -> String {
    let mut out = String::with_capacity(((grid.width() + 1) * grid.height()) as usize);
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let glyph = if starts.iter().any(|s| s.x == x && s.y == y) {
                '@'
            } else {
                match grid.terrain(x, y) {
                    Terrain::Ocean => '~',
                    Terrain::Coast => '-',
                    Terrain::NavigableRiver => '=',
                    Terrain::Mountain => '^',
                    Terrain::Hill => 'n',
                    Terrain::Flat if grid.is_river(x, y) => 'r',
                    Terrain::Flat => '.',
                }
            };
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}
