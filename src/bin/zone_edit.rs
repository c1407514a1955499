//! zone_edit - inspect and edit the zone configuration file

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use zone_occupancy::{AnalysisConfig, Vertex, Zone, ZoneStore};

#[derive(Parser, Debug)]
#[command(name = "zone_edit", about = "Inspect and edit named occupancy zones")]
struct Args {
    /// Zone configuration file (overrides configuration).
    #[arg(long, env = "ZONE_OCCUPANCY_ZONES")]
    zones: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List configured zones
    List,

    /// Add or replace a zone
    Set {
        name: String,
        /// Polygon vertices as x,y pixel pairs (at least three)
        #[arg(required = true, num_args = 3.., value_parser = parse_vertex)]
        vertices: Vec<Vertex>,
    },

    /// Remove a zone
    Remove { name: String },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let zones_path = match args.zones {
        Some(path) => path,
        None => AnalysisConfig::load()?.zones_path,
    };
    let store = ZoneStore::new(zones_path);

    match args.command {
        Command::List => {
            let zones = store.load_checked().or_else(|err| match err {
                zone_occupancy::ConfigError::Io { ref source, .. }
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    Ok(Default::default())
                }
                other => Err(other),
            })?;
            if zones.is_empty() {
                println!("no zones in {}", store.path().display());
            }
            for zone in zones.iter() {
                let ring: Vec<String> = zone
                    .vertices()
                    .iter()
                    .map(|v| format!("{},{}", v.x, v.y))
                    .collect();
                println!("{:<24} {}", zone.name(), ring.join(" "));
            }
        }
        Command::Set { name, vertices } => {
            let zone = Zone::new(name, vertices)?;
            let label = zone.name().to_string();
            let zones = store.upsert(zone)?;
            println!(
                "zone '{}' saved to {} ({} zone(s))",
                label,
                store.path().display(),
                zones.len()
            );
        }
        Command::Remove { name } => match store.remove(&name)? {
            Some(_) => println!("zone '{}' removed from {}", name, store.path().display()),
            None => return Err(anyhow!("no zone named '{}'", name)),
        },
    }
    Ok(())
}

fn parse_vertex(raw: &str) -> Result<Vertex> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| anyhow!("vertex '{}' must be x,y", raw))?;
    let x: i32 = x
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid x coordinate in '{}'", raw))?;
    let y: i32 = y
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid y coordinate in '{}'", raw))?;
    Ok(Vertex::new(x, y))
}
