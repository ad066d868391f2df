//! Inspect generated plates and carved chunks from the command line

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use rivergen::ascii::{plate_markers, render_distance_ascii, render_plate_ascii, PlateView};
use rivergen::export::{export_plate_png, render_distance_map};
use rivergen::fields::{ChunkField, NoiseField};
use rivergen::terrain::{
    chunk_plate, BlendedLandforms, BlockPalette, ChunkMetadata, Landforms, RIVER_DISTANCE_KEY,
};
use rivergen::{
    Cardinal, ColumnBuffer, HostFields, NeighbourHeights, PlateCache, PlateGenerator, RiverConfig,
    TerrainCarver, WorldParams, CHUNK_SIZE, CONFIG_FILE_NAME,
};

#[derive(Parser, Debug)]
#[command(name = "plate_inspector")]
#[command(about = "Generate river plates and carve chunks for inspection")]
struct Args {
    /// World seed
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// River config file; created with defaults when missing
    #[arg(short, long, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// World height in blocks
    #[arg(long, default_value = "256")]
    map_height: i32,

    /// Sea level in blocks
    #[arg(long, default_value = "110")]
    sea_level: i32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one plate
    Plate {
        /// What to show
        #[arg(value_enum, default_value = "starts")]
        view: ViewArg,

        /// Plate x coordinate
        #[arg(short, default_value = "0", allow_hyphen_values = true)]
        x: i32,

        /// Plate z coordinate
        #[arg(short, default_value = "0", allow_hyphen_values = true)]
        z: i32,

        /// Also export the view to a PNG file
        #[arg(long)]
        png: Option<String>,

        /// Blocks per PNG pixel
        #[arg(long, default_value = "8")]
        scale: u32,

        /// List every marker in world coordinates
        #[arg(long)]
        markers: bool,
    },
    /// Carve one chunk column and show its river distance map
    Chunk {
        /// Chunk x coordinate
        #[arg(short, allow_hyphen_values = true)]
        x: i32,

        /// Chunk z coordinate
        #[arg(short, allow_hyphen_values = true)]
        z: i32,

        /// Also export the distance map to a PNG file
        #[arg(long)]
        png: Option<String>,

        /// Carve the western and northern neighbours first and blend into them
        #[arg(long)]
        smooth: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ViewArg {
    Starts,
    Full,
    Land,
    Ocean,
    Coastal,
}

impl From<ViewArg> for PlateView {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::Starts => PlateView::Starts,
            ViewArg::Full => PlateView::Full,
            ViewArg::Land => PlateView::Land,
            ViewArg::Ocean => PlateView::Ocean,
            ViewArg::Coastal => PlateView::Coastal,
        }
    }
}

/// Stand-in host fields for a world without a game engine.
fn host_fields(world: &WorldParams) -> HostFields {
    let seed = world.seed;
    HostFields {
        ocean: Arc::new(NoiseField::new(seed ^ 0x0CEA, 1.0 / 3000.0, 400.0, -40.0)),
        upheaval: Arc::new(NoiseField::new(seed ^ 0x00E4, 1.0 / 2000.0, 60.0, 20.0)),
        climate: Arc::new(NoiseField::new(seed ^ 0xC117, 1.0 / 5000.0, 25.0, 8.0)),
        landforms: Arc::new(BlendedLandforms::new(seed, 0, 1)),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = RiverConfig::load_or_default(&args.config);
    let world = WorldParams {
        seed: args.seed,
        map_height: args.map_height,
        sea_level: args.sea_level,
    };
    let fields = host_fields(&world);
    let ocean: Arc<dyn ChunkField> = Arc::clone(&fields.ocean);
    let plates = Arc::new(PlateCache::new(PlateGenerator::new(Arc::clone(&config), world, ocean)));

    println!("Seed: {}", plates.seeds());
    println!("Plate size: {} blocks ({} zones of {})", config.plate_size(), config.zones_in_plate, config.zone_size);

    match args.command {
        Command::Plate {
            view,
            x,
            z,
            png,
            scale,
            markers,
        } => {
            let view = PlateView::from(view);
            let plate = plates.get_plate(x, z);

            println!(
                "Plate {}: {} ocean zones, {} coastal, {} rivers, {} nodes, {} lakes",
                plate.coord,
                plate.zones.ocean_count(),
                plate.zones.coastal_count(),
                plate.rivers.len(),
                plate.node_count(),
                plate.lake_count(),
            );
            if let Some(biggest) = plate
                .rivers
                .iter()
                .filter_map(|river| river.nodes.first().map(|node| (river, node.start_size)))
                .max_by(|a, b| a.1.total_cmp(&b.1))
            {
                println!(
                    "Biggest mouth: size {:.0} at local {:.0} {:.0}",
                    biggest.1, biggest.0.start_pos.x, biggest.0.start_pos.y
                );
            }
            println!();
            println!("View: {}", view.name());
            print!("{}", render_plate_ascii(&plate, view));

            if markers {
                for line in plate_markers(&plate, view) {
                    println!("{}", line);
                }
            }

            if let Some(path) = png {
                match export_plate_png(&plate, view, scale, &config, &path) {
                    Ok(()) => println!("Saved {} view to {}", view.name(), path),
                    Err(e) => eprintln!("Failed to save {}: {}", path, e),
                }
            }
        }
        Command::Chunk { x, z, png, smooth } => {
            let coord = chunk_plate(x, z, &config);
            let carver = TerrainCarver::new(
                Arc::clone(&plates),
                fields,
                Landforms::standard(&world),
                BlockPalette::default(),
            );

            let height = world.map_height.max(3) as usize;
            let mut buffer = ColumnBuffer::new(CHUNK_SIZE as usize, height);
            let summary = if smooth {
                let mut neighbours = NeighbourHeights::new();
                for side in [Cardinal::West, Cardinal::North] {
                    let (dx, dz) = side.offset();
                    let mut done = ColumnBuffer::new(CHUNK_SIZE as usize, height);
                    carver.carve_chunk(x + dx, z + dz, &mut done);
                    neighbours.set(side, done.terrain_height);
                }
                carver.carve_chunk_smoothed(x, z, &neighbours, &mut buffer)
            } else {
                carver.carve_chunk(x, z, &mut buffer)
            };

            println!(
                "Chunk {} {} (plate {}): {} channel columns, {} valley columns, flow {}, y_max {}",
                x, z, coord, summary.channel_columns, summary.valley_columns, summary.has_flow, summary.y_max,
            );

            if let Some(ChunkMetadata::U16(distances)) = buffer.metadata(RIVER_DISTANCE_KEY) {
                print!("{}", render_distance_ascii(distances, CHUNK_SIZE as usize));

                if let Some(path) = png {
                    let img = render_distance_map(distances, CHUNK_SIZE as usize, config.max_valley_width, 8);
                    match img.save(&path) {
                        Ok(()) => println!("Saved distance map to {}", path),
                        Err(e) => eprintln!("Failed to save {}: {}", path, e),
                    }
                }
            }

            println!("{}", plates.stats().summary());
        }
    }
}
