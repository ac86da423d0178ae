use clap::{Parser, Subcommand};
use geo_ingest::{
    anchor::Anchor,
    build_anchor_transform, clip_and_mesh,
    config::GeoContext,
    dms::{format_dms, parse_dms_latitude, parse_dms_longitude},
    geometry::Point3,
    io::{read_ascii_grid, read_osm_xml, write_result_geojson, write_string},
    osm::{reconstruct, FeatureFilter},
    ClipWindow, ProjResolver, RasterGrid, SrsResolver,
};

#[derive(Parser)]
#[command(author, version, about = "Georeference models and import geodata into them")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a latitude and longitude in decimal or DMS notation.
    ParseDms {
        #[arg(allow_hyphen_values = true)]
        lat: String,
        #[arg(allow_hyphen_values = true)]
        lon: String,
    },
    /// Write a georeferencing context file.
    InitContext {
        path: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: String,
        #[arg(long, allow_hyphen_values = true)]
        lon: String,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        elevation: f64,
        /// Meters per model unit.
        #[arg(long, default_value_t = 1.0)]
        unit_scale: f64,
        #[arg(long, default_value = "WGS84")]
        srs: String,
    },
    /// Print the model to user SRS transform of a context.
    AnchorTransform {
        #[arg(long)]
        context: String,
        /// Overrides the SRS stored in the context.
        #[arg(long)]
        srs: Option<String>,
    },
    /// Convert a model point to WGS84 longitude, latitude and elevation.
    ModelToWgs {
        #[arg(long)]
        context: String,
        #[arg(allow_hyphen_values = true)]
        x: f64,
        #[arg(allow_hyphen_values = true)]
        y: f64,
        #[arg(allow_hyphen_values = true)]
        z: f64,
    },
    /// Reconstruct an OpenStreetMap XML extract in model space.
    ImportOsm {
        input: String,
        #[arg(long)]
        context: String,
        /// Keep only features carrying this key.
        #[arg(long)]
        key: Vec<String>,
        /// Keep only features carrying this key=value pair.
        #[arg(long)]
        tag: Vec<String>,
        /// Write the result as GeoJSON.
        #[arg(long)]
        output: Option<String>,
    },
    /// Sample an ESRI ASCII elevation grid into a quad mesh.
    MeshDem {
        input: String,
        #[arg(long)]
        context: String,
        #[arg(long, allow_hyphen_values = true)]
        west: f64,
        #[arg(long, allow_hyphen_values = true)]
        south: f64,
        #[arg(long, allow_hyphen_values = true)]
        east: f64,
        #[arg(long, allow_hyphen_values = true)]
        north: f64,
        /// Reference system of the grid when it has no `.prj` file.
        #[arg(long)]
        raster_srs: Option<String>,
        /// Do not expand the window by one pixel.
        #[arg(long)]
        no_pad: bool,
        /// Write the mesh as JSON.
        #[arg(long)]
        output: Option<String>,
    },
}

fn load_context(path: &str) -> Result<GeoContext, String> {
    GeoContext::load(path).map_err(|e| format!("Error reading {}: {}", path, e))
}

fn run(cli: Cli) -> Result<(), String> {
    let resolver = ProjResolver::new();
    match cli.command {
        Commands::ParseDms { lat, lon } => {
            let lat = parse_dms_latitude(&lat).map_err(|e| e.to_string())?;
            let lon = parse_dms_longitude(&lon).map_err(|e| e.to_string())?;
            println!("Latitude: {} ({})", lat, format_dms(lat));
            println!("Longitude: {} ({})", lon, format_dms(lon));
        }
        Commands::InitContext {
            path,
            lat,
            lon,
            elevation,
            unit_scale,
            srs,
        } => {
            let mut anchor = Anchor {
                elevation,
                unit_scale,
                ..Anchor::default()
            };
            anchor.set_location(&lat, &lon).map_err(|e| e.to_string())?;
            anchor.validate().map_err(|e| e.to_string())?;
            let ctx = GeoContext::new(anchor).with_srs(srs);
            ctx.save(&path)
                .map_err(|e| format!("Error writing {}: {}", path, e))?;
            println!("Wrote {}", path);
        }
        Commands::AnchorTransform { context, srs } => {
            let ctx = load_context(&context)?;
            let target = match srs {
                Some(id) => resolver.resolve(&id),
                None => ctx.spatial_reference(&resolver),
            }
            .map_err(|e| e.to_string())?;
            let transform = build_anchor_transform(&ctx.anchor, &target, &resolver)
                .map_err(|e| e.to_string())?;
            println!(
                "Model to {} ({}):",
                target.identifier(),
                target.linear_unit_name()
            );
            for row in transform.rows() {
                println!("{:.12} {:.12} {:.12} {:.12}", row[0], row[1], row[2], row[3]);
            }
        }
        Commands::ModelToWgs { context, x, y, z } => {
            let ctx = load_context(&context)?;
            let p = ctx
                .anchor
                .model_to_wgs84(Point3::new(x, y, z))
                .map_err(|e| e.to_string())?;
            println!(
                "Longitude: {:.9} Latitude: {:.9} Elevation: {:.3}",
                p.x, p.y, p.z
            );
        }
        Commands::ImportOsm {
            input,
            context,
            key,
            tag,
            output,
        } => {
            let ctx = load_context(&context)?;
            let extract =
                read_osm_xml(&input).map_err(|e| format!("Error reading {}: {}", input, e))?;
            let mut filter = FeatureFilter::new();
            for k in key {
                filter = filter.with_key(k);
            }
            for t in tag {
                let (k, v) = FeatureFilter::parse_tag(&t).map_err(|e| e.to_string())?;
                filter = filter.with_tag(k, v);
            }
            if ctx.clip {
                if let Some(bounds) = extract.bounds {
                    filter = filter.with_clip(bounds);
                }
            }
            let transform = ctx
                .anchor
                .wgs84_to_model_transform()
                .map_err(|e| e.to_string())?;
            let result = reconstruct(&extract.graph, &transform, &filter);
            for d in &result.diagnostics {
                eprintln!("{:?}: {}", d.kind, d.message);
            }
            println!(
                "Reconstructed {} geometries with {} attribute rows",
                result.geometries.len(),
                result.attributes.len()
            );
            if let Some(output) = output {
                write_result_geojson(&output, &result)
                    .map_err(|e| format!("Error writing {}: {}", output, e))?;
                println!("Wrote {}", output);
            }
        }
        Commands::MeshDem {
            input,
            context,
            west,
            south,
            east,
            north,
            raster_srs,
            no_pad,
            output,
        } => {
            let ctx = load_context(&context)?;
            let grid =
                read_ascii_grid(&input).map_err(|e| format!("Error reading {}: {}", input, e))?;
            let (mut raster, diagnostics) =
                RasterGrid::from_source(&grid, &resolver).map_err(|e| e.to_string())?;
            match raster_srs {
                Some(id) => raster.srs = resolver.resolve(&id).map_err(|e| e.to_string())?,
                None => {
                    for d in &diagnostics {
                        eprintln!("{:?}: {}", d.kind, d.message);
                    }
                }
            }
            let world = ctx
                .anchor
                .wgs84_to_model_transform()
                .map_err(|e| e.to_string())?;
            let window = ClipWindow::new(west, south, east, north);
            let pad = ctx.pad_pixels && !no_pad;
            let mesh = clip_and_mesh(&raster, &resolver, &world, &window, pad);
            for d in &mesh.diagnostics {
                eprintln!("{:?}: {}", d.kind, d.message);
            }
            println!(
                "Mesh: {}x{} vertices, {} faces",
                mesh.width,
                mesh.height,
                mesh.faces.len()
            );
            if let Some(output) = output {
                let json = serde_json::to_string_pretty(&mesh).map_err(|e| e.to_string())?;
                write_string(&output, &json)
                    .map_err(|e| format!("Error writing {}: {}", output, e))?;
                println!("Wrote {}", output);
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env().init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
