//! Selvage CLI - seam-aware mesh decimation.
//!
//! Usage: selvage <COMMAND> <INPUT> <PARAMETER> [OUTPUT] [OPTIONS]
//!
//! Run `selvage --help` for available commands.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use selvage::algo::decimate::{decimate, DecimateOptions, SeamAwareDegree};
use selvage::io;
use selvage::mesh::TexturedMesh;

#[derive(Parser)]
#[command(name = "selvage")]
#[command(author, version, about = "Seam-aware mesh decimation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decimate to an absolute number of vertices
    NumVertices {
        /// Input mesh file (OBJ with texture coordinates)
        input: PathBuf,

        /// Target number of output vertices
        count: usize,

        /// Output mesh file; derived from the input name and the final
        /// error when omitted
        output: Option<PathBuf>,

        #[command(flatten)]
        options: SharedOptions,
    },

    /// Decimate to a percentage of the input vertex count
    PercentVertices {
        /// Input mesh file (OBJ with texture coordinates)
        input: PathBuf,

        /// Percentage of input vertices to keep (0-100)
        percent: f64,

        /// Output mesh file; derived from the input name and the final
        /// error when omitted
        output: Option<PathBuf>,

        #[command(flatten)]
        options: SharedOptions,
    },
}

#[derive(Args)]
struct SharedOptions {
    /// Seam awareness (0: NoUVShapePreserving, 1: UVShapePreserving,
    /// 2: Seamless)
    #[arg(long = "strict", default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=2))]
    strict: u8,

    /// Prevent boundary edges from being collapsed
    #[arg(long)]
    preserve_boundaries: bool,

    /// Relative weight of UV error against geometric error
    #[arg(long, default_value_t = 1.0)]
    uv_weight: f64,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::NumVertices {
            input,
            count,
            output,
            options,
        } => cmd_decimate(&input, count, output, &options),

        Commands::PercentVertices {
            input,
            percent,
            output,
            options,
        } => {
            let mesh = io::load_obj(&input)?;
            let target = ((percent * mesh.num_vertices() as f64) / 100.0).round() as usize;
            println!(
                "{}% of {} input vertices is {} output vertices.",
                percent,
                mesh.num_vertices(),
                target
            );
            cmd_decimate_loaded(&input, mesh, target, output, &options)
        }
    }
}

fn cmd_decimate(
    input: &Path,
    target: usize,
    output: Option<PathBuf>,
    options: &SharedOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = io::load_obj(input)?;
    cmd_decimate_loaded(input, mesh, target, output, options)
}

fn cmd_decimate_loaded(
    input: &Path,
    mesh: TexturedMesh,
    target: usize,
    output: Option<PathBuf>,
    options: &SharedOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "Loaded a mesh with {} vertices and {} faces: {}",
        mesh.num_vertices(),
        mesh.num_faces(),
        input.display()
    );

    if target == 0 {
        return Err("target number of vertices must be a positive integer".into());
    }

    // Nothing to do; write the input back out, named for its vertex count.
    if target >= mesh.num_vertices() {
        let path = output.unwrap_or_else(|| {
            sibling_path(
                input,
                &format!("-decimated_to_{}_vertices.obj", mesh.num_vertices()),
            )
        });
        io::save_obj(&mesh, &path)?;
        println!("Wrote: {}", path.display());
        eprintln!(
            "WARNING: target number of vertices must be smaller than the input \
             number of vertices: {target}"
        );
        return Ok(());
    }

    let decimate_options = DecimateOptions::with_target(target)
        .with_seam_aware_degree(
            SeamAwareDegree::from_index(options.strict as usize).expect("validated by clap"),
        )
        .with_preserve_boundaries(options.preserve_boundaries)
        .with_uv_weight(options.uv_weight);

    let start = Instant::now();
    let result = decimate(&mesh, &decimate_options)?;
    let elapsed = start.elapsed();

    println!(
        "Decimated to {} vertices, {} faces in {:.2}s (max error {:.6})",
        result.mesh.num_vertices(),
        result.mesh.num_faces(),
        elapsed.as_secs_f64(),
        result.max_error
    );
    if !result.reached_target {
        eprintln!(
            "WARNING: the target vertex count was unachievable; no feasible \
             collapses remained."
        );
    }

    let path = output.unwrap_or_else(|| {
        sibling_path(
            input,
            &format!(
                "-decimated_to_{}_err_{:.6}.obj",
                result.mesh.num_vertices(),
                result.max_error
            ),
        )
    });
    io::save_obj(&result.mesh, &path)?;
    println!("Wrote: {}", path.display());

    Ok(())
}

/// `input.obj` + suffix `-foo.obj` -> `input-foo.obj`, next to the input.
fn sibling_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string());
    input.with_file_name(format!("{stem}{suffix}"))
}
