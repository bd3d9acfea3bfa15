//! gltf-inspect - glTF/GLB inspection and conversion tool
//!
//! Prints document structure and accessor contents, and converts between
//! the `.gltf` and `.glb` forms.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nether_gltf::{CodecConfig, Document, DocumentCache, Handle, WriteOptions};

#[derive(Parser)]
#[command(name = "gltf-inspect")]
#[command(about = "Inspect and convert glTF/GLB files")]
#[command(version)]
struct Cli {
    /// Codec configuration file (nether-gltf.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a structural summary of a file
    Info {
        /// Input glTF/GLB file
        input: PathBuf,
    },

    /// List scene names of one or more files
    Scenes {
        /// Input glTF/GLB files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Dump the elements of one accessor
    Accessor {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Accessor index
        index: Handle,

        /// Maximum number of elements to print
        #[arg(short, long, default_value_t = 16)]
        limit: usize,
    },

    /// Re-encode a file as .gltf or .glb
    Convert {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Write a GLB container (default: inferred from the output extension)
        #[arg(long)]
        glb: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => CodecConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CodecConfig::default(),
    };

    match cli.command {
        Commands::Info { input } => print_info(&open(&input)?),

        Commands::Scenes { inputs } => {
            let cache = DocumentCache::from_config(&config.cache);
            for input in &inputs {
                let names = cache
                    .scene_list(input)
                    .with_context(|| format!("Failed to read {}", input.display()))?;
                println!("{}:", input.display());
                for name in names {
                    println!("  {name}");
                }
            }
        }

        Commands::Accessor {
            input,
            index,
            limit,
        } => print_accessor(&open(&input)?, index, limit)?,

        Commands::Convert { input, output, glb } => {
            let as_glb = glb || has_extension(&output, "glb");
            tracing::info!("Converting {:?} -> {:?}", input, output);
            convert(&input, &output, as_glb, &WriteOptions::from(&config.export))?;
            tracing::info!("Done!");
        }
    }

    Ok(())
}

fn open(path: &Path) -> Result<Document> {
    Document::open(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn print_info(doc: &Document) {
    let asset = doc.asset();
    println!("glTF {}", asset.version);
    if !asset.generator.is_empty() {
        println!("generator: {}", asset.generator);
    }
    println!("{}", doc.summary());

    for (i, buffer) in doc.buffers().iter().enumerate() {
        let source = match buffer.uri.as_deref() {
            None => "<embedded>",
            Some(uri) if uri.starts_with("data:") => "<data uri>",
            Some(uri) => uri,
        };
        println!("buffer {i}: {} bytes from {source}", buffer.byte_length);
    }

    for (m, mesh) in doc.meshes().iter().enumerate() {
        println!("mesh {m} {:?}", mesh.name);
        for (p, primitive) in mesh.primitives.iter().enumerate() {
            let attributes: Vec<&str> = primitive.attributes.keys().map(String::as_str).collect();
            println!(
                "  primitive {p}: {:?}, [{}], indexed: {}",
                primitive.mode,
                attributes.join(", "),
                primitive.indices.is_some()
            );
        }
    }

    let default = doc.default_scene();
    for (i, name) in doc.scene_names().iter().enumerate() {
        if default == Some(i as Handle) {
            println!("scene {i}: {name} (default)");
        } else {
            println!("scene {i}: {name}");
        }
    }
}

fn print_accessor(doc: &Document, index: Handle, limit: usize) -> Result<()> {
    let view = doc
        .resolve_accessor(index)
        .with_context(|| format!("Failed to resolve accessor {index}"))?;
    println!(
        "accessor {index}: {} x {:?}<{:?}>, stride {}{}",
        view.len(),
        view.element_type(),
        view.component_type(),
        view.stride(),
        if view.normalized() { ", normalized" } else { "" }
    );
    for (i, element) in view.iter_f32().take(limit).enumerate() {
        println!("  [{i}] {:?}", element.as_slice());
    }
    if view.len() > limit {
        println!("  ... {} more", view.len() - limit);
    }
    Ok(())
}

fn convert(input: &Path, output: &Path, as_glb: bool, options: &WriteOptions) -> Result<()> {
    let mut doc = open(input)?;
    doc.stage_resolved_buffers()
        .with_context(|| format!("Failed to load buffers of {}", input.display()))?;

    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("buffer")
        .to_string();
    let count = doc.buffers().len();
    for i in 0..count {
        let Some(buffer) = doc.buffer_mut(i as Handle) else {
            continue;
        };
        if as_glb && i == 0 {
            buffer.uri = None;
        } else if as_glb && buffer.uri.is_none() {
            buffer.uri = Some(format!("{stem}_{i}.bin"));
        }
    }

    doc.serialize_with(output, as_glb, options)
        .with_context(|| format!("Failed to write {}", output.display()))
}
