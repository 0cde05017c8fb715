use clap::{Parser, Subcommand};
use packview::archive::{schema_digest, verify_schema};
use packview::header::ResourceHeader;
use packview::resolver::{FileResolver, Resolved, ResourceResolver};
use packview::structs::{Field, StructLayout};
use packview::vector::Vector;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "packview", about = "Inspect bit-packed archive resources")]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. `debug` or `packview=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the framing of one resource file
    Inspect {
        resource: PathBuf,
    },
    /// Print the schema sidecar of a resource
    Schema {
        resource: PathBuf,
    },
    /// Compare the stored schema with an expected schema file
    Compare {
        resource: PathBuf,
        #[arg(short, long)]
        expected: PathBuf,
    },
    /// Decode a resource as a vector of an ad-hoc struct layout
    Dump {
        resource: PathBuf,
        /// Element stride in bytes
        #[arg(long)]
        stride: usize,
        /// Field as name:offset:width, with a trailing :s for signed
        #[arg(short, long = "field", required = true, num_args = 1..)]
        fields: Vec<String>,
        #[arg(long, default_value = "0")]
        start: usize,
        /// Last element to print (inclusive); defaults to the last element
        #[arg(long)]
        end: Option<usize>,
        #[arg(long, default_value = "1")]
        step: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {

        // ── Inspect ──────────────────────────────────────────────────────────
        Commands::Inspect { resource } => {
            let resolved = resolve(&resource)?;
            let header = ResourceHeader::read(&*resolved.source)?;
            let report = serde_json::json!({
                "path":          resource.display().to_string(),
                "total_len":     header.total_len,
                "payload_len":   header.payload_len,
                "consistent":    header.is_consistent(),
                "padding_ok":    header.padding_is_zero(&*resolved.source),
                "schema_digest": schema_digest(&resolved.schema),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        // ── Schema ───────────────────────────────────────────────────────────
        Commands::Schema { resource } => {
            print!("{}", resolve(&resource)?.schema);
        }

        // ── Compare ──────────────────────────────────────────────────────────
        Commands::Compare { resource, expected } => {
            let expected_text = std::fs::read_to_string(&expected)?;
            let resolved = resolve(&resource)?;
            verify_schema(&resource_name(&resource)?, &expected_text, &resolved.schema)?;
            println!("schema matches ({})", schema_digest(&expected_text));
        }

        // ── Dump ─────────────────────────────────────────────────────────────
        Commands::Dump { resource, stride, fields, start, end, step } => {
            if step == 0 {
                return Err("--step must be at least 1".into());
            }
            let layout = leak_layout(&resource_name(&resource)?, stride, &fields)?;
            let vector = Vector::new(resolve(&resource)?.source, layout);
            let Some(last) = vector.size().checked_sub(1) else {
                tracing::info!(resource = %resource.display(), "vector is empty");
                return Ok(());
            };
            for element in vector.slice(start, end.unwrap_or(last).min(last), step) {
                println!("{}", serde_json::to_string(&element.describe())?);
            }
        }
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None        => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resource_name(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| format!("{} does not name a resource file", path.display()).into())
}

fn resolve(path: &Path) -> Result<Resolved, Box<dyn std::error::Error>> {
    let name = resource_name(path)?;
    Ok(FileResolver::for_archive_file(path).resolve(&name)?)
}

/// Build a layout from `name:offset:width[:s]` flags.  The layout lives for
/// the rest of the process.
fn leak_layout(
    name:   &str,
    stride: usize,
    specs:  &[String],
) -> Result<&'static StructLayout, Box<dyn std::error::Error>> {
    let mut fields = Vec::with_capacity(specs.len());
    for spec in specs {
        let parts: Vec<&str> = spec.split(':').collect();
        let (field_name, offset, width, signed) = match parts.as_slice() {
            [n, o, w]      => (*n, o.parse::<usize>()?, w.parse::<u32>()?, false),
            [n, o, w, "s"] => (*n, o.parse::<usize>()?, w.parse::<u32>()?, true),
            _ => return Err(format!("bad field '{spec}', expected name:offset:width[:s]").into()),
        };
        if width == 0 || width > packview::codec::MAX_FIELD_WIDTH {
            return Err(format!("field '{field_name}': width {width} out of range").into());
        }
        if offset + width as usize > stride * 8 {
            return Err(format!("field '{field_name}' does not fit in {stride} bytes").into());
        }
        let field_name: &'static str = Box::leak(field_name.to_owned().into_boxed_str());
        fields.push(if signed {
            Field::signed(field_name, offset, width)
        } else {
            Field::unsigned(field_name, offset, width)
        });
    }
    let name: &'static str = Box::leak(name.to_owned().into_boxed_str());
    let fields: &'static [Field] = Box::leak(fields.into_boxed_slice());
    Ok(Box::leak(Box::new(StructLayout::new(name, stride, fields))))
}
