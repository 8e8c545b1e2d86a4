//! PMDL CLI - Command-line editor for PMDL model containers.
//!
//! This is the main entry point for the `pmdl` command-line application.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pmdl::model::opacity_u16_from_percent;
use pmdl::naming::file_stem;
use pmdl::prelude::*;

/// PMDL - model container editor
#[derive(Parser)]
#[command(name = "pmdl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log every edit (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Input {
    /// Path to the PMDL file
    #[arg(short, long, env = "PMDL_INPUT")]
    input: PathBuf,
}

#[derive(Args)]
struct Secondary {
    /// PMDL file to copy from
    #[arg(short, long, env = "PMDL_SECONDARY")]
    secondary: PathBuf,
}

#[derive(Args)]
struct Output {
    /// Where to write the edited file (defaults to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ExportDir {
    /// Output directory
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    force: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the header
    Info {
        #[command(flatten)]
        input: Input,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// List the parts index
    Parts {
        #[command(flatten)]
        input: Input,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// List the subparts of one part
    Subparts {
        #[command(flatten)]
        input: Input,

        /// Part index
        #[arg(short, long)]
        part: usize,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Export one part, or every part, to .part files
    ExportPart {
        #[command(flatten)]
        input: Input,

        /// Part index (all parts when omitted)
        #[arg(short, long)]
        part: Option<usize>,

        #[command(flatten)]
        dir: ExportDir,
    },

    /// Append a .part file as a new part
    ImportPart {
        #[command(flatten)]
        input: Input,

        /// Part file
        file: PathBuf,

        #[command(flatten)]
        output: Output,
    },

    /// Replace the data of a part with a .part file
    ReplacePart {
        #[command(flatten)]
        input: Input,

        /// Part index
        #[arg(short, long)]
        part: usize,

        /// Part file
        file: PathBuf,

        #[command(flatten)]
        output: Output,
    },

    /// Append a copy of a part of the secondary file
    AddPart {
        #[command(flatten)]
        input: Input,

        #[command(flatten)]
        secondary: Secondary,

        /// Part index in the secondary file
        #[arg(short, long)]
        part: usize,

        #[command(flatten)]
        output: Output,
    },

    /// Delete a part
    DeletePart {
        #[command(flatten)]
        input: Input,

        /// Part index
        #[arg(short, long)]
        part: usize,

        #[command(flatten)]
        output: Output,
    },

    /// Change depth, opacity or flag of one part
    SetPart {
        #[command(flatten)]
        input: Input,

        /// Part index
        #[arg(short, long)]
        part: usize,

        /// Render depth, hex (e.g. 0A)
        #[arg(long, value_parser = parse_hex_u8)]
        depth: Option<u8>,

        /// Opacity in percent
        #[arg(long)]
        opacity: Option<i32>,

        /// Flag label ("None", "Equip. 1", "Equip. 2", "Face", "Hideable" or hex)
        #[arg(long)]
        flag: Option<String>,

        #[command(flatten)]
        output: Output,
    },

    /// Apply a JSON list of part edits positionally
    Sync {
        #[command(flatten)]
        input: Input,

        /// JSON file with `[{"depth", "opacity_percent", "flag_label"}, ...]`
        edits: PathBuf,

        #[command(flatten)]
        output: Output,
    },

    /// Export one subpart, or every subpart of a part, to .subpart files
    ExportSubpart {
        #[command(flatten)]
        input: Input,

        /// Part index
        #[arg(short, long)]
        part: usize,

        /// Subpart index (all subparts when omitted)
        #[arg(short = 'n', long)]
        subpart: Option<usize>,

        #[command(flatten)]
        dir: ExportDir,
    },

    /// Replace a subpart with a .subpart file
    ReplaceSubpart {
        #[command(flatten)]
        input: Input,

        /// Part index
        #[arg(short, long)]
        part: usize,

        /// Subpart index
        #[arg(short = 'n', long)]
        subpart: usize,

        /// Subpart file
        file: PathBuf,

        #[command(flatten)]
        output: Output,
    },

    /// Insert .subpart files, in natural name order, after a subpart
    InsertSubpart {
        #[command(flatten)]
        input: Input,

        /// Part index
        #[arg(short, long)]
        part: usize,

        /// Insert after this subpart (at the front when omitted)
        #[arg(short, long)]
        after: Option<usize>,

        /// Subpart files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        output: Output,
    },

    /// Insert a copy of a subpart of the secondary file
    AddSubpart {
        #[command(flatten)]
        input: Input,

        #[command(flatten)]
        secondary: Secondary,

        /// Part index in the input file
        #[arg(short, long)]
        part: usize,

        /// Insert after this subpart (at the front when omitted)
        #[arg(short, long)]
        after: Option<usize>,

        /// Part index in the secondary file
        #[arg(long)]
        from_part: usize,

        /// Subpart index in the secondary file
        #[arg(long)]
        from_subpart: usize,

        #[command(flatten)]
        output: Output,
    },

    /// Delete one or more subparts of a part
    DeleteSubpart {
        #[command(flatten)]
        input: Input,

        /// Part index
        #[arg(short, long)]
        part: usize,

        /// Subpart indices
        #[arg(required = true)]
        subparts: Vec<usize>,

        #[command(flatten)]
        output: Output,
    },

    /// Change bone ids or the unknown field of a subpart
    SetSubpart {
        #[command(flatten)]
        input: Input,

        /// Part index
        #[arg(short, long)]
        part: usize,

        /// Subpart index
        #[arg(short = 'n', long)]
        subpart: usize,

        /// Four bone ids, comma separated
        #[arg(long, value_parser = parse_bone_ids)]
        bones: Option<[u8; 4]>,

        /// Unknown field, hex
        #[arg(long, value_parser = parse_hex_u32)]
        unk: Option<u32>,

        #[command(flatten)]
        output: Output,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { input, json } => cmd_info(&input.input, json),
        Commands::Parts { input, json } => cmd_parts(&input.input, json),
        Commands::Subparts { input, part, json } => cmd_subparts(&input.input, part, json),
        Commands::ExportPart { input, part, dir } => {
            cmd_export_part(&input.input, part, &dir.dir, dir.force)
        }
        Commands::ImportPart {
            input,
            file,
            output,
        } => cmd_import_part(&input.input, &file, output.output),
        Commands::ReplacePart {
            input,
            part,
            file,
            output,
        } => cmd_replace_part(&input.input, part, &file, output.output),
        Commands::AddPart {
            input,
            secondary,
            part,
            output,
        } => cmd_add_part(&input.input, &secondary.secondary, part, output.output),
        Commands::DeletePart {
            input,
            part,
            output,
        } => cmd_delete_part(&input.input, part, output.output),
        Commands::SetPart {
            input,
            part,
            depth,
            opacity,
            flag,
            output,
        } => cmd_set_part(&input.input, part, depth, opacity, flag, output.output),
        Commands::Sync {
            input,
            edits,
            output,
        } => cmd_sync(&input.input, &edits, output.output),
        Commands::ExportSubpart {
            input,
            part,
            subpart,
            dir,
        } => cmd_export_subpart(&input.input, part, subpart, &dir.dir, dir.force),
        Commands::ReplaceSubpart {
            input,
            part,
            subpart,
            file,
            output,
        } => cmd_replace_subpart(&input.input, part, subpart, &file, output.output),
        Commands::InsertSubpart {
            input,
            part,
            after,
            files,
            output,
        } => cmd_insert_subpart(&input.input, part, after, files, output.output),
        Commands::AddSubpart {
            input,
            secondary,
            part,
            after,
            from_part,
            from_subpart,
            output,
        } => cmd_add_subpart(
            &input.input,
            &secondary.secondary,
            part,
            after,
            (from_part, from_subpart),
            output.output,
        ),
        Commands::DeleteSubpart {
            input,
            part,
            subparts,
            output,
        } => cmd_delete_subpart(&input.input, part, &subparts, output.output),
        Commands::SetSubpart {
            input,
            part,
            subpart,
            bones,
            unk,
            output,
        } => cmd_set_subpart(&input.input, part, subpart, bones, unk, output.output),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn open(path: &Path) -> Result<Document> {
    Document::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

/// Save to `output`, or back to the input path.
fn finish(mut doc: Document, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => doc.save_as(path),
        None => doc.save(),
    }
    .context("Failed to write PMDL file")?;

    println!("Wrote {}", doc.path().display());
    Ok(())
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn write_new(path: &Path, data: &[u8], force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))
}

fn cmd_info(input: &Path, json: bool) -> Result<()> {
    let doc = open(input)?;
    let header = doc.file().header();

    if json {
        println!("{}", serde_json::to_string_pretty(header)?);
        return Ok(());
    }

    println!("File:          {}", input.display());
    println!("Size:          {} bytes", doc.file().data().len());
    println!("Bones:         {} at 0x{:X}", header.bone_count, header.bones_offset);
    println!("Parts:         {}", header.part_count);
    println!("Parts index:   0x{:X}", header.parts_index_offset);

    Ok(())
}

fn cmd_parts(input: &Path, json: bool) -> Result<()> {
    let doc = open(input)?;
    let parts = doc.file().parts();

    if json {
        println!("{}", serde_json::to_string_pretty(parts)?);
        return Ok(());
    }

    println!(
        "{:>4} {:>6} {:>5} {:>7} {:>10} {:>10}  Flag",
        "#", "Id", "Depth", "Opacity", "Offset", "Length"
    );
    for (i, part) in parts.iter().enumerate() {
        println!(
            "{:>4} {:>6} {:>5} {:>6}% {:>10} {:>10}  {}",
            i,
            format!("{:04X}", part.part_id),
            format!("{:02X}", part.depth()),
            part.opacity_percent(),
            format!("0x{:X}", part.part_offset),
            part.part_length,
            part.special_flag
        );
    }
    println!("\nTotal: {} parts", parts.len());

    Ok(())
}

fn cmd_subparts(input: &Path, part: usize, json: bool) -> Result<()> {
    let mut doc = open(input)?;
    let buffer = doc
        .part_buffer(part)
        .with_context(|| format!("Failed to read subparts of part {part}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(buffer.subparts())?);
        return Ok(());
    }

    println!(
        "{:>4} {:>8} {:>5} {:>12} {:>10} {:>10} {:>8}",
        "#", "Vertices", "Bones", "Bone ids", "Unk", "Offset", "Size"
    );
    for sub in buffer.subparts() {
        let ids = sub.id_bones.map(|id| format!("{id:02X}")).join(" ");
        println!(
            "{:>4} {:>8} {:>5} {:>12} {:>10} {:>10} {:>8}",
            sub.sub_part,
            sub.num_vertices,
            sub.num_bones,
            ids,
            format!("0x{:X}", sub.unk),
            format!("0x{:X}", sub.sub_part_offset),
            sub.byte_length()
        );
    }
    println!("\nTotal: {} subparts", buffer.subparts().len());

    Ok(())
}

fn cmd_export_part(input: &Path, part: Option<usize>, dir: &Path, force: bool) -> Result<()> {
    let doc = open(input)?;
    let stem = doc.stem();
    fs::create_dir_all(dir)?;

    let indices: Vec<usize> = match part {
        Some(index) => vec![index],
        None => (0..doc.file().parts().len()).collect(),
    };

    let pb = (indices.len() > 1).then(|| progress_bar(indices.len())).transpose()?;
    for index in &indices {
        let data = doc
            .export_part(*index)
            .with_context(|| format!("Failed to export part {index}"))?;
        write_new(&dir.join(part_file_name(&stem, *index)), &data, force)?;

        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    println!("Exported {} parts to {}", indices.len(), dir.display());
    Ok(())
}

fn cmd_import_part(input: &Path, file: &Path, output: Option<PathBuf>) -> Result<()> {
    let mut doc = open(input)?;
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let (offset, length) = doc.import_part(&data).context("Failed to import part")?;
    info!(offset, length, "imported part");
    println!(
        "Appended part {} ({length} bytes at 0x{offset:X})",
        doc.file().parts().len() - 1
    );

    finish(doc, output)
}

fn cmd_replace_part(input: &Path, part: usize, file: &Path, output: Option<PathBuf>) -> Result<()> {
    let mut doc = open(input)?;
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    doc.replace_part(part, &data)
        .with_context(|| format!("Failed to replace part {part}"))?;
    println!("Replaced part {part} ({} bytes)", data.len());

    finish(doc, output)
}

fn cmd_add_part(
    input: &Path,
    secondary: &Path,
    part: usize,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut session = Session::new();
    session
        .open_primary(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    session
        .open_secondary(secondary)
        .with_context(|| format!("Failed to open {}", secondary.display()))?;

    let (offset, length) = session
        .add_part_from_secondary(part)
        .with_context(|| format!("Failed to copy part {part}"))?;
    println!("Copied part {part} ({length} bytes at 0x{offset:X})");

    let doc = session.close_primary().context("No primary file is open")?;
    finish(doc, output)
}

fn cmd_delete_part(input: &Path, part: usize, output: Option<PathBuf>) -> Result<()> {
    let mut doc = open(input)?;
    doc.delete_part(part)
        .with_context(|| format!("Failed to delete part {part}"))?;
    println!("Deleted part {part}");

    finish(doc, output)
}

fn cmd_set_part(
    input: &Path,
    part: usize,
    depth: Option<u8>,
    opacity: Option<i32>,
    flag: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let update = PartUpdate {
        depth,
        opacity: opacity.map(opacity_u16_from_percent),
        special_flag: flag.as_deref().map(SpecialFlag::from_label),
    };
    if update == PartUpdate::default() {
        bail!("Nothing to change (pass --depth, --opacity and/or --flag)");
    }

    let mut doc = open(input)?;
    doc.set_part_fields(part, update)
        .with_context(|| format!("Failed to update part {part}"))?;
    println!("Updated part {part}");

    finish(doc, output)
}

fn cmd_sync(input: &Path, edits: &Path, output: Option<PathBuf>) -> Result<()> {
    let mut doc = open(input)?;
    let json = fs::read_to_string(edits)
        .with_context(|| format!("Failed to read {}", edits.display()))?;
    let edits: Vec<PartEdit> = serde_json::from_str(&json).context("Failed to parse edits")?;

    doc.sync_from_edits(&edits).context("Failed to apply edits")?;
    println!("Applied {} edits", edits.len().min(doc.file().parts().len()));

    finish(doc, output)
}

fn cmd_export_subpart(
    input: &Path,
    part: usize,
    subpart: Option<usize>,
    dir: &Path,
    force: bool,
) -> Result<()> {
    let mut doc = open(input)?;
    let stem = doc.stem();
    fs::create_dir_all(dir)?;

    let buffer = doc
        .part_buffer(part)
        .with_context(|| format!("Failed to read subparts of part {part}"))?;
    let indices: Vec<usize> = match subpart {
        Some(index) => vec![index],
        None => (0..buffer.subparts().len()).collect(),
    };

    let pb = (indices.len() > 1).then(|| progress_bar(indices.len())).transpose()?;
    for index in &indices {
        let sidecar = buffer
            .export_sidecar(*index)
            .with_context(|| format!("Failed to export subpart {index}"))?;
        let path = dir.join(subpart_file_name(&stem, part, *index));
        write_new(&path, &sidecar.to_bytes(), force)?;

        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    println!("Exported {} subparts to {}", indices.len(), dir.display());
    Ok(())
}

fn cmd_replace_subpart(
    input: &Path,
    part: usize,
    subpart: usize,
    file: &Path,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut doc = open(input)?;
    let sidecar = SubPartFile::open(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let delta = doc
        .replace_subpart(part, subpart, &sidecar)
        .with_context(|| format!("Failed to replace subpart {subpart} of part {part}"))?;
    println!("Replaced subpart {subpart} of part {part} ({delta:+} bytes)");

    finish(doc, output)
}

fn cmd_insert_subpart(
    input: &Path,
    part: usize,
    after: Option<usize>,
    mut files: Vec<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut doc = open(input)?;
    sort_natural(&mut files);

    let sidecars = files
        .iter()
        .map(|file| {
            SubPartFile::open(file).with_context(|| format!("Failed to read {}", file.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let offsets = doc
        .insert_subparts(part, after, &sidecars)
        .with_context(|| format!("Failed to insert subparts into part {part}"))?;
    for (file, offset) in files.iter().zip(&offsets) {
        println!("Inserted {} at 0x{offset:X}", file_stem(file));
    }

    finish(doc, output)
}

fn cmd_add_subpart(
    input: &Path,
    secondary: &Path,
    part: usize,
    after: Option<usize>,
    (from_part, from_subpart): (usize, usize),
    output: Option<PathBuf>,
) -> Result<()> {
    let mut session = Session::new();
    session
        .open_primary(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    session
        .open_secondary(secondary)
        .with_context(|| format!("Failed to open {}", secondary.display()))?;

    let (length, offset) = session
        .add_subpart_from_secondary(part, after, from_part, from_subpart)
        .with_context(|| format!("Failed to copy subpart {from_subpart} of part {from_part}"))?;
    println!("Inserted {length} bytes at 0x{offset:X} in part {part}");

    let doc = session.close_primary().context("No primary file is open")?;
    finish(doc, output)
}

fn cmd_delete_subpart(
    input: &Path,
    part: usize,
    subparts: &[usize],
    output: Option<PathBuf>,
) -> Result<()> {
    let mut doc = open(input)?;
    let removed = doc
        .delete_subparts(part, subparts)
        .with_context(|| format!("Failed to delete subparts of part {part}"))?;
    println!("Deleted subparts {subparts:?} of part {part} ({removed} bytes)");

    finish(doc, output)
}

fn cmd_set_subpart(
    input: &Path,
    part: usize,
    subpart: usize,
    bones: Option<[u8; 4]>,
    unk: Option<u32>,
    output: Option<PathBuf>,
) -> Result<()> {
    if bones.is_none() && unk.is_none() {
        bail!("Nothing to change (pass --bones and/or --unk)");
    }

    let mut doc = open(input)?;
    if let Some(bones) = bones {
        doc.set_bone_ids(part, subpart, bones)
            .context("Failed to set bone ids")?;
    }
    if let Some(unk) = unk {
        doc.set_unk(part, subpart, unk)
            .context("Failed to set unknown field")?;
    }

    finish(doc, output)
}

fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid hex byte '{s}': {e}"))
}

fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value '{s}': {e}"))
}

fn parse_bone_ids(s: &str) -> Result<[u8; 4], String> {
    let ids = s
        .split(',')
        .map(|id| id.trim().parse::<u8>().map_err(|e| format!("invalid bone id '{id}': {e}")))
        .collect::<Result<Vec<u8>, String>>()?;

    ids.try_into()
        .map_err(|ids: Vec<u8>| format!("expected 4 bone ids, got {}", ids.len()))
}
