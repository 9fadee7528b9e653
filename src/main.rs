use anyhow::Result;
use asset_patcher::addon::{legacy, structured};
use asset_patcher::{write_document, PatchEngine, PatchOutcome};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "asset-patcher")]
#[command(about = "Rule-driven patching for game client XML assets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply addon rules and patch instructions to a document tree
    Apply {
        /// Root of the document tree (defaults to the current directory)
        #[arg(short = 'r', long)]
        documents: Option<PathBuf>,

        /// Directory of addon files (default: <documents>/addons, then ./addons)
        #[arg(short, long)]
        addons: Option<PathBuf>,

        /// Root patch file (default: <documents>/patches.xml, then ./patches.xml)
        #[arg(short, long)]
        patches: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// List loaded addon rules and patch entries
    List {
        /// Root of the document tree (defaults to the current directory)
        #[arg(short = 'r', long)]
        documents: Option<PathBuf>,

        /// Directory of addon files (default: <documents>/addons, then ./addons)
        #[arg(short, long)]
        addons: Option<PathBuf>,

        /// Root patch file (default: <documents>/patches.xml, then ./patches.xml)
        #[arg(short, long)]
        patches: Option<PathBuf>,

        /// Emit machine-readable JSON instead of the table
        #[arg(long)]
        json: bool,
    },

    /// Rewrite a legacy addon file in the structured XML format
    Convert {
        /// Legacy addon file (.patch or .txt)
        input: PathBuf,

        /// Output path (default: input with an .xml extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            documents,
            addons,
            patches,
            dry_run,
            diff,
        } => cmd_apply(documents, addons, patches, dry_run, diff),

        Commands::List {
            documents,
            addons,
            patches,
            json,
        } => cmd_list(documents, addons, patches, json),

        Commands::Convert { input, output } => cmd_convert(input, output),
    }
}

/// Resolve the document tree root.
///
/// Priority order:
/// 1. Explicit --documents flag
/// 2. ASSET_PATCHER_DOCUMENTS environment variable
/// 3. Current working directory
fn resolve_documents_root(cli_documents: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_documents {
        return Ok(path.canonicalize()?);
    }

    if let Ok(env_path) = env::var("ASSET_PATCHER_DOCUMENTS") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: ASSET_PATCHER_DOCUMENTS is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    Ok(env::current_dir()?)
}

/// Helper: Pick the location of a rule source that was not given explicitly.
///
/// Discovery order:
/// 1. Explicit flag value (used even if missing, so load warnings surface).
/// 2. `<documents>/<name>` (rules kept alongside the target tree).
/// 3. `./<name>` relative to the current working directory.
fn resolve_rule_path(flag: Option<PathBuf>, documents: &Path, name: &str) -> PathBuf {
    if let Some(path) = flag {
        return path;
    }

    let beside_documents = documents.join(name);
    if beside_documents.exists() {
        return beside_documents;
    }

    match env::current_dir() {
        Ok(cwd) => cwd.join(name),
        Err(_) => beside_documents,
    }
}

/// Helper: Discover the XML documents under the tree root, sorted for
/// deterministic processing order. Rule locations inside the tree are
/// pruned so the patcher never rewrites its own inputs.
fn discover_documents(root: &Path, exclude: &[&Path]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !exclude.iter().any(|ex| e.path() == *ex))
    {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();

    Ok(files)
}

/// Helper: Logical identity of a document, as routing patterns see it.
///
/// The path relative to the tree root, joined with backslashes.
fn logical_path(root: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(root).unwrap_or(file);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("\\")
}

/// Helper: Show unified diff between original and patched content
fn display_diff(file: &Path, original: &str, patched: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, patched);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_apply(
    documents: Option<PathBuf>,
    addons: Option<PathBuf>,
    patches: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    // 1. Resolve the document tree and both rule locations
    let documents = resolve_documents_root(documents)?;
    let addons_dir = resolve_rule_path(addons, &documents, "addons");
    let patches_file = resolve_rule_path(patches, &documents, "patches.xml");

    // 2. Load both rule sources
    let engine = PatchEngine::load(&addons_dir, &patches_file);

    println!("Documents: {}", documents.display());
    println!(
        "Addons: {} ({} loaded)",
        addons_dir.display(),
        engine.repository().addons().len()
    );
    println!(
        "Patches: {} ({} entries)",
        patches_file.display(),
        engine.patches().entries().len()
    );
    println!();

    if engine.repository().is_empty() && engine.patches().is_empty() {
        println!(
            "{}",
            "No addon rules or patch entries loaded - nothing to do".yellow()
        );
        return Ok(());
    }

    if dry_run {
        println!("{}", "[DRY RUN - no files will be modified]".cyan());
    }

    // 3. Patch every document under the tree
    let skip = [addons_dir.as_path(), patches_file.as_path()];
    let files = discover_documents(&documents, &skip)?;

    let mut total_patched = 0;
    let mut total_unchanged = 0;
    let mut total_failed = 0;

    for file in files {
        let path = logical_path(&documents, &file);

        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("{} {}: read failed - {}", "✗".red(), path, e);
                total_failed += 1;
                continue;
            }
        };

        match engine.patch_document(&path, &bytes) {
            Ok(PatchOutcome::Patched(patched)) => {
                let verb = if dry_run { "would patch" } else { "patched" };
                println!(
                    "{} {}: {} ({} replacements, {} instructions)",
                    "✓".green(),
                    path,
                    verb,
                    patched.replacements,
                    patched.stats.applied
                );

                if show_diff {
                    let before = String::from_utf8_lossy(&bytes);
                    let after = String::from_utf8_lossy(&patched.bytes);
                    display_diff(&file, &before, &after);
                }

                if !dry_run {
                    write_document(&file, &patched.bytes)?;
                }

                total_patched += 1;
            }
            Ok(PatchOutcome::Unchanged) => {
                println!(
                    "{} {}",
                    "⊙".dimmed(),
                    format!("{}: unchanged", path).dimmed()
                );
                total_unchanged += 1;
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), path, e);
                total_failed += 1;
            }
        }
    }

    // 4. Summary
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} patched", format!("{}", total_patched).green());
    println!("  {} unchanged", format!("{}", total_unchanged).dimmed());
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list(
    documents: Option<PathBuf>,
    addons: Option<PathBuf>,
    patches: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let documents = resolve_documents_root(documents)?;
    let addons_dir = resolve_rule_path(addons, &documents, "addons");
    let patches_file = resolve_rule_path(patches, &documents, "patches.xml");

    let engine = PatchEngine::load(&addons_dir, &patches_file);

    if json {
        let addons: Vec<_> = engine
            .repository()
            .addons()
            .iter()
            .map(|addon| {
                json!({
                    "name": addon.name(),
                    "rules": addon
                        .rules()
                        .map(|(pattern, data)| {
                            json!({
                                "pattern": pattern,
                                "description": data.description,
                                "pairs": data.snr.len(),
                            })
                        })
                        .collect::<Vec<_>>(),
                })
            })
            .collect();

        let entries: Vec<_> = engine
            .patches()
            .entries()
            .iter()
            .map(|entry| {
                json!({
                    "file": entry.pattern,
                    "instructions": entry
                        .instructions
                        .iter()
                        .map(|i| json!({ "kind": i.kind(), "path": i.path() }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();

        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "addons": addons, "patches": entries }))?
        );
        return Ok(());
    }

    println!("{}", "Addons".bold());
    if engine.repository().is_empty() {
        println!("  {}", "(none loaded)".dimmed());
    }
    for addon in engine.repository().addons() {
        println!(
            "{} {} ({} rules)",
            "✓".green(),
            addon.name().bold(),
            addon.rule_count()
        );
        for (pattern, data) in addon.rules() {
            println!("  - {} ({})", pattern, data.description.dimmed());
        }
    }
    println!();

    println!("{}", "Patch entries".bold());
    if engine.patches().is_empty() {
        println!("  {}", "(none loaded)".dimmed());
    }
    for entry in engine.patches().entries() {
        println!(
            "{} {} ({} instructions)",
            "✓".green(),
            entry.pattern.bold(),
            entry.instructions.len()
        );
        for instruction in &entry.instructions {
            println!("  - {} {}", instruction.kind(), instruction.path().dimmed());
        }
    }

    Ok(())
}

fn cmd_convert(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let addon = legacy::load(&input)?;

    if !addon.is_valid() {
        anyhow::bail!(
            "{} contains no usable rules (a malformed legacy record invalidates the whole file)",
            input.display()
        );
    }

    let output = output.unwrap_or_else(|| input.with_extension("xml"));
    if output == input {
        anyhow::bail!("output would overwrite the input; pass --output");
    }

    structured::save(&addon, &output)?;

    println!(
        "{} {} -> {} ({} rules)",
        "✓".green(),
        input.display(),
        output.display(),
        addon.rule_count()
    );

    Ok(())
}
