use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use promptcode::pattern::is_literal;
use promptcode::preset::{render_preset, DEFAULT_TEMPLATE};
use promptcode::{
    generate, match_patterns, parse_pattern_lines, synthesize_patterns, Config, MatchOptions,
    PatternSource, PresetStore,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "promptcode")]
#[command(about = "Build AI prompts from codebase files selected by pattern presets", long_about = None)]
#[command(version)]
struct Cli {
    /// Print debug logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble a prompt from the files a set of patterns selects
    Generate(GenerateArgs),

    /// Manage pattern presets
    #[command(subcommand)]
    Preset(PresetCommand),
}

#[derive(Args, Debug, Clone, Copy)]
struct MatchArgs {
    /// Match hidden (dot-prefixed) files and directories
    #[arg(long)]
    hidden: bool,

    /// Follow symlinks that stay inside the project root
    #[arg(long)]
    follow_symlinks: bool,

    /// Do not honor .gitignore files
    #[arg(long)]
    no_gitignore: bool,
}

impl MatchArgs {
    fn options(self) -> MatchOptions {
        MatchOptions {
            follow_symlinks: self.follow_symlinks,
            include_hidden: self.hidden,
            respect_gitignore: !self.no_gitignore,
            ..Default::default()
        }
    }
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Project root (default: current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Use a stored preset
    #[arg(long, conflicts_with_all = ["patterns", "include"])]
    preset: Option<String>,

    /// Read patterns from a file
    #[arg(long, conflicts_with = "include")]
    patterns: Option<PathBuf>,

    /// Include glob (repeatable)
    #[arg(long)]
    include: Vec<String>,

    /// Exclude glob (repeatable), applied on top of any pattern source
    #[arg(long)]
    exclude: Vec<String>,

    /// Instructions appended to the prompt
    #[arg(long, conflicts_with = "instructions_file")]
    instructions: Option<String>,

    /// Read instructions from a file
    #[arg(long)]
    instructions_file: Option<PathBuf>,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// List files that would be included without reading them into the prompt
    #[arg(long)]
    dry_run: bool,

    /// Show statistics only
    #[arg(long)]
    stats: bool,

    /// Maximum file size in bytes (default: 1MB)
    #[arg(long, default_value = "1048576")]
    max_size: u64,

    #[command(flatten)]
    matching: MatchArgs,
}

#[derive(Subcommand, Debug)]
enum PresetCommand {
    /// Create a preset, optionally synthesized from a list of files
    Create {
        name: String,

        /// Files (or globs) the preset should select
        #[arg(long, num_args = 1..)]
        from_files: Vec<String>,

        /// Overwrite an existing preset
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        root: RootArgs,
    },

    /// Rewrite a preset as the smallest pattern list selecting the same files
    Optimize {
        name: String,

        /// Save the optimized patterns back to the preset
        #[arg(long)]
        write: bool,

        #[command(flatten)]
        root: RootArgs,
    },

    /// List stored presets
    List {
        #[command(flatten)]
        root: RootArgs,
    },

    /// Print a preset file
    Show {
        name: String,

        #[command(flatten)]
        root: RootArgs,
    },

    /// List the files a preset selects
    Files {
        name: String,

        #[command(flatten)]
        root: RootArgs,
    },
}

#[derive(Args, Debug)]
struct RootArgs {
    /// Project root holding .promptcode/presets
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(flatten)]
    matching: MatchArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate(args) => run_generate(args),
        Commands::Preset(command) => run_preset(command),
    }
}

/// RUST_LOG wins unless --verbose forces debug output.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).without_time())
        .with(filter)
        .try_init();
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let source = match (args.preset, args.patterns) {
        (Some(name), _) => PatternSource::Preset(name),
        (None, Some(file)) => PatternSource::File(file),
        (None, None) => PatternSource::Inline(args.include),
    };

    let instructions = match (args.instructions, args.instructions_file) {
        (Some(text), _) => Some(text),
        (None, Some(file)) => Some(
            std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read instructions file: {}", file.display()))?,
        ),
        (None, None) => None,
    };

    let config = Config {
        path: args.path,
        source,
        exclude: args.exclude,
        instructions,
        output_file: args.output,
        dry_run: args.dry_run,
        stats_only: args.stats,
        max_file_size: args.max_size,
        match_options: args.matching.options(),
    };

    let stats = generate(&config)?;

    // Exit with error if no files were processed
    if stats.included_files == 0 {
        eprintln!("Error: No files matched the criteria");
        std::process::exit(3);
    }

    Ok(())
}

fn run_preset(command: PresetCommand) -> Result<()> {
    match command {
        PresetCommand::Create {
            name,
            from_files,
            force,
            root,
        } => create_preset(&name, &from_files, force, &root),
        PresetCommand::Optimize { name, write, root } => optimize_preset(&name, write, &root),
        PresetCommand::List { root } => {
            let store = PresetStore::new(&root.root);
            let names = store.list()?;
            if names.is_empty() {
                eprintln!("No presets found in {}", store.dir().display());
            }
            for name in names {
                println!("{}", name);
            }
            Ok(())
        }
        PresetCommand::Show { name, root } => {
            print!("{}", PresetStore::new(&root.root).read(&name)?);
            Ok(())
        }
        PresetCommand::Files { name, root } => {
            for file in preset_files(&name, &root)? {
                println!("{}", file);
            }
            Ok(())
        }
    }
}

fn create_preset(name: &str, from_files: &[String], force: bool, root: &RootArgs) -> Result<()> {
    let store = PresetStore::new(&root.root);
    let options = root.matching.options();

    let contents = if from_files.is_empty() {
        DEFAULT_TEMPLATE.to_string()
    } else {
        let files = expand_file_args(&root.root, from_files, &options)?;
        if files.is_empty() {
            bail!("No files matched {}", from_files.join(" "));
        }
        let patterns = synthesize_patterns(&root.root, &files, &options)?;
        if patterns.is_empty() {
            bail!(
                "None of the selected paths are inside {}; refusing to write an empty preset",
                root.root.display()
            );
        }
        eprintln!(
            "Synthesized {} pattern(s) from {} file(s)",
            patterns.len(),
            files.len()
        );
        render_preset(&format!("Preset: {name}\nGenerated from {} files", files.len()), &patterns)
    };

    let path = store.save(name, &contents, force)?;
    println!("Created preset '{}' at {}", name, path.display());
    Ok(())
}

/// Plain paths pass through; globs are expanded against the root
fn expand_file_args(root: &Path, args: &[String], options: &MatchOptions) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for arg in args {
        if is_literal(arg) {
            files.push(arg.clone());
        } else {
            let set = parse_pattern_lines([arg.as_str()]);
            files.extend(match_patterns(root, &set, options)?);
        }
    }
    Ok(files)
}

fn optimize_preset(name: &str, write: bool, root: &RootArgs) -> Result<()> {
    let options = root.matching.options();
    let before = preset_files(name, root)?;
    if before.is_empty() {
        bail!("Preset '{}' selects no files; nothing to optimize", name);
    }

    let patterns = synthesize_patterns(&root.root, &before, &options)?;
    if patterns.is_empty() {
        bail!("Could not synthesize patterns for preset '{}'; keeping it unchanged", name);
    }
    let after = match_patterns(&root.root, &parse_pattern_lines(&patterns), &options)?;
    if after != before {
        bail!(
            "Optimized patterns select {} files instead of {}; keeping the preset unchanged",
            after.len(),
            before.len()
        );
    }

    for pattern in &patterns {
        println!("{}", pattern);
    }
    eprintln!(
        "{} file(s) selected before and after ({} pattern(s))",
        before.len(),
        patterns.len()
    );

    if write {
        let header = format!("Preset: {name}\nOptimized from {} files", before.len());
        let path = PresetStore::new(&root.root).save(name, &render_preset(&header, &patterns), true)?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

fn preset_files(name: &str, root: &RootArgs) -> Result<Vec<String>> {
    let set = PresetStore::new(&root.root).load(name)?;
    let files = match_patterns(&root.root, &set, &root.matching.options())
        .with_context(|| format!("Failed to expand preset '{}'", name))?;
    Ok(files)
}
