//! Docmap CLI - Documentation generator for Python packages.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use docmap::builder::{write_site, DocBuild};
use docmap::errors::{exit_code, DocmapError};
use docmap::highlight::{tokenize, HighlightTheme};
use docmap::output::{
    format_doc, format_highlight, format_map, format_search, DocOutput, OutputFormat,
};
use docmap::session::DocBuildSession;
use glob::Pattern;
use serde::Serialize;
use tracing::Level;

#[derive(Parser)]
#[command(name = "docmap")]
#[command(about = "Map Python packages and render their docstrings")]
#[command(version)]
struct Cli {
    /// Log more (repeat for trace output)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SourceArgs {
    /// Directory to search modules in (repeatable, earlier wins)
    #[arg(short, long = "root", default_value = ".")]
    roots: Vec<PathBuf>,

    /// Map `_private` names too
    #[arg(long)]
    include_private: bool,

    /// Include hidden files and directories
    #[arg(long)]
    include_hidden: bool,

    /// Skip source files matching a glob (relative to the root)
    #[arg(long, value_parser = parse_pattern)]
    exclude: Vec<Pattern>,
}

impl SourceArgs {
    fn builder(&self) -> DocBuild {
        let mut roots = self.roots.iter();
        let first = roots.next().cloned().unwrap_or_else(|| PathBuf::from("."));
        let mut build = roots
            .fold(DocBuild::new(first), |build, root| build.root(root.clone()))
            .include_private(self.include_private)
            .include_hidden(self.include_hidden);
        for pattern in &self.exclude {
            build = build.exclude(pattern.clone());
        }
        build
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Display the unit tree of a module
    Map {
        /// Dotted module name
        module: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Maximum tree depth
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Fuzzy search unit paths
    Search {
        /// Name or dotted suffix to look for
        query: String,

        /// Module to search in (repeatable)
        #[arg(short, long = "module", required = true)]
        modules: Vec<String>,

        #[command(flatten)]
        source: SourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the documentation of one unit
    Doc {
        /// Dotted path or unique suffix of the unit
        name: String,

        /// Module to map (defaults to the first segment of the name)
        #[arg(short, long = "module")]
        modules: Vec<String>,

        #[command(flatten)]
        source: SourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Render HTML instead of text
        #[arg(long)]
        html: bool,

        /// Link members as anchors on their parent's page
        #[arg(long)]
        extended: bool,

        /// Show the table of contents
        #[arg(long)]
        contents: bool,
    },

    /// Write an HTML site for modules
    Build {
        /// Modules to document
        #[arg(required = true)]
        modules: Vec<String>,

        #[command(flatten)]
        source: SourceArgs,

        /// Output directory
        #[arg(short, long, default_value = "site")]
        out: PathBuf,

        /// One page per unit instead of anchored member sections
        #[arg(long)]
        plain: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Highlight Python source as HTML
    Highlight {
        /// Source file (stdin when omitted)
        file: Option<PathBuf>,

        /// Set the class of a token type, `TYPE=CLASS` (empty CLASS clears)
        #[arg(long = "class", value_parser = parse_class)]
        classes: Vec<(String, String)>,

        /// Output tokens as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_pattern(value: &str) -> Result<Pattern, String> {
    Pattern::new(value).map_err(|e| e.to_string())
}

fn parse_class(value: &str) -> Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(kind, class)| (kind.trim().to_string(), class.trim().to_string()))
        .ok_or_else(|| format!("expected TYPE=CLASS, got {value:?}"))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let json_output = json_flag(&cli.command);

    let result = match cli.command {
        Commands::Map {
            module,
            source,
            json,
            max_depth,
        } => run_map(module, source, json, max_depth),
        Commands::Search {
            query,
            modules,
            source,
            json,
        } => run_search(query, modules, source, json),
        Commands::Doc {
            name,
            modules,
            source,
            json,
            html,
            extended,
            contents,
        } => run_doc(name, modules, source, json, html, extended, contents),
        Commands::Build {
            modules,
            source,
            out,
            plain,
            json,
        } => run_build(modules, source, out, plain, json),
        Commands::Highlight {
            file,
            classes,
            json,
        } => run_highlight(file, classes, json),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "docmap", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        if json_output {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }

            let payload = ErrorOutput {
                error: e.to_string(),
            };

            let json = serde_json::to_string(&payload)
                .unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string());
            eprintln!("{json}");
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(exit_code(&e));
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn json_flag(cmd: &Commands) -> bool {
    match cmd {
        Commands::Map { json, .. } => *json,
        Commands::Search { json, .. } => *json,
        Commands::Doc { json, .. } => *json,
        Commands::Build { json, .. } => *json,
        Commands::Highlight { json, .. } => *json,
        Commands::Completions { .. } => false,
    }
}

fn run_map(
    module: String,
    source: SourceArgs,
    json: bool,
    max_depth: Option<usize>,
) -> Result<(), DocmapError> {
    let (session, ids) = source.builder().module(module).build_with_roots()?;
    let root = ids.first().copied().ok_or(DocmapError::NoModules)?;
    let output = format_map(session.graph(), root, max_depth, OutputFormat::from_json_flag(json))?;
    print_output(&output);
    Ok(())
}

fn run_search(
    query: String,
    modules: Vec<String>,
    source: SourceArgs,
    json: bool,
) -> Result<(), DocmapError> {
    let mut session = source.builder().modules(modules).build()?;
    let results = session.search(&query);
    let output = format_search(&query, &results, OutputFormat::from_json_flag(json))?;
    print_output(&output);
    Ok(())
}

fn run_doc(
    name: String,
    mut modules: Vec<String>,
    source: SourceArgs,
    json: bool,
    html: bool,
    extended: bool,
    contents: bool,
) -> Result<(), DocmapError> {
    if modules.is_empty() {
        let top = name.split('.').next().unwrap_or(&name);
        modules.push(top.to_string());
    }
    let mut session = source.builder().modules(modules).build()?;
    let id = session
        .resolve(&name)
        .ok_or_else(|| DocmapError::UnitNotFound(name.clone()))?;
    let unit = session
        .unit(id)
        .ok_or_else(|| DocmapError::UnitNotFound(name.clone()))?;
    let (path, kind, signature) = (unit.path.to_string(), unit.kind, unit.signature.clone());

    let text = session.render_text(id).unwrap_or_default();
    let html = if html {
        session.render_html(id, extended)
    } else {
        None
    };
    let contents = if contents { session.structure(id) } else { None };

    let warnings = if json {
        session.drain_warnings()
    } else {
        show_warnings(&mut session);
        Vec::new()
    };

    let doc = DocOutput {
        path,
        kind,
        signature,
        text,
        html,
        contents,
        warnings,
    };
    let output = format_doc(&doc, OutputFormat::from_json_flag(json))?;
    print_output(&output);
    Ok(())
}

fn run_build(
    modules: Vec<String>,
    source: SourceArgs,
    out: PathBuf,
    plain: bool,
    json: bool,
) -> Result<(), DocmapError> {
    let (mut session, ids) = source.builder().modules(modules).build_with_roots()?;
    let report = write_site(&mut session, &ids, &out, !plain)?;
    let warnings = session.drain_warnings();

    if json {
        #[derive(Serialize)]
        struct Output {
            out: String,
            pages: Vec<String>,
            warnings: Vec<String>,
        }
        let output = Output {
            out: out.display().to_string(),
            pages: report.pages.iter().map(|p| p.display().to_string()).collect(),
            warnings,
        };
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| DocmapError::Io(std::io::Error::other(e.to_string())))?;
        println!("{json}");
    } else {
        for warning in &warnings {
            eprint!("{warning}");
        }
        println!("Wrote {} pages to {}", report.pages.len(), out.display());
    }
    Ok(())
}

fn run_highlight(
    file: Option<PathBuf>,
    classes: Vec<(String, String)>,
    json: bool,
) -> Result<(), DocmapError> {
    let source = match file {
        Some(path) => {
            if !path.exists() {
                return Err(DocmapError::PathNotFound(path));
            }
            fs::read_to_string(&path)?
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let mut theme = HighlightTheme::default();
    for (kind, class) in &classes {
        let class = (!class.is_empty()).then_some(class.as_str());
        theme.set_html_class_by_name(kind, class)?;
    }

    let tokens = tokenize(&source);
    let mut html = String::with_capacity(source.len() * 2);
    theme.render(&tokens, &mut html);
    let output = format_highlight(&tokens, &html, OutputFormat::from_json_flag(json))?;
    print_output(&output);
    Ok(())
}

fn show_warnings(session: &mut DocBuildSession) {
    if let Err(error) = session.show_warnings() {
        tracing::warn!(%error, "could not write warnings");
    }
}

fn print_output(output: &str) {
    if output.ends_with('\n') {
        print!("{output}");
    } else {
        println!("{output}");
    }
}
