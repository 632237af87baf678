//! Mailmerge CLI - Merge spreadsheet rows into document templates
//!
//! # Main Commands
//!
//! ```bash
//! mailmerge serve                                  # Start HTTP server (port 3000)
//! mailmerge validate -t <doc> -d <sheet> -o <dir>  # Run the validation gate
//! mailmerge generate -t <doc> -d <sheet> -o <dir>  # Validate, then generate
//! ```
//!
//! # Workspace Commands
//!
//! ```bash
//! mailmerge mkdir Output                     # Create a folder
//! mailmerge import-sheet data.csv            # CSV -> spreadsheet
//! mailmerge import-template letter.txt       # Plain text -> document
//! mailmerge list                             # List files
//! mailmerge placeholders <doc>               # Variables used by a template
//! mailmerge resolve <url>                    # Show the id behind a URL
//! ```

use clap::{Args, Parser, Subcommand};
use mailmerge::{
    extract_placeholders, parse_csv_file_auto, resolve_reference, start_server, text_to_body, AppState,
    AuthContext, DocumentStore, MailMerge, MemoryWorkspace, MergeSources, OutputConfig, OutputMode,
    Settings, Sheet,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "mailmerge")]
#[command(about = "Merge spreadsheet rows into document templates", long_about = None)]
struct Cli {
    /// Workspace snapshot file (default: MAILMERGE_WORKSPACE)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Access token for store calls (default: MAILMERGE_ACCESS_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Sources {
    /// Template document URL or id
    #[arg(short, long)]
    template: String,

    /// Spreadsheet URL or id (a #gid= selects the sheet)
    #[arg(short, long)]
    data: String,

    /// Destination folder URL or id
    #[arg(short = 'o', long)]
    destination: String,

    /// Output mode: individual or merged
    #[arg(short, long, default_value = "individual")]
    mode: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (default: MAILMERGE_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show the resource id and sheet selector behind a reference
    Resolve {
        reference: String,
    },

    /// List the placeholders a template document uses
    Placeholders {
        /// Document URL or id
        document: String,
    },

    /// Import a CSV file as a spreadsheet
    ImportSheet {
        input: PathBuf,

        /// Spreadsheet name (default: file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Parent folder id
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Import a plain-text file as a template document
    ImportTemplate {
        input: PathBuf,

        /// Document name (default: file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Parent folder id
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Create a folder
    Mkdir {
        name: String,

        /// Parent folder id
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Validate references and data, print the report as JSON
    Validate {
        #[command(flatten)]
        sources: Sources,
    },

    /// Validate, then generate every output
    Generate {
        #[command(flatten)]
        sources: Sources,

        /// A4, A3, A5, B4 or B5
        #[arg(long, default_value = "A4")]
        paper_size: String,

        /// portrait or landscape
        #[arg(long, default_value = "portrait")]
        orientation: String,

        /// native or pdf
        #[arg(long, default_value = "native")]
        output_type: String,
    },

    /// List files, optionally inside one folder
    List {
        #[arg(short, long)]
        folder: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(path) = cli.workspace {
        settings.workspace = path;
    }
    if let Some(token) = cli.token {
        settings.access_token = token;
    }

    let result = run(cli.command, settings).await;

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, settings: Settings) -> CliResult {
    let workspace = Arc::new(MemoryWorkspace::load(&settings.workspace)?);
    let auth = AuthContext::bearer(settings.access_token.clone());

    match command {
        Commands::Serve { port } => {
            let engine = MailMerge::from_settings(workspace.clone(), &settings);
            let state = AppState::new(workspace, engine).with_snapshot(settings.workspace.clone());
            start_server(state, port.unwrap_or(settings.port)).await
        }

        Commands::Resolve { reference } => {
            let resolved = resolve_reference(&reference)
                .ok_or_else(|| format!("Cannot resolve a resource id from: {}", reference))?;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
            Ok(())
        }

        Commands::Placeholders { document } => {
            let resolved =
                resolve_reference(&document).ok_or_else(|| format!("Invalid document reference: {}", document))?;
            let doc = workspace.open_document(&auth, &resolved.resource_id).await?;
            let text = doc.body().map(|b| b.text()).unwrap_or_default();
            for name in extract_placeholders(&text) {
                println!("{}", name);
            }
            Ok(())
        }

        Commands::ImportSheet { input, name, folder } => {
            eprintln!("📄 Importing CSV: {}", input.display());
            let parsed = parse_csv_file_auto(&input)?;
            eprintln!("   Encoding: {}", parsed.encoding);
            eprintln!("   Delimiter: '{}'", format_delimiter(parsed.delimiter));
            eprintln!("   Columns: {}", parsed.headers().join(", "));
            eprintln!("   Rows: {}", parsed.row_count());

            let info = workspace.create_spreadsheet(
                &name.unwrap_or_else(|| file_stem(&input)),
                folder.as_deref(),
                vec![Sheet {
                    sheet_id: 0,
                    title: "Sheet1".to_string(),
                    values: parsed.values,
                }],
            )?;
            workspace.save(&settings.workspace)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }

        Commands::ImportTemplate { input, name, folder } => {
            let text = fs::read_to_string(&input)?;
            let body = text_to_body(&text);
            let placeholders = extract_placeholders(&body.text());
            let info = workspace.create_document(
                &name.unwrap_or_else(|| file_stem(&input)),
                folder.as_deref(),
                body,
            )?;
            workspace.save(&settings.workspace)?;
            eprintln!("📝 Template variables: {}", placeholders.join(", "));
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }

        Commands::Mkdir { name, parent } => {
            let info = workspace.create_folder(&name, parent.as_deref())?;
            workspace.save(&settings.workspace)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }

        Commands::Validate { sources } => {
            let engine = MailMerge::from_settings(workspace, &settings);
            let report = engine
                .validate_and_fetch_data(
                    &auth,
                    &sources.template,
                    &sources.data,
                    &sources.destination,
                    OutputMode::parse(&sources.mode),
                )
                .await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.success {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Generate {
            sources,
            paper_size,
            orientation,
            output_type,
        } => {
            let config = OutputConfig {
                paper_size: paper_size.into(),
                orientation: orientation.into(),
                output_type: output_type.into(),
            };
            let engine = MailMerge::from_settings(workspace.clone(), &settings);
            let run = engine
                .run(
                    &auth,
                    MergeSources {
                        template: &sources.template,
                        data: &sources.data,
                        destination: &sources.destination,
                    },
                    OutputMode::parse(&sources.mode),
                    &config,
                )
                .await;
            workspace.save(&settings.workspace)?;

            if !run.report.success {
                println!("{}", serde_json::to_string_pretty(&run.report)?);
                std::process::exit(1);
            }
            println!("{}", serde_json::to_string_pretty(&run.results)?);
            eprintln!("\n📊 {} succeeded, {} failed", run.succeeded(), run.failed());
            if run.failed() > 0 {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::List { folder } => {
            let files = match folder {
                Some(id) => workspace.children(&id)?,
                None => workspace.list()?,
            };
            for f in files {
                println!("{:<12} {:<34} {}", f.kind.label(), f.id, f.name);
            }
            Ok(())
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("imported")
        .to_string()
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
