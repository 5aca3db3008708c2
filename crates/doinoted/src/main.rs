use std::path::PathBuf;

use clap::{builder::ArgAction, ArgGroup, Parser, Subcommand};
use console::{style, Emoji};
use doinote::{
  clients::CrossrefClient,
  doi::parse_doi,
  errors::DoinoteError,
  import::{AcceptAll, DuplicatePrompt, ImportOutcome, Importer},
  index::{DuplicateIndex, DuplicateMatch, DuplicateQuery},
  settings::{MetadataField, Settings},
  state::StateStore,
  vault::LocalVault,
  watch, PaperMetadata,
};
use errors::DoinotedErrors;
use tracing::{debug, trace, warn};
use tracing_subscriber::EnvFilter;

pub mod errors;

static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
static BOOKS: Emoji<'_, '_> = Emoji("📚 ", "");
static EYES: Emoji<'_, '_> = Emoji("👀 ", "");
static PAPER: Emoji<'_, '_> = Emoji("📄 ", "");
static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✨ ", "");

#[derive(Parser)]
#[command(author, version, about = "Import papers into a Markdown vault by DOI")]
struct Cli {
  /// Verbose mode (-v, -vv, -vvv)
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Vault root directory
  #[arg(long, global = true)]
  vault: Option<PathBuf>,

  /// State file holding settings and the duplicate index
  #[arg(long, global = true)]
  state: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch a paper's metadata and write it as a note
  Import {
    /// DOI, `doi:` identifier or doi.org URL
    doi:        String,
    /// Import duplicates without asking
    #[arg(long, short)]
    yes:        bool,
    /// Skip the duplicate check prompt for this import only
    #[arg(long)]
    no_confirm: bool,
  },
  /// Rebuild the duplicate index from the notes in the folder
  Rebuild,
  /// Look up whether a DOI or title is already in the vault
  #[command(group(ArgGroup::new("query").required(true).multiple(true).args(["doi", "title"])))]
  Find {
    /// DOI to look for
    #[arg(long)]
    doi:   Option<String>,
    /// Title to look for
    #[arg(long)]
    title: Option<String>,
  },
  /// Show or change settings
  Config {
    /// Vault-relative folder notes are written to
    #[arg(long)]
    folder:              Option<String>,
    /// Filename template, e.g. "{{first_author}} {{year}} - {{title}}"
    #[arg(long)]
    filename_template:   Option<String>,
    /// Comma-separated frontmatter fields, in order
    #[arg(long, value_delimiter = ',')]
    fields:              Option<Vec<String>>,
    /// Stamp the import date into the frontmatter
    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    import_date:         Option<bool>,
    /// Ask before importing a paper that is already in the vault
    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    confirm_duplicates:  Option<bool>,
    /// Vault-relative path of the body template
    #[arg(long, conflicts_with = "clear_body_template")]
    body_template:       Option<String>,
    /// Stop using a body template
    #[arg(long)]
    clear_body_template: bool,
    /// Metadata service endpoint
    #[arg(long)]
    endpoint:            Option<String>,
    /// Contact address sent with metadata requests
    #[arg(long)]
    mailto:              Option<String>,
    /// Open each new note with the system handler
    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    open_after_import:   Option<bool>,
  },
  /// Keep the duplicate index in sync with the vault until Ctrl-C
  Watch,
}

/// Asks on the terminal whether to import a duplicate.
struct ConfirmPrompt;

#[async_trait::async_trait]
impl DuplicatePrompt for ConfirmPrompt {
  async fn confirm(
    &self,
    duplicate: &DuplicateMatch,
    paper: &PaperMetadata,
  ) -> Result<bool, DoinoteError> {
    println!(
      "\n{} This paper is already in your vault as {} (matched by {})",
      style(WARNING).yellow(),
      style(&duplicate.path).yellow(),
      style(duplicate.kind).cyan()
    );
    println!("   {} {}", style("Title:").blue(), style(&paper.title).white());

    dialoguer::Confirm::new()
      .with_prompt("Import it again?")
      .default(false)
      .interact()
      .map_err(|e| DoinoteError::Prompt(e.to_string()))
  }
}

/// Setup logging with the specified verbosity level
fn setup_logging(verbosity: u8) {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_file(true)
    .with_line_number(true)
    .with_thread_ids(true)
    .with_target(true)
    .init();
}

fn print_settings(store: &StateStore, settings: &Settings) -> Result<(), DoinotedErrors> {
  println!("{} Settings in {}", style(BOOKS).cyan(), style(store.path().display()).yellow());
  println!("{}", serde_json::to_string_pretty(settings)?);
  Ok(())
}

#[tokio::main]
async fn main() -> Result<(), DoinotedErrors> {
  let cli = Cli::parse();
  setup_logging(cli.verbose);

  let vault = LocalVault::new(cli.vault.unwrap_or_else(LocalVault::default_root));
  let store = cli.state.map(StateStore::new).unwrap_or_else(|| StateStore::for_vault(&vault));
  debug!("Vault at {}, state at {}", vault.root().display(), store.path().display());

  match cli.command {
    Commands::Import { doi, yes, no_confirm } => {
      let mut settings = store.load_settings()?;
      if no_confirm {
        settings.confirm_duplicates = false;
      }
      let mut index = DuplicateIndex::load(store.clone(), &vault, &settings.folder)?;
      let client = CrossrefClient::from_settings(&settings);
      let prompt: &dyn DuplicatePrompt = if yes { &AcceptAll } else { &ConfirmPrompt };

      println!("{} Fetching paper: {}", style(LOOKING_GLASS).cyan(), style(&doi).yellow());

      let mut importer = Importer::new(&client, &vault, prompt, &settings);
      match importer.import(&mut index, &doi).await {
        Ok(ImportOutcome::Created { path, paper }) => {
          debug!("Paper details: {:?}", paper);
          println!("\n{} Found paper:", style(SUCCESS).green());
          println!("   {} {}", style("Title:").green().bold(), style(&paper.title).white());
          println!(
            "   {} {}",
            style("Authors:").green().bold(),
            style(paper.authors.join(", ")).white()
          );
          println!("\n{} Created note {}", style(SAVE).green(), style(&path).yellow());

          if settings.open_after_import {
            let absolute = vault.absolute(&path);
            trace!("Opening {}", absolute.display());
            if let Err(e) = opener::open(&absolute) {
              warn!("Could not open {}: {e}", absolute.display());
            }
          }
        },
        Ok(ImportOutcome::Cancelled(duplicate)) => {
          println!(
            "\n{} Skipped, already in your vault as {}",
            style("ℹ").blue(),
            style(&duplicate.path).yellow()
          );
        },
        Err(e) => {
          println!("\n{} Import failed: {}", style(WARNING).red(), style(&e).red());
          return Err(e.into());
        },
      }
      Ok(())
    },

    Commands::Rebuild => {
      let settings = store.load_settings()?;
      let mut index = DuplicateIndex::new(store, &settings.folder);

      println!(
        "{} Rebuilding duplicate index for: {}",
        style(BOOKS).cyan(),
        style(vault.root().join(index.folder()).display()).yellow()
      );
      index.rebuild(&vault)?;

      println!(
        "{} Indexed {} DOIs and {} titles",
        style(SUCCESS).green(),
        style(index.data().by_doi.len()).yellow(),
        style(index.data().by_title.len()).yellow()
      );
      Ok(())
    },

    Commands::Find { doi, title } => {
      let settings = store.load_settings()?;
      let index = DuplicateIndex::load(store, &vault, &settings.folder)?;
      let doi = doi.as_deref().map(parse_doi).transpose()?;
      let query = DuplicateQuery { doi: doi.as_deref(), title: title.as_deref() };

      match index.find_duplicate(&query) {
        Some(found) => {
          println!(
            "{} Already imported as {} (matched by {})",
            style(PAPER).green(),
            style(&found.path).yellow(),
            style(found.kind).cyan()
          );
        },
        None => {
          println!("{} No matching note found", style(WARNING).yellow());
        },
      }
      Ok(())
    },

    Commands::Config {
      folder,
      filename_template,
      fields,
      import_date,
      confirm_duplicates,
      body_template,
      clear_body_template,
      endpoint,
      mailto,
      open_after_import,
    } => {
      let before = store.load_settings()?;
      let mut settings = before.clone();

      if let Some(folder) = folder {
        settings.folder = folder;
      }
      if let Some(template) = filename_template {
        settings.filename_template = template;
      }
      if let Some(fields) = fields {
        let fields: Vec<String> = fields.iter().map(|f| f.trim().to_string()).collect();
        for unknown in fields.iter().filter(|f| f.parse::<MetadataField>().is_err()) {
          println!(
            "{} Unknown field {} will be ignored",
            style(WARNING).yellow(),
            style(unknown).red()
          );
        }
        settings.fields = fields;
      }
      if let Some(value) = import_date {
        settings.add_import_date = value;
      }
      if let Some(value) = confirm_duplicates {
        settings.confirm_duplicates = value;
      }
      if let Some(path) = body_template {
        settings.body_template = Some(path);
      }
      if clear_body_template {
        settings.body_template = None;
      }
      if let Some(endpoint) = endpoint {
        settings.endpoint = endpoint;
      }
      if let Some(mailto) = mailto {
        settings.mailto = Some(mailto).filter(|m| !m.trim().is_empty());
      }
      if let Some(value) = open_after_import {
        settings.open_after_import = value;
      }

      if settings != before {
        store.save_settings(&settings)?;
        println!("{} Settings saved", style(SAVE).green());
      }
      print_settings(&store, &settings)
    },

    Commands::Watch => {
      // Nothing to watch until the vault exists.
      std::fs::create_dir_all(vault.root())?;
      let settings = store.load_settings()?;
      let mut index = DuplicateIndex::load(store, &vault, &settings.folder)?;

      println!(
        "{} Watching {} (press Ctrl-C to stop)",
        style(EYES).cyan(),
        style(vault.root().display()).yellow()
      );
      watch::run(&vault, &mut index).await?;
      println!("{} Stopped watching", style(SUCCESS).green());
      Ok(())
    },
  }
}
