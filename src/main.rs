use std::{path::PathBuf, time::Duration};

use axon::{
   Result,
   cmd::{self, search::SearchArgs, selfupdate_swap::SwapArgs},
   update, version,
};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the axon application.
#[derive(Parser)]
#[command(name = "axon")]
#[command(about = "Hub-and-spoke sync for AI-editor skills, workflows and commands")]
#[command(long_about = "Axon keeps your AI-editor skills, workflows and commands in sync across \
                        machines\nusing a central Git-backed hub at ~/.axon/repo/.")]
#[command(disable_version_flag = true)]
struct Cli {
   /// Print axon version and exit.
   #[arg(short = 'v', long = "version", global = true)]
   version: bool,

   #[command(subcommand)]
   command: Option<Cmd>,
}

/// Available subcommands for axon.
#[derive(Subcommand)]
enum Cmd {
   #[command(about = "Bootstrap the hub and import existing skills")]
   Init {
      #[arg(help = "Personal remote repo URL to clone or attach")]
      repo_url: Option<String>,

      #[arg(long, help = "Clone the public upstream repo in read-only mode")]
      upstream: bool,
   },

   #[command(about = "Create symlinks from tool destinations to the hub")]
   Link {
      #[arg(help = "Target name, or 'all' (default)")]
      name: Option<String>,
   },

   #[command(about = "Remove symlinks and restore the most recent backup")]
   Unlink {
      #[arg(help = "Target name, or 'all' (default)")]
      name: Option<String>,
   },

   #[command(about = "Sync the hub with the remote Git repository")]
   Sync,

   #[command(about = "Manage the hub's remote Git repository")]
   Remote {
      #[command(subcommand)]
      command: RemoteCmd,
   },

   #[command(about = "Validate symlinks and show hub Git status")]
   Status {
      #[arg(long, help = "Also fetch origin and report ahead/behind")]
      fetch: bool,
   },

   #[command(about = "Run pre-flight environment checks")]
   Doctor {
      #[arg(long, help = "Fix detected issues (conflict files, broken links)")]
      fix: bool,
   },

   #[command(about = "Show metadata and structure of a skill or target")]
   Inspect {
      #[arg(help = "Skill folder name or target name")]
      name: String,
   },

   #[command(about = "Search skills by keyword or semantic similarity")]
   Search {
      #[arg(help = "Search query")]
      query: Vec<String>,

      #[arg(long, help = "Build/update the local semantic index (~/.axon/search)")]
      index: bool,

      #[arg(long, help = "Force keyword search only")]
      keyword: bool,

      #[arg(long, help = "Force semantic search only (error if unavailable)")]
      semantic: bool,

      #[arg(long, help = "Number of results to show (default 5)")]
      k: Option<usize>,

      #[arg(long, help = "Minimum cosine similarity score to include (semantic only)")]
      min_score: Option<f64>,

      #[arg(long, help = "Force re-indexing even if no changes detected")]
      force: bool,

      #[arg(long, help = "Print debug information")]
      debug: bool,
   },

   #[command(about = "Update the axon CLI to the latest release")]
   Update {
      #[arg(long, help = "Check for updates but do not download or install")]
      check: bool,

      #[arg(long, help = "Resolve update details but do not download or install")]
      dry_run: bool,

      #[arg(long, default_value = update::DEFAULT_REPO, help = "GitHub repo in owner/name format")]
      repo: String,

      #[arg(long, help = "Allow updating to a prerelease")]
      prerelease: bool,

      #[arg(long, help = "Reinstall even if already on the latest version")]
      force: bool,

      #[arg(
         long,
         default_value = "30s",
         value_parser = humantime::parse_duration,
         help = "Overall timeout for network operations"
      )]
      timeout: Duration,

      #[arg(long, help = "Verbose output")]
      verbose: bool,
   },

   #[command(about = "Show axon version and build information")]
   Version,

   #[command(name = "__selfupdate-swap", hide = true)]
   SelfupdateSwap {
      #[arg(long)]
      pid: u32,

      #[arg(long)]
      current: PathBuf,

      #[arg(long)]
      new: PathBuf,

      #[arg(long)]
      backup: PathBuf,

      #[arg(long)]
      expected: String,

      #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
      timeout: Duration,
   },
}

#[derive(Subcommand)]
enum RemoteCmd {
   #[command(about = "Set (or update) the remote origin URL")]
   Set {
      #[arg(help = "Remote repository URL")]
      url: String,
   },
}

#[tokio::main]
async fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
      .init();

   let cli = Cli::parse();

   if cli.version {
      println!("{}", version::VERSION);
      return;
   }

   let result = dispatch(cli.command).await;
   if let Err(e) = result {
      eprintln!("Error: {e}");
      std::process::exit(1);
   }
}

async fn dispatch(command: Option<Cmd>) -> Result<()> {
   match command {
      Some(Cmd::Init { repo_url, upstream }) => cmd::init::execute(repo_url, upstream),
      Some(Cmd::Link { name }) => cmd::link::execute(name),
      Some(Cmd::Unlink { name }) => cmd::unlink::execute(name),
      Some(Cmd::Sync) => cmd::sync::execute(),
      Some(Cmd::Remote { command: RemoteCmd::Set { url } }) => cmd::remote::execute_set(&url),
      Some(Cmd::Status { fetch }) => cmd::status::execute(fetch),
      Some(Cmd::Doctor { fix }) => cmd::doctor::execute(fix),
      Some(Cmd::Inspect { name }) => cmd::inspect::execute(&name),
      Some(Cmd::Search { query, index, keyword, semantic, k, min_score, force, debug }) => {
         cmd::search::execute(SearchArgs { query, index, keyword, semantic, k, min_score, force, debug })
            .await
      },
      Some(Cmd::Update { check, dry_run, repo, prerelease, force, timeout, verbose }) => {
         cmd::update::execute(check, dry_run, repo, prerelease, force, timeout, verbose).await
      },
      Some(Cmd::Version) => {
         cmd::version::execute();
         Ok(())
      },
      Some(Cmd::SelfupdateSwap { pid, current, new, backup, expected, timeout }) => {
         cmd::selfupdate_swap::execute(SwapArgs {
            pid,
            current,
            new_path: new,
            backup,
            expected,
            timeout,
         })
      },
      None => {
         Cli::command().print_help().map_err(axon::Error::from)?;
         Ok(())
      },
   }
}
