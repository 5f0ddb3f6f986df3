mod verbose;

use std::path::PathBuf;

use clap::{FromArgMatches as _, IntoApp as _, Parser, Subcommand};
use tracing_error::ErrorLayer;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};
use twelf::Layer;

use bedtale_common::Conf;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    #[clap(flatten)]
    verbose: verbose::Verbosity,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the built-in web server
    Serve,
    /// Build the sitemap and write it to a file
    Sitemap {
        /// Output path
        #[clap(long, default_value = "sitemap.xml")]
        out: PathBuf,

        /// Write the JSON form instead of XML
        #[clap(long)]
        json: bool,
    },
    /// Offline maintenance, run with the service-role credential
    #[clap(subcommand)]
    Maintain(MaintainCommands),
}

#[derive(Subcommand)]
enum MaintainCommands {
    /// Upload local story images into the bucket and backfill their rows
    Migrate {
        /// Directory holding the local image files
        #[clap(long, default_value = "public/images")]
        images_dir: PathBuf,
    },
    /// Report bucket objects no image row points at
    Orphans {
        /// Delete the orphaned objects instead of only reporting them
        #[clap(long)]
        delete: bool,
    },
    /// List image rows that still point at local files
    Unmigrated,
    /// Clamp a story's lowest image position to 0
    FixPositions {
        /// Slug of the story to fix
        #[clap(long)]
        story: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), bedtale_common::Report> {
    bedtale_common::install()?;

    let matches = Cli::command().args(&Conf::clap_args()).get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let conf = Conf::with_layers(&[
        Layer::Json("bedtale.json".into()),
        Layer::Toml("bedtale.toml".into()),
        Layer::Env(Some("BEDTALE_".to_string())),
        Layer::Clap(matches),
    ])?;

    let subscriber = Registry::default()
        .with(ErrorLayer::default())
        .with(tracing_subscriber::fmt::Layer::default())
        .with(EnvFilter::from_default_env().add_directive(cli.verbose.log_level_filter().into()));

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve => bedtale_command_serve::run(&conf).await?,
        Commands::Sitemap { out, json } => {
            bedtale_command_maintain::sitemap(&conf, &out, json).await?
        }
        Commands::Maintain(command) => match command {
            MaintainCommands::Migrate { images_dir } => {
                bedtale_command_maintain::migrate(&conf, &images_dir).await?
            }
            MaintainCommands::Orphans { delete } => {
                bedtale_command_maintain::orphans(&conf, delete).await?
            }
            MaintainCommands::Unmigrated => bedtale_command_maintain::unmigrated(&conf).await?,
            MaintainCommands::FixPositions { story } => {
                bedtale_command_maintain::fix_positions(&conf, &story).await?
            }
        },
    }

    Ok(())
}
