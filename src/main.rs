//! CLI entry point for white-meta

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use white_meta::server::ServerOptions;
use white_meta::Site;

#[derive(Parser)]
#[command(name = "white-meta")]
#[command(version)]
#[command(about = "Static site generator for the White-Meta blog", long_about = None)]
struct Cli {
    /// Site directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Create a new post or page
    New {
        /// Layout to use (post, page)
        #[arg(short, long, default_value = "post")]
        layout: String,

        /// Title of the new post
        title: String,

        /// File name to use instead of the slugified title
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate {
        /// Keep running and regenerate on change
        #[arg(short, long)]
        watch: bool,
    },

    /// Generate, then serve the site locally
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Serve without watching or live reload
        #[arg(long)]
        r#static: bool,
    },

    /// Remove the public folder
    Clean,

    /// List posts, pages or ranked tags
    List {
        /// Type of content to list (post, page, tag)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "white_meta=debug,info"
    } else {
        "white_meta=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            white_meta::commands::init::init_site(&target_dir)?;
            println!("Initialized site in {:?}", target_dir);
        }

        Commands::New {
            layout,
            title,
            path,
        } => {
            let site = Site::new(&base_dir)?;
            tracing::debug!("Creating new {} with title: {}", layout, title);
            let file =
                white_meta::commands::new::create_post(&site, &title, &layout, path.as_deref())?;
            println!("Created {:?}", file);
        }

        Commands::Generate { watch } => {
            let site = Site::new(&base_dir)?;
            site.generate()?;

            if watch {
                white_meta::commands::generate::watch(&site).await?;
            }
        }

        Commands::Server {
            port,
            ip,
            open,
            r#static,
        } => {
            let site = Site::new(&base_dir)?;
            site.generate()?;

            let options = ServerOptions {
                ip,
                port,
                live_reload: !r#static,
                open,
            };
            white_meta::server::start(&site, options).await?;
        }

        Commands::Clean => {
            let site = Site::new(&base_dir)?;
            site.clean()?;
            println!("Cleaned {:?}", site.public_dir);
        }

        Commands::List { r#type } => {
            let site = Site::new(&base_dir)?;
            white_meta::commands::list::run(&site, &r#type)?;
        }

        Commands::Version => {
            println!("white-meta version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
