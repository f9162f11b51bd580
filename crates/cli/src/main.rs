use adls_core::{DataLakeFileSystem, MountConfig};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "adls")]
#[command(about = "Filesystem commands over an ADLS Gen2 file system")]
struct Cli {
    /// Account endpoint; overrides STORAGE_ACCOUNT_URL
    #[arg(long, global = true)]
    account_url: Option<String>,
    /// File system name; overrides STORAGE_FILESYSTEM
    #[arg(long, global = true)]
    file_system: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List everything below a path
    Ls {
        path: String,
        /// Print full detail records as JSON
        #[arg(long)]
        detail: bool,
    },
    /// Print the detail record of one path as JSON
    Info { path: String },
    /// Print the etag of a path
    Checksum { path: String },
    /// Create a directory
    Mkdir {
        path: String,
        /// Create missing parents and accept an existing directory
        #[arg(short, long)]
        parents: bool,
    },
    /// Remove files or directory subtrees; missing paths are skipped
    Rm {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Remove one directory
    Rmdir { path: String },
    /// Move a file or directory
    Mv { from: String, to: String },
    /// Write a file to stdout
    Cat { path: String },
    /// Upload a local file
    Put { local: PathBuf, remote: String },
    /// Download a file
    Get { remote: String, local: PathBuf },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("adls_cli=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'adls --help' for commands");
        return Ok(());
    };

    let config = mount_config(cli.account_url, cli.file_system)?;
    let fs = DataLakeFileSystem::new(config);
    run(&fs, command, &mut io::stdout().lock())
}

/// Environment values with command-line overrides applied.
fn mount_config(
    account_url: Option<String>,
    file_system: Option<String>,
) -> anyhow::Result<MountConfig> {
    let env = |key: &str| std::env::var(key).ok();
    let config = MountConfig::from_env_values(
        account_url.or_else(|| env(adls_core::constants::ENV_ACCOUNT_URL)),
        env(adls_core::constants::ENV_ACCOUNT_NAME),
        env(adls_core::constants::ENV_ACCOUNT_KEY),
        file_system.or_else(|| env(adls_core::constants::ENV_FILE_SYSTEM)),
    )?;
    Ok(config)
}

fn run(fs: &DataLakeFileSystem, command: Commands, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Commands::Ls { path, detail } => {
            if detail {
                let entries = fs.ls_detail(&path)?;
                writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?;
            } else {
                for name in fs.ls(&path)? {
                    writeln!(out, "{}", name)?;
                }
            }
        }
        Commands::Info { path } => {
            let info = fs.info(&path)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&info)?)?;
        }
        Commands::Checksum { path } => {
            writeln!(out, "{}", fs.checksum(&path)?)?;
        }
        Commands::Mkdir { path, parents } => {
            if parents {
                fs.makedirs(&path, true)?;
            } else {
                fs.mkdir(&path)?;
            }
        }
        Commands::Rm { paths } => fs.rm_many(&paths, true)?,
        Commands::Rmdir { path } => fs.rmdir(&path)?,
        Commands::Mv { from, to } => fs.mv(&from, &to)?,
        Commands::Cat { path } => {
            let mut file = fs.open(&path, "rb")?;
            io::copy(&mut file, out)?;
            file.close()?;
        }
        Commands::Put { local, remote } => {
            let mut source = std::fs::File::open(&local)?;
            let mut file = fs.open(&remote, "wb")?;
            let copied = io::copy(&mut source, &mut file)?;
            file.close()?;
            tracing::info!("Uploaded {} bytes to {}", copied, remote);
        }
        Commands::Get { remote, local } => {
            let mut file = fs.open(&remote, "rb")?;
            let mut target = std::fs::File::create(&local)?;
            io::copy(&mut file, &mut target)?;
            file.close()?;
        }
    }
    Ok(())
}
