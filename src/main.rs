use anyhow::Result;
use bit_odb::areas::repository::Repository;
use bit_odb::artifacts::objects::object_type::ObjectType;
use bit_odb::commands::plumbing::cat_file::CatFileMode;
use bit_odb::config::{DEFAULT_GIT_DIR, StoreConfig};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bit-odb",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "A git-compatible object database",
    long_about = "Reads and writes git objects and refs. Loose objects, pack files \
    (including offset and reference deltas) and packed-refs are all understood, \
    so the tool can work on repositories created by git itself.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "GIT_DIR",
        help = "Path to the git directory (defaults to .git)"
    )]
    git_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "This command creates an empty object store and refs directory \
        in the current directory or at the specified path."
    )]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<PathBuf>,
    },
    #[command(
        name = "cat-file",
        about = "Print the content, type or size of an object",
        long_about = "This command reads an object from loose storage or from a pack. \
        It requires a revision naming the object.",
        group(ArgGroup::new("mode").required(true).args(["pretty", "show_type", "size", "exists"]))
    )]
    CatFile {
        #[arg(short = 'p', help = "Pretty-print the object's content")]
        pretty: bool,
        #[arg(short = 't', help = "Show the object's type")]
        show_type: bool,
        #[arg(short = 's', help = "Show the object's size")]
        size: bool,
        #[arg(short = 'e', help = "Exit with zero status if the object exists")]
        exists: bool,
        #[arg(index = 1, help = "The object to show")]
        revision: String,
    },
    #[command(
        name = "hash-object",
        about = "Hash an object and optionally write it to the object database",
        long_about = "This command hashes a file as an object of the given type and can write \
        it to the object database. It requires the path to the file to be specified."
    )]
    HashObject {
        #[arg(short, long, required = false, help = "Write the object to the object database")]
        write: bool,
        #[arg(short = 't', default_value = "blob", help = "The type of object to create")]
        object_type: ObjectType,
        #[arg(index = 1)]
        file: String,
    },
    #[command(
        name = "rev-parse",
        about = "Resolve a revision to an object id",
        long_about = "This command prints the object id a ref name, object id or \
        parent/ancestor expression resolves to."
    )]
    RevParse {
        #[arg(index = 1)]
        revision: String,
    },
    #[command(
        name = "update-ref",
        about = "Point a ref at an object",
        long_about = "This command writes a loose ref, following symbolic refs such as HEAD."
    )]
    UpdateRef {
        #[arg(index = 1, help = "The ref to update")]
        ref_name: String,
        #[arg(index = 2, help = "The revision the ref should point at")]
        new_value: String,
    },
    #[command(
        name = "show-ref",
        about = "List references",
        long_about = "This command lists every loose and packed ref with the object it points at."
    )]
    ShowRef {
        #[arg(long, help = "Show HEAD as well")]
        head: bool,
    },
    #[command(
        name = "show-index",
        about = "List the objects of pack indexes",
        long_about = "This command prints the offset, id and CRC-32 of every object in the \
        given pack, or in every pack when none is given."
    )]
    ShowIndex {
        #[arg(index = 1, help = "The pack hash, as in pack-<hash>.idx")]
        pack: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let git_dir = cli
        .git_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_GIT_DIR));

    if let Commands::Init { path } = &cli.command {
        let git_dir = match path {
            Some(path) => path.join(DEFAULT_GIT_DIR),
            None => git_dir,
        };
        let config = StoreConfig::load_from_env(git_dir)?;
        let mut repository = Repository::new(config, Box::new(std::io::stdout()));

        repository.init().await?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = StoreConfig::load_from_env(git_dir)?;
    let mut repository = Repository::new(config, Box::new(std::io::stdout()));

    match &cli.command {
        Commands::Init { .. } => {}
        Commands::CatFile {
            pretty: _,
            show_type,
            size,
            exists,
            revision,
        } => {
            let mode = match (*show_type, *size, *exists) {
                (true, _, _) => CatFileMode::Type,
                (_, true, _) => CatFileMode::Size,
                (_, _, true) => CatFileMode::Exists,
                _ => CatFileMode::Pretty,
            };

            if !repository.cat_file(revision, mode).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::HashObject {
            write,
            object_type,
            file,
        } => repository.hash_object(file, *object_type, *write).await?,
        Commands::RevParse { revision } => repository.rev_parse(revision).await?,
        Commands::UpdateRef {
            ref_name,
            new_value,
        } => repository.update_ref(ref_name, new_value).await?,
        Commands::ShowRef { head } => repository.show_ref(*head).await?,
        Commands::ShowIndex { pack } => repository.show_index(pack.as_deref()).await?,
    }

    Ok(ExitCode::SUCCESS)
}
