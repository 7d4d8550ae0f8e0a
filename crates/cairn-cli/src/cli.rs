use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cairn",
    about = "Cairn: content-addressed snapshots in git's object format",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working tree that holds the `.git` directory
    #[arg(short = 'C', long = "repo", global = true, default_value = ".")]
    pub repo: PathBuf,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new repository
    Init(InitArgs),
    /// Compute a blob address for a file, optionally storing it
    HashObject(HashObjectArgs),
    /// Show an object's content, kind, or size
    CatFile(CatFileArgs),
    /// Snapshot the working tree into tree objects
    WriteTree(WriteTreeArgs),
    /// List the entries of a tree
    LsTree(LsTreeArgs),
    /// Create a commit object for a tree
    CommitTree(CommitTreeArgs),
    /// Write a tree or commit snapshot into a directory
    CheckoutTree(CheckoutTreeArgs),
    /// Copy a repository's objects and refs to a new location
    Clone(CloneArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize (defaults to --repo)
    pub path: Option<PathBuf>,
    /// Store snapshots as one flat tree of relative paths
    #[arg(long)]
    pub flat: bool,
    /// Branch named by HEAD
    #[arg(short, long)]
    pub branch: Option<String>,
}

#[derive(Args)]
pub struct HashObjectArgs {
    /// Write the blob into the object store
    #[arg(short = 'w')]
    pub write: bool,
    pub file: PathBuf,
}

#[derive(Args)]
#[command(group(ArgGroup::new("mode").required(true).args(["pretty", "kind", "size"])))]
pub struct CatFileArgs {
    /// Pretty-print the object's content
    #[arg(short = 'p')]
    pub pretty: bool,
    /// Show the object's kind
    #[arg(short = 't')]
    pub kind: bool,
    /// Show the object's payload size
    #[arg(short = 's')]
    pub size: bool,
    pub object: String,
}

#[derive(Args)]
pub struct WriteTreeArgs {}

#[derive(Args)]
pub struct LsTreeArgs {
    #[arg(long)]
    pub name_only: bool,
    pub tree: String,
}

#[derive(Args)]
pub struct CommitTreeArgs {
    pub tree: String,
    /// Message words, joined with single spaces
    #[arg(short, long, num_args = 1.., required = true)]
    pub message: Vec<String>,
}

#[derive(Args)]
pub struct CheckoutTreeArgs {
    pub object: String,
    pub dest: PathBuf,
}

#[derive(Args)]
pub struct CloneArgs {
    pub src: PathBuf,
    pub dst: PathBuf,
}
