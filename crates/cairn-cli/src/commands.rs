use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use cairn_repo::{RepoConfig, Repository, TreeLayout};
use cairn_store::{Blob, Commit, Tree, TreeEntry};
use cairn_types::{ObjectId, ObjectKind};
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use crate::cli::*;

#[derive(Serialize)]
struct IdOutput {
    id: ObjectId,
}

#[derive(Serialize)]
struct KindOutput {
    id: ObjectId,
    kind: String,
}

#[derive(Serialize)]
struct SizeOutput {
    id: ObjectId,
    size: u64,
}

#[derive(Serialize)]
struct CheckoutOutput {
    object: ObjectId,
    files: usize,
    dirs: usize,
    skipped: usize,
}

#[derive(Serialize)]
struct CloneOutput {
    objects: usize,
    refs: usize,
}

pub fn run_command(cli: Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    let json = matches!(cli.format, OutputFormat::Json);
    let repo = cli.repo.as_path();
    match cli.command {
        Command::Init(args) => cmd_init(repo, args, json, out),
        Command::HashObject(args) => cmd_hash_object(repo, args, json, out),
        Command::CatFile(args) => cmd_cat_file(repo, args, json, out),
        Command::WriteTree(_) => cmd_write_tree(repo, json, out),
        Command::LsTree(args) => cmd_ls_tree(repo, args, json, out),
        Command::CommitTree(args) => cmd_commit_tree(repo, args, json, out),
        Command::CheckoutTree(args) => cmd_checkout_tree(repo, args, json, out),
        Command::Clone(args) => cmd_clone(args, json, out),
    }
}

fn open(repo: &Path) -> anyhow::Result<Repository> {
    Repository::open(repo).with_context(|| format!("cannot open repository at {}", repo.display()))
}

fn parse_id(text: &str) -> anyhow::Result<ObjectId> {
    text.parse::<ObjectId>()
        .with_context(|| format!("{text:?} is not a 40-character object address"))
}

fn print_id(id: ObjectId, json: bool, out: &mut dyn Write) -> anyhow::Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(&IdOutput { id })?)?;
    } else {
        writeln!(out, "{id}")?;
    }
    Ok(())
}

fn tree_line(entry: &TreeEntry) -> String {
    format!(
        "{} {} {}\t{}",
        entry.mode,
        entry.mode.object_kind(),
        entry.object_id,
        entry.name
    )
}

fn cmd_init(repo: &Path, args: InitArgs, json: bool, out: &mut dyn Write) -> anyhow::Result<()> {
    let path = args.path.unwrap_or_else(|| repo.to_path_buf());
    let mut config = RepoConfig::default();
    if args.flat {
        config.layout = TreeLayout::Flat;
    }
    if let Some(branch) = args.branch {
        config.head_branch = branch;
    }
    let repository = Repository::init_with_config(&path, config)?;
    if json {
        writeln!(
            out,
            "{}",
            serde_json::json!({
                "path": repository.repo_dir(),
                "head": repository.head()?,
            })
        )?;
    } else {
        writeln!(
            out,
            "{} Initialized empty repository in {}",
            "✓".green().bold(),
            repository.repo_dir().display().to_string().bold()
        )?;
        writeln!(out, "  Branch: {}", repository.config().head_branch.yellow())?;
    }
    Ok(())
}

fn cmd_hash_object(
    repo: &Path,
    args: HashObjectArgs,
    json: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let data = fs::read(&args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    let id = if args.write {
        open(repo)?.hash_object(&data, true)?
    } else {
        Blob::address(&data)
    };
    debug!(file = %args.file.display(), id = %id, stored = args.write, "hashed file");
    print_id(id, json, out)
}

fn cmd_cat_file(
    repo: &Path,
    args: CatFileArgs,
    json: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let id = parse_id(&args.object)?;
    let object = open(repo)?.read_object(&id)?;

    if args.kind {
        if json {
            let kind = object.kind.to_string();
            writeln!(out, "{}", serde_json::to_string(&KindOutput { id, kind })?)?;
        } else {
            writeln!(out, "{}", object.kind)?;
        }
        return Ok(());
    }
    if args.size {
        if json {
            let size = object.size;
            writeln!(out, "{}", serde_json::to_string(&SizeOutput { id, size })?)?;
        } else {
            writeln!(out, "{}", object.size)?;
        }
        return Ok(());
    }

    match object.kind {
        ObjectKind::Tree => {
            let tree = Tree::from_stored_object(&object)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&tree.entries)?)?;
            } else {
                for entry in &tree.entries {
                    writeln!(out, "{}", tree_line(entry))?;
                }
            }
        }
        ObjectKind::Commit => {
            // Validate before echoing the raw text.
            Commit::decode(&object.data)?;
            out.write_all(&object.data)?;
        }
        _ => out.write_all(&object.data)?,
    }
    Ok(())
}

fn cmd_write_tree(repo: &Path, json: bool, out: &mut dyn Write) -> anyhow::Result<()> {
    let id = open(repo)?.write_tree()?;
    print_id(id, json, out)
}

fn cmd_ls_tree(
    repo: &Path,
    args: LsTreeArgs,
    json: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let id = parse_id(&args.tree)?;
    let tree = open(repo)?.read_tree(&id)?;
    if json {
        if args.name_only {
            let names: Vec<&str> = tree.entries.iter().map(|e| e.name.as_str()).collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&names)?)?;
        } else {
            writeln!(out, "{}", serde_json::to_string_pretty(&tree.entries)?)?;
        }
        return Ok(());
    }
    for entry in &tree.entries {
        if args.name_only {
            writeln!(out, "{}", entry.name)?;
        } else {
            writeln!(out, "{}", tree_line(entry))?;
        }
    }
    Ok(())
}

fn cmd_commit_tree(
    repo: &Path,
    args: CommitTreeArgs,
    json: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let tree = parse_id(&args.tree)?;
    let message = args.message.join(" ");
    let id = open(repo)?.commit_tree(tree, &message)?;
    print_id(id, json, out)
}

fn cmd_checkout_tree(
    repo: &Path,
    args: CheckoutTreeArgs,
    json: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let id = parse_id(&args.object)?;
    let stats = open(repo)?.checkout(&id, &args.dest)?;
    if json {
        let report = CheckoutOutput {
            object: id,
            files: stats.files,
            dirs: stats.dirs,
            skipped: stats.skipped,
        };
        writeln!(out, "{}", serde_json::to_string(&report)?)?;
    } else {
        writeln!(
            out,
            "{} Checked out {} into {} ({} files, {} directories)",
            "✓".green().bold(),
            id.short_hex().yellow(),
            args.dest.display().to_string().bold(),
            stats.files,
            stats.dirs
        )?;
        if stats.skipped > 0 {
            writeln!(out, "  {} {} unsupported entries skipped", "!".yellow(), stats.skipped)?;
        }
    }
    Ok(())
}

fn cmd_clone(args: CloneArgs, json: bool, out: &mut dyn Write) -> anyhow::Result<()> {
    let (_, report) = Repository::clone_from(&args.src, &args.dst).with_context(|| {
        format!("cannot clone {} into {}", args.src.display(), args.dst.display())
    })?;
    if json {
        let report = CloneOutput {
            objects: report.objects,
            refs: report.refs,
        };
        writeln!(out, "{}", serde_json::to_string(&report)?)?;
    } else {
        writeln!(
            out,
            "{} Cloned {} into {}",
            "✓".green().bold(),
            args.src.display().to_string().bold(),
            args.dst.display().to_string().bold()
        )?;
        writeln!(out, "  Objects: {}", report.objects.to_string().cyan())?;
        writeln!(out, "  Refs: {}", report.refs.to_string().cyan())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(args.iter().copied())?;
        let mut out = Vec::new();
        run_command(cli, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    fn repo_arg(dir: &Path) -> String {
        dir.display().to_string()
    }

    #[test]
    fn init_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_arg(dir.path());
        let text = run(&["cairn", "-C", &repo, "init"]).unwrap();
        assert!(text.contains("Initialized empty repository"));
        assert!(dir.path().join(".git/HEAD").is_file());
    }

    #[test]
    fn init_json_reports_head() {
        let dir = tempfile::tempdir().unwrap();
        let path = repo_arg(dir.path());
        let text = run(&["cairn", "--format", "json", "init", "-b", "trunk", &path]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["head"], "ref: refs/heads/trunk");
    }

    #[test]
    fn plain_reinit_resets_branch_and_layout() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_arg(dir.path());
        run(&["cairn", "-C", &repo, "init", "-b", "trunk", "--flat"]).unwrap();
        assert!(dir.path().join(".git/cairn.toml").is_file());

        let text = run(&["cairn", "-C", &repo, "--format", "json", "init"]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["head"], "ref: refs/heads/main");
        assert!(!dir.path().join(".git/cairn.toml").exists());
    }

    #[test]
    fn hash_object_known_address() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("hello.txt");
        fs::write(&file, b"hello\n").unwrap();
        let text = run(&["cairn", "hash-object", &file.display().to_string()]).unwrap();
        assert_eq!(text, "ce013625030ba8dba906f756967f9e9ca394464a\n");
    }

    #[test]
    fn hash_object_write_requires_repository() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, b"x").unwrap();
        let repo = repo_arg(dir.path());
        assert!(run(&["cairn", "-C", &repo, "hash-object", "-w", &file.display().to_string()]).is_err());
    }

    #[test]
    fn snapshot_commit_and_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_arg(dir.path());
        run(&["cairn", "-C", &repo, "init"]).unwrap();
        fs::write(dir.path().join("hello.txt"), b"hello\n").unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/a.md"), b"a").unwrap();

        let tree = run(&["cairn", "-C", &repo, "write-tree"]).unwrap();
        let tree = tree.trim();
        assert_eq!(tree.len(), 40);

        let names = run(&["cairn", "-C", &repo, "ls-tree", "--name-only", tree]).unwrap();
        assert_eq!(names, "docs\nhello.txt\n");

        let listing = run(&["cairn", "-C", &repo, "ls-tree", tree]).unwrap();
        assert!(listing.contains("100644 blob ce013625030ba8dba906f756967f9e9ca394464a\thello.txt"));
        assert!(listing.starts_with("040000 tree "));

        assert_eq!(run(&["cairn", "-C", &repo, "cat-file", "-t", tree]).unwrap(), "tree\n");

        let commit = run(&["cairn", "-C", &repo, "commit-tree", tree, "-m", "first", "snapshot"]).unwrap();
        let commit = commit.trim();
        let body = run(&["cairn", "-C", &repo, "cat-file", "-p", commit]).unwrap();
        assert_eq!(body, format!("tree {tree}\n\nfirst snapshot\n"));
        assert_eq!(run(&["cairn", "-C", &repo, "cat-file", "-t", commit]).unwrap(), "commit\n");
    }

    #[test]
    fn cat_file_blob_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_arg(dir.path());
        run(&["cairn", "-C", &repo, "init"]).unwrap();
        let file = dir.path().join("hello.txt");
        fs::write(&file, b"hello\n").unwrap();
        let id = run(&["cairn", "-C", &repo, "hash-object", "-w", &file.display().to_string()]).unwrap();
        let id = id.trim();

        assert_eq!(run(&["cairn", "-C", &repo, "cat-file", "-p", id]).unwrap(), "hello\n");
        assert_eq!(run(&["cairn", "-C", &repo, "cat-file", "-s", id]).unwrap(), "6\n");

        let json = run(&["cairn", "-C", &repo, "--format", "json", "cat-file", "-s", id]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["size"], 6);
        assert_eq!(value["id"], id);
    }

    #[test]
    fn cat_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_arg(dir.path());
        run(&["cairn", "-C", &repo, "init"]).unwrap();
        assert!(run(&["cairn", "-C", &repo, "cat-file", "-p", "not-hex"]).is_err());
        let missing = "0".repeat(40);
        assert!(run(&["cairn", "-C", &repo, "cat-file", "-p", &missing]).is_err());
    }

    #[test]
    fn ls_tree_json_entries() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_arg(dir.path());
        run(&["cairn", "-C", &repo, "init"]).unwrap();
        fs::write(dir.path().join("x"), b"x").unwrap();
        let tree = run(&["cairn", "-C", &repo, "write-tree"]).unwrap();
        let json = run(&["cairn", "-C", &repo, "--format", "json", "ls-tree", tree.trim()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["name"], "x");
    }

    #[test]
    fn checkout_and_clone() {
        let src = tempfile::tempdir().unwrap();
        let repo = repo_arg(src.path());
        run(&["cairn", "-C", &repo, "init"]).unwrap();
        fs::write(src.path().join("f.txt"), b"payload").unwrap();
        let tree = run(&["cairn", "-C", &repo, "write-tree"]).unwrap();
        let commit = run(&["cairn", "-C", &repo, "commit-tree", tree.trim(), "-m", "snap"]).unwrap();

        let dst = tempfile::tempdir().unwrap();
        let dst_path = dst.path().join("clone");
        let dst_arg = dst_path.display().to_string();
        let json = run(&["cairn", "--format", "json", "clone", &repo, &dst_arg]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["objects"], 3);

        let out = dst.path().join("out");
        run(&["cairn", "-C", &dst_arg, "checkout-tree", commit.trim(), &out.display().to_string()]).unwrap();
        assert_eq!(fs::read(out.join("f.txt")).unwrap(), b"payload");
    }

    #[test]
    fn commands_outside_repository_fail() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_arg(dir.path());
        assert!(run(&["cairn", "-C", &repo, "write-tree"]).is_err());
    }
}
