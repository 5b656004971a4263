use crate::types::*;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Detect, list, extract, rebuild and patch game archives
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Arg {
    #[arg(short = 'f', long, value_enum, global = true)]
    /// Archive format, skips detection
    pub format: Option<ArchiveFormat>,
    #[arg(short = 'e', long, value_enum, global = true)]
    /// Encoding of filenames stored in the archive
    pub encoding: Option<TextEncoding>,
    #[arg(short, long, action = ArgAction::SetTrue, global = true)]
    /// Search for archives in the directory recursively
    pub recursive: bool,
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    /// Consider every file in a directory, not only known extensions
    pub all_files: bool,
    #[arg(global = true, action = ArgAction::SetTrue, short, long)]
    /// Print backtrace on error
    pub backtrace: bool,
    #[arg(long, global = true)]
    /// JSON file with extra settings
    pub config: Option<String>,
    #[arg(long, global = true)]
    /// Window size of the file accessor in bytes
    pub buffer_size: Option<usize>,
    #[arg(long, global = true)]
    /// Maximum number of directory entries accepted per archive
    pub max_files: Option<u64>,
    #[arg(short, long, action = ArgAction::Count, global = true)]
    /// Increase log verbosity, may be repeated
    pub verbose: u8,
    #[command(subcommand)]
    /// Command
    pub command: Command,
}

#[derive(Subcommand, Debug)]
/// Commands
pub enum Command {
    /// Rate every known format against the input
    Detect {
        /// Input archive file or directory
        input: String,
    },
    /// List resources in an archive
    List {
        /// Input archive file or directory
        input: String,
        #[arg(long, action = ArgAction::SetTrue)]
        /// Print one JSON object per archive
        json: bool,
    },
    /// Extract every resource from an archive
    Extract {
        /// Input archive file or directory
        input: String,
        /// Output directory
        output: Option<String>,
    },
    /// Write a fresh archive from an existing one
    Rebuild(WriteArgs),
    /// Copy an archive and overwrite only the replaced entries
    Patch(WriteArgs),
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Input archive file
    pub input: String,
    /// Output archive file
    pub output: String,
    #[arg(long = "replace", value_parser = parse_replacement)]
    /// Substitute a resource's content, as NAME=FILE
    pub replacements: Vec<(String, PathBuf)>,
}

fn parse_replacement(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, file)) if !name.is_empty() && !file.is_empty() => {
            Ok((name.to_string(), PathBuf::from(file)))
        }
        _ => Err(format!("expected NAME=FILE, got '{}'", s)),
    }
}

pub fn parse_args() -> Arg {
    Arg::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_replacement() {
        assert_eq!(
            parse_replacement("a/b.txt=new.txt").unwrap(),
            ("a/b.txt".to_string(), PathBuf::from("new.txt"))
        );
        assert!(parse_replacement("nothing").is_err());
        assert!(parse_replacement("=x").is_err());
    }

    #[cfg(feature = "package")]
    #[test]
    fn test_patch_command() {
        let arg = Arg::try_parse_from([
            "gamearc", "-f", "package", "patch", "in.pkg", "out.pkg", "--replace", "a=b",
        ])
        .unwrap();
        assert_eq!(arg.format, Some(ArchiveFormat::Package));
        match arg.command {
            Command::Patch(w) => assert_eq!(w.replacements.len(), 1),
            _ => panic!("wrong command"),
        }
    }
}
