use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use ustar_stream::{EntryHeader, ReadOptions, Reader, Writer};

/// ustar
#[derive(Debug, Parser)]
#[clap(name = "ustar", version)]
pub struct App {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Creates an archive, one entry per path (directories are not descended into)
    Create {
        /// the archive to write
        #[clap(short = 'f', long)]
        file: PathBuf,
        paths: Vec<PathBuf>,
    },
    /// Lists the entries of an archive
    List {
        #[clap(short = 'f', long)]
        file: PathBuf,
        /// fail on headers with a bad checksum
        #[clap(long)]
        verify: bool,
    },
    /// Writes the contents of one member to stdout
    Cat {
        #[clap(short = 'f', long)]
        file: PathBuf,
        member: PathBuf,
    },
}

fn open_archive(file: &Path, options: ReadOptions) -> Result<Reader<BufReader<File>>> {
    let archive =
        File::open(file).with_context(|| format!("Opening archive {}", file.display()))?;
    Ok(Reader::with_options(BufReader::new(archive), options)?)
}

fn describe(out: &mut impl Write, entry: &EntryHeader) -> io::Result<()> {
    write!(
        out,
        "{} {:04o} {}/{} {:>10} {:>11} {}",
        char::from(entry.entry_type.to_byte()),
        entry.mode,
        entry.uid,
        entry.gid,
        entry.size,
        entry.mtime,
        entry.path.display()
    )?;
    if entry.entry_type.is_link() {
        write!(out, " -> {}", entry.link.display())?;
    }
    writeln!(out)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = App::parse();

    match args.cmd {
        Command::Create { file, paths } => {
            let archive = File::create(&file)
                .with_context(|| format!("Creating archive {}", file.display()))?;
            let mut writer = Writer::new(BufWriter::new(archive));
            for path in &paths {
                writer
                    .append_path(path, None)
                    .with_context(|| format!("Adding {}", path.display()))?;
            }
            writer.into_inner()?;
        }
        Command::List { file, verify } => {
            let options = if verify {
                ReadOptions::strict()
            } else {
                ReadOptions::default()
            };
            let mut reader = open_archive(&file, options)?;
            let mut stdout = io::stdout().lock();
            while let Some(entry) = reader.next_entry()? {
                describe(&mut stdout, &entry)?;
            }
        }
        Command::Cat { file, member } => {
            let mut reader = open_archive(&file, ReadOptions::default())?;
            loop {
                let Some(entry) = reader.next_entry()? else {
                    bail!("{} not found in archive", member.display());
                };
                if entry.path == member {
                    io::copy(&mut reader, &mut io::stdout().lock())?;
                    break;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ustar_stream::EntryType;

    use super::*;

    #[test]
    fn test_describe() {
        let mut out = vec![];
        let entry = EntryHeader {
            entry_type: EntryType::Symlink,
            mode: 0o777,
            link: "Burger".into(),
            ..EntryHeader::new("menu/Quarter Pounder")
        };
        describe(&mut out, &entry).unwrap();
        describe(&mut out, &EntryHeader::new("menu/Burger")).unwrap();

        similar_asserts::assert_eq!(
            String::from_utf8(out).unwrap(),
            "2 0777 0/0          0           0 menu/Quarter Pounder -> Burger\n\
             0 0000 0/0          0           0 menu/Burger\n"
        );
    }
}
