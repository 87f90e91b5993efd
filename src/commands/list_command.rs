use clap::Args;

use scanpick::{Archive, EntryTag, Result};

use super::ArchiveArgs;

pub const ABOUT: &str = "Lists the entries of an archive";

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    archive: ArchiveArgs,

    #[arg(
        long,
        help = "Only list the entries that can be picked.",
        default_value_t = false
    )]
    candidates: bool,
}

/// Prints one tab-separated line per entry: name, tag, kind, shape, dtype.
pub fn run(args: &ListArgs) -> Result<i32> {
    let mut archive = Archive::open(&args.archive.archive, args.archive.rules()?)?;

    if args.candidates {
        for c in archive.candidates(None) {
            println!(
                "{}\tdata\t{}\t{:?}\t{}",
                c.name,
                kind_label(c.kind),
                c.info.shape,
                c.info.dtype.descr
            );
        }
        return Ok(0);
    }

    for entry in archive.entries() {
        let (tag, kind) = match entry.tag {
            EntryTag::Data => ("data", kind_label(archive.rules().kind(&entry.name))),
            EntryTag::Metadata => ("metadata", "-"),
        };
        match archive.describe(&entry.name) {
            Ok(info) => println!(
                "{}\t{}\t{}\t{:?}\t{}",
                entry.name, tag, kind, info.shape, info.dtype.descr
            ),
            Err(e) => println!("{}\t{}\t{}\t-\t({})", entry.name, tag, kind, e),
        }
    }
    Ok(0)
}

fn kind_label(kind: scanpick::EntryKind) -> &'static str {
    match kind {
        scanpick::EntryKind::Image => "image",
        scanpick::EntryKind::Mask => "mask",
    }
}
