//! Copy host files into an ext2 image.
//!
//! The driver behind this tool is still read-only, so the copy itself is
//! reported as unsupported after the image, the sources, and the
//! destination have all been validated.

use std::env;
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::process::exit;

use ext2fs::{Ext2Fs, FileBlockDevice, FsError, MountOptions};

const CMD_NAME: &str = "ext2cp";

const ESC_RESET: &str = "\x1b[0m";
const ESC_BOLD: &str = "\x1b[1m";
const ESC_RED: &str = "\x1b[31m";

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{CMD_NAME}: {}: {}", record.level().as_str().to_lowercase(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn fail(msg: impl Display) -> ! {
    eprintln!("{ESC_BOLD}{CMD_NAME}: {ESC_RED}error: {ESC_RESET}{msg}");
    exit(1);
}

fn usage() {
    println!("Usage: {CMD_NAME} [OPTION]... IMAGE SOURCE    DEST");
    println!("   or: {CMD_NAME} [OPTION]... IMAGE SOURCE... DIRECTORY");
    println!("Copy host files into an ext2 image.");
    println!();
    println!("  -v  verbose logging");
    println!("  -h  display this help and exit");
}

struct Params {
    image: String,
    sources: Vec<String>,
    dest: String,
}

fn parse_args() -> Params {
    let mut verbose = false;
    let mut operands = Vec::new();

    // A single pass decides what is an option and what is an operand; the
    // image, sources, and destination are then split off the operand list.
    for arg in env::args().skip(1) {
        if let Some(flags) = arg.strip_prefix('-') {
            for flag in flags.chars() {
                match flag {
                    'h' => {
                        usage();
                        exit(0);
                    }
                    'v' => verbose = true,
                    _ => fail(format!("invalid option '{flag}'")),
                }
            }
            continue;
        }
        operands.push(arg);
    }

    log::set_logger(&LOGGER).ok();
    log::set_max_level(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });

    if operands.is_empty() {
        fail("missing image operand");
    }
    if operands.len() < 2 {
        fail("missing source operand");
    }
    if operands.len() < 3 {
        fail("missing destination operand");
    }

    let image = operands.remove(0);
    let dest = operands.pop().unwrap_or_default();
    Params {
        image,
        sources: operands,
        dest,
    }
}

fn main() {
    let params = parse_args();

    if !params.dest.starts_with('/') {
        fail("destination must be an absolute path");
    }

    let image_file = match OpenOptions::new().read(true).write(true).open(&params.image) {
        Ok(file) => file,
        Err(err) => fail(format!(
            "failed to open image file '{}': {err}",
            params.image
        )),
    };
    let mut device = match FileBlockDevice::from_file(image_file) {
        Ok(device) => device,
        Err(err) => fail(format!(
            "failed to open image file '{}': {err}",
            params.image
        )),
    };

    let mut sources: Vec<File> = Vec::with_capacity(params.sources.len());
    for source in &params.sources {
        match File::open(source) {
            Ok(file) => sources.push(file),
            Err(err) => fail(format!("failed to open source file '{source}': {err}")),
        }
    }

    let mut fs = match Ext2Fs::mount(&mut device, MountOptions { writable: true }) {
        Ok(fs) => fs,
        Err(err) => fail(err.message()),
    };

    // The destination must be an existing directory, or (with a single
    // source) a new name inside an existing directory.
    match fs.resolve(&params.dest) {
        Ok(ino) => match fs.read_inode(ino) {
            Ok(inode) if inode.is_dir() => {}
            Ok(_) if params.sources.len() == 1 => {}
            Ok(_) => fail(format!("target '{}' is not a directory", params.dest)),
            Err(err) => fail(format!("cannot access '{}': {err}", params.dest)),
        },
        Err(FsError::NotFound) if params.sources.len() == 1 => {
            let parent = match params.dest.trim_end_matches('/').rsplit_once('/') {
                Some(("", _)) | None => "/",
                Some((parent, _)) => parent,
            };
            match fs.resolve(parent).and_then(|ino| fs.read_inode(ino)) {
                Ok(inode) if inode.is_dir() => {}
                Ok(_) => fail(format!("'{parent}' is not a directory")),
                Err(err) => fail(format!("cannot access '{parent}': {err}")),
            }
        }
        Err(FsError::NotFound) => fail(format!(
            "destination directory '{}' does not exist",
            params.dest
        )),
        Err(err) => fail(format!("cannot access '{}': {err}", params.dest)),
    }

    log::debug!(
        "image '{}' validated: {} source(s) for '{}'",
        params.image,
        sources.len(),
        params.dest
    );

    fail("copying into ext2 images is not implemented yet: the filesystem driver is read-only");
}
