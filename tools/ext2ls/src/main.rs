//! List directories inside an ext2 image.

use std::env;
use std::fmt::Display;
use std::process::exit;

use ext2fs::{
    BlockDevice, Ext2Fs, FileBlockDevice, FileType, Inode, MountOptions, PERM_GROUP_EXEC,
    PERM_GROUP_READ, PERM_GROUP_WRITE, PERM_OTHER_EXEC, PERM_OTHER_READ, PERM_OTHER_WRITE,
    PERM_SETGID, PERM_SETUID, PERM_STICKY, PERM_USER_EXEC, PERM_USER_READ, PERM_USER_WRITE,
};
use uuid::Uuid;

const CMD_NAME: &str = "ext2ls";

const ESC_RESET: &str = "\x1b[0m";
const ESC_BOLD: &str = "\x1b[1m";
const ESC_RED: &str = "\x1b[31m";
const ESC_BLUE: &str = "\x1b[34m";
const ESC_CYAN: &str = "\x1b[36m";

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
    println!("Usage: {CMD_NAME} [OPTION]... IMAGE [PATH]...");
    println!("List directories inside an ext2 image.");
    println!();
    println!("  -l  use a long listing format");
    println!("  -v  verbose logging");
    println!("  -h  display this help and exit");
}

struct Params {
    image: String,
    paths: Vec<String>,
    long: bool,
}

fn parse_args() -> Params {
    let mut long = false;
    let mut verbose = false;
    let mut operands = Vec::new();

    for arg in env::args().skip(1) {
        if let Some(flags) = arg.strip_prefix('-') {
            for flag in flags.chars() {
                match flag {
                    'h' => {
                        usage();
                        exit(0);
                    }
                    'l' => long = true,
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

    let mut operands = operands.into_iter();
    let Some(image) = operands.next() else {
        fail("missing image operand");
    };
    let mut paths: Vec<String> = operands.collect();
    if paths.is_empty() {
        paths.push(String::from("/"));
    }

    Params { image, paths, long }
}

fn main() {
    let params = parse_args();

    let mut device = match FileBlockDevice::open(&params.image) {
        Ok(device) => device,
        Err(err) => fail(format!(
            "failed to open image file '{}': {err}",
            params.image
        )),
    };

    let mut fs = match Ext2Fs::mount(&mut device, MountOptions::default()) {
        Ok(fs) => fs,
        Err(err) => fail(err.message()),
    };

    if params.long {
        let sb = fs.superblock();
        let label = String::from_utf8_lossy(&sb.volume_name);
        let label = label.trim_end_matches('\0');
        println!(
            "{}: volume '{}' uuid {}",
            params.image,
            label,
            Uuid::from_bytes(sb.uuid)
        );
    }

    let multiple = params.paths.len() > 1;
    for (i, path) in params.paths.iter().enumerate() {
        if multiple {
            if i > 0 {
                println!();
            }
            println!("{path}:");
        }
        list_path(&mut fs, path, params.long);
    }
}

fn list_path<D: BlockDevice>(fs: &mut Ext2Fs<'_, D>, path: &str, long: bool) {
    let ino = match fs.resolve(path) {
        Ok(ino) => ino,
        Err(err) => fail(format!("cannot access '{path}': {err}")),
    };
    let inode = match fs.read_inode(ino) {
        Ok(inode) => inode,
        Err(err) => fail(format!("cannot access '{path}': {err}")),
    };

    if !inode.is_dir() {
        let name = path.rsplit('/').find(|c| !c.is_empty()).unwrap_or(path);
        print_entry(fs, &inode, name, long);
        if !long {
            println!();
        }
        return;
    }

    let mut entries = match fs.readdir(path) {
        Ok(entries) => entries,
        Err(err) => fail(format!("cannot read directory '{path}': {err}")),
    };
    entries.sort_by(|a, b| a.name().cmp(b.name()));

    let mut printed = 0;
    for entry in &entries {
        if entry.name() == b"." || entry.name() == b".." {
            continue;
        }
        let inode = match fs.read_inode(entry.ino()) {
            Ok(inode) => inode,
            Err(err) => fail(format!(
                "cannot read inode {} of '{path}': {err}",
                entry.ino()
            )),
        };
        if !long && printed > 0 {
            print!("  ");
        }
        print_entry(fs, &inode, &entry.name_lossy(), long);
        printed += 1;
    }
    if !long && printed > 0 {
        println!();
    }
}

fn print_entry<D: BlockDevice>(fs: &mut Ext2Fs<'_, D>, inode: &Inode, name: &str, long: bool) {
    let coloured = match inode.file_type() {
        FileType::Directory => format!("{ESC_BLUE}{name}/{ESC_RESET}"),
        FileType::Symlink => format!("{ESC_CYAN}{name}{ESC_RESET}"),
        _ => String::from(name),
    };

    if long {
        println!(
            "{} {:3} {:5} {:5} {:10} {:10} {}",
            mode_string(inode),
            inode.links_count.get(),
            inode.uid.get(),
            inode.gid.get(),
            fs.file_size(inode),
            inode.mtime.get(),
            coloured
        );
    } else {
        print!("{coloured}");
    }
}

/// Render the mode word the way `ls -l` does, e.g. `drwxr-sr-x`.
fn mode_string(inode: &Inode) -> String {
    let type_char = match inode.file_type() {
        FileType::Fifo => 'p',
        FileType::CharDevice => 'c',
        FileType::Directory => 'd',
        FileType::BlockDevice => 'b',
        FileType::Regular => '-',
        FileType::Symlink => 'l',
        FileType::Socket => 's',
        FileType::Unknown => '?',
    };
    let perms = inode.permissions();
    let bit = |mask: u16, ch: char| if perms & mask != 0 { ch } else { '-' };

    let user_exec = match (perms & PERM_USER_EXEC != 0, perms & PERM_SETUID != 0) {
        (true, true) => 's',
        (false, true) => 'S',
        (true, false) => 'x',
        (false, false) => '-',
    };
    let group_exec = match (perms & PERM_GROUP_EXEC != 0, perms & PERM_SETGID != 0) {
        (true, true) => 's',
        (false, true) => 'S',
        (true, false) => 'x',
        (false, false) => '-',
    };
    let other_exec = match (perms & PERM_OTHER_EXEC != 0, perms & PERM_STICKY != 0) {
        (true, true) => 't',
        (false, true) => 'T',
        (true, false) => 'x',
        (false, false) => '-',
    };

    [
        type_char,
        bit(PERM_USER_READ, 'r'),
        bit(PERM_USER_WRITE, 'w'),
        user_exec,
        bit(PERM_GROUP_READ, 'r'),
        bit(PERM_GROUP_WRITE, 'w'),
        group_exec,
        bit(PERM_OTHER_READ, 'r'),
        bit(PERM_OTHER_WRITE, 'w'),
        other_exec,
    ]
    .iter()
    .collect()
}
