//! Formats one filesystem entry for LIST, NLST, STAT and the MLSx commands.

use crate::core_buffer::RingBuffer;
use chrono::{TimeZone, Utc};
use std::fmt::Write;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;

const S_IFMT: u32 = 0o170000;
const S_IFSOCK: u32 = 0o140000;
const S_IFLNK: u32 = 0o120000;
const S_IFREG: u32 = 0o100000;
const S_IFBLK: u32 = 0o060000;
const S_IFDIR: u32 = 0o040000;
const S_IFCHR: u32 = 0o020000;
const S_IFIFO: u32 = 0o010000;

const S_IRUSR: u32 = 0o400;
const S_IWUSR: u32 = 0o200;
const S_IXUSR: u32 = 0o100;

/// Half a year, the ls cutoff between "Mmm dd HH:MM" and "Mmm dd yyyy".
const SIX_MONTHS: i64 = 60 * 60 * 24 * 365 / 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum XferDirMode {
    List,
    Mlsd,
    Mlst,
    Nlst,
    Stat,
}

/// Which MLSx facts are currently enabled (OPTS MLST).
#[derive(Clone, Copy, Debug)]
pub struct MlstFacts {
    pub ty: bool,
    pub size: bool,
    pub modify: bool,
    pub perm: bool,
    pub unix_mode: bool,
}

impl Default for MlstFacts {
    fn default() -> Self {
        Self {
            ty: true,
            size: true,
            modify: true,
            perm: true,
            unix_mode: false,
        }
    }
}

/// The slice of stat output the formatter needs.
#[derive(Clone, Copy, Debug)]
pub struct DirentInfo {
    pub mode: u32,
    pub size: u64,
    pub mtime: i64,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u64,
}

impl DirentInfo {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            mode: metadata.mode(),
            size: metadata.size(),
            mtime: metadata.mtime(),
            uid: metadata.uid(),
            gid: metadata.gid(),
            nlink: metadata.nlink(),
        }
    }

    fn is_reg(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }
}

fn type_fact(info: &DirentInfo) -> &'static str {
    match info.mode & S_IFMT {
        S_IFREG => "file",
        S_IFDIR => "dir",
        S_IFLNK => "os.unix=symlink",
        S_IFCHR => "os.unix=character",
        S_IFBLK => "os.unix=block",
        S_IFIFO => "os.unix=fifo",
        S_IFSOCK => "os.unix=socket",
        _ => "???",
    }
}

fn type_char(info: &DirentInfo) -> char {
    match info.mode & S_IFMT {
        S_IFREG => '-',
        S_IFDIR => 'd',
        S_IFLNK => 'l',
        S_IFCHR => 'c',
        S_IFBLK => 'b',
        S_IFIFO => 'p',
        S_IFSOCK => 's',
        _ => '?',
    }
}

/// The Perm fact per RFC 3659 §7.5.5, derived from the owner mode bits.
fn perm_fact(info: &DirentInfo) -> String {
    let mut perm = String::new();

    // append
    if info.is_reg() && info.mode & S_IWUSR != 0 {
        perm.push('a');
    }
    // create-in
    if info.is_dir() && info.mode & S_IWUSR != 0 {
        perm.push('c');
    }
    // delete
    perm.push('d');
    // chdir
    if info.is_dir() && info.mode & S_IXUSR != 0 {
        perm.push('e');
    }
    // rename
    perm.push('f');
    // list
    if info.is_dir() && info.mode & S_IRUSR != 0 {
        perm.push('l');
    }
    // mkdir
    if info.is_dir() && info.mode & S_IWUSR != 0 {
        perm.push('m');
    }
    // purge
    if info.is_dir() && info.mode & S_IWUSR != 0 {
        perm.push('p');
    }
    // read
    if info.is_reg() && info.mode & S_IRUSR != 0 {
        perm.push('r');
    }
    // write
    if info.is_reg() && info.mode & S_IWUSR != 0 {
        perm.push('w');
    }

    perm
}

fn rwx_string(mode: u32) -> String {
    let mut out = String::with_capacity(9);
    for shift in [6u32, 3, 0] {
        let bits = mode >> shift;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

fn list_timestamp(mtime: i64, now: i64) -> String {
    let when = Utc
        .timestamp_opt(mtime, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap());

    // Recent entries show the clock time, old or future ones the year
    if now > mtime && now - mtime < SIX_MONTHS {
        when.format("%b %e %H:%M ").to_string()
    } else {
        when.format("%b %e %Y ").to_string()
    }
}

/// Render one directory entry the way the current listing mode wants it.
/// `type_override` substitutes the MLSx Type fact (used for `cdir`).
pub fn format_dirent(
    info: &DirentInfo,
    path: &str,
    mode: XferDirMode,
    facts: &MlstFacts,
    type_override: Option<&str>,
    now: i64,
) -> String {
    let mut line = String::new();

    match mode {
        XferDirMode::Mlsd | XferDirMode::Mlst => {
            if mode == XferDirMode::Mlst {
                // MLST facts sit inside a 250- multi-line reply
                line.push(' ');
            }

            if facts.ty {
                let ty = type_override.unwrap_or_else(|| type_fact(info));
                let _ = write!(line, "Type={};", ty);
            }
            if facts.size {
                let _ = write!(line, "Size={};", info.size);
            }
            if facts.modify {
                let when = Utc
                    .timestamp_opt(info.mtime, 0)
                    .single()
                    .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap());
                let _ = write!(line, "Modify={};", when.format("%Y%m%d%H%M%S"));
            }
            if facts.perm {
                let _ = write!(line, "Perm={};", perm_fact(info));
            }
            if facts.unix_mode {
                let _ = write!(line, "UNIX.mode=0{:o};", info.mode & 0o7777);
            }

            if !line.ends_with(' ') {
                line.push(' ');
            }
        }
        XferDirMode::List | XferDirMode::Stat => {
            if mode == XferDirMode::Stat {
                line.push(' ');
            }

            let _ = write!(
                line,
                "{}{} {} {} {} {} {}",
                type_char(info),
                rwx_string(info.mode),
                info.nlink,
                info.uid,
                info.gid,
                info.size,
                list_timestamp(info.mtime, now),
            );
        }
        XferDirMode::Nlst => {}
    }

    line.push_str(path);
    line.push_str("\r\n");
    line
}

/// Append a formatted entry to the staging buffer. Returns false when the
/// buffer has no room; the caller retries after the pending bytes drain.
pub fn fill_dirent(
    buffer: &mut RingBuffer,
    info: &DirentInfo,
    path: &str,
    mode: XferDirMode,
    facts: &MlstFacts,
    type_override: Option<&str>,
    now: i64,
) -> Option<usize> {
    let line = format_dirent(info, path, mode, facts, type_override, now);
    if buffer.push(line.as_bytes()) {
        Some(line.len())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular_file() -> DirentInfo {
        DirentInfo {
            mode: S_IFREG | 0o644,
            size: 1024,
            // 2024-01-15 12:00:00 UTC
            mtime: 1705320000,
            uid: 1000,
            gid: 100,
            nlink: 1,
        }
    }

    fn all_facts() -> MlstFacts {
        MlstFacts {
            ty: true,
            size: true,
            modify: true,
            perm: true,
            unix_mode: true,
        }
    }

    #[test]
    fn test_mlsd_line_for_regular_file() {
        let line = format_dirent(
            &regular_file(),
            "x",
            XferDirMode::Mlsd,
            &all_facts(),
            None,
            1705400000,
        );
        assert_eq!(
            line,
            "Type=file;Size=1024;Modify=20240115120000;Perm=adfrw;UNIX.mode=0644; x\r\n"
        );
    }

    #[test]
    fn test_mlst_line_has_leading_space() {
        let line = format_dirent(
            &regular_file(),
            "/x",
            XferDirMode::Mlst,
            &MlstFacts::default(),
            None,
            1705400000,
        );
        assert!(line.starts_with(" Type=file;"));
        assert!(!line.contains("UNIX.mode"), "{line}");
        assert!(line.ends_with(" /x\r\n"));
    }

    #[test]
    fn test_mlsd_respects_disabled_facts() {
        let facts = MlstFacts {
            ty: true,
            size: false,
            modify: false,
            perm: false,
            unix_mode: false,
        };
        let line = format_dirent(
            &regular_file(),
            "x",
            XferDirMode::Mlsd,
            &facts,
            None,
            1705400000,
        );
        assert_eq!(line, "Type=file; x\r\n");
    }

    #[test]
    fn test_cdir_type_override() {
        let dir = DirentInfo {
            mode: S_IFDIR | 0o755,
            ..regular_file()
        };
        let line = format_dirent(
            &dir,
            "/music",
            XferDirMode::Mlsd,
            &MlstFacts::default(),
            Some("cdir"),
            1705400000,
        );
        assert!(line.starts_with("Type=cdir;"), "{line}");
    }

    #[test]
    fn test_perm_fact_for_directory() {
        let dir = DirentInfo {
            mode: S_IFDIR | 0o755,
            ..regular_file()
        };
        assert_eq!(perm_fact(&dir), "cdeflmp");
    }

    #[test]
    fn test_list_line_recent_uses_clock() {
        let line = format_dirent(
            &regular_file(),
            "x",
            XferDirMode::List,
            &MlstFacts::default(),
            None,
            1705400000,
        );
        assert_eq!(line, "-rw-r--r-- 1 1000 100 1024 Jan 15 12:00 x\r\n");
    }

    #[test]
    fn test_list_line_old_uses_year() {
        let old = DirentInfo {
            mtime: 1577880000, // 2020-01-01 12:00:00 UTC
            ..regular_file()
        };
        let line = format_dirent(
            &old,
            "x",
            XferDirMode::List,
            &MlstFacts::default(),
            None,
            1705400000,
        );
        assert!(line.ends_with("Jan  1 2020 x\r\n"), "{line}");
    }

    #[test]
    fn test_future_mtime_uses_year() {
        let future = DirentInfo {
            mtime: 1705500000,
            ..regular_file()
        };
        let line = format_dirent(
            &future,
            "x",
            XferDirMode::List,
            &MlstFacts::default(),
            None,
            1705400000,
        );
        assert!(line.contains("2024 x"), "{line}");
    }

    #[test]
    fn test_nlst_is_bare_path() {
        let line = format_dirent(
            &regular_file(),
            "/a/b",
            XferDirMode::Nlst,
            &MlstFacts::default(),
            None,
            0,
        );
        assert_eq!(line, "/a/b\r\n");
    }

    #[test]
    fn test_fill_dirent_reports_full_buffer() {
        let mut buffer = RingBuffer::new(8);
        let ok = fill_dirent(
            &mut buffer,
            &regular_file(),
            "a-name-longer-than-the-buffer",
            XferDirMode::Nlst,
            &MlstFacts::default(),
            None,
            0,
        );
        assert!(ok.is_none());
        assert!(buffer.is_empty());
    }
}
