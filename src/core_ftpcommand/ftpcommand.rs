use std::cmp::Ordering;

/// Every verb the server recognizes. The X-prefixed RFC 775 aliases map to
/// the same handlers as their modern spellings.
#[derive(Clone, Copy, Eq, Hash, PartialEq, Debug)]
pub enum FtpCommand {
    ABOR,
    ALLO,
    APPE,
    CDUP,
    CWD,
    DELE,
    FEAT,
    HELP,
    LIST,
    MDTM,
    MKD,
    MLSD,
    MLST,
    MODE,
    NLST,
    NOOP,
    OPTS,
    PASS,
    PASV,
    PORT,
    PWD,
    QUIT,
    REST,
    RETR,
    RMD,
    RNFR,
    RNTO,
    SITE,
    SIZE,
    STAT,
    STOR,
    STOU,
    STRU,
    SYST,
    TYPE,
    USER,
}

/// Dispatch table, sorted by verb so lookup can binary-search it.
const COMMANDS: &[(&str, FtpCommand)] = &[
    ("ABOR", FtpCommand::ABOR),
    ("ALLO", FtpCommand::ALLO),
    ("APPE", FtpCommand::APPE),
    ("CDUP", FtpCommand::CDUP),
    ("CWD", FtpCommand::CWD),
    ("DELE", FtpCommand::DELE),
    ("FEAT", FtpCommand::FEAT),
    ("HELP", FtpCommand::HELP),
    ("LIST", FtpCommand::LIST),
    ("MDTM", FtpCommand::MDTM),
    ("MKD", FtpCommand::MKD),
    ("MLSD", FtpCommand::MLSD),
    ("MLST", FtpCommand::MLST),
    ("MODE", FtpCommand::MODE),
    ("NLST", FtpCommand::NLST),
    ("NOOP", FtpCommand::NOOP),
    ("OPTS", FtpCommand::OPTS),
    ("PASS", FtpCommand::PASS),
    ("PASV", FtpCommand::PASV),
    ("PORT", FtpCommand::PORT),
    ("PWD", FtpCommand::PWD),
    ("QUIT", FtpCommand::QUIT),
    ("REST", FtpCommand::REST),
    ("RETR", FtpCommand::RETR),
    ("RMD", FtpCommand::RMD),
    ("RNFR", FtpCommand::RNFR),
    ("RNTO", FtpCommand::RNTO),
    ("SITE", FtpCommand::SITE),
    ("SIZE", FtpCommand::SIZE),
    ("STAT", FtpCommand::STAT),
    ("STOR", FtpCommand::STOR),
    ("STOU", FtpCommand::STOU),
    ("STRU", FtpCommand::STRU),
    ("SYST", FtpCommand::SYST),
    ("TYPE", FtpCommand::TYPE),
    ("USER", FtpCommand::USER),
    ("XCUP", FtpCommand::CDUP),
    ("XCWD", FtpCommand::CWD),
    ("XMKD", FtpCommand::MKD),
    ("XPWD", FtpCommand::PWD),
    ("XRMD", FtpCommand::RMD),
];

/// Case-insensitive three-way comparison over byte slices; works for both
/// full strings and unterminated views.
pub fn compare_ignore_case(lhs: &str, rhs: &str) -> Ordering {
    let mut l = lhs.bytes().map(|b| b.to_ascii_lowercase());
    let mut r = rhs.bytes().map(|b| b.to_ascii_lowercase());

    loop {
        match (l.next(), r.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => match a.cmp(&b) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

impl FtpCommand {
    pub fn lookup(verb: &str) -> Option<FtpCommand> {
        COMMANDS
            .binary_search_by(|(name, _)| compare_ignore_case(name, verb))
            .ok()
            .map(|index| COMMANDS[index].1)
    }

    /// Commands that stay legal while a data transfer is in progress.
    pub fn allowed_during_transfer(self) -> bool {
        matches!(
            self,
            FtpCommand::ABOR
                | FtpCommand::NOOP
                | FtpCommand::PWD
                | FtpCommand::QUIT
                | FtpCommand::STAT
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        for pair in COMMANDS.windows(2) {
            assert!(
                compare_ignore_case(pair[0].0, pair[1].0) == Ordering::Less,
                "{} >= {}",
                pair[0].0,
                pair[1].0
            );
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(FtpCommand::lookup("retr"), Some(FtpCommand::RETR));
        assert_eq!(FtpCommand::lookup("ReTr"), Some(FtpCommand::RETR));
        assert_eq!(FtpCommand::lookup("XPWD"), Some(FtpCommand::PWD));
        assert_eq!(FtpCommand::lookup("NONSENSE"), None);
        assert_eq!(FtpCommand::lookup(""), None);
    }

    #[test]
    fn test_transfer_allowlist() {
        assert!(FtpCommand::ABOR.allowed_during_transfer());
        assert!(FtpCommand::STAT.allowed_during_transfer());
        assert!(!FtpCommand::RETR.allowed_during_transfer());
        assert!(!FtpCommand::CWD.allowed_during_transfer());
    }
}
