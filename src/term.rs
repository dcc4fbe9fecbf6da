//! Terminal capabilities.
//!
//! The session only needs five control sequences, named as in terminfo.
//! A [`Resolver`] maps a terminal type name onto them; [`resolve`] is a
//! small built-in table covering the ECMA-48 family.

/// Control sequences used for line editing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TermCaps {
    /// Move the cursor one column left
    pub cub1: &'static str,
    /// Delete the character under the cursor
    pub dch1: Option<&'static str>,
    /// Clear to end of line
    pub el: Option<&'static str>,
    /// Save cursor position
    pub sc: Option<&'static str>,
    /// Restore cursor position
    pub rc: Option<&'static str>,
}

impl TermCaps {
    /// Capabilities of a terminal that can only backspace.
    pub const DUMB: TermCaps = TermCaps {
        cub1: "\x08",
        dch1: None,
        el: None,
        sc: None,
        rc: None,
    };

    /// True when both save and restore are available.
    pub fn can_save(&self) -> bool {
        self.sc.is_some() && self.rc.is_some()
    }
}

/// Maps a terminal type name to its capabilities.
///
/// Returning `None` refuses the terminal; the session then fails to start.
pub type Resolver = fn(&str) -> Option<TermCaps>;

const XTERM: TermCaps = TermCaps {
    cub1: "\x08",
    dch1: Some("\x1b[P"),
    el: Some("\x1b[K"),
    sc: Some("\x1b7"),
    rc: Some("\x1b8"),
};

const VT100: TermCaps = TermCaps {
    cub1: "\x08",
    dch1: None,
    el: Some("\x1b[K"),
    sc: Some("\x1b7"),
    rc: Some("\x1b8"),
};

const ANSI: TermCaps = TermCaps {
    cub1: "\x1b[D",
    dch1: None,
    el: Some("\x1b[K"),
    sc: Some("\x1b[s"),
    rc: Some("\x1b[u"),
};

static TABLE: &[(&str, TermCaps)] = &[
    ("xterm", XTERM),
    ("screen", XTERM),
    ("tmux", XTERM),
    ("rxvt", XTERM),
    ("linux", XTERM),
    // vt2xx and later models have DCH; vt1xx terminals are treated as vt100
    ("vt2", XTERM),
    ("vt1", VT100),
    ("ansi", ANSI),
    ("dumb", TermCaps::DUMB),
];

/// Built-in resolver.
///
/// Matches by case-insensitive prefix, so `"XTERM-256COLOR"` resolves like
/// `"xterm"`. Unknown names get [`TermCaps::DUMB`].
pub fn resolve(name: &str) -> Option<TermCaps> {
    let caps = TABLE
        .iter()
        .find(|(prefix, _)| {
            name.len() >= prefix.len()
                && name.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
        })
        .map(|(_, caps)| *caps);

    Some(caps.unwrap_or(TermCaps::DUMB))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xterm_family() {
        let caps = resolve("xterm-256color").unwrap();
        assert_eq!(caps.dch1, Some("\x1b[P"));
        assert!(caps.can_save());
        assert_eq!(resolve("XTERM"), Some(caps));
        assert_eq!(resolve("screen.xterm-256color"), Some(caps));
    }

    #[test]
    fn test_vt100_has_no_dch1() {
        let caps = resolve("vt100").unwrap();
        assert_eq!(caps.cub1, "\x08");
        assert!(caps.dch1.is_none());
        assert_eq!(caps.el, Some("\x1b[K"));
    }

    #[test]
    fn test_vt_families_by_prefix() {
        for name in ["vt220", "vt220-8", "vt240", "VT220-8BIT"] {
            assert_eq!(resolve(name), Some(XTERM), "{}", name);
        }
        for name in ["vt100", "vt102", "vt125", "vt100-am"] {
            assert_eq!(resolve(name), Some(VT100), "{}", name);
        }
        assert_eq!(resolve("vt52"), Some(TermCaps::DUMB));
    }

    #[test]
    fn test_ansi() {
        assert_eq!(resolve("ansi").unwrap().cub1, "\x1b[D");
    }

    #[test]
    fn test_unknown_is_dumb() {
        assert_eq!(resolve("unknown"), Some(TermCaps::DUMB));
        assert_eq!(resolve(""), Some(TermCaps::DUMB));
        assert!(!TermCaps::DUMB.can_save());
    }
}
