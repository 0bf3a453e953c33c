//! Loop bracket matching by scanning the instruction stream.
//!
//! There is no precomputed jump table: in unified memory the program can
//! rewrite itself or change length between two visits to the same bracket, so
//! every jump scans from where it stands. A scan costs the length of the
//! skipped region and happens on loop entry/exit, not on every iteration.

use crate::opcode::{LBRACKET, RBRACKET};

/// Find the `]` matching the `[` at `open`.
///
/// Returns `code.len()` when there is no match: the scan stops at the end of
/// the stream, which ends the run.
pub fn find_close(code: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, &b) in code.iter().enumerate().skip(open + 1) {
        match b {
            LBRACKET => depth += 1,
            RBRACKET if depth == 0 => return i,
            RBRACKET => depth -= 1,
            _ => {}
        }
    }
    code.len()
}

/// Find the `[` matching the `]` at `close`.
///
/// Returns `None` when the scan runs off the start of the stream; execution
/// then resumes from index 0.
pub fn find_open(code: &[u8], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..close.min(code.len())).rev() {
        match code[i] {
            RBRACKET => depth += 1,
            LBRACKET if depth == 0 => return Some(i),
            LBRACKET => depth -= 1,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_pair() {
        assert_eq!(find_close(b"[-]", 0), 2);
        assert_eq!(find_open(b"[-]", 2), Some(0));
    }

    #[test]
    fn test_nested() {
        let code = b"[[]+[]]";
        assert_eq!(find_close(code, 0), 6);
        assert_eq!(find_close(code, 1), 2);
        assert_eq!(find_close(code, 4), 5);
        assert_eq!(find_open(code, 6), Some(0));
        assert_eq!(find_open(code, 5), Some(4));
    }

    #[test]
    fn test_ignores_other_bytes() {
        let code = b"[a>b]c]";
        assert_eq!(find_close(code, 0), 4);
        assert_eq!(find_open(code, 4), Some(0));
    }

    #[test]
    fn test_unmatched_open_stops_at_end() {
        assert_eq!(find_close(b"[[]", 0), 3);
        assert_eq!(find_close(b"[", 0), 1);
    }

    #[test]
    fn test_unmatched_close_runs_off_start() {
        assert_eq!(find_open(b"+]", 1), None);
        assert_eq!(find_open(b"[]]", 2), None);
    }
}
