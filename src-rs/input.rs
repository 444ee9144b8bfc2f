use crate::corners::{Corner, CornerActions};
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::fmt;
use std::io::{self, BufRead, Read};
use std::path::PathBuf;

/// Longest accepted line, newline included.
pub const MAX_LINE_BYTES: usize = 2048;
pub const DEFAULT_MAX_RECORDS: usize = 32;

const CORNER_PREFIXES: [(&[u8], Corner); 4] = [
    (b"@NW ", Corner::NorthWest),
    (b"@NE ", Corner::NorthEast),
    (b"@SW ", Corner::SouthWest),
    (b"@SE ", Corner::SouthEast),
];

/// What a cell shows: an image file or a literal text label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayRef {
    Path(PathBuf),
    Label(String),
}

impl DisplayRef {
    /// `"quoted"` references are labels; everything else is a file path.
    fn from_token(token: Vec<u8>) -> Self {
        match token
            .strip_prefix(b"\"")
            .and_then(|rest| rest.strip_suffix(b"\""))
        {
            Some(label) => DisplayRef::Label(String::from_utf8_lossy(label).into_owned()),
            None => DisplayRef::Path(path_from_bytes(token)),
        }
    }

    /// Printable form for logs and reports.
    pub fn describe(&self) -> Cow<'_, str> {
        match self {
            DisplayRef::Path(path) => path.to_string_lossy(),
            DisplayRef::Label(label) => Cow::Borrowed(label.as_str()),
        }
    }
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// One grid entry. `action` is emitted byte-for-byte and may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub display: DisplayRef,
    pub action: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    TooLong,
    MissingDelimiter,
    MalformedCorner,
    EmptyCorner(Corner),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub line: usize,
    pub kind: WarningKind,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self.line;
        match &self.kind {
            WarningKind::TooLong => {
                write!(f, "line {line}: longer than {MAX_LINE_BYTES} bytes, skipped")
            }
            WarningKind::MissingDelimiter => {
                write!(f, "line {line}: expected \"<image> <action>\", skipped")
            }
            WarningKind::MalformedCorner => write!(
                f,
                "line {line}: unknown corner directive (expected @NW, @NE, @SW or @SE), skipped"
            ),
            WarningKind::EmptyCorner(corner) => {
                write!(f, "line {line}: @{} has no action, ignored", corner.tag())
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedInput {
    pub records: Vec<Record>,
    pub corners: CornerActions,
    pub warnings: Vec<ParseWarning>,
}

enum Line {
    Skip,
    Record(Record),
    Corner(Corner, Vec<u8>),
}

/// Read records and corner directives until end of input or until
/// `max_records` records have been accepted. Bad lines are reported in
/// `warnings` and never abort the parse.
pub fn parse_input<R: BufRead>(mut reader: R, max_records: usize) -> Result<ParsedInput> {
    let mut parsed = ParsedInput::default();
    let mut buf = Vec::with_capacity(MAX_LINE_BYTES + 1);
    let mut line_no = 0;

    while parsed.records.len() < max_records {
        let Some(fits) = read_line(&mut reader, &mut buf).context("failed to read input line")?
        else {
            break;
        };
        line_no += 1;
        if !fits {
            warn(&mut parsed, line_no, WarningKind::TooLong);
            continue;
        }

        match parse_line(&buf) {
            Ok(Line::Skip) => {}
            Ok(Line::Record(record)) => parsed.records.push(record),
            Ok(Line::Corner(corner, action)) => {
                if action.is_empty() {
                    parsed.corners.set(corner, None);
                    warn(&mut parsed, line_no, WarningKind::EmptyCorner(corner));
                } else {
                    parsed.corners.set(corner, Some(action));
                }
            }
            Err(kind) => warn(&mut parsed, line_no, kind),
        }
    }

    log::debug!(
        "parsed {} record(s), {} corner override(s), {} warning(s)",
        parsed.records.len(),
        parsed.corners.iter().count(),
        parsed.warnings.len()
    );
    Ok(parsed)
}

/// Read one line into `buf`, holding at most `MAX_LINE_BYTES + 1` bytes.
/// Returns `None` at end of input and `Some(false)` when the line was too
/// long; the rest of such a line is consumed without being stored.
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<bool>> {
    buf.clear();
    let limit = (MAX_LINE_BYTES + 1) as u64;
    let read = reader.by_ref().take(limit).read_until(b'\n', buf)?;
    if read == 0 {
        return Ok(None);
    }
    if buf.len() <= MAX_LINE_BYTES {
        return Ok(Some(true));
    }
    if buf.last() != Some(&b'\n') {
        skip_rest_of_line(reader)?;
    }
    Ok(Some(false))
}

fn skip_rest_of_line<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

fn warn(parsed: &mut ParsedInput, line: usize, kind: WarningKind) {
    let warning = ParseWarning { line, kind };
    log::warn!("{warning}");
    parsed.warnings.push(warning);
}

fn skip_spaces(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != b' ').unwrap_or(bytes.len());
    &bytes[start..]
}

fn parse_line(raw: &[u8]) -> std::result::Result<Line, WarningKind> {
    let text = raw.strip_suffix(b"\n").unwrap_or(raw);
    let text = text.strip_suffix(b"\r").unwrap_or(text);
    if text.is_empty() {
        return Ok(Line::Skip);
    }

    let text = match text.iter().position(|&b| b == b'#') {
        Some(pos) => &text[..pos],
        None => text,
    };
    let text = skip_spaces(text);
    if text.is_empty() {
        return Ok(Line::Skip);
    }

    if text[0] == b'@' {
        return CORNER_PREFIXES
            .iter()
            .find_map(|(prefix, corner)| {
                text.strip_prefix(*prefix)
                    .map(|rest| Line::Corner(*corner, skip_spaces(rest).to_vec()))
            })
            .ok_or(WarningKind::MalformedCorner);
    }

    let Some(split) = text.iter().position(|&b| b == b' ') else {
        return Err(WarningKind::MissingDelimiter);
    };
    let reference = text[..split]
        .iter()
        .map(|&b| if b == b'_' { b' ' } else { b })
        .collect();

    Ok(Line::Record(Record {
        display: DisplayRef::from_token(reference),
        action: skip_spaces(&text[split..]).to_vec(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    fn parse(text: &str) -> ParsedInput {
        parse_input(Cursor::new(text.as_bytes().to_vec()), DEFAULT_MAX_RECORDS).unwrap()
    }

    #[test]
    fn corner_directive_sets_action() {
        let parsed = parse("@NW quit_now\n");
        assert_eq!(parsed.corners.get(Corner::NorthWest), Some(b"quit_now".as_slice()));
        assert!(parsed.records.is_empty());
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn underscores_in_reference_become_spaces() {
        let parsed = parse("my_pic.png select_a\n");
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(
            parsed.records[0].display,
            DisplayRef::Path(PathBuf::from("my pic.png"))
        );
        assert_eq!(parsed.records[0].action, b"select_a");
    }

    #[test]
    fn action_keeps_inner_spaces_and_underscores() {
        let parsed = parse("  term.png    xterm -e top_level  \n");
        assert_eq!(parsed.records[0].action, b"xterm -e top_level  ");
    }

    #[test]
    fn non_utf8_bytes_pass_through_unchanged() {
        let parsed = parse_input(Cursor::new(b"caf\xe9.png caf\xe9\n".to_vec()), 32).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.records[0].action, b"caf\xe9");
        #[cfg(unix)]
        {
            use std::os::unix::ffi::OsStrExt;
            let DisplayRef::Path(path) = &parsed.records[0].display else {
                panic!("expected a path");
            };
            assert_eq!(path.as_os_str().as_bytes(), b"caf\xe9.png");
        }
    }

    #[test]
    fn record_with_nothing_after_the_space_has_an_empty_action() {
        let parsed = parse("a.png # nothing\nb.png   \n");
        assert_eq!(parsed.records.len(), 2);
        assert!(parsed.records[0].action.is_empty());
        assert!(parsed.records[1].action.is_empty());
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn quoted_reference_is_a_label() {
        let parsed = parse("\"Web_Browser\" firefox\n");
        assert_eq!(
            parsed.records[0].display,
            DisplayRef::Label("Web Browser".to_string())
        );
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let parsed = parse("# header\n\n     \nfoo.png run_foo # trailing\n   # indented\n");
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].action, b"run_foo ");
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn line_without_space_is_skipped_with_warning() {
        let parsed = parse("lonely.png\nok.png go\n");
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].action, b"go");
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning { line: 1, kind: WarningKind::MissingDelimiter }]
        );
    }

    #[test]
    fn over_length_line_is_skipped_with_warning() {
        let long = format!("a.png {}\nb.png ok\n", "x".repeat(MAX_LINE_BYTES));
        let parsed = parse(&long);
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].action, b"ok");
        assert_eq!(parsed.warnings[0].kind, WarningKind::TooLong);
    }

    #[test]
    fn huge_line_is_discarded_without_losing_the_next_record() {
        let huge = io::repeat(b'x').take(8 * 1024 * 1024);
        let reader = io::BufReader::new(huge.chain(Cursor::new(b"\nb.png ok\n".to_vec())));
        let parsed = parse_input(reader, DEFAULT_MAX_RECORDS).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].action, b"ok");
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning { line: 1, kind: WarningKind::TooLong }]
        );
    }

    #[test]
    fn line_one_byte_over_limit_is_rejected() {
        let mut line = "a.png ".to_string();
        line.push_str(&"y".repeat(MAX_LINE_BYTES - line.len()));
        line.push('\n');
        assert_eq!(line.len(), MAX_LINE_BYTES + 1);
        line.push_str("c.png next\n");
        let parsed = parse(&line);
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].action, b"next");
        assert_eq!(parsed.warnings[0].line, 1);
    }

    #[test]
    fn line_at_exact_limit_is_accepted() {
        let mut line = "a.png ".to_string();
        line.push_str(&"y".repeat(MAX_LINE_BYTES - line.len() - 1));
        line.push('\n');
        assert_eq!(line.len(), MAX_LINE_BYTES);
        let parsed = parse(&line);
        assert_eq!(parsed.records.len(), 1);
    }

    #[test]
    fn malformed_and_empty_corners_warn_and_continue() {
        let parsed = parse("@XX nope\n@NWfoo\n@SE   \n@NE  lock \nz.png zz\n");
        assert_eq!(parsed.corners.get(Corner::SouthEast), None);
        assert_eq!(parsed.corners.get(Corner::NorthEast), Some(b"lock ".as_slice()));
        assert_eq!(parsed.records.len(), 1);
        let kinds: Vec<_> = parsed.warnings.iter().map(|w| w.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                WarningKind::MalformedCorner,
                WarningKind::MalformedCorner,
                WarningKind::EmptyCorner(Corner::SouthEast),
            ]
        );
    }

    #[test]
    fn corner_prefix_is_case_sensitive() {
        let parsed = parse("@nw lower\n");
        assert_eq!(parsed.corners.iter().count(), 0);
        assert_eq!(parsed.warnings[0].kind, WarningKind::MalformedCorner);
    }

    #[test]
    fn capacity_stops_the_parse() {
        let text: String = (0..33).map(|i| format!("img{i}.png act{i}\n")).collect();
        let parsed = parse(&text);
        assert_eq!(parsed.records.len(), 32);
        assert_eq!(parsed.records[31].action, b"act31");
    }

    #[test]
    fn custom_capacity_is_honoured() {
        let parsed = parse_input(Cursor::new(b"a x\nb y\nc z\n".to_vec()), 2).unwrap();
        assert_eq!(parsed.records.len(), 2);
    }

    #[test]
    fn last_line_without_newline_is_parsed() {
        let parsed = parse("a.png first\r\nb.png second");
        assert_eq!(parsed.records[0].action, b"first");
        assert_eq!(parsed.records[1].action, b"second");
    }

    #[test]
    fn reads_from_file() {
        use std::io::Write;
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "@SW shutdown").unwrap();
        writeln!(file, "shell.png xterm").unwrap();
        let reader = std::io::BufReader::new(std::fs::File::open(file.path()).unwrap());
        let parsed = parse_input(reader, DEFAULT_MAX_RECORDS).unwrap();
        assert_eq!(parsed.corners.get(Corner::SouthWest), Some(b"shutdown".as_slice()));
        assert_eq!(parsed.records[0].action, b"xterm");
    }
}
