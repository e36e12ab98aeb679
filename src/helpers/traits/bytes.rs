/// Request bytes split into their three wire sections, before decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRequest {
    pub request_line: String,
    pub header_lines: Vec<String>,
    pub body: String,
}

pub trait SplitRequest {
    fn tokenize(&self) -> Option<RawRequest>;
}

impl SplitRequest for &[u8] {
    /// Splits accumulated connection bytes on `\n` into a request line,
    /// header lines, and body. The header block ends at the first line that
    /// is empty once its trailing `\r` is stripped; lines past that, joined
    /// back with `\n`, are the body. A stream with no boundary line is
    /// tolerated: everything after line 0 counts as headers and the body is
    /// empty. Returns `None` only when there is no line at all.
    fn tokenize(&self) -> Option<RawRequest> {
        if self.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(self);
        let lines: Vec<&str> = text.split('\n').collect();

        let request_line = lines[0].trim_end_matches('\r').to_owned();

        let mut boundary = None;
        for (index, line) in lines.iter().enumerate().skip(1) {
            if line.trim_end_matches('\r').is_empty() {
                boundary = Some(index);
                break;
            }
        }

        let header_end = boundary.unwrap_or(lines.len());
        let header_lines = lines[1..header_end]
            .iter()
            .map(|line| line.trim_end_matches('\r').to_owned())
            .collect();

        let body = match boundary {
            Some(index) if index + 1 < lines.len() => lines[index + 1..].join("\n"),
            _ => String::new(),
        };

        Some(RawRequest {
            request_line,
            header_lines,
            body,
        })
    }
}
