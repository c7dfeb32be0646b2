use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use log::{debug, info, trace, warn};

use super::codec::{compression, decoding};
use super::format::{comments, header};
use super::types::error::{DslError, Result};
use super::types::models::{CodePage, DslEncoding, DslHeader, DslLine, LineFeed};

const READ_BUFFER_SIZE: usize = 65536;

const LINE_FEED: u16 = 0x0A;
const CARRIAGE_RETURN: u16 = 0x0D;
const HEADER_MARKER: u16 = b'#' as u16;

/// Undecoded bytes of one physical line, without its terminator.
#[derive(Debug)]
struct RawLine {
    bytes: Vec<u8>,
    offset: u64,
}

/// Line-by-line reader for `.dsl` and `.dsl.dz` files.
///
/// Opening a scanner detects the encoding and consumes the `#`-header; reading
/// then starts at the first line after it. The scanner owns the underlying
/// stream and closes it when dropped. It is `Send` but keeps mutable cursor
/// state, so give each thread its own instance.
pub struct DslScanner {
    source: Box<dyn Read + Send>,
    encoding: DslEncoding,
    line_feed: Option<LineFeed>,
    header: DslHeader,

    buffer: Vec<u8>,
    buffer_pos: usize,
    buffer_len: usize,
    /// Stream offset of `buffer[0]`.
    buffer_offset: u64,
    source_exhausted: bool,

    /// First non-header line, read while scanning the header.
    pending: Option<RawLine>,
    /// A `{{` comment is open across physical lines.
    in_comment: bool,
    /// Pieces of a comment-joined line collected before a decoding error.
    partial: Option<DslLine>,
    lines_read: u32,
    end_reported: bool,
}

impl DslScanner {
    /// Opens a DSL file with automatic encoding detection.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_encoding(path, None)
    }

    /// Opens a DSL file, optionally overriding the detected encoding.
    ///
    /// Priority for determining text encoding (highest → lowest):
    /// 1. A byte-order mark in the file
    /// 2. `user_encoding` (explicit override provided by caller/CLI)
    /// 3. `#SOURCE_CODE_PAGE` declared in the header
    /// 4. UTF-8
    ///
    /// # Errors
    /// Returns an error if:
    /// - File cannot be opened or read
    /// - The stream is empty, has a broken byte-order mark, or has a header and nothing else
    /// - The header declares an unknown code page
    /// - A header line cannot be decoded
    pub fn open_with_encoding(path: impl AsRef<Path>, user_encoding: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening DSL file: {}", path.display());
        let file = File::open(path).map_err(|source| DslError::CantOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, user_encoding)
    }

    /// Builds a scanner over any byte source. Gzip input is detected by its magic bytes.
    pub fn from_reader<R: Read + Send + 'static>(reader: R, user_encoding: Option<&str>) -> Result<Self> {
        let mut scanner = Self {
            source: compression::open_stream(reader)?,
            encoding: DslEncoding::Utf8,
            line_feed: None,
            header: DslHeader::default(),
            buffer: vec![0; READ_BUFFER_SIZE],
            buffer_pos: 0,
            buffer_len: 0,
            buffer_offset: 0,
            source_exhausted: false,
            pending: None,
            in_comment: false,
            partial: None,
            lines_read: 0,
            end_reported: false,
        };

        // Step 1: Detect encoding from the first bytes
        while scanner.buffer_len < 4 && !scanner.source_exhausted {
            scanner.refill()?;
        }
        let detection = decoding::detect_encoding(&scanner.buffer[..scanner.buffer_len])?;
        scanner.encoding = detection.encoding;
        scanner.buffer_pos = detection.bom_len;

        // Step 2: Apply the caller's override unless a byte-order mark settled it
        let mut needs_code_page = detection.needs_code_page;
        if let Some(user_encoding) = user_encoding.and_then(decoding::parse_encoding) {
            if detection.bom_len == 0 {
                info!(
                    "Text encoding overridden: detected='{}', final='{}'",
                    detection.encoding.name(),
                    user_encoding.name()
                );
                scanner.encoding = user_encoding;
                needs_code_page = false;
            } else {
                warn!(
                    "Byte-order mark selects {}, ignoring encoding override '{}'",
                    detection.encoding.name(),
                    user_encoding.name()
                );
            }
        }

        // Step 3: Consume the header
        scanner.read_header(needs_code_page)?;

        info!(
            "DSL header parsed: name='{}', from='{}', to='{}', encoding={}",
            scanner.header.dictionary_name,
            scanner.header.lang_from,
            scanner.header.lang_to,
            scanner.encoding.name()
        );
        Ok(scanner)
    }

    /// Reads `#`-lines up to the first line that is not one, keeping that line pending.
    fn read_header(&mut self, needs_code_page: bool) -> Result<()> {
        let mut raw_lines = Vec::new();
        loop {
            let raw = self.read_raw_line()?.ok_or_else(|| {
                DslError::Malformed("the header is not followed by any article".to_string())
            })?;
            if decoding::unit_at(&raw.bytes, 0, self.encoding) != Some(HEADER_MARKER) {
                self.pending = Some(raw);
                break;
            }
            raw_lines.push(raw);
        }

        // The code page has to be known before header values can be decoded for real.
        let provisional: Vec<String> = raw_lines
            .iter()
            .map(|raw| decoding::decode_line_lossy(&raw.bytes, self.encoding))
            .collect();
        if let Some(name) = header::find_code_page(&provisional) {
            if needs_code_page {
                let code_page = CodePage::from_directive(&name)
                    .ok_or_else(|| DslError::UnknownCodePage(name.clone()))?;
                debug!("Header selects code page {:?}", code_page);
                self.encoding = DslEncoding::SingleByte(code_page);
            } else {
                warn!("Code page '{}' specified in a file with a known encoding, ignoring", name);
            }
        }

        let lines = raw_lines
            .iter()
            .enumerate()
            .map(|(index, raw)| decoding::decode_line(&raw.bytes, self.encoding, index as u32 + 1))
            .collect::<Result<Vec<_>>>()?;
        self.header = header::parse(&lines);
        Ok(())
    }

    /// Returns the detected encoding of this file.
    pub fn encoding(&self) -> DslEncoding {
        self.encoding
    }

    /// Line feed style seen on the first terminated line (`Lf` until one is seen).
    pub fn line_feed(&self) -> LineFeed {
        self.line_feed.unwrap_or_default()
    }

    pub fn header(&self) -> &DslHeader {
        &self.header
    }

    pub fn dictionary_name(&self) -> &str {
        &self.header.dictionary_name
    }

    pub fn lang_from(&self) -> &str {
        &self.header.lang_from
    }

    pub fn lang_to(&self) -> &str {
        &self.header.lang_to
    }

    pub fn sound_dictionary(&self) -> Option<&str> {
        self.header.sound_dictionary.as_deref()
    }

    /// Number of physical lines read so far, header lines included.
    pub fn lines_read(&self) -> u32 {
        self.lines_read
    }

    /// Converts a character count into the number of bytes it occupies in the file.
    ///
    /// Exact because DSL files never need variable-width sequences where
    /// offsets matter.
    pub fn distance_to_bytes(&self, chars: usize) -> usize {
        chars * self.encoding.unit_width()
    }

    /// Reads the next line.
    ///
    /// Returns `Ok(None)` at end of stream. With `only_headword`, lines that
    /// start with whitespace (article bodies) are decoded only up to the end
    /// of their first token; the stream still advances past the whole line.
    ///
    /// # Errors
    /// - [`DslError::Decoding`] if the line is invalid in the detected encoding;
    ///   the line is skipped and reading may continue
    /// - [`DslError::ReadPastEnd`] if end of stream was already reported
    pub fn read_next_line(&mut self, only_headword: bool) -> Result<Option<DslLine>> {
        if self.end_reported {
            return Err(DslError::ReadPastEnd);
        }
        let line = self.next_line(only_headword)?;
        self.end_reported = line.is_none();
        Ok(line)
    }

    /// Like [`read_next_line`](Self::read_next_line), with `{{...}}` comments removed.
    ///
    /// A comment left open at the end of a line swallows following lines
    /// until it is closed; the pieces outside comments are concatenated and
    /// the offset of the first physical line is reported.
    ///
    /// If a line inside an open comment fails to decode, the error is
    /// returned and the next call carries on inside the comment, appending to
    /// the pieces collected before the error.
    pub fn read_next_line_without_comments(&mut self, only_headword: bool) -> Result<Option<DslLine>> {
        if self.end_reported {
            return Err(DslError::ReadPastEnd);
        }

        loop {
            let Some(line) = self.next_line(only_headword)? else {
                if self.in_comment {
                    debug!("Comment still open at end of stream (line {})", self.lines_read);
                    self.in_comment = false;
                }
                let partial = self.partial.take();
                self.end_reported = partial.is_none();
                return Ok(partial);
            };

            let text = comments::strip_comments(&line.text, &mut self.in_comment);
            let joined = match self.partial.take() {
                Some(mut partial) => {
                    partial.text.push_str(&text);
                    partial
                }
                None => DslLine {
                    text,
                    offset: line.offset,
                },
            };

            if !self.in_comment {
                return Ok(Some(joined));
            }
            self.partial = Some(joined);
        }
    }

    /// Iterates over the remaining lines, stopping at end of stream.
    ///
    /// Decoding errors are yielded as items and iteration continues after them.
    pub fn lines(&mut self, strip_comments: bool) -> Lines<'_> {
        Lines {
            scanner: self,
            strip_comments,
            done: false,
        }
    }

    fn next_line(&mut self, only_headword: bool) -> Result<Option<DslLine>> {
        let raw = match self.pending.take() {
            Some(raw) => raw,
            None => match self.read_raw_line()? {
                Some(raw) => raw,
                None => return Ok(None),
            },
        };

        let len = if only_headword {
            decoding::headword_prefix_len(&raw.bytes, self.encoding)
        } else {
            raw.bytes.len()
        };
        let text = decoding::decode_line(&raw.bytes[..len], self.encoding, self.lines_read)?;

        Ok(Some(DslLine {
            text,
            offset: raw.offset,
        }))
    }

    /// Splits the next physical line off the read buffer, refilling it as needed.
    fn read_raw_line(&mut self) -> Result<Option<RawLine>> {
        let width = self.encoding.unit_width();
        let mut searched = 0;

        loop {
            let available = &self.buffer[self.buffer_pos..self.buffer_len];
            let found = decoding::find_unit(&available[searched..], LINE_FEED, self.encoding);
            let available_len = available.len();

            if let Some(index) = found {
                let start = self.buffer_pos;
                let end = start + searched + index;
                self.buffer_pos = end + width;
                return Ok(Some(self.take_line(start, end, true)));
            }

            if self.source_exhausted {
                if available_len == 0 {
                    return Ok(None);
                }
                let (start, end) = (self.buffer_pos, self.buffer_len);
                self.buffer_pos = end;
                return Ok(Some(self.take_line(start, end, false)));
            }

            // Whole units already searched stay valid after the buffer is compacted.
            searched = available_len - available_len % width;
            self.refill()?;
        }
    }

    fn take_line(&mut self, start: usize, mut end: usize, terminated: bool) -> RawLine {
        let width = self.encoding.unit_width();
        let has_cr = end >= start + width
            && decoding::unit_at(&self.buffer, end - width, self.encoding) == Some(CARRIAGE_RETURN);
        if has_cr {
            end -= width;
        }

        if terminated && self.line_feed.is_none() {
            let line_feed = if has_cr { LineFeed::CrLf } else { LineFeed::Lf };
            debug!("Detected line feed style {:?}", line_feed);
            self.line_feed = Some(line_feed);
        }

        self.lines_read += 1;
        RawLine {
            bytes: self.buffer[start..end].to_vec(),
            offset: self.buffer_offset + start as u64,
        }
    }

    /// Moves unread bytes to the front of the buffer and reads more from the source.
    ///
    /// The buffer grows when a single line does not fit into it.
    fn refill(&mut self) -> Result<()> {
        if self.buffer_pos > 0 {
            self.buffer.copy_within(self.buffer_pos..self.buffer_len, 0);
            self.buffer_offset += self.buffer_pos as u64;
            self.buffer_len -= self.buffer_pos;
            self.buffer_pos = 0;
        }
        if self.buffer_len == self.buffer.len() {
            self.buffer.resize(self.buffer.len() + READ_BUFFER_SIZE, 0);
        }

        let read = loop {
            match self.source.read(&mut self.buffer[self.buffer_len..]) {
                Ok(read) => break read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        if read == 0 {
            self.source_exhausted = true;
        } else {
            self.buffer_len += read;
        }
        trace!(
            "Read buffer refilled: +{} bytes, {} buffered at stream offset {}",
            read, self.buffer_len, self.buffer_offset
        );
        Ok(())
    }
}

/// Iterator over the lines of a [`DslScanner`].
///
/// Created by [`DslScanner::lines()`].
pub struct Lines<'a> {
    scanner: &'a mut DslScanner,
    strip_comments: bool,
    done: bool,
}

impl Iterator for Lines<'_> {
    type Item = Result<DslLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = if self.strip_comments {
            self.scanner.read_next_line_without_comments(false)
        } else {
            self.scanner.read_next_line(false)
        };

        match result {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) | Err(DslError::ReadPastEnd) => {
                self.done = true;
                None
            }
            Err(e) => Some(Err(e)),
        }
    }
}
