/// Byte range of one non-empty line, terminator excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
    /// 1-based physical line number. Chunk-local and 0-based until rebased.
    pub line_number: usize,
}

impl LineSpan {
    pub fn bytes<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start..self.end]
    }
}

/// Line spans found by one worker, plus the terminator count of its chunk.
#[derive(Debug, Default, Clone)]
pub struct ChunkLines {
    pub spans: Vec<LineSpan>,
    pub terminators: usize,
}

/// `\0`, `\n`, or a `\r` that is not the first half of `\r\n`.
pub fn is_line_ending(buf: &[u8], i: usize) -> bool {
    match buf[i] {
        0 | b'\n' => true,
        b'\r' => buf.get(i + 1) != Some(&b'\n'),
        _ => false,
    }
}

fn make_span(buf: &[u8], start: usize, end: usize, line_number: usize) -> Option<LineSpan> {
    let mut end = end;
    if end > start && buf[end - 1] == b'\r' {
        end -= 1;
    }

    (end > start).then_some(LineSpan {
        start,
        end,
        line_number,
    })
}

pub fn split_lines(buf: &[u8]) -> Vec<LineSpan> {
    let mut spans = Vec::with_capacity(buf.len() / 32);
    let mut line_number = 1;
    let mut start = 0;

    for i in 0..buf.len() {
        if is_line_ending(buf, i) {
            spans.extend(make_span(buf, start, i, line_number));
            line_number += 1;
            start = i + 1;
        }
    }
    spans.extend(make_span(buf, start, buf.len(), line_number));

    spans
}

pub fn chunk_bounds(len: usize, chunk: usize, chunk_count: usize) -> (usize, usize) {
    let size = len / chunk_count;
    let start = chunk * size;
    let end = if chunk + 1 == chunk_count {
        len
    } else {
        start + size
    };
    (start, end)
}

/// Splits chunk `chunk` of `chunk_count` equal parts of `buf`.
///
/// The worker owns every line that starts inside its chunk. A partial line at
/// the chunk start belongs to the previous chunk and is skipped; the last owned
/// line is followed past the chunk end to its terminator. Line numbers in the
/// result count terminators from the chunk start and must be rebased with the
/// terminator totals of the preceding chunks.
pub fn split_chunk(buf: &[u8], chunk: usize, chunk_count: usize) -> ChunkLines {
    let (start, end) = chunk_bounds(buf.len(), chunk, chunk_count);
    let mut lines = ChunkLines {
        spans: Vec::with_capacity((end - start) / 32),
        terminators: 0,
    };

    let mut line_start = (start == 0 || is_line_ending(buf, start - 1)).then_some(start);

    for i in start..end {
        if is_line_ending(buf, i) {
            if let Some(owned_start) = line_start {
                lines
                    .spans
                    .extend(make_span(buf, owned_start, i, lines.terminators));
            }
            lines.terminators += 1;
            line_start = Some(i + 1);
        }
    }

    if let Some(owned_start) = line_start.filter(|&s| s < end) {
        let stop = (end..buf.len())
            .find(|&i| is_line_ending(buf, i))
            .unwrap_or(buf.len());
        lines
            .spans
            .extend(make_span(buf, owned_start, stop, lines.terminators));
    }

    lines
}
