use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{IndexError, ObjError, ObjResult, Warning};
use crate::options::ObjLoadOptions;

use super::assemble::SceneBuilder;
use super::command::{parse_line, Command};
use super::index::AttributeCounts;
use super::lines::split_chunk;
use super::parse_obj::{is_blank, parse_sequential};
use super::resolver::MaterialResolver;
use super::types::{CornerIndex, ObjSceneData};

struct ParsedLine<'a> {
    /// Chunk-local, 0-based.
    line: usize,
    content: &'a [u8],
    command: Command<'a>,
}

struct ParsedChunk<'a> {
    lines: Vec<ParsedLine<'a>>,
    terminators: usize,
    counts: AttributeCounts,
    has_content: bool,
}

struct ResolvedChunk<'a> {
    commands: Vec<(usize, Command<'a, CornerIndex>)>,
    /// In line order.
    warnings: Vec<Warning>,
    error: Option<IndexError>,
}

fn parse_chunk(buf: &[u8], chunk: usize, chunk_count: usize) -> ParsedChunk<'_> {
    let split = split_chunk(buf, chunk, chunk_count);
    let mut counts = AttributeCounts::default();
    let mut has_content = false;

    let lines = split
        .spans
        .iter()
        .filter_map(|span| {
            let content = span.bytes(buf);
            has_content |= !is_blank(content);
            let command = parse_line(content)?;
            command.advance(&mut counts);
            Some(ParsedLine {
                line: span.line_number,
                content,
                command,
            })
        })
        .collect();

    ParsedChunk {
        lines,
        terminators: split.terminators,
        counts,
        has_content,
    }
}

fn resolve_chunk(
    chunk: ParsedChunk<'_>,
    line_base: usize,
    offset: AttributeCounts,
) -> ResolvedChunk<'_> {
    let mut local = AttributeCounts::default();
    let mut resolved = ResolvedChunk {
        commands: Vec::with_capacity(chunk.lines.len()),
        warnings: Vec::new(),
        error: None,
    };

    for ParsedLine {
        line,
        content,
        command,
    } in chunk.lines
    {
        let line = line_base + line;
        let counts = offset + local;
        command.advance(&mut local);

        match command.resolve(counts, line, content, &mut resolved.warnings) {
            Ok(command) => resolved.commands.push((line, command)),
            Err(error) => {
                resolved.error = Some(error);
                break;
            }
        }
    }

    resolved
}

/// Chunked parse on a dedicated pool of `threads` workers.
///
/// Workers split and parse their chunk, then resolve indices against prefix
/// offsets of the attribute counts. The results are replayed in chunk order
/// into the same builder the sequential path uses.
pub(crate) fn parse_parallel(
    buf: &[u8],
    resolver: Option<&mut dyn MaterialResolver>,
    options: &ObjLoadOptions,
    threads: usize,
) -> ObjResult<ObjSceneData> {
    let pool = match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool,
        Err(error) => {
            warn!(%error, "failed to build parser thread pool, parsing sequentially");
            return parse_sequential(buf, resolver, options);
        }
    };

    let started = Instant::now();
    let parsed: Vec<ParsedChunk<'_>> = pool.install(|| {
        (0..threads)
            .into_par_iter()
            .map(|chunk| parse_chunk(buf, chunk, threads))
            .collect()
    });
    let parse_time = started.elapsed();

    if !parsed.iter().any(|chunk| chunk.has_content) {
        return Err(ObjError::EmptyInput);
    }

    let mut line_bases = Vec::with_capacity(parsed.len());
    let mut offsets = Vec::with_capacity(parsed.len());
    let mut line_base = 1;
    let mut offset = AttributeCounts::default();
    for chunk in &parsed {
        line_bases.push(line_base);
        offsets.push(offset);
        line_base += chunk.terminators;
        offset = offset + chunk.counts;
    }

    let started = Instant::now();
    let resolved: Vec<ResolvedChunk<'_>> = pool.install(|| {
        parsed
            .into_par_iter()
            .zip(line_bases)
            .zip(offsets)
            .map(|((chunk, line_base), offset)| resolve_chunk(chunk, line_base, offset))
            .collect()
    });
    let resolve_time = started.elapsed();
    drop(pool);

    let started = Instant::now();
    let mut builder = SceneBuilder::new(options, resolver);
    for chunk in resolved {
        let mut warnings = chunk.warnings.into_iter().peekable();
        for (line, command) in chunk.commands {
            while let Some(warning) = warnings.next_if(|w| w.line.is_some_and(|l| l <= line)) {
                builder.warnings_mut().push(warning);
            }
            builder.apply(line, command);
        }
        builder.warnings_mut().extend(warnings);

        if let Some(error) = chunk.error {
            return Err(builder.fail(error));
        }
    }
    let scene = builder.finish();

    debug!(
        threads,
        vertices = scene.attributes.vertex_count(),
        shapes = scene.shapes.len(),
        warnings = scene.warnings.len(),
        parse_ms = parse_time.as_millis() as u64,
        resolve_ms = resolve_time.as_millis() as u64,
        merge_ms = started.elapsed().as_millis() as u64,
        "parsed OBJ in parallel"
    );
    Ok(scene)
}
