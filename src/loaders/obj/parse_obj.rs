use std::fs::{self, File};
use std::path::Path;

use tracing::debug;

use crate::error::{ObjError, ObjResult};
use crate::options::ObjLoadOptions;

use super::assemble::SceneBuilder;
use super::command::parse_line;
use super::lines::{split_lines, LineSpan};
use super::parallel::parse_parallel;
use super::resolver::{MaterialFileResolver, MaterialResolver};
use super::types::ObjSceneData;

/// Files above this size are memory-mapped instead of read.
const MMAP_THRESHOLD: u64 = 1024 * 1024;

pub(crate) fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| b.is_ascii_whitespace() || *b == 0)
}

pub(crate) fn has_content(buf: &[u8], spans: &[LineSpan]) -> bool {
    spans.iter().any(|span| !is_blank(span.bytes(buf)))
}

/// Parses an OBJ buffer into attributes, shapes and materials.
///
/// `mtllib` lines are handed to `resolver`; without one they are skipped.
/// More than one effective thread in `options` selects the chunked parser,
/// which produces the same scene as the sequential one.
pub fn parse_obj(
    buf: &[u8],
    resolver: Option<&mut dyn MaterialResolver>,
    options: &ObjLoadOptions,
) -> ObjResult<ObjSceneData> {
    let threads = options.effective_threads(buf.len());
    if threads > 1 {
        return parse_parallel(buf, resolver, options, threads);
    }
    parse_sequential(buf, resolver, options)
}

pub(crate) fn parse_sequential(
    buf: &[u8],
    resolver: Option<&mut dyn MaterialResolver>,
    options: &ObjLoadOptions,
) -> ObjResult<ObjSceneData> {
    let spans = split_lines(buf);
    if !has_content(buf, &spans) {
        return Err(ObjError::EmptyInput);
    }

    let mut builder = SceneBuilder::new(options, resolver);
    for span in &spans {
        let content = span.bytes(buf);
        let Some(command) = parse_line(content) else {
            continue;
        };

        let counts = builder.counts();
        match command.resolve(counts, span.line_number, content, builder.warnings_mut()) {
            Ok(resolved) => builder.apply(span.line_number, resolved),
            Err(error) => return Err(builder.fail(error)),
        }
    }

    let scene = builder.finish();
    debug!(
        lines = spans.len(),
        vertices = scene.attributes.vertex_count(),
        shapes = scene.shapes.len(),
        warnings = scene.warnings.len(),
        "parsed OBJ sequentially"
    );
    Ok(scene)
}

enum ObjSource {
    Mmap(memmap2::Mmap),
    Vec(Vec<u8>),
}

impl AsRef<[u8]> for ObjSource {
    fn as_ref(&self) -> &[u8] {
        match self {
            ObjSource::Mmap(mmap) => &mmap[..],
            ObjSource::Vec(vec) => vec.as_slice(),
        }
    }
}

fn read_source(path: &Path) -> ObjResult<ObjSource> {
    let size = fs::metadata(path).map_err(|e| ObjError::io(path, e))?.len();
    if size <= MMAP_THRESHOLD {
        let bytes = fs::read(path).map_err(|e| ObjError::io(path, e))?;
        return Ok(ObjSource::Vec(bytes));
    }

    debug!(path = %path.display(), size, "using mmap for large OBJ file");
    let file = File::open(path).map_err(|e| ObjError::io(path, e))?;
    // SAFETY: The file is opened read-only and we assume it won't be modified
    // while the map is alive. The map lives only for the duration of the parse.
    let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| ObjError::io(path, e))?;
    Ok(ObjSource::Mmap(mmap))
}

/// Loads an OBJ file, resolving `mtllib` against `options.mtl_search_path`
/// or, when unset, the directory holding the file.
pub fn load_obj<P: AsRef<Path>>(path: P, options: &ObjLoadOptions) -> ObjResult<ObjSceneData> {
    let path = path.as_ref();
    let search_path = match &options.mtl_search_path {
        Some(dir) => dir.clone(),
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    let source = read_source(path)?;
    let mut resolver = MaterialFileResolver::new(search_path);
    parse_obj(source.as_ref(), Some(&mut resolver), options)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{parse_obj, parse_sequential, read_source, ObjSource, MMAP_THRESHOLD};
    use crate::error::{Attribute, ObjError, ObjResult};
    use crate::loaders::obj::parallel::parse_parallel;
    use crate::loaders::obj::resolver::MaterialTextResolver;
    use crate::loaders::obj::types::{CornerIndex, MaterialLibrary, ObjSceneData};
    use crate::options::ObjLoadOptions;

    fn parse(text: &str) -> ObjResult<ObjSceneData> {
        parse_obj(text.as_bytes(), None, &ObjLoadOptions::default())
    }

    #[test]
    fn empty_and_whitespace_input_is_an_error() {
        assert!(matches!(parse(""), Err(ObjError::EmptyInput)));
        assert!(matches!(parse(" \n\t\r\n  "), Err(ObjError::EmptyInput)));
    }

    #[test]
    fn comment_only_input_yields_an_empty_scene() {
        let scene = parse("# nothing here\n").unwrap();
        assert!(scene.shapes.is_empty());
        assert_eq!(scene.attributes.vertex_count(), 0);
    }

    #[test]
    fn relative_index_may_repeat_a_corner() {
        let scene = parse("v 1 2 3\nv 4 5 6\nf 1 2 -1").unwrap();
        assert_eq!(scene.attributes.vertex_count(), 2);
        assert_eq!(
            scene.shapes[0].mesh.indices,
            vec![
                CornerIndex::vertex(0),
                CornerIndex::vertex(1),
                CornerIndex::vertex(1)
            ]
        );
    }

    #[test]
    fn quad_is_fanned_into_two_triangles() {
        let scene = parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n").unwrap();
        let vertices: Vec<usize> = scene.shapes[0]
            .mesh
            .indices
            .iter()
            .map(|corner| corner.vertex_index)
            .collect();
        assert_eq!(vertices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(scene.shapes[0].mesh.num_face_vertices, vec![3, 3]);
    }

    #[test]
    fn index_past_the_end_fails_with_context() {
        let error = parse("v 0 0 0\nf 0 1 1\nv 1 0 0\nf 1 2 3\n").unwrap_err();
        match &error {
            ObjError::IndexOutOfRange {
                line,
                attribute,
                raw,
                count,
                content,
                warnings,
            } => {
                assert_eq!(*line, 4);
                assert_eq!(*attribute, Attribute::Vertex);
                assert_eq!(*raw, 3);
                assert_eq!(*count, 2);
                assert_eq!(content, "f 1 2 3");
                assert_eq!(warnings.len(), 1);
                assert_eq!(warnings[0].line, Some(2));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn indices_resolve_against_counts_at_the_face_line() {
        let error = parse("v 0 0 0\nv 0 0 0\nf 1 2 3\nv 0 0 0\n").unwrap_err();
        assert!(matches!(error, ObjError::IndexOutOfRange { line: 3, .. }));
    }

    #[test]
    fn missing_normals_and_texcoords_stay_absent() {
        let scene = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2 3/\n").unwrap();
        let indices = &scene.shapes[0].mesh.indices;
        assert_eq!(indices[0].normal_index, Some(0));
        assert_eq!(indices[1].normal_index, None);
        assert_eq!(indices[2].texcoord_index, None);
    }

    #[test]
    fn materials_come_from_the_resolver() {
        let mut resolver = MaterialTextResolver::new("newmtl skin\nKd 0.5 0.5 0.5\n");
        let scene = parse_obj(
            b"mtllib skin.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl skin\nf 1 2 3\n",
            Some(&mut resolver),
            &ObjLoadOptions::default(),
        )
        .unwrap();

        assert_eq!(scene.materials.len(), 1);
        assert_eq!(scene.shapes[0].mesh.material_ids, vec![Some(0)]);
        assert!(scene.warnings.is_empty());
    }

    #[test]
    fn failing_resolver_is_only_a_warning() {
        let mut resolver = |name: &str| -> ObjResult<MaterialLibrary> {
            Err(ObjError::io(
                name,
                std::io::Error::new(std::io::ErrorKind::NotFound, "absent"),
            ))
        };
        let scene = parse_obj(
            b"mtllib a.mtl b.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl x\nf 1 2 3\n",
            Some(&mut resolver),
            &ObjLoadOptions::default(),
        )
        .unwrap();

        assert_eq!(scene.warnings.len(), 4);
        assert!(scene.warnings[0].message.contains("a.mtl"));
        assert!(scene.warnings[1].message.contains("b.mtl"));
        assert_eq!(scene.warnings[3].line, Some(5));
        assert_eq!(scene.shapes[0].mesh.material_ids, vec![None]);
    }

    #[test]
    fn corner_count_matches_fan_size_over_mixed_polygons() {
        let sizes = [3usize, 4, 5, 8, 3, 6];
        let mut text = String::new();
        for i in 0..8 {
            text.push_str(&format!("v {} {} 0\n", i % 3, i / 3));
        }
        for (i, &n) in sizes.iter().enumerate() {
            if i == 3 {
                text.push_str("g second\n");
            }
            text.push('f');
            for corner in 1..=n {
                text.push_str(&format!(" {}", corner));
            }
            text.push('\n');
        }

        let scene = parse(&text).unwrap();
        let corners: usize = scene.shapes.iter().map(|s| s.mesh.indices.len()).sum();
        let faces: usize = scene.shapes.iter().map(|s| s.face_count()).sum();
        let expected: usize = sizes.iter().map(|n| n - 2).sum();
        assert_eq!(faces, expected);
        assert_eq!(corners, 3 * expected);
    }

    fn grid_obj(size: usize) -> String {
        let mut text = String::from("mtllib grid.mtl\n");
        for y in 0..size {
            for x in 0..size {
                text.push_str(&format!("v {} {} 0\n", x, y));
            }
        }
        text.push_str("vn 0 0 1\n");
        for y in 0..size - 1 {
            text.push_str(if y % 2 == 0 { "usemtl even\n" } else { "usemtl odd\n" });
            for x in 0..size - 1 {
                let a = y * size + x + 1;
                text.push_str(&format!(
                    "f {}//1 {}//1 {}//1 {}//1\n",
                    a,
                    a + 1,
                    a + size + 1,
                    a + size
                ));
            }
        }
        text
    }

    #[test]
    fn large_files_are_mapped_and_parse_the_same_in_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.obj");
        let text = grid_obj(240);
        assert!(text.len() as u64 > MMAP_THRESHOLD);
        fs::write(&path, &text).unwrap();

        let source = read_source(&path).unwrap();
        assert!(matches!(source, ObjSource::Mmap(_)));
        let bytes: &[u8] = source.as_ref();
        assert_eq!(bytes, text.as_bytes());

        let materials = "newmtl even\nKd 1 1 1\nnewmtl odd\nKd 0 0 0\n";
        let mut resolver = MaterialTextResolver::new(materials);
        let expected = parse_sequential(bytes, Some(&mut resolver), &ObjLoadOptions::default())
            .unwrap();
        assert_eq!(expected.shapes[0].face_count(), 2 * 239 * 239);

        for threads in [2, 5] {
            let options = ObjLoadOptions {
                threads,
                ..Default::default()
            };
            let mut resolver = MaterialTextResolver::new(materials);
            let actual = parse_parallel(bytes, Some(&mut resolver), &options, threads).unwrap();
            assert_eq!(actual.attributes, expected.attributes);
            assert_eq!(actual.shapes, expected.shapes);
            assert_eq!(actual.materials, expected.materials);
            assert_eq!(actual.warnings, expected.warnings);
        }
    }

    #[test]
    fn small_files_are_read_into_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.obj");
        fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert!(matches!(read_source(&path).unwrap(), ObjSource::Vec(_)));
    }
}
