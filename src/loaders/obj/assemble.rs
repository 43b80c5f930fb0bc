use std::borrow::Cow;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{IndexError, ObjError, Warning};
use crate::options::{ObjLoadOptions, TriangulationMethod};

use super::command::Command;
use super::index::AttributeCounts;
use super::resolver::MaterialResolver;
use super::triangulate::triangulate;
use super::types::{Attributes, CornerIndex, Material, ObjSceneData, Shape};

/// Stable sort by line; warnings without a line go last.
pub(crate) fn sort_warnings(warnings: &mut [Warning]) {
    warnings.sort_by_key(|warning| warning.line.unwrap_or(usize::MAX));
}

pub(crate) fn push_warning(warnings: &mut Vec<Warning>, line: Option<usize>, message: String) {
    warn!(line = ?line, "{}", message);
    warnings.push(Warning::new(line, message));
}

/// Materials merged from every `mtllib`, looked up by name.
#[derive(Debug, Default)]
pub(crate) struct MaterialTable {
    pub materials: Vec<Material>,
    by_name: HashMap<String, usize>,
}

impl MaterialTable {
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Tries each file in turn and merges the first library that loads.
    /// Returns the index of the first merged material.
    pub fn load(
        &mut self,
        resolver: &mut dyn MaterialResolver,
        line: usize,
        files: &[Cow<'_, str>],
        warnings: &mut Vec<Warning>,
    ) -> usize {
        let first = self.materials.len();

        let library = files.iter().find_map(|file| match resolver.resolve(file) {
            Ok(library) => Some((file, library)),
            Err(error) => {
                push_warning(
                    warnings,
                    Some(line),
                    format!("failed to load material library '{}': {}", file, error),
                );
                None
            }
        });
        let Some((file, library)) = library else {
            push_warning(warnings, Some(line), "no material library could be loaded".into());
            return first;
        };

        for warning in library.warnings {
            push_warning(warnings, Some(line), format!("{}: {}", file, warning));
        }
        for material in library.materials {
            self.by_name
                .entry(material.name.clone())
                .or_insert(self.materials.len());
            self.materials.push(material);
        }
        debug!(
            line,
            file = %file,
            materials = self.materials.len() - first,
            "material library merged"
        );
        first
    }
}

/// Folds resolved commands, in file order, into a scene.
pub(crate) struct SceneBuilder<'r> {
    triangulate: bool,
    triangulation: TriangulationMethod,
    vertex_color: bool,
    resolver: Option<&'r mut dyn MaterialResolver>,

    attributes: Attributes,
    every_vertex_colored: bool,
    shapes: Vec<Shape>,
    current: Shape,
    materials: MaterialTable,
    material_id: Option<usize>,
    smoothing_group: u32,
    warnings: Vec<Warning>,
}

impl<'r> SceneBuilder<'r> {
    pub fn new(options: &ObjLoadOptions, resolver: Option<&'r mut dyn MaterialResolver>) -> Self {
        Self {
            triangulate: options.triangulate,
            triangulation: options.triangulation,
            vertex_color: options.vertex_color,
            resolver,
            attributes: Attributes::default(),
            every_vertex_colored: true,
            shapes: Vec::new(),
            current: Shape::default(),
            materials: MaterialTable::default(),
            material_id: None,
            smoothing_group: 0,
            warnings: Vec::new(),
        }
    }

    pub fn counts(&self) -> AttributeCounts {
        AttributeCounts {
            vertices: self.attributes.vertex_count(),
            normals: self.attributes.normal_count(),
            texcoords: self.attributes.texcoord_count(),
        }
    }

    pub fn warnings_mut(&mut self) -> &mut Vec<Warning> {
        &mut self.warnings
    }

    fn warn(&mut self, line: Option<usize>, message: String) {
        push_warning(&mut self.warnings, line, message);
    }

    pub fn apply(&mut self, line: usize, command: Command<'_, CornerIndex>) {
        match command {
            Command::Vertex {
                position,
                weight,
                color,
            } => {
                self.attributes.vertices.extend_from_slice(&position);
                self.attributes.vertex_weights.push(weight);
                self.every_vertex_colored &= color.is_some();
                self.attributes
                    .colors
                    .extend_from_slice(&color.unwrap_or([1.0; 3]));
            }
            Command::Normal(normal) => self.attributes.normals.extend_from_slice(&normal),
            Command::TexCoord([u, v, w]) => {
                self.attributes.texcoords.extend_from_slice(&[u, v]);
                self.attributes.texcoord_ws.push(w);
            }
            Command::Face(corners) => self.add_face(line, corners),
            Command::Line(corners) => {
                if corners.len() < 2 {
                    self.warn(Some(line), "line with fewer than 2 vertices skipped".into());
                    return;
                }
                let lines = &mut self.current.lines;
                lines.num_line_vertices.push(corners.len() as u32);
                lines.indices.extend(corners);
            }
            Command::Points(corners) => {
                if corners.is_empty() {
                    self.warn(Some(line), "point command without vertices skipped".into());
                    return;
                }
                self.current.points.indices.extend(corners);
            }
            Command::Group(names) => {
                let name = match names.into_iter().next() {
                    Some(name) => name.into_owned(),
                    None => {
                        self.warn(Some(line), "empty group name".into());
                        String::new()
                    }
                };
                self.open_shape(name);
            }
            Command::Object(name) => self.open_shape(name.into_owned()),
            Command::UseMtl(name) => {
                self.material_id = self.materials.lookup(&name);
                if self.material_id.is_none() {
                    self.warn(Some(line), format!("material '{}' not found", name));
                }
            }
            Command::MtlLib(files) => match self.resolver.as_deref_mut() {
                Some(resolver) => {
                    self.materials
                        .load(resolver, line, &files, &mut self.warnings);
                }
                None => debug!(line, "mtllib ignored without a material resolver"),
            },
            Command::Smoothing(id) => self.smoothing_group = id,
            Command::Tag(tag) => self.current.mesh.tags.push(tag),
        }
    }

    fn add_face(&mut self, line: usize, corners: Vec<CornerIndex>) {
        if corners.len() < 3 {
            self.warn(
                Some(line),
                format!("face with {} vertices skipped", corners.len()),
            );
            return;
        }

        let mesh = &mut self.current.mesh;
        if self.triangulate {
            for [a, b, c] in triangulate(&corners, &self.attributes.vertices, self.triangulation) {
                mesh.indices.extend([corners[a], corners[b], corners[c]]);
                mesh.num_face_vertices.push(3);
                mesh.material_ids.push(self.material_id);
                mesh.smoothing_group_ids.push(self.smoothing_group);
            }
        } else {
            mesh.num_face_vertices.push(corners.len() as u32);
            mesh.material_ids.push(self.material_id);
            mesh.smoothing_group_ids.push(self.smoothing_group);
            mesh.indices.extend(corners);
        }
    }

    fn close_shape(&mut self) {
        let shape = std::mem::take(&mut self.current);
        if shape.has_primitives() {
            self.shapes.push(shape);
        }
    }

    fn open_shape(&mut self, name: String) {
        self.close_shape();
        self.current.name = name;
    }

    /// Converts a resolution failure, attaching every warning gathered so far.
    pub fn fail(mut self, error: IndexError) -> ObjError {
        sort_warnings(&mut self.warnings);
        error.into_obj_error(self.warnings)
    }

    pub fn finish(mut self) -> ObjSceneData {
        self.close_shape();
        if !self.vertex_color && !self.every_vertex_colored {
            self.attributes.colors.clear();
        }
        sort_warnings(&mut self.warnings);

        ObjSceneData {
            attributes: self.attributes,
            shapes: self.shapes,
            materials: self.materials.materials,
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SceneBuilder;
    use crate::loaders::obj::command::parse_line;
    use crate::loaders::obj::resolver::MaterialTextResolver;
    use crate::loaders::obj::types::ObjSceneData;
    use crate::options::ObjLoadOptions;

    fn build(text: &str, options: &ObjLoadOptions) -> ObjSceneData {
        let mut resolver = MaterialTextResolver::new("newmtl red\nKd 1 0 0\nnewmtl blue\n");
        let mut builder = SceneBuilder::new(options, Some(&mut resolver));
        for (number, line) in text.lines().enumerate() {
            if let Some(command) = parse_line(line.as_bytes()) {
                let counts = builder.counts();
                let resolved = command
                    .resolve(counts, number + 1, line.as_bytes(), builder.warnings_mut())
                    .unwrap();
                builder.apply(number + 1, resolved);
            }
        }
        builder.finish()
    }

    const QUADS: &str = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n";

    #[test]
    fn group_without_faces_creates_no_shape() {
        let scene = build(
            &format!("{}g empty\ng filled\nf 1 2 3\no\n", QUADS),
            &ObjLoadOptions::default(),
        );
        assert_eq!(scene.shapes.len(), 1);
        assert_eq!(scene.shapes[0].name, "filled");
        assert_eq!(scene.shapes[0].face_count(), 1);
    }

    #[test]
    fn faces_before_any_group_form_an_unnamed_shape() {
        let scene = build(&format!("{}f 1 2 3 4\ng next\nf 1 2 3\n", QUADS), &Default::default());
        assert_eq!(scene.shapes.len(), 2);
        assert_eq!(scene.shapes[0].name, "");
        assert_eq!(scene.shapes[0].face_count(), 2);
        assert_eq!(scene.shapes[1].name, "next");
    }

    #[test]
    fn quads_stay_whole_without_triangulation() {
        let options = ObjLoadOptions {
            triangulate: false,
            ..Default::default()
        };
        let scene = build(&format!("{}f 1 2 3 4\n", QUADS), &options);
        let mesh = &scene.shapes[0].mesh;
        assert_eq!(mesh.num_face_vertices, vec![4]);
        assert_eq!(mesh.indices.len(), 4);
    }

    #[test]
    fn material_ids_follow_usemtl_across_shapes() {
        let scene = build(
            &format!(
                "mtllib any.mtl\n{}usemtl blue\nf 1 2 3\ng second\nf 1 3 4\nusemtl missing\nf 2 3 4\n",
                QUADS
            ),
            &Default::default(),
        );

        assert_eq!(scene.materials.len(), 2);
        assert_eq!(scene.shapes[0].mesh.material_ids, vec![Some(1)]);
        assert_eq!(scene.shapes[1].mesh.material_ids, vec![Some(1), None]);
        assert_eq!(scene.warnings.len(), 1);
        assert_eq!(scene.warnings[0].line, Some(10));
    }

    #[test]
    fn short_faces_and_empty_groups_are_warnings() {
        let scene = build(&format!("{}f 1 2\ng\nf 1 2 3\n", QUADS), &Default::default());
        assert_eq!(scene.shapes.len(), 1);
        assert_eq!(scene.warnings.len(), 2);
        assert_eq!(scene.warnings[0].line, Some(5));
        assert_eq!(scene.warnings[1].line, Some(6));
    }

    #[test]
    fn vertex_colors_are_kept_only_when_complete_or_filled() {
        let text = "v 0 0 0 1 0 0\nv 1 0 0\nv 0 1 0 0 0 1\nf 1 2 3\n";

        let filled = build(text, &Default::default());
        assert_eq!(filled.attributes.colors.len(), 9);
        assert_eq!(&filled.attributes.colors[3..6], &[1.0, 1.0, 1.0]);

        let strict = build(
            text,
            &ObjLoadOptions {
                vertex_color: false,
                ..Default::default()
            },
        );
        assert!(strict.attributes.colors.is_empty());
    }

    #[test]
    fn lines_points_and_tags_belong_to_the_open_shape() {
        let scene = build(
            &format!("{}o wire\nt crease 1/0/0 7\nl 1 2 3\np 4\ns 2\nf 1 2 3\n", QUADS),
            &Default::default(),
        );
        let shape = &scene.shapes[0];
        assert_eq!(shape.name, "wire");
        assert_eq!(shape.lines.num_line_vertices, vec![3]);
        assert_eq!(shape.points.indices.len(), 1);
        assert_eq!(shape.mesh.tags[0].int_values, vec![7]);
        assert_eq!(shape.mesh.smoothing_group_ids, vec![2]);
    }
}
