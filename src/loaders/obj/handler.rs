use tracing::debug;

use crate::error::{ObjError, ObjResult, Warning};

use super::assemble::{push_warning, sort_warnings, MaterialTable};
use super::command::{parse_line, Command};
use super::index::RawCorner;
use super::lines::split_lines;
use super::parse_obj::has_content;
use super::resolver::MaterialResolver;
use super::types::{Material, Real};

/// Receives OBJ content line by line, in file order, without building a scene.
///
/// Face corners are passed as written: 1-based or negative, never resolved.
pub trait ObjHandler {
    fn on_vertex(&mut self, _position: [Real; 3], _weight: Real, _color: Option<[Real; 3]>) {}

    fn on_normal(&mut self, _normal: [Real; 3]) {}

    /// u, v, w
    fn on_texcoord(&mut self, _texcoord: [Real; 3]) {}

    fn on_face(&mut self, _corners: &[RawCorner]) {}

    /// `material_id` is `None` when no loaded library defines `name`.
    fn on_usemtl(&mut self, _name: &str, _material_id: Option<usize>) {}

    /// Materials merged by one `mtllib` line.
    fn on_mtllib(&mut self, _materials: &[Material]) {}

    fn on_group(&mut self, _names: &[&str]) {}

    fn on_object(&mut self, _name: &str) {}
}

/// Streams `buf` through `handler`. Returns the warnings, sorted by line.
pub fn parse_obj_with_handler<H: ObjHandler>(
    buf: &[u8],
    handler: &mut H,
    mut resolver: Option<&mut dyn MaterialResolver>,
) -> ObjResult<Vec<Warning>> {
    let spans = split_lines(buf);
    if !has_content(buf, &spans) {
        return Err(ObjError::EmptyInput);
    }

    let mut materials = MaterialTable::default();
    let mut warnings = Vec::new();

    for span in &spans {
        let Some(command) = parse_line(span.bytes(buf)) else {
            continue;
        };
        let line = span.line_number;

        match command {
            Command::Vertex {
                position,
                weight,
                color,
            } => handler.on_vertex(position, weight, color),
            Command::Normal(normal) => handler.on_normal(normal),
            Command::TexCoord(texcoord) => handler.on_texcoord(texcoord),
            Command::Face(corners) => handler.on_face(&corners),
            Command::UseMtl(name) => {
                let material_id = materials.lookup(&name);
                if material_id.is_none() {
                    push_warning(
                        &mut warnings,
                        Some(line),
                        format!("material '{}' not found", name),
                    );
                }
                handler.on_usemtl(&name, material_id);
            }
            Command::MtlLib(files) => match resolver.as_deref_mut() {
                Some(resolver) => {
                    let first = materials.load(resolver, line, &files, &mut warnings);
                    handler.on_mtllib(&materials.materials[first..]);
                }
                None => debug!(line, "mtllib ignored without a material resolver"),
            },
            Command::Group(names) => {
                let names: Vec<&str> = names.iter().map(|name| &**name).collect();
                handler.on_group(&names);
            }
            Command::Object(name) => handler.on_object(&name),
            Command::Line(_) | Command::Points(_) | Command::Smoothing(_) | Command::Tag(_) => {}
        }
    }

    sort_warnings(&mut warnings);
    Ok(warnings)
}
