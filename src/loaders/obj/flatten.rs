use std::collections::{BTreeMap, HashMap};

use crate::error::{Attribute, ObjError, ObjResult};

use super::types::{Attributes, CornerIndex, Real, Shape};

/// Single-index triangle mesh for one material of a shape, ready for upload
/// to APIs that take one index per vertex.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IndexedMesh {
    pub positions: Vec<Real>,
    /// Zero for corners declared without a normal.
    pub normals: Vec<Real>,
    /// Empty unless every corner of the mesh has a texture coordinate.
    pub texcoords: Vec<Real>,
    pub indices: Vec<u32>,
    pub material_id: Option<usize>,
}

impl IndexedMesh {
    /// Splits a triangulated shape per material, merging identical
    /// `(vertex, texcoord, normal)` corners into one output vertex.
    ///
    /// Meshes come out ordered by material id, faces without material first.
    /// Corners pointing past `attributes` are rejected, so shapes edited by
    /// hand fail with [`ObjError::CornerOutOfRange`] instead of panicking.
    pub fn from_shape(shape: &Shape, attributes: &Attributes) -> ObjResult<Vec<IndexedMesh>> {
        let mesh = &shape.mesh;
        if let Some(&face_vertices) = mesh.num_face_vertices.iter().find(|&&n| n != 3) {
            return Err(ObjError::NotTriangulated {
                shape: shape.name.clone(),
                face_vertices,
            });
        }
        for corner in &mesh.indices {
            check_corner(shape, corner, attributes)?;
        }

        let mut material_faces: BTreeMap<Option<usize>, Vec<&[CornerIndex]>> = BTreeMap::new();
        for (face, corners) in mesh.indices.chunks_exact(3).enumerate() {
            let material_id = mesh.material_ids.get(face).copied().flatten();
            material_faces.entry(material_id).or_default().push(corners);
        }

        let meshes = material_faces
            .into_iter()
            .map(|(material_id, faces)| flatten_faces(material_id, &faces, attributes))
            .collect();
        Ok(meshes)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

fn check_corner(shape: &Shape, corner: &CornerIndex, attributes: &Attributes) -> ObjResult<()> {
    let checks = [
        (Attribute::Vertex, Some(corner.vertex_index), attributes.vertex_count()),
        (Attribute::Normal, corner.normal_index, attributes.normal_count()),
        (Attribute::Texcoord, corner.texcoord_index, attributes.texcoord_count()),
    ];
    for (attribute, index, count) in checks {
        if let Some(index) = index.filter(|&index| index >= count) {
            return Err(ObjError::CornerOutOfRange {
                shape: shape.name.clone(),
                attribute,
                index,
                count,
            });
        }
    }
    Ok(())
}

fn flatten_faces(
    material_id: Option<usize>,
    faces: &[&[CornerIndex]],
    attributes: &Attributes,
) -> IndexedMesh {
    let mut mesh = IndexedMesh {
        material_id,
        ..Default::default()
    };

    let mut vertex_map: HashMap<CornerIndex, u32> = HashMap::new();
    let mut vertex_texcoords: Vec<Option<[Real; 2]>> = Vec::new();

    for corner in faces.iter().flat_map(|face| face.iter()) {
        let next_index = vertex_map.len() as u32;
        let index = *vertex_map.entry(*corner).or_insert_with(|| {
            mesh.positions
                .extend_from_slice(&attributes.position(corner.vertex_index));
            let normal = corner
                .normal_index
                .map_or([0.0; 3], |normal| attributes.normal(normal));
            mesh.normals.extend_from_slice(&normal);
            vertex_texcoords.push(corner.texcoord_index.map(|uv| attributes.texcoord(uv)));
            next_index
        });
        mesh.indices.push(index);
    }

    if let Some(texcoords) = vertex_texcoords.into_iter().collect::<Option<Vec<_>>>() {
        mesh.texcoords = texcoords.into_iter().flatten().collect();
    }

    mesh
}
