use std::collections::BTreeMap;

use crate::error::Warning;

#[cfg(not(feature = "double"))]
pub type Real = f32;
#[cfg(feature = "double")]
pub type Real = f64;

/// Flat attribute arrays shared by every shape of a scene.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Attributes {
    /// xyz per vertex.
    pub vertices: Vec<Real>,
    /// `w` per vertex, 1 when omitted.
    pub vertex_weights: Vec<Real>,
    /// xyz per normal.
    pub normals: Vec<Real>,
    /// uv per texture coordinate.
    pub texcoords: Vec<Real>,
    /// `w` per texture coordinate, 0 when omitted.
    pub texcoord_ws: Vec<Real>,
    /// rgb per vertex. Empty when colors were dropped.
    pub colors: Vec<Real>,
}

impl Attributes {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn normal_count(&self) -> usize {
        self.normals.len() / 3
    }

    pub fn texcoord_count(&self) -> usize {
        self.texcoords.len() / 2
    }

    /// # Panics
    ///
    /// If `index` is not below the matching `*_count`.
    pub fn position(&self, index: usize) -> [Real; 3] {
        let i = index * 3;
        [self.vertices[i], self.vertices[i + 1], self.vertices[i + 2]]
    }

    /// # Panics
    ///
    /// If `index` is not below the matching `*_count`.
    pub fn normal(&self, index: usize) -> [Real; 3] {
        let i = index * 3;
        [self.normals[i], self.normals[i + 1], self.normals[i + 2]]
    }

    /// # Panics
    ///
    /// If `index` is not below the matching `*_count`.
    pub fn texcoord(&self, index: usize) -> [Real; 2] {
        let i = index * 2;
        [self.texcoords[i], self.texcoords[i + 1]]
    }
}

/// One resolved face corner. Absent attributes are `None`, never a sentinel index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CornerIndex {
    pub vertex_index: usize,
    pub normal_index: Option<usize>,
    pub texcoord_index: Option<usize>,
}

impl CornerIndex {
    pub fn vertex(vertex_index: usize) -> Self {
        Self {
            vertex_index,
            normal_index: None,
            texcoord_index: None,
        }
    }
}

/// `t name i/r/s values...`
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub int_values: Vec<i64>,
    pub real_values: Vec<Real>,
    pub string_values: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Mesh {
    pub indices: Vec<CornerIndex>,
    /// Corner count per face; all 3 when triangulated.
    pub num_face_vertices: Vec<u32>,
    pub material_ids: Vec<Option<usize>>,
    pub smoothing_group_ids: Vec<u32>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Lines {
    pub indices: Vec<CornerIndex>,
    pub num_line_vertices: Vec<u32>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Points {
    pub indices: Vec<CornerIndex>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Shape {
    pub name: String,
    pub mesh: Mesh,
    pub lines: Lines,
    pub points: Points,
}

impl Shape {
    pub fn has_primitives(&self) -> bool {
        !self.mesh.num_face_vertices.is_empty()
            || !self.lines.num_line_vertices.is_empty()
            || !self.points.indices.is_empty()
    }

    pub fn face_count(&self) -> usize {
        self.mesh.num_face_vertices.len()
    }
}

/// `-type` of a reflection map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureType {
    #[default]
    None,
    Sphere,
    CubeTop,
    CubeBottom,
    CubeFront,
    CubeBack,
    CubeLeft,
    CubeRight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureOption {
    pub texture_type: TextureType,
    /// `-boost`
    pub sharpness: Real,
    /// `-mm` base value
    pub brightness: Real,
    /// `-mm` gain value
    pub contrast: Real,
    pub origin_offset: [Real; 3],
    pub scale: [Real; 3],
    pub turbulence: [Real; 3],
    pub clamp: bool,
    pub imfchan: char,
    pub blendu: bool,
    pub blendv: bool,
    /// `-bm`
    pub bump_multiplier: Real,
    pub colorspace: String,
}

impl TextureOption {
    pub fn new(is_bump: bool) -> Self {
        Self {
            texture_type: TextureType::None,
            sharpness: 1.0,
            brightness: 0.0,
            contrast: 1.0,
            origin_offset: [0.0; 3],
            scale: [1.0; 3],
            turbulence: [0.0; 3],
            clamp: false,
            imfchan: if is_bump { 'l' } else { 'm' },
            blendu: true,
            blendv: true,
            bump_multiplier: 1.0,
            colorspace: String::new(),
        }
    }
}

impl Default for TextureOption {
    fn default() -> Self {
        Self::new(false)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Texture {
    pub name: String,
    pub option: TextureOption,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,

    pub ambient: [Real; 3],
    pub diffuse: [Real; 3],
    pub specular: [Real; 3],
    pub transmittance: [Real; 3],
    pub emission: [Real; 3],
    pub shininess: Real,
    pub ior: Real,
    /// 1 is opaque.
    pub dissolve: Real,
    pub illum: i32,

    pub ambient_texture: Option<Texture>,
    pub diffuse_texture: Option<Texture>,
    pub specular_texture: Option<Texture>,
    pub specular_highlight_texture: Option<Texture>,
    pub bump_texture: Option<Texture>,
    pub displacement_texture: Option<Texture>,
    pub alpha_texture: Option<Texture>,
    pub reflection_texture: Option<Texture>,

    pub roughness: Real,
    pub metallic: Real,
    pub sheen: Real,
    pub clearcoat_thickness: Real,
    pub clearcoat_roughness: Real,
    pub anisotropy: Real,
    pub anisotropy_rotation: Real,

    pub roughness_texture: Option<Texture>,
    pub metallic_texture: Option<Texture>,
    pub sheen_texture: Option<Texture>,
    pub emissive_texture: Option<Texture>,
    pub normal_texture: Option<Texture>,

    pub unknown_parameters: BTreeMap<String, String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient: [0.0; 3],
            diffuse: [0.0; 3],
            specular: [0.0; 3],
            transmittance: [0.0; 3],
            emission: [0.0; 3],
            shininess: 1.0,
            ior: 1.0,
            dissolve: 1.0,
            illum: 0,
            ambient_texture: None,
            diffuse_texture: None,
            specular_texture: None,
            specular_highlight_texture: None,
            bump_texture: None,
            displacement_texture: None,
            alpha_texture: None,
            reflection_texture: None,
            roughness: 0.0,
            metallic: 0.0,
            sheen: 0.0,
            clearcoat_thickness: 0.0,
            clearcoat_roughness: 0.0,
            anisotropy: 0.0,
            anisotropy_rotation: 0.0,
            roughness_texture: None,
            metallic_texture: None,
            sheen_texture: None,
            emissive_texture: None,
            normal_texture: None,
            unknown_parameters: BTreeMap::new(),
        }
    }
}

/// Materials of one MTL source, in declaration order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MaterialLibrary {
    pub materials: Vec<Material>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Default, Clone)]
pub struct ObjSceneData {
    pub attributes: Attributes,
    pub shapes: Vec<Shape>,
    pub materials: Vec<Material>,
    /// Sorted by line; warnings without a line come last.
    pub warnings: Vec<Warning>,
}
