pub mod error;
pub mod loaders;
pub mod options;

pub use error::{Attribute, ObjError, ObjResult, Warning};
pub use loaders::obj::{
    fan_triangulate, fix_index, load_mtl, load_obj, parse_mtl, parse_obj, parse_obj_with_handler,
    Attributes, CornerIndex, IndexedMesh, Material, MaterialFileResolver, MaterialLibrary,
    MaterialResolver, MaterialTextResolver, ObjHandler, ObjSceneData, RawCorner, Real, Shape,
};
pub use options::{ObjLoadOptions, TriangulationMethod};
