mod assemble;
mod command;
mod flatten;
mod handler;
mod index;
mod lines;
mod parallel;
mod parse_mtl;
mod parse_obj;
mod resolver;
mod scanner;
mod triangulate;
mod types;

pub use flatten::IndexedMesh;
pub use handler::{parse_obj_with_handler, ObjHandler};
pub use index::{fix_index, RawCorner};
pub use parse_mtl::{load_mtl, parse_mtl};
pub use parse_obj::{load_obj, parse_obj};
pub use resolver::{MaterialFileResolver, MaterialResolver, MaterialTextResolver};
pub use scanner::try_parse_double;
pub use triangulate::{ear_clip_face, fan_triangulate, TriangulationOutcome};
pub use types::{
    Attributes, CornerIndex, Lines, Material, MaterialLibrary, Mesh, ObjSceneData, Points, Real,
    Shape, Tag, Texture, TextureOption, TextureType,
};
