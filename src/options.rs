use std::path::PathBuf;

/// Hard cap on parser workers, independent of the hardware.
pub const MAX_THREADS: usize = 256;

/// How polygons with more than three corners are split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriangulationMethod {
    /// `(c0, ci, ci+1)` fan anchored at the first corner.
    #[default]
    Fan,
    /// Ear clipping on the polygon's dominant plane, fan when it cannot clip.
    EarClip,
}

#[derive(Debug, Clone)]
pub struct ObjLoadOptions {
    pub triangulate: bool,
    pub triangulation: TriangulationMethod,
    /// Worker count for the chunked parser. `0` uses the hardware parallelism.
    pub threads: usize,
    /// Fill colors of vertices that declare none with white.
    pub vertex_color: bool,
    /// Directory searched for `mtllib` files. Defaults to the OBJ file's directory.
    pub mtl_search_path: Option<PathBuf>,
}

impl Default for ObjLoadOptions {
    fn default() -> Self {
        Self {
            triangulate: true,
            triangulation: TriangulationMethod::Fan,
            threads: 1,
            vertex_color: true,
            mtl_search_path: None,
        }
    }
}

impl ObjLoadOptions {
    /// Number of workers actually used for a buffer of `len` bytes.
    pub fn effective_threads(&self, len: usize) -> usize {
        let hardware = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let requested = if self.threads == 0 {
            hardware
        } else {
            self.threads
        };

        requested
            .min(hardware)
            .min(MAX_THREADS)
            .min(len.max(1))
            .max(1)
    }
}
