use crate::error::{Attribute, IndexError, Warning};

use super::scanner::parse_leading_int;
use super::types::CornerIndex;

/// Face corner as written: 1-based or relative, texcoord and normal optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCorner {
    pub vertex: i64,
    pub texcoord: Option<i64>,
    pub normal: Option<i64>,
}

/// Attribute totals at one logical position of the input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AttributeCounts {
    pub vertices: usize,
    pub normals: usize,
    pub texcoords: usize,
}

impl std::ops::Add for AttributeCounts {
    type Output = AttributeCounts;

    fn add(self, other: AttributeCounts) -> AttributeCounts {
        AttributeCounts {
            vertices: self.vertices + other.vertices,
            normals: self.normals + other.normals,
            texcoords: self.texcoords + other.texcoords,
        }
    }
}

/// Maps a 1-based (`i > 0`) or relative (`i < 0`) index to 0-based.
///
/// `0` is not a valid OBJ index; it maps to `0` and the caller records a
/// warning. The result may be negative for relative indices reaching before
/// the first element.
pub fn fix_index(index: i64, count: usize) -> i64 {
    match index {
        i if i > 0 => i - 1,
        0 => 0,
        i => count as i64 + i,
    }
}

/// Reads `i`, `i/j`, `i//k` or `i/j/k`. An empty field is absent.
pub fn parse_raw_corner(token: &[u8]) -> RawCorner {
    let mut fields = token.splitn(3, |&b| b == b'/');
    let vertex = parse_leading_int(fields.next().unwrap_or_default());
    let optional = |field: Option<&[u8]>| {
        field
            .filter(|f| !f.is_empty())
            .map(parse_leading_int)
    };
    let texcoord = optional(fields.next());
    let normal = optional(fields.next());

    RawCorner {
        vertex,
        texcoord,
        normal,
    }
}

/// Resolution context of one line.
pub(crate) struct LineContext<'l> {
    pub line: usize,
    pub content: &'l [u8],
}

impl LineContext<'_> {
    fn resolve(
        &self,
        raw: i64,
        count: usize,
        attribute: Attribute,
        warnings: &mut Vec<Warning>,
    ) -> Result<usize, IndexError> {
        if raw == 0 {
            warnings.push(Warning::new(
                Some(self.line),
                format!("{} index 0 is invalid; using the first {}", attribute, attribute),
            ));
        }

        let fixed = fix_index(raw, count);
        if fixed < 0 || fixed as usize >= count {
            return Err(IndexError {
                line: self.line,
                attribute,
                raw,
                count,
                content: String::from_utf8_lossy(self.content).into_owned(),
            });
        }

        Ok(fixed as usize)
    }

    pub fn resolve_corner(
        &self,
        corner: RawCorner,
        counts: AttributeCounts,
        warnings: &mut Vec<Warning>,
    ) -> Result<CornerIndex, IndexError> {
        let vertex_index = self.resolve(corner.vertex, counts.vertices, Attribute::Vertex, warnings)?;
        let texcoord_index = corner
            .texcoord
            .map(|raw| self.resolve(raw, counts.texcoords, Attribute::Texcoord, warnings))
            .transpose()?;
        let normal_index = corner
            .normal
            .map(|raw| self.resolve(raw, counts.normals, Attribute::Normal, warnings))
            .transpose()?;

        Ok(CornerIndex {
            vertex_index,
            normal_index,
            texcoord_index,
        })
    }
}
