use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type ObjResult<T> = Result<T, ObjError>;

/// Index space a face corner points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Vertex,
    Normal,
    Texcoord,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Vertex => write!(f, "vertex"),
            Attribute::Normal => write!(f, "normal"),
            Attribute::Texcoord => write!(f, "texcoord"),
        }
    }
}

/// A recoverable anomaly. Parsing continued past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub line: Option<usize>,
    pub message: String,
}

impl Warning {
    pub fn new<S: Into<String>>(line: Option<usize>, message: S) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Error, Debug)]
pub enum ObjError {
    #[error("input contains no lines")]
    EmptyInput,

    #[error("line {line}: {attribute} index {raw} is out of range (count={count}) in '{content}'")]
    IndexOutOfRange {
        line: usize,
        attribute: Attribute,
        raw: i64,
        count: usize,
        content: String,
        warnings: Vec<Warning>,
    },

    #[error("shape '{shape}' has a face with {face_vertices} vertices; triangulate before flattening")]
    NotTriangulated { shape: String, face_vertices: u32 },

    #[error("shape '{shape}' refers to {attribute} {index}, but only {count} exist")]
    CornerOutOfRange {
        shape: String,
        attribute: Attribute,
        index: usize,
        count: usize,
    },

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ObjError {
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        ObjError::Io {
            path: path.into(),
            source,
        }
    }

    /// Diagnostics gathered before the failure, if the error carries any.
    pub fn warnings(&self) -> &[Warning] {
        match self {
            ObjError::IndexOutOfRange { warnings, .. } => warnings,
            _ => &[],
        }
    }
}

/// Index failure found during resolution, before warnings are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IndexError {
    pub line: usize,
    pub attribute: Attribute,
    pub raw: i64,
    pub count: usize,
    pub content: String,
}

impl IndexError {
    pub(crate) fn into_obj_error(self, warnings: Vec<Warning>) -> ObjError {
        ObjError::IndexOutOfRange {
            line: self.line,
            attribute: self.attribute,
            raw: self.raw,
            count: self.count,
            content: self.content,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Attribute, IndexError, ObjError, Warning};

    #[test]
    fn index_error_message_names_the_line_and_content() {
        let error = IndexError {
            line: 3,
            attribute: Attribute::Normal,
            raw: 7,
            count: 2,
            content: "f 1//7 2//1 3//1".to_string(),
        }
        .into_obj_error(vec![Warning::new(Some(1), "zero index")]);

        let message = error.to_string();
        assert!(message.contains("line 3"));
        assert!(message.contains("normal index 7"));
        assert!(message.contains("f 1//7 2//1 3//1"));
        assert_eq!(error.warnings().len(), 1);
    }

    #[test]
    fn warning_display_includes_line_when_known() {
        assert_eq!(
            Warning::new(Some(4), "empty group name").to_string(),
            "line 4: empty group name"
        );
        assert_eq!(Warning::new(None, "no mtl").to_string(), "no mtl");
        assert!(ObjError::EmptyInput.warnings().is_empty());
    }
}
