use std::borrow::Cow;

use crate::error::{IndexError, Warning};

use super::index::{parse_raw_corner, AttributeCounts, LineContext, RawCorner};
use super::scanner::{parse_leading_int, Scanner};
use super::types::{CornerIndex, Real, Tag};

const MAX_TAG_VALUES: i64 = 8192;

/// One meaningful OBJ line. `C` is [`RawCorner`] until indices are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Command<'a, C = RawCorner> {
    Vertex {
        position: [Real; 3],
        weight: Real,
        color: Option<[Real; 3]>,
    },
    Normal([Real; 3]),
    /// u, v, w
    TexCoord([Real; 3]),
    Face(Vec<C>),
    Line(Vec<C>),
    Points(Vec<C>),
    Group(Vec<Cow<'a, str>>),
    Object(Cow<'a, str>),
    UseMtl(Cow<'a, str>),
    MtlLib(Vec<Cow<'a, str>>),
    Smoothing(u32),
    Tag(Tag),
}

fn text(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

fn tokens<'a>(scanner: &mut Scanner<'a>) -> Vec<&'a [u8]> {
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token();
        if token.is_empty() {
            return tokens;
        }
        tokens.push(token);
    }
}

fn parse_vertex(scanner: &mut Scanner<'_>) -> Command<'static> {
    let position = [
        scanner.parse_real(0.0),
        scanner.parse_real(0.0),
        scanner.parse_real(0.0),
    ];

    let mut extras: [Real; 4] = [0.0; 4];
    let mut count = 0;
    while count < extras.len() {
        match scanner.try_parse_real() {
            Some(value) => {
                extras[count] = value;
                count += 1;
            }
            None => break,
        }
    }

    let (weight, color) = match count {
        1 | 2 => (extras[0], None),
        3 => (1.0, Some([extras[0], extras[1], extras[2]])),
        4 => (extras[0], Some([extras[1], extras[2], extras[3]])),
        _ => (1.0, None),
    };

    Command::Vertex {
        position,
        weight,
        color,
    }
}

fn parse_tag(scanner: &mut Scanner<'_>) -> Tag {
    let name = text(scanner.next_token()).into_owned();

    let mut sizes = scanner
        .next_token()
        .splitn(3, |&b| b == b'/')
        .map(parse_leading_int)
        .map(|n| n.clamp(0, MAX_TAG_VALUES) as usize);
    let ints = sizes.next().unwrap_or(0);
    let reals = sizes.next().unwrap_or(0);
    let strings = sizes.next().unwrap_or(0);

    Tag {
        name,
        int_values: (0..ints).map(|_| scanner.parse_int()).collect(),
        real_values: (0..reals).map(|_| scanner.parse_real(0.0)).collect(),
        string_values: (0..strings)
            .map(|_| text(scanner.next_token()).into_owned())
            .collect(),
    }
}

fn parse_smoothing(token: &[u8]) -> u32 {
    if token.starts_with(b"off") {
        return 0;
    }
    let id = parse_leading_int(token).max(0);
    u32::try_from(id).unwrap_or(u32::MAX)
}

/// Parses one line. Blank, comment and unrecognized lines yield `None`.
pub fn parse_line(line: &[u8]) -> Option<Command<'_>> {
    let mut scanner = Scanner::new(line);
    let keyword = scanner.next_token();

    let command = match keyword {
        b"v" => parse_vertex(&mut scanner),
        b"vn" => Command::Normal([
            scanner.parse_real(0.0),
            scanner.parse_real(0.0),
            scanner.parse_real(0.0),
        ]),
        b"vt" => Command::TexCoord([
            scanner.parse_real(0.0),
            scanner.parse_real(0.0),
            scanner.parse_real(0.0),
        ]),
        b"f" | b"l" | b"p" => {
            let corners: Vec<RawCorner> = tokens(&mut scanner)
                .into_iter()
                .map(parse_raw_corner)
                .collect();
            match keyword {
                b"f" => Command::Face(corners),
                b"l" => Command::Line(corners),
                _ => Command::Points(corners),
            }
        }
        b"g" => Command::Group(tokens(&mut scanner).into_iter().map(text).collect()),
        b"o" => Command::Object(text(scanner.rest())),
        b"usemtl" => Command::UseMtl(text(scanner.rest())),
        b"mtllib" => Command::MtlLib(tokens(&mut scanner).into_iter().map(text).collect()),
        b"s" => {
            let token = scanner.next_token();
            if token.is_empty() {
                return None;
            }
            Command::Smoothing(parse_smoothing(token))
        }
        b"t" => Command::Tag(parse_tag(&mut scanner)),
        _ => return None,
    };

    Some(command)
}

impl<'a> Command<'a> {
    /// Attribute totals after this command, given the totals before it.
    pub fn advance(&self, counts: &mut AttributeCounts) {
        match self {
            Command::Vertex { .. } => counts.vertices += 1,
            Command::Normal(_) => counts.normals += 1,
            Command::TexCoord(_) => counts.texcoords += 1,
            _ => {}
        }
    }

    /// Turns raw corners into 0-based indices valid for `counts`.
    ///
    /// Zero indices append a warning; the first out-of-range index aborts.
    pub(crate) fn resolve(
        self,
        counts: AttributeCounts,
        line: usize,
        content: &[u8],
        warnings: &mut Vec<Warning>,
    ) -> Result<Command<'a, CornerIndex>, IndexError> {
        let context = LineContext { line, content };
        let mut resolve_all = |corners: Vec<RawCorner>| {
            corners
                .into_iter()
                .map(|corner| context.resolve_corner(corner, counts, warnings))
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(match self {
            Command::Face(corners) => Command::Face(resolve_all(corners)?),
            Command::Line(corners) => Command::Line(resolve_all(corners)?),
            Command::Points(corners) => Command::Points(resolve_all(corners)?),
            Command::Vertex {
                position,
                weight,
                color,
            } => Command::Vertex {
                position,
                weight,
                color,
            },
            Command::Normal(normal) => Command::Normal(normal),
            Command::TexCoord(texcoord) => Command::TexCoord(texcoord),
            Command::Group(names) => Command::Group(names),
            Command::Object(name) => Command::Object(name),
            Command::UseMtl(name) => Command::UseMtl(name),
            Command::MtlLib(files) => Command::MtlLib(files),
            Command::Smoothing(id) => Command::Smoothing(id),
            Command::Tag(tag) => Command::Tag(tag),
        })
    }
}
