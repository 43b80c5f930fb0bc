use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ObjError, ObjResult, Warning};

use super::lines::split_lines;
use super::scanner::{try_parse_double, Scanner};
use super::types::{Material, MaterialLibrary, Real, Texture, TextureOption, TextureType};

pub fn load_mtl(path: &Path) -> ObjResult<MaterialLibrary> {
    let buf = fs::read(path).map_err(|e| ObjError::io(path, e))?;
    let library = parse_mtl(&buf);
    debug!(
        path = %path.display(),
        materials = library.materials.len(),
        "loaded material library"
    );
    Ok(library)
}

/// Parses MTL text. Malformed values fall back to defaults; nothing here fails.
pub fn parse_mtl(buf: &[u8]) -> MaterialLibrary {
    let mut parser = MtlParser::default();
    for span in split_lines(buf) {
        parser.parse_line(span.line_number, span.bytes(buf));
    }
    parser.finish()
}

#[derive(Default)]
struct MtlParser {
    library: MaterialLibrary,
    material: Material,
    // Declarations before the first newmtl are dropped.
    in_material: bool,
    has_d: bool,
    has_tr: bool,
}

fn parse_real3(scanner: &mut Scanner<'_>) -> [Real; 3] {
    [
        scanner.parse_real(0.0),
        scanner.parse_real(0.0),
        scanner.parse_real(0.0),
    ]
}

impl MtlParser {
    fn warn(&mut self, line: usize, message: String) {
        warn!(line, "{}", message);
        self.library.warnings.push(Warning::new(Some(line), message));
    }

    fn flush(&mut self) {
        let material = std::mem::take(&mut self.material);
        if self.in_material {
            self.library.materials.push(material);
        }
        self.in_material = false;
        self.has_d = false;
        self.has_tr = false;
    }

    fn parse_line(&mut self, line: usize, bytes: &[u8]) {
        let mut scanner = Scanner::new(bytes);
        let keyword = scanner.next_token();
        if keyword.is_empty() || keyword.starts_with(b"#") {
            return;
        }

        if keyword == b"newmtl" {
            self.flush();
            self.material.name = String::from_utf8_lossy(scanner.rest()).into_owned();
            self.in_material = true;
            return;
        }

        let material = &mut self.material;
        match keyword {
            b"Ka" => material.ambient = parse_real3(&mut scanner),
            b"Kd" => material.diffuse = parse_real3(&mut scanner),
            b"Ks" => material.specular = parse_real3(&mut scanner),
            b"Kt" | b"Tf" => material.transmittance = parse_real3(&mut scanner),
            b"Ke" => material.emission = parse_real3(&mut scanner),
            b"Ni" => material.ior = scanner.parse_real(0.0),
            b"Ns" => material.shininess = scanner.parse_real(0.0),
            b"illum" => {
                let illum = scanner.parse_int().clamp(i32::MIN.into(), i32::MAX.into());
                material.illum = illum as i32;
            }
            b"d" => {
                material.dissolve = scanner.parse_real(0.0);
                if self.has_tr {
                    let name = material.name.clone();
                    self.warn(
                        line,
                        format!("both d and Tr are defined for '{}'; using d", name),
                    );
                }
                self.has_d = true;
            }
            b"Tr" => {
                if self.has_d {
                    let name = material.name.clone();
                    self.warn(
                        line,
                        format!("both d and Tr are defined for '{}'; using d", name),
                    );
                } else {
                    material.dissolve = 1.0 - scanner.parse_real(0.0);
                }
                self.has_tr = true;
            }
            b"Pr" => material.roughness = scanner.parse_real(0.0),
            b"Pm" => material.metallic = scanner.parse_real(0.0),
            b"Ps" => material.sheen = scanner.parse_real(0.0),
            b"Pc" => material.clearcoat_thickness = scanner.parse_real(0.0),
            b"Pcr" => material.clearcoat_roughness = scanner.parse_real(0.0),
            b"aniso" => material.anisotropy = scanner.parse_real(0.0),
            b"anisor" => material.anisotropy_rotation = scanner.parse_real(0.0),
            b"map_Ka" => material.ambient_texture = parse_texture(&mut scanner, false),
            b"map_Kd" => material.diffuse_texture = parse_texture(&mut scanner, false),
            b"map_Ks" => material.specular_texture = parse_texture(&mut scanner, false),
            b"map_Ns" => {
                material.specular_highlight_texture = parse_texture(&mut scanner, false)
            }
            b"map_bump" | b"map_Bump" | b"bump" => {
                material.bump_texture = parse_texture(&mut scanner, true)
            }
            b"disp" => material.displacement_texture = parse_texture(&mut scanner, false),
            b"map_d" => material.alpha_texture = parse_texture(&mut scanner, false),
            b"refl" => material.reflection_texture = parse_texture(&mut scanner, false),
            b"map_Pr" => material.roughness_texture = parse_texture(&mut scanner, false),
            b"map_Pm" => material.metallic_texture = parse_texture(&mut scanner, false),
            b"map_Ps" => material.sheen_texture = parse_texture(&mut scanner, false),
            b"map_Ke" => material.emissive_texture = parse_texture(&mut scanner, false),
            b"norm" => material.normal_texture = parse_texture(&mut scanner, false),
            _ => {
                let key = String::from_utf8_lossy(keyword).into_owned();
                let value = String::from_utf8_lossy(scanner.rest()).into_owned();
                material.unknown_parameters.entry(key).or_insert(value);
            }
        }
    }

    fn finish(mut self) -> MaterialLibrary {
        self.flush();
        self.library
    }
}

fn parse_on_off(scanner: &mut Scanner<'_>, default: bool) -> bool {
    match scanner.next_token() {
        b"on" => true,
        b"off" => false,
        _ => default,
    }
}

fn parse_texture_type(token: &[u8]) -> TextureType {
    match token {
        b"sphere" => TextureType::Sphere,
        b"cube_top" => TextureType::CubeTop,
        b"cube_bottom" => TextureType::CubeBottom,
        b"cube_front" => TextureType::CubeFront,
        b"cube_back" => TextureType::CubeBack,
        b"cube_left" => TextureType::CubeLeft,
        b"cube_right" => TextureType::CubeRight,
        _ => TextureType::None,
    }
}

/// Fills `values` from the following numeric tokens, stopping at the first
/// token that is not a number so a file name is never swallowed.
fn parse_optional_reals(scanner: &mut Scanner<'_>, values: &mut [Real]) {
    for value in values {
        let mut probe = scanner.clone();
        let token = probe.next_token();
        let numeric = token.iter().all(|b| b"+-.eE0123456789".contains(b));
        match try_parse_double(token).filter(|_| numeric).and_then(num::cast) {
            Some(parsed) => {
                *value = parsed;
                *scanner = probe;
            }
            None => return,
        }
    }
}

/// Leading `-option` flags, then the rest of the line as the file name.
fn parse_texture(scanner: &mut Scanner<'_>, is_bump: bool) -> Option<Texture> {
    let mut option = TextureOption::new(is_bump);

    loop {
        scanner.skip_space();
        if scanner.at_line_end() {
            return None;
        }

        let mut probe = scanner.clone();
        let flag = probe.next_token();
        let known = matches!(
            flag,
            b"-blendu"
                | b"-blendv"
                | b"-clamp"
                | b"-boost"
                | b"-bm"
                | b"-o"
                | b"-s"
                | b"-t"
                | b"-type"
                | b"-imfchan"
                | b"-mm"
                | b"-colorspace"
        );
        if !known {
            let name = String::from_utf8_lossy(scanner.rest()).into_owned();
            return Some(Texture { name, option });
        }
        *scanner = probe;

        match flag {
            b"-blendu" => option.blendu = parse_on_off(scanner, true),
            b"-blendv" => option.blendv = parse_on_off(scanner, true),
            b"-clamp" => option.clamp = parse_on_off(scanner, true),
            b"-boost" => parse_optional_reals(scanner, std::slice::from_mut(&mut option.sharpness)),
            b"-bm" => {
                parse_optional_reals(scanner, std::slice::from_mut(&mut option.bump_multiplier))
            }
            b"-o" => parse_optional_reals(scanner, &mut option.origin_offset),
            b"-s" => parse_optional_reals(scanner, &mut option.scale),
            b"-t" => parse_optional_reals(scanner, &mut option.turbulence),
            b"-type" => option.texture_type = parse_texture_type(scanner.next_token()),
            b"-imfchan" => {
                if let [channel] = scanner.next_token() {
                    option.imfchan = char::from(*channel);
                }
            }
            b"-mm" => {
                let mut values = [option.brightness, option.contrast];
                parse_optional_reals(scanner, &mut values);
                [option.brightness, option.contrast] = values;
            }
            _ => {
                option.colorspace = String::from_utf8_lossy(scanner.next_token()).into_owned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_mtl;
    use crate::loaders::obj::types::TextureType;

    #[test]
    fn parses_colors_scalars_and_maps() {
        let library = parse_mtl(
            b"# comment\nnewmtl red\nKa 0.1 0.2 0.3\nKd 1 0 0\nNs 10\nillum 2\nmap_Kd red.png\n\
              newmtl blue\nKd 0 0 1\nmap_Bump -bm 0.5 bump map.png  \n",
        );

        assert_eq!(library.materials.len(), 2);
        let red = &library.materials[0];
        assert_eq!(red.name, "red");
        assert_eq!(red.ambient, [0.1, 0.2, 0.3]);
        assert_eq!(red.diffuse, [1.0, 0.0, 0.0]);
        assert_eq!(red.shininess, 10.0);
        assert_eq!(red.illum, 2);
        assert_eq!(red.diffuse_texture.as_ref().unwrap().name, "red.png");

        let blue = &library.materials[1];
        let bump = blue.bump_texture.as_ref().unwrap();
        assert_eq!(bump.name, "bump map.png");
        assert_eq!(bump.option.bump_multiplier, 0.5);
        assert_eq!(bump.option.imfchan, 'l');
        assert!(library.warnings.is_empty());
    }

    #[test]
    fn d_wins_over_tr_with_a_warning() {
        let library = parse_mtl(b"newmtl glass\nd 0.25\nTr 0.9\n");
        assert_eq!(library.materials[0].dissolve, 0.25);
        assert_eq!(library.warnings.len(), 1);
        assert_eq!(library.warnings[0].line, Some(3));

        let library = parse_mtl(b"newmtl glass\nTr 0.25\n");
        assert_eq!(library.materials[0].dissolve, 0.75);
        assert!(library.warnings.is_empty());
    }

    #[test]
    fn texture_options_stop_at_the_file_name() {
        let library = parse_mtl(
            b"newmtl m\nrefl -type cube_top -clamp on -s 2 3 sky.png\n\
              map_Ks -s 2 1.png\n\
              map_Ka -o 0.5 -blendu off -imfchan r -mm 0.2 1.5 -colorspace sRGB amb.png\n",
        );
        let material = &library.materials[0];

        let refl = material.reflection_texture.as_ref().unwrap();
        assert_eq!(refl.name, "sky.png");
        assert_eq!(refl.option.imfchan, 'm');
        assert_eq!(refl.option.texture_type, TextureType::CubeTop);
        assert!(refl.option.clamp);
        assert_eq!(refl.option.scale, [2.0, 3.0, 1.0]);

        let specular = material.specular_texture.as_ref().unwrap();
        assert_eq!(specular.name, "1.png");
        assert_eq!(specular.option.scale, [2.0, 1.0, 1.0]);

        let ambient = material.ambient_texture.as_ref().unwrap();
        assert_eq!(ambient.name, "amb.png");
        assert_eq!(ambient.option.origin_offset, [0.5, 0.0, 0.0]);
        assert!(!ambient.option.blendu);
        assert_eq!(ambient.option.imfchan, 'r');
        assert_eq!(ambient.option.brightness, 0.2);
        assert_eq!(ambient.option.contrast, 1.5);
        assert_eq!(ambient.option.colorspace, "sRGB");
    }

    #[test]
    fn unknown_parameters_keep_the_first_value() {
        let library = parse_mtl(b"newmtl m\nPr 0.4\nmap_Pr rough.png\nfoo bar baz\nfoo other\n");
        let material = &library.materials[0];
        assert_eq!(material.roughness, 0.4);
        assert_eq!(material.roughness_texture.as_ref().unwrap().name, "rough.png");
        assert_eq!(material.unknown_parameters.get("foo").unwrap(), "bar baz");
    }

    #[test]
    fn empty_library_has_no_materials() {
        assert!(parse_mtl(b"").materials.is_empty());
        assert!(parse_mtl(b"# only a comment\n").materials.is_empty());
    }

    #[test]
    fn declarations_before_first_newmtl_are_dropped() {
        let library = parse_mtl(b"Ka 0.2 0.2 0.2\nillum 4\nfoo bar\nnewmtl red\nKd 1 0 0\n");
        let names: Vec<&str> = library.materials.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["red"]);

        let red = &library.materials[0];
        assert_eq!(red.ambient, [0.0; 3]);
        assert_eq!(red.illum, 0);
        assert!(red.unknown_parameters.is_empty());
        assert_eq!(red.diffuse, [1.0, 0.0, 0.0]);

        assert!(parse_mtl(b"Kd 1 1 1\n").materials.is_empty());
    }

    #[test]
    fn options_without_a_file_name_declare_no_texture() {
        let library = parse_mtl(b"newmtl m\nmap_Kd -clamp on\n");
        assert!(library.materials[0].diffuse_texture.is_none());
    }
}
