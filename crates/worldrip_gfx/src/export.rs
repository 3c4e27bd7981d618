//! Serializers for the interchange formats
//!
//! All of them are deterministic: the same mesh and document always produce the same bytes.

use crate::{
    entity::MapDocument,
    mesh::{Face, Mesh},
};
use ahash::AHashMap;
use anyhow::ensure;
use itertools::Itertools;
use log::info;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use worldrip_utils::{file_stem, ok, AnyResult, AnyhowResultExt};

/// Writes the mesh as a Wavefront OBJ file referencing `material_library`.
///
/// Faces are grouped by material, in the order materials first appear. Every face is written
/// with its 2nd and 3rd vertex swapped, which flips the winding to what OBJ consumers expect.
pub fn write_obj<W: Write>(mesh: &Mesh, material_library: &str, w: &mut W) -> AnyResult {
    writeln!(w, "# worldrip")?;
    writeln!(
        w,
        "# {} vertices, {} faces",
        mesh.vertices().len(),
        mesh.faces().len()
    )?;
    writeln!(w, "mtllib {material_library}")?;

    for vertex in mesh.vertices() {
        let p = vertex.position;
        writeln!(w, "v {:.5} {:.5} {:.5}", p.x, p.y, p.z)?;
    }

    for vertex in mesh.vertices() {
        let n = vertex.normal;
        writeln!(w, "vn {:.5} {:.5} {:.5}", n.x, n.y, n.z)?;
    }

    for vertex in mesh.vertices() {
        writeln!(w, "vt {:.5} {:.5}", vertex.uv.x, vertex.uv.y)?;
    }

    for (material, faces) in group_by_material(mesh.faces()) {
        writeln!(w, "g {material}")?;
        writeln!(w, "usemtl {material}")?;

        for face in faces {
            let [a, b, c] = face.indices.map(|i| i + 1);
            writeln!(w, "f {a}/{a}/{a} {c}/{c}/{c} {b}/{b}/{b}")?;
        }
    }

    ok()
}

fn group_by_material(faces: &[Face]) -> Vec<(&str, Vec<&Face>)> {
    let mut groups: Vec<(&str, Vec<&Face>)> = Vec::new();
    let mut positions = AHashMap::new();

    for face in faces {
        let material: &str = &face.material;
        let index = *positions.entry(material).or_insert_with(|| {
            groups.push((material, Vec::new()));
            groups.len() - 1
        });
        groups[index].1.push(face);
    }

    groups
}

/// Writes the material library. A mesh without materials produces an empty file.
pub fn write_mtl<W: Write>(mesh: &Mesh, w: &mut W) -> AnyResult {
    for material in mesh.materials() {
        writeln!(w, "newmtl {}", material.name)?;
        writeln!(w, "illum 4")?;
        writeln!(w, "Kd 0.00 0.00 0.00")?;
        writeln!(w, "Ka 0.00 0.00 0.00")?;
        writeln!(w, "Ks 0.50 0.50 0.50")?;

        let maps = [
            ("map_Kd", &material.diffuse),
            ("map_bump", &material.normal),
            ("map_Ks", &material.specular),
        ];
        for (directive, texture) in maps {
            if let Some(texture) = texture {
                writeln!(w, "{directive} {texture}")?;
            }
        }

        writeln!(w)?;
    }

    ok()
}

/// Writes the entity list as an `iwmap 4` map file.
///
/// The format has no escapes, so keys and values containing quotes or line breaks are rejected.
pub fn write_map<W: Write>(document: &MapDocument, w: &mut W) -> AnyResult {
    writeln!(w, "iwmap 4")?;
    writeln!(w, "\"script_startingnumber\" 0")?;
    writeln!(w, "\"000_Global\" flags  active")?;
    writeln!(w, "\"The Map\" flags")?;

    for (index, entity) in document.entities().iter().enumerate() {
        writeln!(w, "// entity {index}")?;
        writeln!(w, "{{")?;
        for (key, value) in entity.properties() {
            for text in [key, value] {
                ensure!(
                    !text.contains(['"', '\n', '\r']),
                    "entity {index} has a property that can't be quoted: {text:?}"
                );
            }
            writeln!(w, "\"{key}\" \"{value}\"")?;
        }
        writeln!(w, "}}")?;
    }

    ok()
}

/// Comma separated, deduplicated names of all diffuse textures, without extensions.
///
/// Meant to be pasted into asset browsers to find the textures the map needs.
pub fn search_string(mesh: &Mesh) -> String {
    mesh.materials()
        .iter()
        .filter_map(|material| material.diffuse.as_deref())
        .map(file_stem)
        .unique()
        .join(",")
}

/// Paths of a saved [`ExportSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub obj: PathBuf,
    pub mtl: PathBuf,
    pub map: PathBuf,
    pub search_string: PathBuf,
}

impl ExportedFiles {
    pub fn new(directory: &Path, name: &str) -> Self {
        Self {
            obj: directory.join(format!("{name}.obj")),
            mtl: directory.join(format!("{name}.mtl")),
            map: directory.join(format!("{name}.map")),
            search_string: directory.join(format!("{name}_search_string.txt")),
        }
    }
}

/// Everything extracted out of a world, ready to be written out.
///
/// Saving only borrows the model, so a failed save can be retried elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct ExportSet<'a> {
    pub mesh: &'a Mesh,
    pub document: &'a MapDocument,
}

impl<'a> ExportSet<'a> {
    pub fn new(mesh: &'a Mesh, document: &'a MapDocument) -> Self {
        Self { mesh, document }
    }

    /// Writes `<name>.obj`, `<name>.mtl`, `<name>.map` and `<name>_search_string.txt` into
    /// `directory`, creating it if needed.
    pub fn save(&self, directory: &Path, name: &str) -> AnyResult<ExportedFiles> {
        fs::create_dir_all(directory)
            .otherwise(format!("couldn't create {}", directory.display()))?;

        let files = ExportedFiles::new(directory, name);
        let library = format!("{name}.mtl");

        write_file(&files.obj, |w| write_obj(self.mesh, &library, w))?;
        write_file(&files.mtl, |w| write_mtl(self.mesh, w))?;
        write_file(&files.map, |w| write_map(self.document, w))?;
        write_file(&files.search_string, |w| {
            w.write_all(search_string(self.mesh).as_bytes())?;
            ok()
        })?;

        info!("Saved `{name}` into {}", directory.display());
        Ok(files)
    }
}

fn write_file(path: &Path, f: impl FnOnce(&mut BufWriter<File>) -> AnyResult) -> AnyResult {
    let file = File::create(path).otherwise(format!("couldn't create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    f(&mut writer)?;
    writer
        .flush()
        .otherwise(format!("couldn't write {}", path.display()))?;
    ok()
}
