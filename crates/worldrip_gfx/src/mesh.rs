//! The canonical mesh, and its assembly out of per-surface vertex runs

use crate::{
    schema::{
        self, FaceIndexBase, RawVertex, ReadError, Schema, SurfaceRecord, TextureSlot,
        VertexSource, ZoneLink, ZoneRecord, ZoneStreams,
    },
    source::MemorySource,
    Skipped,
};
use ahash::AHashMap;
use byteorder::{ReadBytesExt, LE};
use glam::{Vec2, Vec3};
use log::{debug, info, trace, warn};
use std::{
    io::{Cursor, Seek, SeekFrom},
    sync::Arc,
};
use worldrip_utils::{color::RGBA8, file_stem};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// Already flipped vertically
    pub uv: Vec2,
    pub color: Option<RGBA8>,
}

impl From<RawVertex> for Vertex {
    fn from(raw: RawVertex) -> Self {
        Self {
            position: raw.position,
            normal: raw.normal,
            uv: Vec2::new(raw.uv.x, 1.0 - raw.uv.y),
            color: raw.color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    pub indices: [u32; 3],
    pub material: Arc<str>,
}

impl Face {
    pub fn is_degenerate(indices: [u32; 3]) -> bool {
        let [a, b, c] = indices;
        a == b || b == c || a == c
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Material {
    pub name: String,
    pub diffuse: Option<String>,
    pub normal: Option<String>,
    pub specular: Option<String>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Append-only indexed triangle mesh.
///
/// Materials are unique by name. Adding a material with a name that's already present replaces
/// its textures, but keeps its original position in [`Mesh::materials`].
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
    materials: Vec<Material>,
    material_index: AHashMap<String, usize>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of the new vertex.
    pub fn add_vertex(&mut self, vertex: Vertex) -> u32 {
        self.vertices.push(vertex);
        self.vertices.len() as u32 - 1
    }

    /// Adds a face, unless two of its indices are equal. Returns whether the face was kept.
    pub fn add_face(&mut self, indices: [u32; 3], material: Arc<str>) -> bool {
        if Face::is_degenerate(indices) {
            return false;
        }

        self.faces.push(Face { indices, material });
        true
    }

    pub fn add_material(&mut self, material: Material) {
        match self.material_index.get(&material.name) {
            Some(&index) => self.materials[index] = material,
            None => {
                self.material_index
                    .insert(material.name.clone(), self.materials.len());
                self.materials.push(material);
            }
        }
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.material_index
            .get(name)
            .map(|&index| &self.materials[index])
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Index the next appended vertex will get.
    pub fn base_vertex(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.faces.is_empty()
    }
}

/// Turns an asset name into a material name: no path, no extension and no leading `*`.
///
/// ```
/// use worldrip_gfx::mesh::clean_material_name;
/// assert_eq!(clean_material_name("*3u_shader01.mtl_suffix"), "3u_shader01");
/// assert_eq!(clean_material_name(r"wc/mtl_brick"), "mtl_brick");
/// ```
pub fn clean_material_name(name: &str) -> String {
    file_stem(name).trim_start_matches('*').to_owned()
}

/// File name a texture gets exported under.
pub fn texture_file_name(image: &str) -> String {
    format!("{}.png", file_stem(image))
}

/// Buffers shared by all surfaces of a world.
#[derive(Debug, Clone, Default)]
pub struct GeometryBuffers {
    /// The flat or shared vertex buffer. Unused by zone titles.
    pub vertices: Vec<u8>,
    /// 16-bit face indices. Unused by zone titles.
    pub indices: Vec<u8>,
    pub zones: Vec<ZoneRecord>,
}

#[derive(Debug, Default)]
pub struct Assembly {
    pub mesh: Mesh,
    /// Vertex offset applied to the face indices of each surface, `None` for skipped ones
    pub surface_offsets: Vec<Option<u32>>,
    pub skipped: Vec<Skipped>,
}

struct ZoneCursors {
    positions: Cursor<Vec<u8>>,
    draw_data: Cursor<Vec<u8>>,
    uvs: Cursor<Vec<u8>>,
    indices: Cursor<Vec<u8>>,
}

/// Where a surface's vertices come from, once everything it points at is resolved.
enum VertexRun {
    /// Already in the mesh, appended as a whole before the first surface
    Shared,
    Flat,
    Zone(ZoneLink),
}

/// Merges surfaces into one [`Mesh`].
pub struct MeshAssembler<'a, S: MemorySource> {
    schema: Schema,
    source: &'a S,
    buffers: &'a GeometryBuffers,
    materials: AHashMap<u64, Arc<str>>,
    zones: AHashMap<u32, ZoneCursors>,
}

impl<'a, S: MemorySource> MeshAssembler<'a, S> {
    pub fn new(schema: Schema, source: &'a S, buffers: &'a GeometryBuffers) -> Self {
        Self {
            schema,
            source,
            buffers,
            materials: AHashMap::new(),
            zones: AHashMap::new(),
        }
    }

    /// Assembles the surfaces in order.
    ///
    /// Surfaces whose material or zone can't be found are skipped and reported in
    /// [`Assembly::skipped`]. Malformed records and out of range reads abort the whole assembly.
    pub fn assemble(&mut self, surfaces: &[SurfaceRecord]) -> Result<Assembly, ReadError> {
        let layout = self.schema.layout();
        let mut assembly = Assembly {
            surface_offsets: Vec::with_capacity(surfaces.len()),
            ..Default::default()
        };

        let shared_base = match layout.vertex_source {
            VertexSource::SharedBuffer if !surfaces.is_empty() => {
                Some(self.append_shared_buffer(&mut assembly.mesh)?)
            }
            _ => None,
        };

        // Vertex count of the mesh so far, the base of the next surface's run
        let mut running = assembly.mesh.base_vertex();

        for (index, surface) in surfaces.iter().enumerate() {
            let resolved = self.resolve(surface, &mut assembly.mesh);
            let (material, run) = match resolved {
                Ok(resolved) => resolved,
                Err(e) if e.is_missing_target() => {
                    warn!("Skipping surface {index}: {e}");
                    assembly.skipped.push(Skipped {
                        what: "surface",
                        index,
                        reason: e.to_string(),
                    });
                    assembly.surface_offsets.push(None);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let base = match layout.face_index_base() {
                FaceIndexBase::SurfaceBaseVertex => shared_base.unwrap_or(0) + surface.base_vertex,
                FaceIndexBase::RunningOffset => running,
            };

            match &run {
                VertexRun::Shared => {}
                VertexRun::Flat => self.append_flat_vertices(index, surface, &mut assembly.mesh)?,
                VertexRun::Zone(link) => {
                    self.append_zone_vertices(surface, link, &mut assembly.mesh)?
                }
            }

            let kept = self.append_faces(index, surface, &run, base, material, &mut assembly.mesh)?;
            trace!(
                "Surface {index}: {} vertices at {base}, {kept}/{} faces kept",
                surface.vertex_count,
                surface.face_count
            );

            if layout.face_index_base() == FaceIndexBase::RunningOffset {
                running += surface.vertex_count;
            }
            debug_assert_eq!(running, assembly.mesh.base_vertex());

            assembly.surface_offsets.push(Some(base));
        }

        info!(
            "Assembled {} vertices, {} faces and {} materials out of {} surfaces ({} skipped)",
            assembly.mesh.vertices().len(),
            assembly.mesh.faces().len(),
            assembly.mesh.materials().len(),
            surfaces.len(),
            assembly.skipped.len()
        );

        Ok(assembly)
    }

    fn vertex(&self, raw: RawVertex) -> Vertex {
        let mut vertex = Vertex::from(raw);
        vertex.position *= self.schema.layout().unit_scale;
        vertex
    }

    fn append_shared_buffer(&self, mesh: &mut Mesh) -> Result<u32, ReadError> {
        let base = mesh.base_vertex();
        let count = self.buffers.vertices.len() / self.schema.layout().vertex_size;
        for i in 0..count {
            let raw = schema::read_vertex(self.schema, &self.buffers.vertices, i)?;
            mesh.add_vertex(self.vertex(raw));
        }

        debug!("Appended {count} vertices of the shared world buffer");
        Ok(base)
    }

    /// Resolves everything the surface points at, before anything is appended to the mesh.
    ///
    /// The material is registered last, so a surface skipped over a missing zone leaves no
    /// material behind.
    fn resolve(
        &mut self,
        surface: &SurfaceRecord,
        mesh: &mut Mesh,
    ) -> Result<(Arc<str>, VertexRun), ReadError> {
        let run = match self.schema.layout().vertex_source {
            VertexSource::SharedBuffer => VertexRun::Shared,
            VertexSource::FlatBuffer => VertexRun::Flat,
            VertexSource::Zone => {
                let handle = surface.zone_data.unwrap_or(0);
                let link = schema::read_zone_link(self.schema, self.source, handle)?;
                self.open_zone(link.zone_index)?;
                VertexRun::Zone(link)
            }
        };

        let material = self.material(surface.material, mesh)?;
        Ok((material, run))
    }

    fn material(&mut self, handle: u64, mesh: &mut Mesh) -> Result<Arc<str>, ReadError> {
        if let Some(name) = self.materials.get(&handle) {
            return Ok(name.clone());
        }

        let record = schema::read_material(self.schema, self.source, handle)?;
        let full_name = schema::read_material_name(self.schema, self.source, &record)?;
        let mut material = Material::new(clean_material_name(&full_name));

        for texture in schema::read_texture_table(self.schema, self.source, &record)? {
            let image = match schema::read_image_name(self.schema, self.source, texture.image) {
                Ok(image) => image,
                Err(e) if e.is_missing_target() => {
                    warn!("Material `{full_name}` references a missing image: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let slot = match texture.slot {
                TextureSlot::Diffuse => &mut material.diffuse,
                TextureSlot::Normal => &mut material.normal,
                TextureSlot::Specular => &mut material.specular,
            };
            slot.get_or_insert_with(|| texture_file_name(&image));
        }

        debug!("Loaded material `{}` from {handle:#x}", material.name);
        let name: Arc<str> = Arc::from(material.name.as_str());
        mesh.add_material(material);
        self.materials.insert(handle, name.clone());
        Ok(name)
    }

    /// Makes sure cursors over the zone's sub-buffers are open.
    fn open_zone(&mut self, zone_index: u32) -> Result<(), ReadError> {
        if self.zones.contains_key(&zone_index) {
            return Ok(());
        }

        let zone = self
            .buffers
            .zones
            .get(zone_index as usize)
            .ok_or(ReadError::MissingZone {
                schema: self.schema,
                zone: zone_index,
                available: self.buffers.zones.len(),
            })?;

        let read = |(address, size): (u64, u32)| -> Result<Cursor<Vec<u8>>, ReadError> {
            if size == 0 {
                return Ok(Cursor::new(Vec::new()));
            }

            self.source
                .read_bytes(address, size as usize)
                .map(Cursor::new)
                .map_err(|source| ReadError::Source {
                    schema: self.schema,
                    record: "zone buffer",
                    address,
                    source,
                })
        };

        let cursors = ZoneCursors {
            positions: read(zone.positions)?,
            draw_data: read(zone.draw_data)?,
            uvs: read(zone.uvs)?,
            indices: read(zone.indices)?,
        };

        debug!("Opened zone {zone_index}");
        self.zones.insert(zone_index, cursors);
        Ok(())
    }

    /// Cursors of a zone opened by [`Self::open_zone`].
    fn zone_cursors(&mut self, zone_index: u32) -> Result<&mut ZoneCursors, ReadError> {
        let (schema, available) = (self.schema, self.buffers.zones.len());
        self.zones
            .get_mut(&zone_index)
            .ok_or(ReadError::MissingZone {
                schema,
                zone: zone_index,
                available,
            })
    }

    fn append_flat_vertices(
        &self,
        index: usize,
        surface: &SurfaceRecord,
        mesh: &mut Mesh,
    ) -> Result<(), ReadError> {
        let available = (self.buffers.vertices.len() / self.schema.layout().vertex_size) as u64;
        let first = u64::from(surface.base_vertex);
        let count = u64::from(surface.vertex_count);
        if first + count > available {
            return Err(ReadError::RangeOutOfBounds {
                schema: self.schema,
                record: "vertex",
                surface: index,
                first,
                count,
                available,
            });
        }

        for i in first..first + count {
            let raw = schema::read_vertex(self.schema, &self.buffers.vertices, i as usize)?;
            mesh.add_vertex(self.vertex(raw));
        }

        Ok(())
    }

    fn append_zone_vertices(
        &mut self,
        surface: &SurfaceRecord,
        link: &ZoneLink,
        mesh: &mut Mesh,
    ) -> Result<(), ReadError> {
        let schema = self.schema;
        let unit_scale = schema.layout().unit_scale;
        let cursors = self.zone_cursors(link.zone_index)?;

        cursors.positions.set_position(link.position_offset.into());
        cursors.draw_data.set_position(link.draw_data_offset.into());
        cursors.uvs.set_position(link.uv_offset.into());

        for i in 0..surface.vertex_count {
            let streams = ZoneStreams {
                positions: &mut cursors.positions,
                draw_data: &mut cursors.draw_data,
                uvs: &mut cursors.uvs,
            };

            let raw = schema::read_zone_vertex(schema, streams, link.quantization, i.into())?;
            let mut vertex = Vertex::from(raw);
            vertex.position *= unit_scale;
            mesh.add_vertex(vertex);
        }

        Ok(())
    }

    /// Appends the faces of a surface and returns how many were kept.
    fn append_faces(
        &mut self,
        index: usize,
        surface: &SurfaceRecord,
        run: &VertexRun,
        base: u32,
        material: Arc<str>,
        mesh: &mut Mesh,
    ) -> Result<u32, ReadError> {
        let schema = self.schema;
        let first = u64::from(surface.base_face_index) * u64::from(schema.layout().face_index_stride);

        let mut raw_faces = Vec::with_capacity(surface.face_count as usize);
        match run {
            VertexRun::Zone(link) => {
                let indices = &mut self.zone_cursors(link.zone_index)?.indices;
                indices
                    .seek(SeekFrom::Start(u64::from(link.face_index_offset) + first * 2))
                    .map_err(|_| ReadError::Truncated {
                        schema,
                        record: "face index",
                        offset: first,
                    })?;

                for face in 0..u64::from(surface.face_count) {
                    let mut triangle = [0u16; 3];
                    for value in &mut triangle {
                        *value = indices.read_u16::<LE>().map_err(|_| ReadError::Truncated {
                            schema,
                            record: "face index",
                            offset: first + face * 3,
                        })?;
                    }
                    raw_faces.push(triangle);
                }
            }
            VertexRun::Shared | VertexRun::Flat => {
                let bytes = &self.buffers.indices;
                let available = bytes.len() as u64 / 2;
                let count = u64::from(surface.face_count) * 3;
                if first + count > available {
                    return Err(ReadError::RangeOutOfBounds {
                        schema,
                        record: "face index",
                        surface: index,
                        first,
                        count,
                        available,
                    });
                }

                for face in 0..u64::from(surface.face_count) {
                    let at = |k: u64| {
                        let offset = ((first + face * 3 + k) * 2) as usize;
                        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
                    };
                    raw_faces.push([at(0), at(1), at(2)]);
                }
            }
        }

        let vertex_count = u64::from(mesh.base_vertex());
        let mut kept = 0;
        for raw in raw_faces {
            let indices = raw.map(|i| base + u32::from(i));

            if let Some(&bad) = indices.iter().find(|&&i| u64::from(i) >= vertex_count) {
                return Err(ReadError::RangeOutOfBounds {
                    schema,
                    record: "vertex",
                    surface: index,
                    first: bad.into(),
                    count: 1,
                    available: vertex_count,
                });
            }

            if mesh.add_face(indices, material.clone()) {
                kept += 1;
            }
        }

        Ok(kept)
    }
}
