//! Binary record layouts of every supported title
//!
//! Each title gets its own module with `#[derive(PackedData)]` structs mirroring the game's
//! memory layout, plus a [`SchemaLayout`] table with the constants the assemblers need. The
//! functions in this module dispatch on [`Schema`] and turn the title-specific records into
//! schema-neutral ones.
//!
//! Nothing in here guesses which layout applies to a given blob. The caller always picks.

use crate::{
    decode::{unpack_normal_a, unpack_normal_b, unpack_tangent_frame, Quantization},
    source::{MemorySource, SourceError},
};
use bitflags::bitflags;
use glam::{Mat3, Vec2, Vec3};
use std::{fmt, io::Read, str::FromStr};
use thiserror::Error;
use worldrip_utils::{color::RGBA8, packed::PackedData, EnumParseError};

pub mod bo2;
pub mod bo3;
pub mod ghosts;
pub mod iw;
pub mod mw2;
pub mod waw;

/// Supported game titles, each with a distinct binary layout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum, serde::Deserialize,
)]
pub enum Schema {
    #[value(name = "waw")]
    #[serde(rename = "waw")]
    WorldAtWar,
    #[value(name = "mw2")]
    #[serde(rename = "mw2")]
    ModernWarfare2,
    #[value(name = "bo2")]
    #[serde(rename = "bo2")]
    BlackOps2,
    #[value(name = "ghosts")]
    #[serde(rename = "ghosts")]
    Ghosts,
    #[value(name = "bo3")]
    #[serde(rename = "bo3")]
    BlackOps3,
    #[value(name = "iw")]
    #[serde(rename = "iw")]
    InfiniteWarfare,
}

impl Schema {
    pub const ALL: [Schema; 6] = [
        Schema::WorldAtWar,
        Schema::ModernWarfare2,
        Schema::BlackOps2,
        Schema::Ghosts,
        Schema::BlackOps3,
        Schema::InfiniteWarfare,
    ];

    /// Short identifier, as accepted on the command line.
    pub const fn id(self) -> &'static str {
        match self {
            Schema::WorldAtWar => "waw",
            Schema::ModernWarfare2 => "mw2",
            Schema::BlackOps2 => "bo2",
            Schema::Ghosts => "ghosts",
            Schema::BlackOps3 => "bo3",
            Schema::InfiniteWarfare => "iw",
        }
    }

    pub fn layout(self) -> &'static SchemaLayout {
        match self {
            Schema::WorldAtWar => &waw::LAYOUT,
            Schema::ModernWarfare2 => &mw2::LAYOUT,
            Schema::BlackOps2 => &bo2::LAYOUT,
            Schema::Ghosts => &ghosts::LAYOUT,
            Schema::BlackOps3 => &bo3::LAYOUT,
            Schema::InfiniteWarfare => &iw::LAYOUT,
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Schema {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Schema::ALL
            .into_iter()
            .find(|schema| schema.id().eq_ignore_ascii_case(s))
            .ok_or(EnumParseError::InvalidInput)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerWidth {
    U32,
    U64,
}

impl PointerWidth {
    pub const fn size(self) -> usize {
        match self {
            PointerWidth::U32 => 4,
            PointerWidth::U64 => 8,
        }
    }
}

/// How vertex normals are packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalEncoding {
    /// Three biased bytes with a shared scale byte.
    MethodA,
    /// Three 10-bit unsigned fields.
    MethodB,
    /// A packed tangent frame quaternion.
    TangentFrame,
}

impl NormalEncoding {
    pub fn decode(self, packed: u32) -> Vec3 {
        match self {
            NormalEncoding::MethodA => unpack_normal_a(packed.to_le_bytes()),
            NormalEncoding::MethodB => unpack_normal_b(packed),
            NormalEncoding::TangentFrame => unpack_tangent_frame(packed).normal,
        }
    }
}

/// Where a surface's vertices come from, which also decides what its face indices are relative
/// to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSource {
    /// One world-wide vertex buffer, appended to the mesh once in full. Face indices are
    /// relative to the surface's base vertex within that buffer.
    SharedBuffer,
    /// One world-wide vertex buffer, of which every surface appends only its own run. Face
    /// indices are relative to the run.
    FlatBuffer,
    /// Per-zone position, draw data and uv sub-buffers. Face indices are relative to the run.
    Zone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceIndexBase {
    /// Indices get the surface's base vertex added.
    SurfaceBaseVertex,
    /// Indices get the running vertex count of the mesh added.
    RunningOffset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSlot {
    Diffuse,
    Normal,
    Specular,
}

/// Texture semantic codes used by a title's materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSemantics {
    pub diffuse: u8,
    pub normal: u8,
    pub specular: u8,
}

impl TextureSemantics {
    pub fn slot(&self, semantic: u8) -> Option<TextureSlot> {
        if semantic == self.diffuse {
            Some(TextureSlot::Diffuse)
        } else if semantic == self.normal {
            Some(TextureSlot::Normal)
        } else if semantic == self.specular {
            Some(TextureSlot::Specular)
        } else {
            None
        }
    }
}

bitflags! {
    pub struct SchemaFlags: u32 {
        /// Static models whose name starts with `*` are placeholders and get skipped.
        const SKIP_PLACEHOLDER_MODELS = 1 << 0;
        /// Quantized static model origins store `y` before `x`.
        const SWAP_QUANTIZED_XY = 1 << 1;
    }
}

/// Constant offset table of a title.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchemaLayout {
    pub title: &'static str,
    pub pointer_width: PointerWidth,
    pub surface_size: usize,
    /// Zero for titles without a flat vertex buffer.
    pub vertex_size: usize,
    pub static_model_size: usize,
    pub material_size: usize,
    pub texture_def_size: usize,
    /// Zero for titles without zones.
    pub zone_size: usize,
    /// Offset of the name pointer within an image record.
    pub image_name_offset: u64,
    /// Offset of the name pointer within a model record.
    pub model_name_offset: u64,
    pub normals: NormalEncoding,
    pub vertex_source: VertexSource,
    /// Multiplier applied to a surface's base face index to get the first index to read.
    pub face_index_stride: u32,
    pub semantics: TextureSemantics,
    /// Multiplier applied to all positions and origins.
    pub unit_scale: f32,
    pub flags: SchemaFlags,
}

impl SchemaLayout {
    pub fn face_index_base(&self) -> FaceIndexBase {
        match self.vertex_source {
            VertexSource::SharedBuffer => FaceIndexBase::SurfaceBaseVertex,
            VertexSource::FlatBuffer | VertexSource::Zone => FaceIndexBase::RunningOffset,
        }
    }
}

/// Schema-neutral surface descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceRecord {
    pub base_vertex: u32,
    pub base_face_index: u32,
    pub vertex_count: u32,
    pub face_count: u32,
    /// Handle of the material record.
    pub material: u64,
    /// Handle of the record describing which zone and where in it the surface lives.
    pub zone_data: Option<u64>,
}

/// Where in a zone a surface's data starts. Offsets are in bytes into each sub-buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneLink {
    pub zone_index: u32,
    pub position_offset: u32,
    pub draw_data_offset: u32,
    pub uv_offset: u32,
    pub face_index_offset: u32,
    pub quantization: Quantization,
}

/// Handles and sizes (in bytes) of a zone's sub-buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRecord {
    pub positions: (u64, u32),
    pub draw_data: (u64, u32),
    pub uvs: (u64, u32),
    pub indices: (u64, u32),
}

/// A vertex as stored by the game, before the uv flip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub color: Option<RGBA8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementOrigin {
    Float(Vec3),
    Quantized(u64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Orientation {
    Axes(Mat3),
    PackedQuaternion([i16; 4]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRef {
    Pointer(u64),
    UniqueIndex(u32),
}

/// Schema-neutral static model instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticModelRecord {
    pub origin: PlacementOrigin,
    pub orientation: Orientation,
    pub scale: f32,
    pub model: ModelRef,
}

/// Schema-neutral material descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialRecord {
    pub name: u64,
    pub image_count: u32,
    pub image_table: u64,
}

/// A material's texture table entry, before its semantic is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDef {
    pub semantic: u8,
    pub image: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRecord {
    pub slot: TextureSlot,
    pub image: u64,
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{schema}: {record} #{index} at offset {offset:#x} needs {size} bytes, but only {available} are available")]
    OutOfBounds {
        schema: Schema,
        record: &'static str,
        index: usize,
        offset: usize,
        size: usize,
        available: usize,
    },
    #[error("{schema}: {record} at offset {offset:#x} of its buffer runs past the end")]
    Truncated {
        schema: Schema,
        record: &'static str,
        offset: u64,
    },
    #[error("{schema}: malformed {record} at offset {offset:#x}: {reason}")]
    Malformed {
        schema: Schema,
        record: &'static str,
        offset: usize,
        reason: String,
    },
    #[error("{schema}: couldn't read {record} at {address:#x}: {source}")]
    Source {
        schema: Schema,
        record: &'static str,
        address: u64,
        #[source]
        source: SourceError,
    },
    #[error("{schema}: zone {zone} is referenced, but the world only has {available} zones")]
    MissingZone {
        schema: Schema,
        zone: u32,
        available: usize,
    },
    #[error("{schema}: unique model {index} is referenced, but the table only has {available}")]
    MissingModel {
        schema: Schema,
        index: u32,
        available: u32,
    },
    #[error("{schema} has no {record} records")]
    Unsupported {
        schema: Schema,
        record: &'static str,
    },
    #[error("{schema}: surface {surface} reads {count} {record}s from #{first}, but the buffer only holds {available}")]
    RangeOutOfBounds {
        schema: Schema,
        record: &'static str,
        surface: usize,
        first: u64,
        count: u64,
        available: u64,
    },
}

impl ReadError {
    /// Whether this error means that an indirection target is missing, rather than the input
    /// being malformed. Such errors skip the affected surface or instance instead of aborting.
    pub fn is_missing_target(&self) -> bool {
        matches!(
            self,
            ReadError::Source { .. } | ReadError::MissingZone { .. } | ReadError::MissingModel { .. }
        )
    }
}

/// Implemented by all title record structs.
pub(crate) trait LayoutRecord: PackedData {
    const NAME: &'static str;
    const RECORD_SIZE: usize;
}

macro_rules! layout_records {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl $crate::schema::LayoutRecord for $ty {
                const NAME: &'static str = $name;
                const RECORD_SIZE: usize = <$ty>::SIZE;
            }
        )*
    };
}
pub(crate) use layout_records;

/// Reads the `index`-th record of a contiguous table.
pub(crate) fn read_indexed<T: LayoutRecord>(
    schema: Schema,
    bytes: &[u8],
    index: usize,
) -> Result<T, ReadError> {
    let size = T::RECORD_SIZE;
    let offset = index.saturating_mul(size);
    let slice = offset
        .checked_add(size)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(ReadError::OutOfBounds {
            schema,
            record: T::NAME,
            index,
            offset,
            size,
            available: bytes.len(),
        })?;

    T::read_packed(&mut &slice[..]).map_err(|e| ReadError::Malformed {
        schema,
        record: T::NAME,
        offset,
        reason: e.to_string(),
    })
}

/// Reads a record through the memory source.
pub(crate) fn read_at<T: LayoutRecord, S: MemorySource>(
    schema: Schema,
    source: &S,
    address: u64,
) -> Result<T, ReadError> {
    source
        .read_record(address, T::RECORD_SIZE)
        .map_err(|source| ReadError::Source {
            schema,
            record: T::NAME,
            address,
            source,
        })
}

/// Reads one record from a cursor over a sub-buffer.
pub(crate) fn read_streamed<T: LayoutRecord, R: Read>(
    schema: Schema,
    r: &mut R,
    offset: u64,
) -> Result<T, ReadError> {
    T::read_packed(r).map_err(|_| ReadError::Truncated {
        schema,
        record: T::NAME,
        offset,
    })
}

pub fn read_surface(schema: Schema, bytes: &[u8], index: usize) -> Result<SurfaceRecord, ReadError> {
    Ok(match schema {
        Schema::WorldAtWar => read_indexed::<waw::GfxSurface>(schema, bytes, index)?.into(),
        Schema::ModernWarfare2 => read_indexed::<mw2::GfxSurface>(schema, bytes, index)?.into(),
        Schema::BlackOps2 => read_indexed::<bo2::GfxSurface>(schema, bytes, index)?.into(),
        Schema::Ghosts => read_indexed::<ghosts::GfxSurface>(schema, bytes, index)?.into(),
        Schema::BlackOps3 => read_indexed::<bo3::GfxSurface>(schema, bytes, index)?.into(),
        Schema::InfiniteWarfare => read_indexed::<iw::GfxSurface>(schema, bytes, index)?.into(),
    })
}

/// Reads a vertex of a flat vertex buffer.
pub fn read_vertex(schema: Schema, bytes: &[u8], index: usize) -> Result<RawVertex, ReadError> {
    Ok(match schema {
        Schema::WorldAtWar => read_indexed::<waw::GfxVertex>(schema, bytes, index)?.into(),
        Schema::ModernWarfare2 => read_indexed::<mw2::GfxVertex>(schema, bytes, index)?.into(),
        Schema::BlackOps2 => read_indexed::<bo2::GfxVertex>(schema, bytes, index)?.into(),
        Schema::Ghosts => read_indexed::<ghosts::GfxVertex>(schema, bytes, index)?.into(),
        Schema::BlackOps3 => read_indexed::<bo3::GfxVertex>(schema, bytes, index)?.into(),
        Schema::InfiniteWarfare => {
            return Err(ReadError::Unsupported {
                schema,
                record: "flat vertex",
            })
        }
    })
}

pub fn read_static_model(
    schema: Schema,
    bytes: &[u8],
    index: usize,
) -> Result<StaticModelRecord, ReadError> {
    Ok(match schema {
        Schema::WorldAtWar => read_indexed::<waw::GfxStaticModel>(schema, bytes, index)?.into(),
        Schema::ModernWarfare2 => read_indexed::<mw2::GfxStaticModel>(schema, bytes, index)?.into(),
        Schema::BlackOps2 => read_indexed::<bo2::GfxStaticModel>(schema, bytes, index)?.into(),
        Schema::Ghosts => read_indexed::<ghosts::GfxStaticModel>(schema, bytes, index)?.into(),
        Schema::BlackOps3 => read_indexed::<bo3::GfxStaticModel>(schema, bytes, index)?.into(),
        Schema::InfiniteWarfare => read_indexed::<iw::GfxStaticModel>(schema, bytes, index)?.into(),
    })
}

pub fn read_zone(schema: Schema, bytes: &[u8], index: usize) -> Result<ZoneRecord, ReadError> {
    match schema {
        Schema::InfiniteWarfare => Ok(read_indexed::<iw::GfxZone>(schema, bytes, index)?.into()),
        _ => Err(ReadError::Unsupported {
            schema,
            record: "zone",
        }),
    }
}

/// Follows a surface's zone data handle.
pub fn read_zone_link<S: MemorySource>(
    schema: Schema,
    source: &S,
    address: u64,
) -> Result<ZoneLink, ReadError> {
    match schema {
        Schema::InfiniteWarfare => {
            Ok(read_at::<iw::GfxSurfaceShared, S>(schema, source, address)?.into())
        }
        _ => Err(ReadError::Unsupported {
            schema,
            record: "zone link",
        }),
    }
}

/// Cursors over the sub-buffers of one zone.
pub struct ZoneStreams<'a, R: Read> {
    pub positions: &'a mut R,
    pub draw_data: &'a mut R,
    pub uvs: &'a mut R,
}

/// Reads the next vertex out of a zone's sub-buffers, advancing each stream.
///
/// `offset` only serves error reporting, it's the index of the vertex within its surface.
pub fn read_zone_vertex<R: Read>(
    schema: Schema,
    streams: ZoneStreams<'_, R>,
    quantization: Quantization,
    offset: u64,
) -> Result<RawVertex, ReadError> {
    match schema {
        Schema::InfiniteWarfare => iw::read_zone_vertex(streams, quantization, offset),
        _ => Err(ReadError::Unsupported {
            schema,
            record: "zone vertex",
        }),
    }
}

pub fn read_material<S: MemorySource>(
    schema: Schema,
    source: &S,
    address: u64,
) -> Result<MaterialRecord, ReadError> {
    Ok(match schema {
        Schema::WorldAtWar => read_at::<waw::Material, S>(schema, source, address)?.into(),
        Schema::ModernWarfare2 => read_at::<mw2::Material, S>(schema, source, address)?.into(),
        Schema::BlackOps2 => read_at::<bo2::Material, S>(schema, source, address)?.into(),
        Schema::Ghosts => read_at::<ghosts::Material, S>(schema, source, address)?.into(),
        Schema::BlackOps3 => read_at::<bo3::Material, S>(schema, source, address)?.into(),
        Schema::InfiniteWarfare => read_at::<iw::Material, S>(schema, source, address)?.into(),
    })
}

fn read_texture_def(schema: Schema, bytes: &[u8], index: usize) -> Result<TextureDef, ReadError> {
    Ok(match schema {
        Schema::WorldAtWar => read_indexed::<waw::MaterialTextureDef>(schema, bytes, index)?.into(),
        Schema::ModernWarfare2 => {
            read_indexed::<mw2::MaterialTextureDef>(schema, bytes, index)?.into()
        }
        Schema::BlackOps2 => read_indexed::<bo2::MaterialTextureDef>(schema, bytes, index)?.into(),
        Schema::Ghosts => read_indexed::<ghosts::MaterialTextureDef>(schema, bytes, index)?.into(),
        Schema::BlackOps3 => read_indexed::<bo3::MaterialTextureDef>(schema, bytes, index)?.into(),
        Schema::InfiniteWarfare => {
            read_indexed::<iw::MaterialTextureDef>(schema, bytes, index)?.into()
        }
    })
}

/// Reads a material's texture table, keeping only the entries with a known slot.
pub fn read_texture_table<S: MemorySource>(
    schema: Schema,
    source: &S,
    material: &MaterialRecord,
) -> Result<Vec<TextureRecord>, ReadError> {
    if material.image_count == 0 || material.image_table == 0 {
        return Ok(Vec::new());
    }

    let layout = schema.layout();
    let count = material.image_count as usize;
    let bytes = source
        .read_bytes(material.image_table, count * layout.texture_def_size)
        .map_err(|source| ReadError::Source {
            schema,
            record: "texture table",
            address: material.image_table,
            source,
        })?;

    let mut result = Vec::with_capacity(count);
    for index in 0..count {
        let def = read_texture_def(schema, &bytes, index)?;
        if let Some(slot) = layout.semantics.slot(def.semantic) {
            result.push(TextureRecord {
                slot,
                image: def.image,
            });
        }
    }

    Ok(result)
}

fn read_name_at<S: MemorySource>(
    schema: Schema,
    source: &S,
    record: &'static str,
    address: u64,
) -> Result<String, ReadError> {
    let wrap = |source| ReadError::Source {
        schema,
        record,
        address,
        source,
    };

    let name = source
        .read_pointer(address, schema.layout().pointer_width)
        .map_err(wrap)?;
    source.read_c_string(name).map_err(wrap)
}

/// Reads the name of an image record.
pub fn read_image_name<S: MemorySource>(
    schema: Schema,
    source: &S,
    image: u64,
) -> Result<String, ReadError> {
    if image == 0 {
        return Err(ReadError::Source {
            schema,
            record: "image",
            address: 0,
            source: SourceError::Null { what: "image" },
        });
    }

    read_name_at(
        schema,
        source,
        "image",
        image + schema.layout().image_name_offset,
    )
}

/// Reads the name of a model record.
pub fn read_model_name<S: MemorySource>(
    schema: Schema,
    source: &S,
    model: u64,
) -> Result<String, ReadError> {
    if model == 0 {
        return Err(ReadError::Source {
            schema,
            record: "model",
            address: 0,
            source: SourceError::Null { what: "model" },
        });
    }

    read_name_at(
        schema,
        source,
        "model",
        model + schema.layout().model_name_offset,
    )
}

/// Reads the name of a material record.
pub fn read_material_name<S: MemorySource>(
    schema: Schema,
    source: &S,
    material: &MaterialRecord,
) -> Result<String, ReadError> {
    source
        .read_c_string(material.name)
        .map_err(|source| ReadError::Source {
            schema,
            record: "material name",
            address: material.name,
            source,
        })
}
