//! Infinite Warfare layouts (64-bit)
//!
//! Geometry is split into zones. A surface only points at a shared record telling which zone it
//! lives in and where its data starts in each of the zone's sub-buffers:
//!
//! | sub-buffer | element                                     |
//! | ---------- | ------------------------------------------- |
//! | positions  | 8-byte quantized position                   |
//! | draw data  | packed tangent frame + `RGBA8` colour       |
//! | uvs        | two half precision floats                   |
//! | indices    | `u16` face indices, relative to the surface |
//!
//! Static models store a quantized origin and an index into the world's unique model table.

use super::{
    layout_records, read_streamed, MaterialRecord, ModelRef, NormalEncoding, Orientation,
    PlacementOrigin, PointerWidth, RawVertex, ReadError, Schema, SchemaFlags, SchemaLayout,
    StaticModelRecord, SurfaceRecord, TextureDef, TextureSemantics, VertexSource, ZoneLink,
    ZoneRecord, ZoneStreams,
};
use crate::decode::{unpack_half2, unpack_quantized_position, Quantization};
use std::io::Read;
use worldrip_proc::PackedData;
use worldrip_utils::{color::RGBA8, packed::Padding};

pub(super) static LAYOUT: SchemaLayout = SchemaLayout {
    title: "Call of Duty: Infinite Warfare",
    pointer_width: PointerWidth::U64,
    surface_size: GfxSurface::SIZE,
    vertex_size: 0,
    static_model_size: GfxStaticModel::SIZE,
    material_size: Material::SIZE,
    texture_def_size: MaterialTextureDef::SIZE,
    zone_size: GfxZone::SIZE,
    image_name_offset: 0x00,
    model_name_offset: 0x00,
    normals: NormalEncoding::TangentFrame,
    vertex_source: VertexSource::Zone,
    face_index_stride: 1,
    semantics: TextureSemantics {
        diffuse: 2,
        normal: 5,
        specular: 8,
    },
    unit_scale: 1.0,
    flags: SchemaFlags::from_bits_truncate(
        SchemaFlags::SKIP_PLACEHOLDER_MODELS.bits() | SchemaFlags::SWAP_QUANTIZED_XY.bits(),
    ),
};

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x30)]
pub struct GfxSurface {
    pub base_index: u32,
    pub tri_count: u16,
    pub vertex_count: u16,
    /// Points at a [`GfxSurfaceShared`]
    pub shared: u64,
    pub material: u64,
    pub pad_18: Padding<0x18>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x30)]
pub struct GfxSurfaceShared {
    pub zone_index: u32,
    pub position_offset: u32,
    pub draw_data_offset: u32,
    pub uv_offset: u32,
    pub index_offset: u32,
    pub quantize_scale: f32,
    pub quantize_offset: [f32; 3],
    pub pad_24: Padding<0x0C>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x40)]
pub struct GfxZone {
    pub name: u64,
    pub position_buffer: u64,
    pub position_size: u32,
    pub draw_data_size: u32,
    pub draw_data_buffer: u64,
    pub uv_buffer: u64,
    pub uv_size: u32,
    pub index_size: u32,
    pub index_buffer: u64,
    pub pad_38: Padding<0x08>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x08)]
pub struct ZonePosition {
    pub packed: u64,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x08)]
pub struct ZoneDrawData {
    pub tangent_frame: u32,
    pub color: RGBA8,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x04)]
pub struct ZoneUv {
    pub tex_coord: [u16; 2],
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x20)]
pub struct GfxStaticModel {
    pub packed_origin: u64,
    pub orientation: [i16; 4],
    pub scale: f32,
    pub unique_model: u16,
    pub flags: u16,
    pub pad_18: Padding<0x08>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x58)]
pub struct Material {
    pub name: u64,
    pub pad_08: Padding<0x0C>,
    pub texture_count: u8,
    pub constant_count: u8,
    pub state_bits_count: u8,
    pub state_flags: u8,
    pub pad_18: Padding<0x30>,
    pub texture_table: u64,
    pub pad_50: Padding<0x08>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x10)]
pub struct MaterialTextureDef {
    pub image: u64,
    pub semantic: u8,
    pub sampler_state: u8,
    pub pad_0a: Padding<0x02>,
    pub name_hash: u32,
}

layout_records! {
    GfxSurface => "surface",
    GfxSurfaceShared => "surface zone link",
    GfxZone => "zone",
    ZonePosition => "zone position",
    ZoneDrawData => "zone draw data",
    ZoneUv => "zone uv",
    GfxStaticModel => "static model",
    Material => "material",
    MaterialTextureDef => "texture definition",
}

pub(super) fn read_zone_vertex<R: Read>(
    streams: ZoneStreams<'_, R>,
    quantization: Quantization,
    offset: u64,
) -> Result<RawVertex, ReadError> {
    let schema = Schema::InfiniteWarfare;
    let position: ZonePosition = read_streamed(schema, streams.positions, offset)?;
    let draw_data: ZoneDrawData = read_streamed(schema, streams.draw_data, offset)?;
    let uv: ZoneUv = read_streamed(schema, streams.uvs, offset)?;

    Ok(RawVertex {
        position: unpack_quantized_position(position.packed, quantization, false),
        normal: LAYOUT.normals.decode(draw_data.tangent_frame),
        uv: unpack_half2(uv.tex_coord),
        color: Some(draw_data.color),
    })
}

impl From<GfxSurface> for SurfaceRecord {
    fn from(surface: GfxSurface) -> Self {
        Self {
            base_vertex: 0,
            base_face_index: surface.base_index,
            vertex_count: surface.vertex_count.into(),
            face_count: surface.tri_count.into(),
            material: surface.material,
            zone_data: Some(surface.shared),
        }
    }
}

impl From<GfxSurfaceShared> for ZoneLink {
    fn from(shared: GfxSurfaceShared) -> Self {
        Self {
            zone_index: shared.zone_index,
            position_offset: shared.position_offset,
            draw_data_offset: shared.draw_data_offset,
            uv_offset: shared.uv_offset,
            face_index_offset: shared.index_offset,
            quantization: Quantization {
                scale: shared.quantize_scale,
                offset: shared.quantize_offset,
            },
        }
    }
}

impl From<GfxZone> for ZoneRecord {
    fn from(zone: GfxZone) -> Self {
        Self {
            positions: (zone.position_buffer, zone.position_size),
            draw_data: (zone.draw_data_buffer, zone.draw_data_size),
            uvs: (zone.uv_buffer, zone.uv_size),
            indices: (zone.index_buffer, zone.index_size),
        }
    }
}

impl From<GfxStaticModel> for StaticModelRecord {
    fn from(instance: GfxStaticModel) -> Self {
        Self {
            origin: PlacementOrigin::Quantized(instance.packed_origin),
            orientation: Orientation::PackedQuaternion(instance.orientation),
            scale: instance.scale,
            model: ModelRef::UniqueIndex(instance.unique_model.into()),
        }
    }
}

impl From<Material> for MaterialRecord {
    fn from(material: Material) -> Self {
        Self {
            name: material.name,
            image_count: material.texture_count.into(),
            image_table: material.texture_table,
        }
    }
}

impl From<MaterialTextureDef> for TextureDef {
    fn from(def: MaterialTextureDef) -> Self {
        Self {
            semantic: def.semantic,
            image: def.image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::read_zone_vertex as read_any_zone_vertex;
    use glam::{Vec2, Vec3};
    use std::io::Cursor;
    use worldrip_utils::packed::to_packed_bytes;

    #[test]
    fn zone_vertices_advance_every_stream() {
        let quantization = Quantization {
            scale: 0.5,
            offset: [10.0, 20.0, 30.0],
        };

        let packed = 2 | (4 << 21) | (6 << 42);
        let mut positions = Cursor::new([0u64, packed].map(u64::to_le_bytes).concat());
        let mut draw_data = Cursor::new(
            [
                ZoneDrawData::default(),
                ZoneDrawData {
                    tangent_frame: 0,
                    color: RGBA8::new(1, 2, 3, 4),
                },
            ]
            .iter()
            .flat_map(|d| to_packed_bytes(d).unwrap())
            .collect::<Vec<u8>>(),
        );
        // 0.0 and 1.0
        let mut uvs = Cursor::new(vec![0, 0, 0, 0, 0x00, 0x00, 0x00, 0x3C]);

        for offset in 0..2 {
            let vertex = read_any_zone_vertex(
                Schema::InfiniteWarfare,
                ZoneStreams {
                    positions: &mut positions,
                    draw_data: &mut draw_data,
                    uvs: &mut uvs,
                },
                quantization,
                offset,
            )
            .unwrap();

            if offset == 1 {
                assert_eq!(vertex.position, Vec3::new(11.0, 22.0, 33.0));
                assert_eq!(vertex.uv, Vec2::new(0.0, 1.0));
                assert_eq!(vertex.color, Some(RGBA8::new(1, 2, 3, 4)));
                // Only x is set, a half turn around the X axis
                assert_eq!(vertex.normal, Vec3::NEG_Z);
            }
        }

        let exhausted = read_any_zone_vertex(
            Schema::InfiniteWarfare,
            ZoneStreams {
                positions: &mut positions,
                draw_data: &mut draw_data,
                uvs: &mut uvs,
            },
            quantization,
            2,
        );
        assert!(matches!(
            exhausted,
            Err(ReadError::Truncated {
                record: "zone position",
                offset: 2,
                ..
            })
        ));
    }
}
