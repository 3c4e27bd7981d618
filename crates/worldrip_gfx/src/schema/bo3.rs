//! Black Ops 3 layouts (64-bit)
//!
//! Vertices carry a packed tangent frame instead of a separate normal, and static models are
//! oriented with a packed quaternion.

use super::{
    layout_records, MaterialRecord, ModelRef, NormalEncoding, Orientation, PlacementOrigin,
    PointerWidth, RawVertex, SchemaFlags, SchemaLayout, StaticModelRecord, SurfaceRecord,
    TextureDef, TextureSemantics, VertexSource,
};
use crate::decode::unpack_half2;
use glam::Vec3;
use worldrip_proc::PackedData;
use worldrip_utils::{color::RGBA8, packed::Padding};

pub(super) static LAYOUT: SchemaLayout = SchemaLayout {
    title: "Call of Duty: Black Ops III",
    pointer_width: PointerWidth::U64,
    surface_size: GfxSurface::SIZE,
    vertex_size: GfxVertex::SIZE,
    static_model_size: GfxStaticModel::SIZE,
    material_size: Material::SIZE,
    texture_def_size: MaterialTextureDef::SIZE,
    zone_size: 0,
    image_name_offset: 0xF8,
    model_name_offset: 0x00,
    normals: NormalEncoding::TangentFrame,
    vertex_source: VertexSource::FlatBuffer,
    face_index_stride: 1,
    semantics: TextureSemantics {
        diffuse: 1,
        normal: 2,
        specular: 3,
    },
    unit_scale: 1.0,
    flags: SchemaFlags::empty(),
};

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x50)]
pub struct GfxSurface {
    pub base_index: u32,
    pub tri_count: u16,
    pub vertex_count: u16,
    pub first_vertex: u32,
    pub vertex_data_offset: u32,
    pub pad_10: Padding<0x10>,
    pub material: u64,
    pub pad_28: Padding<0x28>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x20)]
pub struct GfxVertex {
    pub xyz: [f32; 3],
    pub tangent_frame: u32,
    pub color: RGBA8,
    pub tex_coord: [u16; 2],
    pub lmap_coord: [u16; 2],
    pub pad_1c: Padding<0x04>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x30)]
pub struct GfxStaticModel {
    pub origin: [f32; 3],
    pub orientation: [i16; 4],
    pub scale: f32,
    pub pad_18: Padding<0x08>,
    pub model: u64,
    pub pad_28: Padding<0x08>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x40)]
pub struct Material {
    pub name: u64,
    pub pad_08: Padding<0x20>,
    pub texture_table: u64,
    pub pad_30: Padding<0x08>,
    pub texture_count: u8,
    pub pad_39: Padding<0x07>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x20)]
pub struct MaterialTextureDef {
    pub image: u64,
    pub name_hash: u32,
    pub sampler_state: u8,
    pub semantic: u8,
    pub is_mature_content: u8,
    pub unknown: u8,
    pub pad_10: Padding<0x10>,
}

layout_records! {
    GfxSurface => "surface",
    GfxVertex => "vertex",
    GfxStaticModel => "static model",
    Material => "material",
    MaterialTextureDef => "texture definition",
}

impl From<GfxSurface> for SurfaceRecord {
    fn from(surface: GfxSurface) -> Self {
        Self {
            base_vertex: surface.first_vertex,
            base_face_index: surface.base_index,
            vertex_count: surface.vertex_count.into(),
            face_count: surface.tri_count.into(),
            material: surface.material,
            zone_data: None,
        }
    }
}

impl From<GfxVertex> for RawVertex {
    fn from(vertex: GfxVertex) -> Self {
        Self {
            position: Vec3::from_array(vertex.xyz),
            normal: LAYOUT.normals.decode(vertex.tangent_frame),
            uv: unpack_half2(vertex.tex_coord),
            color: Some(vertex.color),
        }
    }
}

impl From<GfxStaticModel> for StaticModelRecord {
    fn from(instance: GfxStaticModel) -> Self {
        Self {
            origin: PlacementOrigin::Float(Vec3::from_array(instance.origin)),
            orientation: Orientation::PackedQuaternion(instance.orientation),
            scale: instance.scale,
            model: ModelRef::Pointer(instance.model),
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
