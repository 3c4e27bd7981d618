//! World at War layouts (32-bit)
//!
//! The only title here whose surfaces index into one shared world vertex buffer instead of a
//! run of their own.

use super::{
    layout_records, MaterialRecord, ModelRef, NormalEncoding, Orientation, PlacementOrigin,
    PointerWidth, RawVertex, SchemaFlags, SchemaLayout, StaticModelRecord, SurfaceRecord,
    TextureDef, TextureSemantics, VertexSource,
};
use crate::rotation::axes_from_rows;
use glam::{Vec2, Vec3};
use worldrip_proc::PackedData;
use worldrip_utils::{color::RGBA8, packed::Padding};

pub(super) static LAYOUT: SchemaLayout = SchemaLayout {
    title: "Call of Duty: World at War",
    pointer_width: PointerWidth::U32,
    surface_size: GfxSurface::SIZE,
    vertex_size: GfxVertex::SIZE,
    static_model_size: GfxStaticModel::SIZE,
    material_size: Material::SIZE,
    texture_def_size: MaterialTextureDef::SIZE,
    zone_size: 0,
    image_name_offset: 0x20,
    model_name_offset: 0x00,
    normals: NormalEncoding::MethodA,
    vertex_source: VertexSource::SharedBuffer,
    face_index_stride: 1,
    semantics: TextureSemantics {
        diffuse: 2,
        normal: 5,
        specular: 8,
    },
    unit_scale: 1.0,
    flags: SchemaFlags::empty(),
};

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x30)]
pub struct GfxSurface {
    pub vertex_layer_data: u32,
    pub first_vertex: u32,
    pub vertex_count: u16,
    pub tri_count: u16,
    pub base_index: u32,
    pub pad_10: Padding<0x14>,
    pub material: u32,
    pub pad_28: Padding<0x08>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x2C)]
pub struct GfxVertex {
    pub xyz: [f32; 3],
    pub binormal_sign: f32,
    pub color: RGBA8,
    pub tex_coord: [f32; 2],
    pub lmap_coord: [f32; 2],
    pub normal: u32,
    pub tangent: u32,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x4C)]
pub struct GfxStaticModel {
    pub cull_dist: f32,
    pub origin: [f32; 3],
    pub axis: [[f32; 3]; 3],
    pub scale: f32,
    pub model: u32,
    pub pad_3c: Padding<0x10>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x58)]
pub struct Material {
    pub name: u32,
    pub pad_04: Padding<0x3C>,
    pub texture_count: u8,
    pub constant_count: u8,
    pub state_bits_count: u8,
    pub state_flags: u8,
    pub camera_region: u8,
    pub pad_45: Padding<0x03>,
    pub texture_table: u32,
    pub pad_4c: Padding<0x0C>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x0C)]
pub struct MaterialTextureDef {
    pub name_hash: u32,
    pub name_start: u8,
    pub name_end: u8,
    pub sampler_state: u8,
    pub semantic: u8,
    pub image: u32,
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
            material: surface.material.into(),
            zone_data: None,
        }
    }
}

impl From<GfxVertex> for RawVertex {
    fn from(vertex: GfxVertex) -> Self {
        Self {
            position: Vec3::from_array(vertex.xyz),
            normal: LAYOUT.normals.decode(vertex.normal),
            uv: Vec2::from_array(vertex.tex_coord),
            color: Some(vertex.color),
        }
    }
}

impl From<GfxStaticModel> for StaticModelRecord {
    fn from(instance: GfxStaticModel) -> Self {
        Self {
            origin: PlacementOrigin::Float(Vec3::from_array(instance.origin)),
            orientation: Orientation::Axes(axes_from_rows(instance.axis)),
            scale: instance.scale,
            model: ModelRef::Pointer(instance.model.into()),
        }
    }
}

impl From<Material> for MaterialRecord {
    fn from(material: Material) -> Self {
        Self {
            name: material.name.into(),
            image_count: material.texture_count.into(),
            image_table: material.texture_table.into(),
        }
    }
}

impl From<MaterialTextureDef> for TextureDef {
    fn from(def: MaterialTextureDef) -> Self {
        Self {
            semantic: def.semantic,
            image: def.image.into(),
        }
    }
}
