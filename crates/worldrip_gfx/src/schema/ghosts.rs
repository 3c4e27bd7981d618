//! Ghosts layouts (64-bit)
//!
//! Face indices are addressed in whole triangles here, and positions are converted from inches
//! to centimeters.

use super::{
    layout_records, MaterialRecord, ModelRef, NormalEncoding, Orientation, PlacementOrigin,
    PointerWidth, RawVertex, SchemaFlags, SchemaLayout, StaticModelRecord, SurfaceRecord,
    TextureDef, TextureSemantics, VertexSource,
};
use crate::{decode::unpack_half2, rotation::axes_from_rows};
use glam::Vec3;
use worldrip_proc::PackedData;
use worldrip_utils::{color::RGBA8, packed::Padding};

pub(super) static LAYOUT: SchemaLayout = SchemaLayout {
    title: "Call of Duty: Ghosts",
    pointer_width: PointerWidth::U64,
    surface_size: GfxSurface::SIZE,
    vertex_size: GfxVertex::SIZE,
    static_model_size: GfxStaticModel::SIZE,
    material_size: Material::SIZE,
    texture_def_size: MaterialTextureDef::SIZE,
    zone_size: 0,
    image_name_offset: 0x48,
    model_name_offset: 0x00,
    normals: NormalEncoding::MethodA,
    vertex_source: VertexSource::FlatBuffer,
    face_index_stride: 3,
    semantics: TextureSemantics {
        diffuse: 2,
        normal: 5,
        specular: 8,
    },
    unit_scale: 2.54,
    flags: SchemaFlags::empty(),
};

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x28)]
pub struct GfxSurface {
    pub base_index: u32,
    pub tri_count: u16,
    pub vertex_count: u16,
    pub first_vertex: u32,
    pub vertex_layer_data: u32,
    pub material: u64,
    pub lightmap_index: u8,
    pub reflection_probe_index: u8,
    pub primary_light_index: u8,
    pub flags: u8,
    pub pad_1c: Padding<0x0C>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x20)]
pub struct GfxVertex {
    pub xyz: [f32; 3],
    pub binormal_sign: f32,
    pub color: RGBA8,
    pub tex_coord: [u16; 2],
    pub normal: u32,
    pub tangent: u32,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x50)]
pub struct GfxStaticModel {
    pub model: u64,
    pub origin: [f32; 3],
    pub axis: [[f32; 3]; 3],
    pub scale: f32,
    pub pad_3c: Padding<0x14>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x138)]
pub struct Material {
    pub name: u64,
    pub pad_08: Padding<0x110>,
    pub texture_count: u8,
    pub constant_count: u8,
    pub state_bits_count: u8,
    pub state_flags: u8,
    pub camera_region: u8,
    pub pad_11d: Padding<0x03>,
    pub texture_table: u64,
    pub pad_128: Padding<0x10>,
}

#[derive(Debug, Clone, Default, PackedData)]
#[packed(size = 0x10)]
pub struct MaterialTextureDef {
    pub name_hash: u32,
    pub name_start: u8,
    pub name_end: u8,
    pub sampler_state: u8,
    pub semantic: u8,
    pub image: u64,
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
            normal: LAYOUT.normals.decode(vertex.normal),
            uv: unpack_half2(vertex.tex_coord),
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
