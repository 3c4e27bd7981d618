//! Whole world extraction
//!
//! Locating the world's tables in the game's memory is the caller's job. They're handed in as a
//! [`WorldHandles`], usually deserialized from a description file.

use crate::{
    decode::Quantization,
    entity::{EntityAssembler, MapDocument, PlacementTables},
    mesh::{GeometryBuffers, Mesh, MeshAssembler},
    schema::{self, Schema},
    source::MemorySource,
    Skipped,
};
use log::{debug, info};
use serde::Deserialize;
use worldrip_utils::{AnyResult, AnyhowResultExt};

/// Address and element count of a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TableHandle {
    pub address: u64,
    pub count: u32,
}

impl TableHandle {
    pub const fn new(address: u64, count: u32) -> Self {
        Self { address, count }
    }
}

/// Locations of a world's tables.
///
/// Tables a title doesn't use can be left out.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldHandles {
    pub surfaces: TableHandle,
    /// Flat or shared vertex buffer, counted in vertices
    pub vertices: TableHandle,
    /// Face index buffer, counted in indices
    pub indices: TableHandle,
    pub static_models: TableHandle,
    /// Table of model pointers, for titles that index unique models
    pub unique_models: TableHandle,
    pub zones: TableHandle,
    pub static_model_quantization: Quantization,
}

#[derive(Debug, Default)]
pub struct ExtractedWorld {
    pub mesh: Mesh,
    pub document: MapDocument,
    /// Vertex offset of every surface, `None` for skipped ones
    pub surface_offsets: Vec<Option<u32>>,
    /// Static models dropped for pointing at a placeholder model
    pub placeholders: usize,
    pub skipped: Vec<Skipped>,
}

/// Reads all of a world's tables and assembles its mesh and entities.
pub fn extract_world<S: MemorySource>(
    schema: Schema,
    source: &S,
    handles: &WorldHandles,
) -> AnyResult<ExtractedWorld> {
    let layout = schema.layout();
    info!("Extracting a world of {}", layout.title);

    let surface_table = read_table(source, "surface", handles.surfaces, layout.surface_size)?;
    let surfaces = (0..handles.surfaces.count as usize)
        .map(|i| schema::read_surface(schema, &surface_table, i))
        .collect::<Result<Vec<_>, _>>()?;
    debug!("Read {} surfaces", surfaces.len());

    let zone_table = read_table(source, "zone", handles.zones, layout.zone_size)?;
    let zones = (0..handles.zones.count as usize)
        .map(|i| schema::read_zone(schema, &zone_table, i))
        .collect::<Result<Vec<_>, _>>()?;

    let buffers = GeometryBuffers {
        vertices: read_table(source, "vertex", handles.vertices, layout.vertex_size)?,
        indices: read_table(source, "index", handles.indices, 2)?,
        zones,
    };

    let assembly = MeshAssembler::new(schema, source, &buffers).assemble(&surfaces)?;

    let model_table = read_table(
        source,
        "static model",
        handles.static_models,
        layout.static_model_size,
    )?;
    let static_models = (0..handles.static_models.count as usize)
        .map(|i| schema::read_static_model(schema, &model_table, i))
        .collect::<Result<Vec<_>, _>>()?;
    debug!("Read {} static models", static_models.len());

    let tables = PlacementTables {
        unique_models: handles.unique_models.address,
        unique_model_count: handles.unique_models.count,
        origin_quantization: handles.static_model_quantization,
    };
    let entities = EntityAssembler::new(schema, source, tables).assemble(&static_models)?;

    let mut skipped = assembly.skipped;
    skipped.extend(entities.skipped);

    Ok(ExtractedWorld {
        mesh: assembly.mesh,
        document: entities.document,
        surface_offsets: assembly.surface_offsets,
        placeholders: entities.placeholders,
        skipped,
    })
}

fn read_table<S: MemorySource>(
    source: &S,
    what: &str,
    table: TableHandle,
    stride: usize,
) -> AnyResult<Vec<u8>> {
    if table.count == 0 || stride == 0 {
        return Ok(Vec::new());
    }

    source
        .read_bytes(table.address, table.count as usize * stride)
        .otherwise(format!(
            "couldn't read the {what} table ({} entries at {:#x})",
            table.count, table.address
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        export::{write_mtl, write_obj},
        schema::{bo2, bo3, ghosts, iw, mw2, waw, ReadError},
        source::RegionSource,
    };
    use glam::{Vec2, Vec3};
    use worldrip_utils::{
        align,
        packed::{to_packed_bytes, PackedData},
    };

    /// Lays out records in a synthetic address space.
    struct Fixture {
        source: RegionSource,
        next: u64,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                source: RegionSource::new(),
                next: 0x10000,
            }
        }

        fn put(&mut self, bytes: Vec<u8>) -> u64 {
            let address = self.next;
            self.next = align(address + bytes.len() as u64 + 1, 0x100);
            self.source.add_region(address, bytes);
            address
        }

        fn records<T: PackedData>(&mut self, records: &[T]) -> u64 {
            let bytes = records
                .iter()
                .flat_map(|r| to_packed_bytes(r).unwrap())
                .collect();
            self.put(bytes)
        }

        fn string(&mut self, s: &str) -> u64 {
            self.put(format!("{s}\0").into_bytes())
        }

        fn indices(&mut self, indices: &[u16]) -> u64 {
            self.put(indices.iter().flat_map(|i| i.to_le_bytes()).collect())
        }

        /// A record with a name pointer at `name_offset`.
        fn named(&mut self, name: &str, name_offset: usize, width: usize) -> u64 {
            let name = self.string(name);
            let mut bytes = vec![0; name_offset];
            bytes.extend_from_slice(&name.to_le_bytes()[..width]);
            self.put(bytes)
        }

        fn bo2_material(&mut self, name: &str, diffuse: &str) -> u32 {
            let image = self.named(diffuse, 0x28, 4);
            let table = self.records(&[bo2::MaterialTextureDef {
                semantic: 2,
                image: image as u32,
                ..Default::default()
            }]);
            let name = self.string(name);
            self.records(&[bo2::Material {
                name: name as u32,
                texture_count: 1,
                texture_table: table as u32,
                ..Default::default()
            }]) as u32
        }

        fn bo2_vertices(&mut self, count: usize) -> TableHandle {
            let vertices: Vec<_> = (0..count)
                .map(|x| bo2::GfxVertex {
                    xyz: [x as f32, 0.0, 0.0],
                    ..Default::default()
                })
                .collect();
            TableHandle::new(self.records(&vertices), count as u32)
        }
    }

    fn bo2_surface(
        first_vertex: u32,
        vertex_count: u16,
        base_index: u32,
        tri_count: u16,
        material: u32,
    ) -> bo2::GfxSurface {
        bo2::GfxSurface {
            first_vertex,
            vertex_count,
            base_index,
            tri_count,
            material,
            ..Default::default()
        }
    }

    fn to_string(f: impl FnOnce(&mut Vec<u8>) -> AnyResult) -> String {
        let mut buffer = Vec::new();
        f(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn single_textured_triangle() {
        let mut fixture = Fixture::new();
        let material = fixture.bo2_material("m1", "tex");
        let handles = WorldHandles {
            surfaces: TableHandle::new(fixture.records(&[bo2_surface(0, 4, 0, 1, material)]), 1),
            vertices: fixture.bo2_vertices(4),
            indices: TableHandle::new(fixture.indices(&[0, 1, 2]), 3),
            ..Default::default()
        };

        let world = extract_world(Schema::BlackOps2, &fixture.source, &handles).unwrap();
        assert!(world.skipped.is_empty());
        assert_eq!(world.mesh.vertices()[3].position, Vec3::new(3.0, 0.0, 0.0));

        let obj = to_string(|w| write_obj(&world.mesh, "level.mtl", w));
        assert_eq!(obj.lines().filter(|l| l.starts_with("v ")).count(), 4);
        assert_eq!(obj.lines().filter(|&l| l == "usemtl m1").count(), 1);
        let faces: Vec<_> = obj.lines().filter(|l| l.starts_with("f ")).collect();
        assert_eq!(faces, ["f 1/1/1 3/3/3 2/2/2"]);

        let mtl = to_string(|w| write_mtl(&world.mesh, w));
        assert!(mtl.lines().any(|l| l == "newmtl m1"));
        assert!(mtl.lines().any(|l| l == "map_Kd tex.png"));
    }

    #[test]
    fn empty_world() {
        let fixture = Fixture::new();
        let world =
            extract_world(Schema::BlackOps2, &fixture.source, &WorldHandles::default()).unwrap();

        assert!(world.mesh.is_empty());
        assert_eq!(world.document.entities().len(), 1);

        let obj = to_string(|w| write_obj(&world.mesh, "level.mtl", w));
        assert!(obj.lines().all(|l| l.starts_with('#') || l.starts_with("mtllib")));
        assert_eq!(to_string(|w| write_mtl(&world.mesh, w)), "");
    }

    #[test]
    fn degenerate_triangles_are_dropped() {
        let mut fixture = Fixture::new();
        let material = fixture.bo2_material("m1", "tex");
        let handles = WorldHandles {
            surfaces: TableHandle::new(fixture.records(&[bo2_surface(0, 3, 0, 2, material)]), 1),
            vertices: fixture.bo2_vertices(3),
            indices: TableHandle::new(fixture.indices(&[0, 1, 1, 0, 1, 2]), 6),
            ..Default::default()
        };

        let world = extract_world(Schema::BlackOps2, &fixture.source, &handles).unwrap();
        assert_eq!(world.mesh.faces().len(), 1);
        assert_eq!(world.mesh.faces()[0].indices, [0, 1, 2]);
    }

    #[test]
    fn surface_offsets_accumulate() {
        let mut fixture = Fixture::new();
        let material = fixture.bo2_material("m1", "tex");
        let counts = [3u16, 4, 5];

        let mut surfaces = Vec::new();
        let mut first_vertex = 0;
        for (i, &count) in counts.iter().enumerate() {
            surfaces.push(bo2_surface(first_vertex, count, i as u32 * 3, 1, material));
            first_vertex += u32::from(count);
        }

        let handles = WorldHandles {
            surfaces: TableHandle::new(fixture.records(&surfaces), 3),
            vertices: fixture.bo2_vertices(12),
            indices: TableHandle::new(fixture.indices(&[0, 1, 2, 1, 2, 3, 2, 3, 4]), 9),
            ..Default::default()
        };

        let world = extract_world(Schema::BlackOps2, &fixture.source, &handles).unwrap();
        assert_eq!(world.surface_offsets, [Some(0), Some(3), Some(7)]);
        assert_eq!(world.mesh.vertices().len(), 12);

        let faces: Vec<_> = world.mesh.faces().iter().map(|f| f.indices).collect();
        assert_eq!(faces, [[0, 1, 2], [4, 5, 6], [9, 10, 11]]);
    }

    #[test]
    fn missing_materials_skip_the_surface() {
        let mut fixture = Fixture::new();
        let material = fixture.bo2_material("m1", "tex");
        let surfaces = [
            bo2_surface(0, 3, 0, 1, 0x0BAD_0000),
            bo2_surface(3, 3, 0, 1, material),
        ];

        let handles = WorldHandles {
            surfaces: TableHandle::new(fixture.records(&surfaces), 2),
            vertices: fixture.bo2_vertices(6),
            indices: TableHandle::new(fixture.indices(&[0, 1, 2]), 3),
            ..Default::default()
        };

        let world = extract_world(Schema::BlackOps2, &fixture.source, &handles).unwrap();
        assert_eq!(world.skipped.len(), 1);
        assert_eq!(world.skipped[0].index, 0);
        assert_eq!(world.surface_offsets, [None, Some(0)]);
        assert_eq!(world.mesh.vertices().len(), 3);
        assert_eq!(world.mesh.vertices()[0].position.x, 3.0);
    }

    #[test]
    fn out_of_range_surfaces_fail_fast() {
        let mut fixture = Fixture::new();
        let material = fixture.bo2_material("m1", "tex");
        let handles = WorldHandles {
            surfaces: TableHandle::new(fixture.records(&[bo2_surface(2, 4, 0, 1, material)]), 1),
            vertices: fixture.bo2_vertices(4),
            indices: TableHandle::new(fixture.indices(&[0, 1, 2]), 3),
            ..Default::default()
        };

        let error = extract_world(Schema::BlackOps2, &fixture.source, &handles).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ReadError>(),
            Some(ReadError::RangeOutOfBounds {
                record: "vertex",
                first: 2,
                count: 4,
                available: 4,
                ..
            })
        ));

        // The surface table claims more records than were mapped
        let handles = WorldHandles {
            surfaces: TableHandle::new(handles.surfaces.address, 2),
            ..handles
        };
        assert!(extract_world(Schema::BlackOps2, &fixture.source, &handles).is_err());
    }

    #[test]
    fn shared_buffer_indices_are_relative_to_the_surface() {
        let mut fixture = Fixture::new();
        let name = fixture.string("shared");
        let material = fixture.records(&[waw::Material {
            name: name as u32,
            ..Default::default()
        }]) as u32;

        let vertices: Vec<_> = (0..6)
            .map(|x| waw::GfxVertex {
                xyz: [x as f32, 1.0, 0.0],
                tex_coord: [0.0, 0.25],
                ..Default::default()
            })
            .collect();
        let surfaces = [
            waw::GfxSurface {
                first_vertex: 0,
                vertex_count: 3,
                tri_count: 1,
                material,
                ..Default::default()
            },
            waw::GfxSurface {
                first_vertex: 3,
                vertex_count: 3,
                tri_count: 1,
                base_index: 3,
                material,
                ..Default::default()
            },
        ];

        let handles = WorldHandles {
            surfaces: TableHandle::new(fixture.records(&surfaces), 2),
            vertices: TableHandle::new(fixture.records(&vertices), 6),
            indices: TableHandle::new(fixture.indices(&[0, 1, 2, 0, 2, 1]), 6),
            ..Default::default()
        };

        let world = extract_world(Schema::WorldAtWar, &fixture.source, &handles).unwrap();
        assert_eq!(world.surface_offsets, [Some(0), Some(3)]);
        assert_eq!(world.mesh.vertices().len(), 6);
        assert_eq!(world.mesh.vertices()[0].uv.y, 0.75);

        let faces: Vec<_> = world.mesh.faces().iter().map(|f| f.indices).collect();
        assert_eq!(faces, [[0, 1, 2], [3, 5, 4]]);
        assert_eq!(world.mesh.materials().len(), 1);
        assert_eq!(world.mesh.materials()[0].diffuse, None);
    }

    #[test]
    fn triangle_strided_indices_and_unit_scale() {
        let mut fixture = Fixture::new();
        let name = fixture.string("*mc/mtl_floor.mat");
        let material = fixture.records(&[ghosts::Material {
            name,
            ..Default::default()
        }]);

        let vertices: Vec<_> = (0..3)
            .map(|x| ghosts::GfxVertex {
                xyz: [x as f32, 0.0, 10.0],
                ..Default::default()
            })
            .collect();
        let surface = ghosts::GfxSurface {
            base_index: 1,
            tri_count: 1,
            vertex_count: 3,
            material,
            ..Default::default()
        };

        let handles = WorldHandles {
            surfaces: TableHandle::new(fixture.records(&[surface]), 1),
            vertices: TableHandle::new(fixture.records(&vertices), 3),
            indices: TableHandle::new(fixture.indices(&[0, 0, 0, 2, 1, 0]), 6),
            ..Default::default()
        };

        let world = extract_world(Schema::Ghosts, &fixture.source, &handles).unwrap();
        assert_eq!(world.mesh.faces()[0].indices, [2, 1, 0]);
        assert_eq!(&*world.mesh.faces()[0].material, "mtl_floor");
        let position = world.mesh.vertices()[1].position;
        assert!(position.abs_diff_eq(Vec3::new(2.54, 0.0, 25.4), 1e-4), "{position}");
    }

    #[test]
    fn zones_and_unique_models() {
        let mut fixture = Fixture::new();
        let name = fixture.string("zone_mtl");
        let material = fixture.records(&[iw::Material {
            name,
            ..Default::default()
        }]);

        // Six vertices, the first three used by surface 0, the rest by surface 1
        let positions: Vec<_> = (0..6u64)
            .map(|x| iw::ZonePosition {
                packed: x | (1 << 21) | (2 << 42),
            })
            .collect();
        let draw_data = vec![iw::ZoneDrawData::default(); 6];
        let uvs = vec![iw::ZoneUv::default(); 6];

        let zone = iw::GfxZone {
            position_buffer: fixture.records(&positions),
            position_size: 6 * 8,
            draw_data_buffer: fixture.records(&draw_data),
            draw_data_size: 6 * 8,
            uv_buffer: fixture.records(&uvs),
            uv_size: 6 * 4,
            index_buffer: fixture.indices(&[0, 1, 2, 2, 1, 0]),
            index_size: 6 * 2,
            ..Default::default()
        };

        let link = |zone_index, first: u32| iw::GfxSurfaceShared {
            zone_index,
            position_offset: first * 8,
            draw_data_offset: first * 8,
            uv_offset: first * 4,
            index_offset: first * 2,
            quantize_scale: 1.0,
            ..Default::default()
        };
        let links = [link(0, 0), link(0, 3), link(7, 0)];

        let mut surfaces = Vec::new();
        for shared in links {
            surfaces.push(iw::GfxSurface {
                tri_count: 1,
                vertex_count: 3,
                shared: fixture.records(&[shared]),
                material,
                ..Default::default()
            });
        }

        let tree = fixture.named("foliage_tree", 0, 8);
        let placeholder = fixture.named("*37", 0, 8);
        let instances = [
            iw::GfxStaticModel {
                packed_origin: 1 | (2 << 21) | (3 << 42),
                orientation: [0, 0, 0, i16::MAX],
                scale: 1.5,
                unique_model: 0,
                ..Default::default()
            },
            iw::GfxStaticModel {
                unique_model: 1,
                ..Default::default()
            },
            iw::GfxStaticModel {
                unique_model: 2,
                ..Default::default()
            },
        ];
        let unique_models: Vec<u8> = [tree, placeholder]
            .iter()
            .flat_map(|p| p.to_le_bytes())
            .collect();

        let handles = WorldHandles {
            surfaces: TableHandle::new(fixture.records(&surfaces), 3),
            zones: TableHandle::new(fixture.records(&[zone]), 1),
            static_models: TableHandle::new(fixture.records(&instances), 3),
            unique_models: TableHandle::new(fixture.put(unique_models), 2),
            static_model_quantization: Quantization {
                scale: 1.0,
                offset: [0.0, 0.0, 0.0],
            },
            ..Default::default()
        };

        let world = extract_world(Schema::InfiniteWarfare, &fixture.source, &handles).unwrap();

        // The third surface points at a zone that doesn't exist
        assert_eq!(world.surface_offsets, [Some(0), Some(3), None]);
        assert_eq!(world.mesh.vertices().len(), 6);
        assert_eq!(world.mesh.vertices()[4].position, Vec3::new(4.0, 1.0, 2.0));

        let faces: Vec<_> = world.mesh.faces().iter().map(|f| f.indices).collect();
        assert_eq!(faces, [[0, 1, 2], [5, 4, 3]]);

        // One tree, one placeholder and one instance past the unique model table
        assert_eq!(world.placeholders, 1);
        assert_eq!(world.skipped.len(), 2);
        let placed = world.document.placed();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].get("model"), Some("foliage_tree"));
        assert_eq!(placed[0].get("origin"), Some("2.0000 1.0000 3.0000"));
        assert_eq!(placed[0].get("modelscale"), Some("1.5"));
    }

    #[test]
    fn zone_skips_leave_no_material_behind() {
        let mut fixture = Fixture::new();
        let name = fixture.string("orphan_mtl");
        let material = fixture.records(&[iw::Material {
            name,
            ..Default::default()
        }]);
        let shared = fixture.records(&[iw::GfxSurfaceShared {
            zone_index: 9,
            quantize_scale: 1.0,
            ..Default::default()
        }]);
        let surface = iw::GfxSurface {
            tri_count: 1,
            vertex_count: 3,
            shared,
            material,
            ..Default::default()
        };

        let handles = WorldHandles {
            surfaces: TableHandle::new(fixture.records(&[surface]), 1),
            ..Default::default()
        };

        let world = extract_world(Schema::InfiniteWarfare, &fixture.source, &handles).unwrap();
        assert_eq!(world.skipped.len(), 1);
        assert_eq!(world.surface_offsets, [None]);
        assert!(world.mesh.faces().is_empty());
        assert!(world.mesh.materials().is_empty());
        assert_eq!(to_string(|w| write_mtl(&world.mesh, w)), "");
    }

    #[test]
    fn material_first_surfaces_and_direct_placeholders() {
        let mut fixture = Fixture::new();
        let image = fixture.named(r"images\crate_col.iwi", 0x20, 4);
        let table = fixture.records(&[mw2::MaterialTextureDef {
            semantic: 2,
            image: image as u32,
            ..Default::default()
        }]);
        let name = fixture.string("wc/mtl_crate");
        let material = fixture.records(&[mw2::Material {
            name: name as u32,
            texture_count: 1,
            texture_table: table as u32,
            ..Default::default()
        }]) as u32;

        let vertices: Vec<_> = (0..3)
            .map(|x| mw2::GfxVertex {
                xyz: [x as f32, 2.0, 0.0],
                tex_coord: [0x3800, 0x3400],
                normal: u32::from_le_bytes([127, 0, 254, 63]),
                ..Default::default()
            })
            .collect();
        let surface = mw2::GfxSurface {
            material,
            vertex_count: 3,
            tri_count: 1,
            ..Default::default()
        };

        let crate_model = fixture.named("com_crate_01", 0, 4);
        let placeholder = fixture.named("*37", 0, 4);
        let instance = |model: u64| mw2::GfxStaticModel {
            origin: [8.0, 16.0, -4.0],
            axis: [[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            scale: 0.5,
            model: model as u32,
            ..Default::default()
        };

        let handles = WorldHandles {
            surfaces: TableHandle::new(fixture.records(&[surface]), 1),
            vertices: TableHandle::new(fixture.records(&vertices), 3),
            indices: TableHandle::new(fixture.indices(&[0, 1, 2]), 3),
            static_models: TableHandle::new(
                fixture.records(&[instance(placeholder), instance(crate_model)]),
                2,
            ),
            ..Default::default()
        };

        let world = extract_world(Schema::ModernWarfare2, &fixture.source, &handles).unwrap();
        assert!(world.skipped.is_empty());
        assert_eq!(world.mesh.faces().len(), 1);
        assert_eq!(&*world.mesh.faces()[0].material, "mtl_crate");

        let vertex = world.mesh.vertices()[2];
        assert_eq!(vertex.position, Vec3::new(2.0, 2.0, 0.0));
        assert_eq!(vertex.uv, Vec2::new(0.5, 0.75));
        assert!(vertex.normal.abs_diff_eq(Vec3::new(0.0, -1.0, 1.0), 1e-3));

        let mtl = to_string(|w| write_mtl(&world.mesh, w));
        assert!(mtl.lines().any(|l| l == "map_Kd crate_col.png"));

        assert_eq!(world.placeholders, 1);
        let placed = world.document.placed();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].get("model"), Some("com_crate_01"));
        assert_eq!(placed[0].get("origin"), Some("8.0000 16.0000 -4.0000"));
        assert_eq!(placed[0].get("angles"), Some("0.0000 0.0000 90.0000"));
        assert_eq!(placed[0].get("modelscale"), Some("0.5"));
    }

    #[test]
    fn tangent_frames_and_packed_quaternions() {
        let mut fixture = Fixture::new();
        let defs: Vec<_> = [(1, "wall_col"), (2, "wall_nml"), (3, "wall_spec")]
            .into_iter()
            .map(|(semantic, image)| bo3::MaterialTextureDef {
                semantic,
                image: fixture.named(&format!("images/{image}.iwi"), 0xF8, 8),
                ..Default::default()
            })
            .collect();
        let table = fixture.records(&defs);
        let name = fixture.string("mtl_wall");
        let material = fixture.records(&[bo3::Material {
            name,
            texture_count: 3,
            texture_table: table,
            ..Default::default()
        }]);

        // Tangent frame of a quarter turn around Z
        let vertices: Vec<_> = (0..3)
            .map(|x| bo3::GfxVertex {
                xyz: [0.0, x as f32, 0.0],
                tangent_frame: (3 << 30) | (511 << 20),
                ..Default::default()
            })
            .collect();
        let surface = bo3::GfxSurface {
            vertex_count: 3,
            tri_count: 1,
            material,
            ..Default::default()
        };

        let model = fixture.named("*12", 0, 8);
        let instance = bo3::GfxStaticModel {
            origin: [1.0, 2.0, 3.0],
            orientation: [0, 0, 23170, 23170],
            scale: 1.0,
            model,
            ..Default::default()
        };

        let handles = WorldHandles {
            surfaces: TableHandle::new(fixture.records(&[surface]), 1),
            vertices: TableHandle::new(fixture.records(&vertices), 3),
            indices: TableHandle::new(fixture.indices(&[0, 1, 2]), 3),
            static_models: TableHandle::new(fixture.records(&[instance]), 1),
            ..Default::default()
        };

        let world = extract_world(Schema::BlackOps3, &fixture.source, &handles).unwrap();
        assert!(world.skipped.is_empty());
        for vertex in world.mesh.vertices() {
            assert!(vertex.normal.abs_diff_eq(Vec3::Z, 1e-3), "{}", vertex.normal);
        }

        let mtl = to_string(|w| write_mtl(&world.mesh, w));
        assert_eq!(
            mtl,
            "newmtl mtl_wall\nillum 4\nKd 0.00 0.00 0.00\nKa 0.00 0.00 0.00\nKs 0.50 0.50 0.50\n\
             map_Kd wall_col.png\nmap_bump wall_nml.png\nmap_Ks wall_spec.png\n\n"
        );

        // Placeholder names are kept on this title
        assert_eq!(world.placeholders, 0);
        let placed = world.document.placed();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].get("model"), Some("*12"));
        assert_eq!(placed[0].get("angles"), Some("0.0000 0.0000 90.0000"));
    }

    #[test]
    fn dangling_images_keep_the_surface() {
        let mut fixture = Fixture::new();
        let table = fixture.records(&[bo2::MaterialTextureDef {
            semantic: 2,
            image: 0x0BAD_0000,
            ..Default::default()
        }]);
        let name = fixture.string("mtl_lost");
        let material = fixture.records(&[bo2::Material {
            name: name as u32,
            texture_count: 1,
            texture_table: table as u32,
            ..Default::default()
        }]) as u32;

        let handles = WorldHandles {
            surfaces: TableHandle::new(fixture.records(&[bo2_surface(0, 3, 0, 1, material)]), 1),
            vertices: fixture.bo2_vertices(3),
            indices: TableHandle::new(fixture.indices(&[0, 1, 2]), 3),
            ..Default::default()
        };

        let world = extract_world(Schema::BlackOps2, &fixture.source, &handles).unwrap();
        assert!(world.skipped.is_empty());
        assert_eq!(world.surface_offsets, [Some(0)]);
        assert_eq!(world.mesh.faces().len(), 1);
        assert_eq!(world.mesh.materials().len(), 1);
        assert_eq!(world.mesh.materials()[0].name, "mtl_lost");
        assert_eq!(world.mesh.materials()[0].diffuse, None);
    }
}
