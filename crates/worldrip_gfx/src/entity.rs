//! Level editor entities, and the assembler placing static models

use crate::{
    decode::{unpack_quantized_position, unpack_quaternion_i16, Quantization},
    rotation::{axes_to_degrees, euler_to_degrees, quat_to_euler},
    schema::{
        self, ModelRef, Orientation, PlacementOrigin, ReadError, Schema, SchemaFlags,
        StaticModelRecord,
    },
    source::MemorySource,
    Skipped,
};
use glam::Vec3;
use log::{debug, info, warn};

/// Key/value property bag of a map entity. Properties keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entity {
    properties: Vec<(String, String)>,
}

impl Entity {
    pub fn new(classname: &str) -> Self {
        let mut entity = Self::default();
        entity.set("classname", classname);
        entity
    }

    /// The `worldspawn` entity with the engine defaults every map starts with.
    pub fn worldspawn() -> Self {
        let mut entity = Self::new("worldspawn");
        entity
            .set("fsi", "default")
            .set("gravity", "800")
            .set("lodbias", "default")
            .set("lutmaterial", "luts_t7_default")
            .set("numOmniShadowSlices", "24")
            .set("numSpotShadowSlices", "64")
            .set("sky_intensity_factor0", "1")
            .set("sky_intensity_factor1", "1");

        for i in 1..=4 {
            entity.set(&format!("state_alias_{i}"), &format!("State {i}"));
        }

        entity
    }

    /// A static model placement. `angles` are roll, pitch and yaw in degrees.
    pub fn static_model(model: &str, origin: Vec3, angles: Vec3, scale: f32) -> Self {
        let mut entity = Self::new("misc_model");
        entity
            .set("model", model)
            .set(
                "origin",
                &format!("{:.4} {:.4} {:.4}", origin.x, origin.y, origin.z),
            )
            // Y X Z is the order the editor reads them in
            .set(
                "angles",
                &format!("{:.4} {:.4} {:.4}", angles.y, angles.x, angles.z),
            )
            .set("modelscale", &scale.to_string());
        entity
    }

    /// Sets a property, overwriting an existing value in place.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        match self.properties.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_owned(),
            None => self.properties.push((key.to_owned(), value.to_owned())),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn classname(&self) -> &str {
        self.get("classname").unwrap_or_default()
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Ordered list of entities, always starting with `worldspawn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapDocument {
    entities: Vec<Entity>,
}

impl MapDocument {
    pub fn new() -> Self {
        Self {
            entities: vec![Entity::worldspawn()],
        }
    }

    pub fn push(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Every entity except for `worldspawn`.
    pub fn placed(&self) -> &[Entity] {
        &self.entities[1..]
    }
}

impl Default for MapDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// World level tables static model instances refer to.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementTables {
    /// Array of model pointers, used by titles that index unique models
    pub unique_models: u64,
    pub unique_model_count: u32,
    /// Used by titles with quantized origins
    pub origin_quantization: Quantization,
}

#[derive(Debug, Default)]
pub struct EntityAssembly {
    pub document: MapDocument,
    /// Instances dropped for pointing at a placeholder model
    pub placeholders: usize,
    pub skipped: Vec<Skipped>,
}

/// Turns static model instances into placement entities.
pub struct EntityAssembler<'a, S: MemorySource> {
    schema: Schema,
    source: &'a S,
    tables: PlacementTables,
}

impl<'a, S: MemorySource> EntityAssembler<'a, S> {
    pub fn new(schema: Schema, source: &'a S, tables: PlacementTables) -> Self {
        Self {
            schema,
            source,
            tables,
        }
    }

    pub fn assemble(&self, records: &[StaticModelRecord]) -> Result<EntityAssembly, ReadError> {
        let layout = self.schema.layout();
        let mut assembly = EntityAssembly::default();

        for (index, record) in records.iter().enumerate() {
            let name = match self.model_name(record.model) {
                Ok(name) => name,
                Err(e) if e.is_missing_target() => {
                    warn!("Skipping static model {index}: {e}");
                    assembly.skipped.push(Skipped {
                        what: "static model",
                        index,
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            if layout.flags.contains(SchemaFlags::SKIP_PLACEHOLDER_MODELS) && name.starts_with('*')
            {
                debug!("Static model {index} is a placeholder (`{name}`)");
                assembly.placeholders += 1;
                continue;
            }

            let entity = Entity::static_model(
                &name,
                self.origin(record.origin),
                self.angles(record.orientation),
                record.scale,
            );
            assembly.document.push(entity);
        }

        info!(
            "Placed {} static models ({} placeholders, {} skipped)",
            assembly.document.placed().len(),
            assembly.placeholders,
            assembly.skipped.len()
        );

        Ok(assembly)
    }

    fn model_name(&self, model: ModelRef) -> Result<String, ReadError> {
        let pointer = match model {
            ModelRef::Pointer(pointer) => pointer,
            ModelRef::UniqueIndex(index) => {
                if index >= self.tables.unique_model_count {
                    return Err(ReadError::MissingModel {
                        schema: self.schema,
                        index,
                        available: self.tables.unique_model_count,
                    });
                }

                let width = self.schema.layout().pointer_width;
                let address = self.tables.unique_models + u64::from(index) * width.size() as u64;
                self.source
                    .read_pointer(address, width)
                    .map_err(|source| ReadError::Source {
                        schema: self.schema,
                        record: "unique model",
                        address,
                        source,
                    })?
            }
        };

        schema::read_model_name(self.schema, self.source, pointer)
    }

    fn origin(&self, origin: PlacementOrigin) -> Vec3 {
        let layout = self.schema.layout();
        let origin = match origin {
            PlacementOrigin::Float(origin) => origin,
            PlacementOrigin::Quantized(packed) => unpack_quantized_position(
                packed,
                self.tables.origin_quantization,
                layout.flags.contains(SchemaFlags::SWAP_QUANTIZED_XY),
            ),
        };

        origin * layout.unit_scale
    }

    fn angles(&self, orientation: Orientation) -> Vec3 {
        match orientation {
            Orientation::Axes(axes) => axes_to_degrees(axes),
            Orientation::PackedQuaternion(packed) => {
                euler_to_degrees(quat_to_euler(unpack_quaternion_i16(packed)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RegionSource;
    use glam::Mat3;

    #[test]
    fn worldspawn_defaults() {
        let worldspawn = Entity::worldspawn();
        let keys: Vec<_> = worldspawn.properties().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            [
                "classname",
                "fsi",
                "gravity",
                "lodbias",
                "lutmaterial",
                "numOmniShadowSlices",
                "numSpotShadowSlices",
                "sky_intensity_factor0",
                "sky_intensity_factor1",
                "state_alias_1",
                "state_alias_2",
                "state_alias_3",
                "state_alias_4",
            ]
        );
        assert_eq!(worldspawn.get("gravity"), Some("800"));
        assert_eq!(worldspawn.get("state_alias_3"), Some("State 3"));

        let document = MapDocument::new();
        assert_eq!(document.entities()[0].classname(), "worldspawn");
        assert!(document.placed().is_empty());
    }

    #[test]
    fn static_model_properties() {
        let entity = Entity::static_model(
            "foliage_tree_01",
            Vec3::new(1.0, -2.5, 1024.125),
            Vec3::new(10.0, 20.0, 30.0),
            1.0,
        );

        assert_eq!(entity.classname(), "misc_model");
        assert_eq!(entity.get("model"), Some("foliage_tree_01"));
        assert_eq!(entity.get("origin"), Some("1.0000 -2.5000 1024.1250"));
        assert_eq!(entity.get("angles"), Some("20.0000 10.0000 30.0000"));
        assert_eq!(entity.get("modelscale"), Some("1"));
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut entity = Entity::new("info_null");
        entity.set("a", "1").set("b", "2").set("a", "3");
        let properties: Vec<_> = entity.properties().collect();
        assert_eq!(
            properties,
            [("classname", "info_null"), ("a", "3"), ("b", "2")]
        );
    }

    /// A model record at 0x1000 named `*37`, and a unique model table at 0x3000 pointing at it.
    fn placeholder_source() -> RegionSource {
        let mut source = RegionSource::new();
        source
            .add_region(0x1000, 0x2000u64.to_le_bytes().to_vec())
            .add_region(0x2000, b"*37\0".to_vec())
            .add_region(0x3000, 0x1000u64.to_le_bytes().to_vec());
        source
    }

    #[test]
    fn placeholders_are_skipped_where_the_title_uses_them() {
        let source = placeholder_source();
        let tables = PlacementTables {
            unique_models: 0x3000,
            unique_model_count: 1,
            ..Default::default()
        };

        let indexed = StaticModelRecord {
            origin: PlacementOrigin::Quantized(0),
            orientation: Orientation::PackedQuaternion([0, 0, 0, i16::MAX]),
            scale: 1.0,
            model: ModelRef::UniqueIndex(0),
        };
        let assembly = EntityAssembler::new(Schema::InfiniteWarfare, &source, tables)
            .assemble(&[indexed])
            .unwrap();
        assert!(assembly.document.placed().is_empty());
        assert_eq!(assembly.placeholders, 1);

        let direct = StaticModelRecord {
            origin: PlacementOrigin::Float(Vec3::ZERO),
            orientation: Orientation::PackedQuaternion([0, 0, 0, i16::MAX]),
            scale: 1.0,
            model: ModelRef::Pointer(0x1000),
        };
        let assembly = EntityAssembler::new(Schema::BlackOps3, &source, tables)
            .assemble(&[direct])
            .unwrap();
        assert_eq!(assembly.document.placed().len(), 1);
        assert_eq!(assembly.document.placed()[0].get("model"), Some("*37"));
        assert_eq!(
            assembly.document.placed()[0].get("angles"),
            Some("0.0000 0.0000 0.0000")
        );
    }

    #[test]
    fn missing_models_are_skipped() {
        let source = placeholder_source();
        let tables = PlacementTables {
            unique_models: 0x3000,
            unique_model_count: 1,
            ..Default::default()
        };

        let record = |model| StaticModelRecord {
            origin: PlacementOrigin::Float(Vec3::ONE),
            orientation: Orientation::Axes(Mat3::IDENTITY),
            scale: 2.0,
            model,
        };

        // Out of the table, and a dangling pointer
        let assembly = EntityAssembler::new(Schema::InfiniteWarfare, &source, tables)
            .assemble(&[record(ModelRef::UniqueIndex(4))])
            .unwrap();
        assert_eq!(assembly.skipped.len(), 1);

        let assembly = EntityAssembler::new(Schema::WorldAtWar, &source, tables)
            .assemble(&[record(ModelRef::Pointer(0x9000)), record(ModelRef::Pointer(0x1000))])
            .unwrap();
        assert_eq!(assembly.skipped.len(), 1);
        assert_eq!(assembly.skipped[0].index, 0);
        assert_eq!(assembly.document.placed().len(), 1);
        assert_eq!(
            assembly.document.placed()[0].get("modelscale"),
            Some("2")
        );
    }

    #[test]
    fn quantized_origins_swap_and_scale() {
        let source = placeholder_source();
        let tables = PlacementTables {
            origin_quantization: Quantization {
                scale: 2.0,
                offset: [0.0, 0.0, 100.0],
            },
            ..Default::default()
        };

        let assembler = EntityAssembler::new(Schema::InfiniteWarfare, &source, tables);
        let origin = assembler.origin(PlacementOrigin::Quantized(1 | (2 << 21) | (3 << 42)));
        assert_eq!(origin, Vec3::new(4.0, 2.0, 106.0));

        let assembler = EntityAssembler::new(Schema::Ghosts, &source, tables);
        let origin = assembler.origin(PlacementOrigin::Float(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(origin, Vec3::new(2.54, 0.0, 0.0));
    }
}
