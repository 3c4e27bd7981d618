use clap::Args;
use log::{info, warn};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use worldrip_gfx::{
    export::ExportSet,
    schema::Schema,
    source::RegionSource,
    world::{extract_world, WorldHandles},
};
use worldrip_utils::{file_stem, ok, AnyResult, AnyhowResultExt};

#[derive(Args)]
pub struct ExtractCommand {
    /// Title the memory was dumped from, overrides the one in the description
    #[arg(long, short = 's')]
    pub schema: Option<Schema>,
    /// World description file
    pub description: PathBuf,
    /// Output directory
    #[clap(long, short = 'o')]
    pub output: PathBuf,
    /// Base name of the written files, defaults to the world's name
    #[arg(long, short = 'n')]
    pub name: Option<String>,
}

/// Where to find a world: which dumps to map and where its tables are.
///
/// ```toml
/// schema = "bo2"
/// name = "mp_raid"
///
/// [[regions]]
/// path = "raid.bin"
/// base = 0x10000000
///
/// [world]
/// surfaces = { address = 0x10002000, count = 1200 }
/// vertices = { address = 0x10100000, count = 84000 }
/// indices = { address = 0x10900000, count = 250000 }
/// static_models = { address = 0x10004000, count = 300 }
/// ```
#[derive(Debug, Deserialize)]
pub struct WorldDescription {
    pub schema: Option<Schema>,
    pub name: Option<String>,
    #[serde(default)]
    pub regions: Vec<DumpRegion>,
    #[serde(default)]
    pub world: WorldHandles,
}

/// A memory dump mapped at `base`. Relative paths are resolved against the description file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DumpRegion {
    pub path: PathBuf,
    pub base: u64,
}

impl WorldDescription {
    pub fn load(path: &Path) -> AnyResult<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("An error occurred while reading the description: {err:#?}");
                return Err(err.into());
            }
        };

        match toml::from_str::<WorldDescription>(&text) {
            Ok(description) => Ok(description),
            Err(err) => {
                eprintln!("An error occurred while parsing the description: {err:#?}");
                Err(err.into())
            }
        }
    }

    pub fn map_regions(&self, directory: &Path) -> AnyResult<RegionSource> {
        let mut source = RegionSource::new();
        for region in &self.regions {
            let path = directory.join(&region.path);
            source
                .add_file(region.base, &path)
                .otherwise(format!("couldn't map {}", path.display()))?;
            info!("Mapped {} at {:#x}", path.display(), region.base);
        }
        Ok(source)
    }
}

impl crate::Command for ExtractCommand {
    fn run(self) -> AnyResult {
        let description = WorldDescription::load(&self.description)?;

        let schema = self
            .schema
            .or(description.schema)
            .otherwise("no schema given, pass --schema or set it in the description")?;

        let name = self
            .name
            .or_else(|| description.name.clone())
            .unwrap_or_else(|| file_stem(&self.description.to_string_lossy()).to_owned());

        let directory = self.description.parent().unwrap_or(Path::new(""));
        let source = description.map_regions(directory)?;

        let world = extract_world(schema, &source, &description.world)?;
        info!(
            "Extracted {} vertices, {} faces, {} materials and {} static models",
            world.mesh.vertices().len(),
            world.mesh.faces().len(),
            world.mesh.materials().len(),
            world.document.placed().len(),
        );
        if world.placeholders > 0 {
            info!("Left out {} placeholder models", world.placeholders);
        }
        if !world.skipped.is_empty() {
            warn!("{} records were skipped:", world.skipped.len());
            for skipped in &world.skipped {
                warn!("  - {skipped}");
            }
        }

        let files = ExportSet::new(&world.mesh, &world.document).save(&self.output, &name)?;
        println!(" : Wrote {}", files.obj.display());
        println!(" : Wrote {}", files.mtl.display());
        println!(" : Wrote {}", files.map.display());
        println!(" : Wrote {}", files.search_string.display());

        ok()
    }
}
