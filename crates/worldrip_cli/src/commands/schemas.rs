use clap::Args;
use std::io::{self, Write};
use worldrip_gfx::schema::{Schema, SchemaLayout};
use worldrip_utils::{ok, AnyResult};

#[derive(Args)]
pub struct SchemasCommand {
    /// Only describe this title
    pub schema: Option<Schema>,
}

impl crate::Command for SchemasCommand {
    fn run(self) -> AnyResult {
        let schemas = match self.schema {
            Some(schema) => vec![schema],
            None => Schema::ALL.to_vec(),
        };

        let mut stdout = io::stdout().lock();
        for schema in schemas {
            describe(schema, &mut stdout)?;
        }
        ok()
    }
}

fn describe<W: Write>(schema: Schema, w: &mut W) -> AnyResult {
    let layout = schema.layout();
    let SchemaLayout {
        title,
        pointer_width,
        surface_size,
        vertex_size,
        static_model_size,
        material_size,
        zone_size,
        normals,
        vertex_source,
        face_index_stride,
        unit_scale,
        flags,
        ..
    } = *layout;

    writeln!(w, "{schema} - {title}")?;
    writeln!(w, "  pointers:      {} bytes", pointer_width.size())?;
    writeln!(w, "  surface:       {surface_size:#x} bytes")?;
    if vertex_size != 0 {
        writeln!(w, "  vertex:        {vertex_size:#x} bytes")?;
    }
    if zone_size != 0 {
        writeln!(w, "  zone:          {zone_size:#x} bytes")?;
    }
    writeln!(w, "  static model:  {static_model_size:#x} bytes")?;
    writeln!(w, "  material:      {material_size:#x} bytes")?;
    writeln!(w, "  vertices:      {vertex_source:?}, {normals:?} normals")?;
    writeln!(w, "  faces:         {:?}, stride {face_index_stride}", layout.face_index_base())?;
    if unit_scale != 1.0 {
        writeln!(w, "  unit scale:    {unit_scale}")?;
    }
    if !flags.is_empty() {
        writeln!(w, "  flags:         {flags:?}")?;
    }
    ok()
}
