// crates/af_io/src/vtk.rs

//! Legacy ASCII VTK 流场写出
//!
//! 节点中心格式下单元即原始网格节点，流场量作为 POINT_DATA 写出：
//! 密度、压力、温度、马赫数、涡粘与速度向量。
//! 单元表直接来自原始网格（VTK 单元类型编码）。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use af_mesh::{ElementKind, RawMesh};
use af_physics::FlowField;

use crate::error::IoResult;

/// VTK 单元类型编码
fn vtk_cell_type(kind: ElementKind) -> u8 {
    match kind {
        ElementKind::Triangle => 5,
        ElementKind::Quadrilateral => 9,
        ElementKind::Tetrahedron => 10,
        ElementKind::Hexahedron => 12,
        ElementKind::Prism => 13,
        ElementKind::Pyramid => 14,
    }
}

/// 写出流场（legacy ASCII UNSTRUCTURED_GRID）
pub fn write_vtk(path: &Path, raw: &RawMesh, state: &FlowField) -> IoResult<()> {
    let mut w = BufWriter::new(File::create(path)?);

    writeln!(w, "# vtk DataFile Version 3.0")?;
    writeln!(w, "AeroFVM flow field")?;
    writeln!(w, "ASCII")?;
    writeln!(w, "DATASET UNSTRUCTURED_GRID")?;

    writeln!(w, "POINTS {} double", raw.points.len())?;
    for p in &raw.points {
        writeln!(w, "{:.12e} {:.12e} {:.12e}", p[0], p[1], p[2])?;
    }

    let total: usize = raw.elements.iter().map(|e| e.nodes.len() + 1).sum();
    writeln!(w, "CELLS {} {}", raw.elements.len(), total)?;
    for elem in &raw.elements {
        write!(w, "{}", elem.nodes.len())?;
        for &n in &elem.nodes {
            write!(w, " {n}")?;
        }
        writeln!(w)?;
    }
    writeln!(w, "CELL_TYPES {}", raw.elements.len())?;
    for elem in &raw.elements {
        writeln!(w, "{}", vtk_cell_type(elem.kind))?;
    }

    let n = state.n_cells();
    writeln!(w, "POINT_DATA {n}")?;

    let scalar = |w: &mut BufWriter<File>, name: &str, values: &dyn Fn(usize) -> f64| -> IoResult<()> {
        writeln!(w, "SCALARS {name} double 1")?;
        writeln!(w, "LOOKUP_TABLE default")?;
        for c in 0..n {
            writeln!(w, "{:.12e}", values(c))?;
        }
        Ok(())
    };

    scalar(&mut w, "density", &|c| state.density[c])?;
    scalar(&mut w, "pressure", &|c| state.pressure[c])?;
    scalar(&mut w, "temperature", &|c| state.temperature[c])?;
    scalar(&mut w, "mach", &|c| {
        state.velocity[c].length() / state.sound_speed[c]
    })?;
    scalar(&mut w, "eddy_viscosity", &|c| state.mu_eddy[c])?;

    writeln!(w, "VECTORS velocity double")?;
    for c in 0..n {
        let v = state.velocity[c];
        writeln!(w, "{:.12e} {:.12e} {:.12e}", v.x, v.y, v.z)?;
    }

    w.flush()?;
    tracing::debug!(path = %path.display(), "流场已写出");
    Ok(())
}
