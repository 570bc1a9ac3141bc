//! Point-cloud export: extended XYZ (readable back) and legacy VTK.

use crate::atom::Atom;
use crate::error::{AtomError, Result};
use crate::store::AtomStore;
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info_span;

const XYZ_PROPERTIES: &str = "properties=id:I:1:pos:R:3:marker:I:1";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// One line per atom: `id x y z marker`.
    Xyz,
    /// Legacy VTK unstructured grid of vertex cells.
    Vtk,
}

impl Format {
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xyz" | "movie" => Ok(Format::Xyz),
            "vtk" => Ok(Format::Vtk),
            _ => Err(AtomError::UnsupportedFormat(ext.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }
}

/// Extra per-point data written alongside ids and markers in VTK output.
#[derive(Debug, Default)]
pub struct VtkFields<'a> {
    scalars: Vec<(&'a str, &'a [f64])>,
    vectors: Vec<(&'a str, &'a [Vector3<f64>])>,
}

impl<'a> VtkFields<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, name: &'a str, values: &'a [f64]) -> Self {
        self.scalars.push((name, values));
        self
    }

    pub fn vector(mut self, name: &'a str, values: &'a [Vector3<f64>]) -> Self {
        self.vectors.push((name, values));
        self
    }

    fn check(&self, n_atoms: usize) -> Result<()> {
        let lengths = self
            .scalars
            .iter()
            .map(|(name, v)| (*name, v.len()))
            .chain(self.vectors.iter().map(|(name, v)| (*name, v.len())));
        for (name, len) in lengths {
            if len != n_atoms {
                return Err(AtomError::FieldLength {
                    name: name.to_string(),
                    expected: n_atoms,
                    found: len,
                });
            }
        }
        Ok(())
    }
}

pub fn write_xyz(store: &AtomStore, writer: &mut impl Write) -> Result<()> {
    let _span = info_span!("write_xyz", n_atoms = store.size()).entered();
    writeln!(writer, "{}", store.size())?;
    writeln!(writer, "Atoms {}", XYZ_PROPERTIES)?;
    for atom in store {
        let p = atom.point;
        writeln!(writer, "{} {} {} {} {}", atom.id, p.x, p.y, p.z, atom.marker)?;
    }
    Ok(())
}

/// Parses the output of [`write_xyz`]. Blank lines after the header are
/// skipped; a count that disagrees with the atom lines is an error.
pub fn read_xyz(reader: &mut impl BufRead) -> Result<AtomStore> {
    let _span = info_span!("read_xyz").entered();
    let mut lines = reader.lines().enumerate();

    let n_atoms = match lines.next() {
        Some((i, line)) => {
            let line = line?;
            line.trim().parse::<usize>().map_err(|e| AtomError::Parse {
                line: i + 1,
                message: format!("invalid atom count '{}': {}", line.trim(), e),
            })?
        }
        None => {
            return Err(AtomError::Parse {
                line: 1,
                message: "missing atom count".to_string(),
            });
        }
    };
    // comment line
    if let Some((_, line)) = lines.next() {
        line?;
    }

    let mut store = AtomStore::with_capacity(n_atoms);
    for (i, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        store.append(parse_atom(&line, i + 1)?);
    }

    if store.size() != n_atoms {
        return Err(AtomError::SizeMismatch {
            expected: n_atoms,
            found: store.size(),
        });
    }
    Ok(store)
}

fn parse_atom(line: &str, line_no: usize) -> Result<Atom> {
    let parse_err = |message: String| AtomError::Parse {
        line: line_no,
        message,
    };
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 5 {
        return Err(parse_err(format!(
            "expected 5 columns, found {}",
            tokens.len()
        )));
    }
    let int = |s: &str| {
        s.parse::<i32>()
            .map_err(|e| parse_err(format!("invalid integer '{}': {}", s, e)))
    };
    let real = |s: &str| {
        s.parse::<f64>()
            .map_err(|e| parse_err(format!("invalid number '{}': {}", s, e)))
    };
    Ok(Atom::new(
        int(tokens[0])?,
        Point3::new(real(tokens[1])?, real(tokens[2])?, real(tokens[3])?),
        int(tokens[4])?,
    ))
}

pub fn write_vtk(store: &AtomStore, fields: &VtkFields<'_>, writer: &mut impl Write) -> Result<()> {
    let _span = info_span!("write_vtk", n_atoms = store.size()).entered();
    let n = store.size();
    fields.check(n)?;

    writeln!(writer, "# vtk DataFile Version 3.0")?;
    writeln!(writer, "# atom point cloud")?;
    writeln!(writer, "ASCII")?;
    writeln!(writer, "DATASET UNSTRUCTURED_GRID")?;

    writeln!(writer, "POINTS {} double", n)?;
    for atom in store {
        let p = atom.point;
        writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
    }

    // one vertex cell per point
    writeln!(writer, "CELLS {} {}", n, 2 * n)?;
    for i in 0..n {
        writeln!(writer, "1 {}", i)?;
    }
    writeln!(writer, "CELL_TYPES {}", n)?;
    for _ in 0..n {
        writeln!(writer, "1")?;
    }

    writeln!(writer, "POINT_DATA {}", n)?;
    writeln!(writer, "SCALARS id int\nLOOKUP_TABLE default")?;
    for atom in store {
        writeln!(writer, "{}", atom.id)?;
    }
    writeln!(writer, "SCALARS marker int\nLOOKUP_TABLE default")?;
    for atom in store {
        writeln!(writer, "{}", atom.marker)?;
    }
    for (name, values) in &fields.scalars {
        writeln!(writer, "SCALARS {} double\nLOOKUP_TABLE default", name)?;
        for v in values.iter() {
            writeln!(writer, "{}", v)?;
        }
    }
    for (name, values) in &fields.vectors {
        writeln!(writer, "VECTORS {} double", name)?;
        for v in values.iter() {
            writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
        }
    }
    Ok(())
}

impl AtomStore {
    /// Writes the atoms to `path` in the format named by its extension.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let mut writer = BufWriter::new(File::create(path)?);
        match format {
            Format::Xyz => write_xyz(self, &mut writer)?,
            Format::Vtk => write_vtk(self, &VtkFields::new(), &mut writer)?,
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_xyz_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        read_xyz(&mut reader)
    }
}
