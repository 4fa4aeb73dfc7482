use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use ndarray::{Array3, ArrayD, Axis, Ix3};
use ndarray_npy::{NpzReader, ReadNpzError};

use crate::error::{HarnessError, Result};

/// Name of the image array inside a sample archive.
const IMAGE_ARRAY: &str = "x";

/// Reads the image array `x` from a sample `.npz` archive.
///
/// Integer and floating point dtypes are converted to `f32`. A rank-2 array is
/// treated as a single-channel image.
pub fn read_image(path: &Path) -> Result<Array3<f32>> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let load_error = |reason: String| HarnessError::SampleLoad {
        file: file_name.clone(),
        reason,
    };

    let file = File::open(path)?;
    let mut npz = NpzReader::new(file).map_err(|e| load_error(e.to_string()))?;
    let entry = find_entry(&mut npz, IMAGE_ARRAY)
        .map_err(|e| load_error(e.to_string()))?
        .ok_or_else(|| load_error(format!("archive has no '{}' array", IMAGE_ARRAY)))?;

    let raw = read_as_f32(&mut npz, &entry).map_err(load_error)?;
    into_image(raw).map_err(load_error)
}

/// Archive entries are stored as `name.npy`; accept either spelling.
fn find_entry<R: Read + Seek>(
    npz: &mut NpzReader<R>,
    name: &str,
) -> std::result::Result<Option<String>, ReadNpzError> {
    let with_ext = format!("{}.npy", name);
    Ok(npz.names()?.into_iter().find(|n| n == name || *n == with_ext))
}

fn read_as_f32<R: Read + Seek>(npz: &mut NpzReader<R>, entry: &str) -> std::result::Result<ArrayD<f32>, String> {
    if let Ok(array) = npz.by_name::<ndarray::OwnedRepr<f32>, ndarray::IxDyn>(entry) {
        return Ok(array);
    }
    if let Ok(array) = npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::IxDyn>(entry) {
        return Ok(array.mapv(|v| v as f32));
    }
    if let Ok(array) = npz.by_name::<ndarray::OwnedRepr<u8>, ndarray::IxDyn>(entry) {
        return Ok(array.mapv(f32::from));
    }
    if let Ok(array) = npz.by_name::<ndarray::OwnedRepr<u16>, ndarray::IxDyn>(entry) {
        return Ok(array.mapv(f32::from));
    }
    if let Ok(array) = npz.by_name::<ndarray::OwnedRepr<i32>, ndarray::IxDyn>(entry) {
        return Ok(array.mapv(|v| v as f32));
    }
    match npz.by_name::<ndarray::OwnedRepr<i64>, ndarray::IxDyn>(entry) {
        Ok(array) => Ok(array.mapv(|v| v as f32)),
        Err(e) => Err(format!("unsupported dtype for '{}': {}", entry, e)),
    }
}

fn into_image(raw: ArrayD<f32>) -> std::result::Result<Array3<f32>, String> {
    let raw = match raw.ndim() {
        2 => raw.insert_axis(Axis(2)),
        3 => raw,
        n => return Err(format!("expected an image of rank 2 or 3, found rank {}", n)),
    };
    raw.into_dimensionality::<Ix3>()
        .map_err(|e| format!("invalid image shape: {}", e))
}
