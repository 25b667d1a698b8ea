//! FITS helpers, in the same spirit as the ones in hyperdrive.

use std::path::Path;

use fitsio::{
    hdu::{FitsHdu, HduInfo},
    images::ImageDescription,
    FitsFile,
};
use ndarray::prelude::*;

use super::{ExportElement, ExportError};

/// Create a FITS file (replacing anything already at `file`) whose primary HDU
/// is an image of type `T` with the given (C-ordered) shape.
fn fits_create<T: ExportElement>(file: &Path, shape: &[usize]) -> Result<FitsFile, ExportError> {
    let description = ImageDescription {
        data_type: T::IMAGE_TYPE,
        dimensions: shape,
    };
    let fptr = FitsFile::create(file)
        .with_custom_primary(&description)
        .overwrite()
        .open()?;
    Ok(fptr)
}

/// Write `array` as the primary image of a new FITS file.
///
/// The image axes are the same as the array's; FITS readers will report them
/// reversed, as for any C-ordered data. A 0-dimensional array becomes an image
/// with one element.
pub(super) fn fits_write_image<T: ExportElement>(
    file: &Path,
    array: ArrayViewD<T>,
) -> Result<(), ExportError> {
    let shape = match array.shape() {
        [] => vec![1],
        s => s.to_vec(),
    };
    let mut fptr = fits_create::<T>(file, &shape)?;
    let hdu = fptr.primary_hdu()?;
    // Iteration is in logical (row-major) order regardless of the memory
    // layout.
    let data: Vec<T> = array.iter().copied().collect();
    T::write_fits(&hdu, &mut fptr, &data)?;
    Ok(())
}

/// Get the (C-ordered) shape of the image in `hdu`.
fn fits_get_image_size<'a>(file: &Path, hdu: &'a FitsHdu) -> Result<&'a [usize], ExportError> {
    match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => Ok(shape.as_slice()),
        _ => Err(ExportError::NotAnImage(file.to_path_buf())),
    }
}

/// Read the primary image of a FITS file written by [`fits_write_image`].
pub(super) fn fits_read_image<T: ExportElement>(file: &Path) -> Result<ArrayD<T>, ExportError> {
    let mut fptr = FitsFile::open(file)?;
    let hdu = fptr.primary_hdu()?;
    let shape = fits_get_image_size(file, &hdu)?.to_vec();
    let data = T::read_fits(&hdu, &mut fptr)?;
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn non_standard_layout_is_written_logically() {
        let tmp_dir = tempdir().unwrap();
        let file = tmp_dir.path().join("t.fits");
        let a = array![[1_i32, 2, 3], [4, 5, 6]];
        let t = a.t();
        fits_write_image(&file, t.into_dyn()).unwrap();
        let b: ArrayD<i32> = fits_read_image(&file).unwrap();
        assert_eq!(b, t.into_dyn());
    }

    #[test]
    fn overwrites_existing_file() {
        let tmp_dir = tempdir().unwrap();
        let file = tmp_dir.path().join("o.fits");
        fits_write_image(&file, array![1.0_f64, 2.0].into_dyn().view()).unwrap();
        fits_write_image(&file, array![[3.0_f64], [4.0], [5.0]].into_dyn().view()).unwrap();
        let b: ArrayD<f64> = fits_read_image(&file).unwrap();
        assert_eq!(b.shape(), &[3, 1]);
    }

    #[test]
    fn zero_dimensional() {
        let tmp_dir = tempdir().unwrap();
        let file = tmp_dir.path().join("z.fits");
        fits_write_image(&file, arr0(7_i64).into_dyn().view()).unwrap();
        let b: ArrayD<i64> = fits_read_image(&file).unwrap();
        assert_eq!(b, array![7_i64].into_dyn());
    }
}
