//! Tiny measurement sets for tests.

#![allow(dead_code)]

use std::path::Path;

use marlu::c32;
use ndarray::prelude::*;
use rubbl_casatables::{GlueDataType, Table, TableCreateMode, TableDesc, TableDescCreateMode};

/// The contents of a measurement set with a single spectral window.
pub struct TestMs {
    /// One (u, v, w) per row \[metres\].
    pub uvw: Vec<[f64; 3]>,
    pub chan_freqs: Vec<f64>,
    pub num_pols: usize,
    /// One `(num_chans, num_pols)` cell per row; this is how rubbl presents
    /// casacore's `(num_pols, num_chans)` cells.
    pub data: Vec<Array2<c32>>,
    pub antenna1: Vec<i32>,
    pub antenna2: Vec<i32>,
    pub scans: Vec<i32>,
    pub times: Vec<f64>,
    /// One value per polarisation per row.
    pub sigma: Vec<Vec<f32>>,
}

impl TestMs {
    /// One row per UVW, with the given channel frequencies and two
    /// polarisations.
    pub fn new(uvw: Vec<[f64; 3]>, chan_freqs: Vec<f64>) -> TestMs {
        TestMs::with_pols(uvw, chan_freqs, 2)
    }

    pub fn with_pols(uvw: Vec<[f64; 3]>, chan_freqs: Vec<f64>, num_pols: usize) -> TestMs {
        let num_rows = uvw.len();
        let num_chans = chan_freqs.len();
        let data = (0..num_rows)
            .map(|i_row| {
                Array2::from_shape_fn((num_chans, num_pols), |(i_chan, i_pol)| {
                    c32::new(
                        (100 * i_row + 10 * i_chan + i_pol) as f32 + 0.25,
                        -((100 * i_row + 10 * i_chan + i_pol) as f32) - 0.5,
                    )
                })
            })
            .collect();
        TestMs {
            uvw,
            chan_freqs,
            num_pols,
            data,
            antenna1: (0..num_rows as i32).collect(),
            antenna2: (0..num_rows as i32).map(|a| a + 1).collect(),
            scans: (0..num_rows as i32).map(|r| 1 + r / 2).collect(),
            times: (0..num_rows).map(|r| 4888561712.0 + r as f64 * 2.0).collect(),
            sigma: (0..num_rows)
                .map(|r| (0..num_pols).map(|p| (r * 10 + p) as f32 + 0.5).collect())
                .collect(),
        }
    }

    /// The UVWs and frequencies used throughout the tests.
    pub fn scenario(chan_freqs: Vec<f64>) -> TestMs {
        TestMs::new(vec![[10.0, 5.0, 0.0], [20.0, 15.0, 0.0]], chan_freqs)
    }

    /// Write this out as a measurement set at `path` (which must not exist).
    pub fn write(&self, path: &Path) {
        let num_rows = self.uvw.len();
        let num_chans = self.chan_freqs.len();
        let num_pols = self.num_pols;

        let mut main_desc = TableDesc::new("MAIN", TableDescCreateMode::TDM_SCRATCH).unwrap();
        main_desc
            .add_array_column(GlueDataType::TpDouble, "UVW", None, Some(&[3]), false, false)
            .unwrap();
        main_desc
            .add_array_column(
                GlueDataType::TpComplex,
                "DATA",
                None,
                Some(&[num_chans as u64, num_pols as u64]),
                false,
                false,
            )
            .unwrap();
        main_desc
            .add_array_column(
                GlueDataType::TpFloat,
                "SIGMA",
                None,
                Some(&[num_pols as u64]),
                false,
                false,
            )
            .unwrap();
        for col in ["ANTENNA1", "ANTENNA2", "SCAN_NUMBER"] {
            main_desc
                .add_scalar_column(GlueDataType::TpInt, col, None, false, false)
                .unwrap();
        }
        main_desc
            .add_scalar_column(GlueDataType::TpDouble, "TIME", None, false, false)
            .unwrap();

        let mut main_table =
            Table::new(path, main_desc, num_rows, TableCreateMode::New).unwrap();
        for i_row in 0..num_rows {
            let row = i_row as u64;
            main_table
                .put_cell("UVW", row, &self.uvw[i_row].to_vec())
                .unwrap();
            main_table.put_cell("DATA", row, &self.data[i_row]).unwrap();
            main_table.put_cell("SIGMA", row, &self.sigma[i_row]).unwrap();
            main_table
                .put_cell("ANTENNA1", row, &self.antenna1[i_row])
                .unwrap();
            main_table
                .put_cell("ANTENNA2", row, &self.antenna2[i_row])
                .unwrap();
            main_table
                .put_cell("SCAN_NUMBER", row, &self.scans[i_row])
                .unwrap();
            main_table.put_cell("TIME", row, &self.times[i_row]).unwrap();
        }
        drop(main_table);

        let mut spw_desc =
            TableDesc::new("SPECTRAL_WINDOW", TableDescCreateMode::TDM_SCRATCH).unwrap();
        spw_desc
            .add_array_column(
                GlueDataType::TpDouble,
                "CHAN_FREQ",
                None,
                Some(&[num_chans as u64]),
                false,
                false,
            )
            .unwrap();
        spw_desc
            .add_scalar_column(GlueDataType::TpInt, "NUM_CHAN", None, false, false)
            .unwrap();
        let mut spw_table = Table::new(
            path.join("SPECTRAL_WINDOW"),
            spw_desc,
            1,
            TableCreateMode::New,
        )
        .unwrap();
        spw_table.put_cell("CHAN_FREQ", 0, &self.chan_freqs).unwrap();
        spw_table
            .put_cell("NUM_CHAN", 0, &(num_chans as i32))
            .unwrap();
        drop(spw_table);

        let mut ddesc_desc =
            TableDesc::new("DATA_DESCRIPTION", TableDescCreateMode::TDM_SCRATCH).unwrap();
        ddesc_desc
            .add_scalar_column(
                GlueDataType::TpInt,
                "SPECTRAL_WINDOW_ID",
                None,
                false,
                false,
            )
            .unwrap();
        let mut ddesc_table = Table::new(
            path.join("DATA_DESCRIPTION"),
            ddesc_desc,
            1,
            TableCreateMode::New,
        )
        .unwrap();
        ddesc_table.put_cell("SPECTRAL_WINDOW_ID", 0, &0_i32).unwrap();
    }
}
