//! Reference diesel fuel consumption data and the fitting helpers built on it.

use std::io::Read;

use crate::error::InputError;

/// Litres per US gallon.
pub const LITRES_PER_GALLON: f64 = 3.7854;

/// Load fractions of the built-in table columns.
pub const REFERENCE_LOAD_FRACTIONS: [f64; 4] = [0.25, 0.5, 0.75, 1.0];

/// Generator size (kW) and consumption at 1/4, 1/2, 3/4 and full load (gal/h).
const REFERENCE_GAL_PER_H: [(f64, [f64; 4]); 25] = [
    (20.0, [0.6, 0.9, 1.3, 1.6]),
    (30.0, [1.3, 1.8, 2.4, 2.9]),
    (40.0, [1.6, 2.3, 3.2, 4.0]),
    (60.0, [1.8, 2.9, 3.8, 4.8]),
    (75.0, [2.4, 3.4, 4.6, 6.1]),
    (100.0, [2.6, 4.1, 5.8, 7.4]),
    (125.0, [3.1, 5.0, 7.1, 9.1]),
    (135.0, [3.3, 5.4, 7.6, 9.8]),
    (150.0, [3.6, 5.9, 8.4, 10.9]),
    (175.0, [4.1, 6.8, 9.7, 12.7]),
    (200.0, [4.7, 7.7, 11.0, 14.4]),
    (230.0, [5.3, 8.8, 12.5, 16.6]),
    (250.0, [5.7, 9.5, 13.6, 18.0]),
    (300.0, [6.8, 11.3, 16.1, 21.5]),
    (350.0, [7.9, 13.1, 18.7, 25.1]),
    (400.0, [8.9, 14.9, 21.3, 28.6]),
    (500.0, [11.0, 18.5, 26.4, 35.7]),
    (600.0, [13.2, 22.0, 31.5, 42.8]),
    (750.0, [16.3, 27.4, 39.3, 53.4]),
    (1000.0, [21.6, 36.4, 52.1, 71.1]),
    (1250.0, [26.9, 45.3, 65.0, 88.8]),
    (1500.0, [32.2, 54.3, 77.8, 106.5]),
    (1750.0, [37.5, 63.2, 90.7, 124.2]),
    (2000.0, [42.8, 72.2, 103.5, 141.9]),
    (2250.0, [48.1, 81.1, 116.4, 159.6]),
];

/// Fuel consumption of reference generators at fixed load fractions.
///
/// Rows are sorted by generator size; consumption is stored in L/h.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelConsumptionTable {
    sizes_kw: Vec<f64>,
    litres_per_h: Vec<Vec<f64>>,
}

impl FuelConsumptionTable {
    /// Built-in table of typical diesel generator consumption.
    pub fn reference() -> Self {
        let (sizes_kw, litres_per_h) = REFERENCE_GAL_PER_H
            .iter()
            .map(|(size, gal)| {
                let litres: Vec<f64> = gal.iter().map(|g| g * LITRES_PER_GALLON).collect();
                (*size, litres)
            })
            .unzip();
        Self {
            sizes_kw,
            litres_per_h,
        }
    }

    /// Reads a table from CSV: a header row, then one row per generator with
    /// its size in kW followed by consumption in gal/h for each load fraction.
    ///
    /// # Errors
    ///
    /// Returns an `InputError` on malformed CSV, non-numeric cells, rows of
    /// differing length or negative values.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, InputError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let mut rows: Vec<Vec<f64>> = Vec::new();
        for (idx, record) in rdr.deserialize::<Vec<f64>>().enumerate() {
            let row = record?;
            if let Some(first) = rows.first() {
                if first.len() != row.len() {
                    return Err(InputError::Ragged {
                        row: idx + 1,
                        expected: first.len(),
                        found: row.len(),
                    });
                }
            }
            if let Some(&value) = row.iter().find(|v| **v < 0.0) {
                return Err(InputError::Negative {
                    row: idx + 1,
                    field: "fuel table",
                    value,
                });
            }
            rows.push(row);
        }
        if rows.len() < 2 {
            return Err(InputError::TooShort(rows.len()));
        }

        rows.sort_by(|a, b| a[0].total_cmp(&b[0]));
        if let Some(w) = rows.windows(2).find(|w| w[0][0] == w[1][0]) {
            return Err(InputError::DuplicateSize { size_kw: w[0][0] });
        }
        let (sizes_kw, litres_per_h) = rows
            .into_iter()
            .map(|row| {
                let litres: Vec<f64> =
                    row[1..].iter().map(|g| g * LITRES_PER_GALLON).collect();
                (row[0], litres)
            })
            .unzip();
        Ok(Self {
            sizes_kw,
            litres_per_h,
        })
    }

    /// Number of load-fraction columns.
    pub fn columns(&self) -> usize {
        self.litres_per_h.first().map_or(0, Vec::len)
    }

    /// Consumption (L/h) of a generator of nominal size `p_nom` at each load
    /// fraction, interpolated between neighbouring table rows.
    ///
    /// A zero-size, zero-consumption row is assumed below the table. Sizes
    /// beyond the last entry are extrapolated from the last two rows, up to one
    /// table spacing; further out `None` is returned.
    pub fn interpolate(&self, p_nom: f64) -> Option<Vec<f64>> {
        let mut sizes = self.sizes_kw.clone();
        let mut rows = self.litres_per_h.clone();
        if sizes.first().is_some_and(|s| *s != 0.0) {
            sizes.insert(0, 0.0);
            rows.insert(0, vec![0.0; self.columns()]);
        }
        let last = sizes.len().checked_sub(1)?;
        if last == 0 {
            return None;
        }

        let lower = if p_nom < sizes[0] {
            0
        } else {
            sizes
                .windows(2)
                .position(|w| w[0] <= p_nom && p_nom < w[1])
                .unwrap_or(last)
        };

        let lower = if lower == last {
            let spacing = (sizes[last] - sizes[last - 1]).abs();
            if (p_nom - sizes[last]).abs() > spacing {
                return None;
            }
            last - 1
        } else {
            lower
        };

        let (p0, p1) = (sizes[lower], sizes[lower + 1]);
        Some(
            rows[lower]
                .iter()
                .zip(&rows[lower + 1])
                .map(|(c0, c1)| c0 + (c1 - c0) / (p1 - p0) * (p_nom - p0))
                .collect(),
        )
    }
}

/// Ordinary least-squares line through `(x, y)` points.
///
/// # Returns
///
/// `(slope, intercept)`, or `None` with fewer than two distinct `x` values.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;
    let (sxy, sxx) = x[..n]
        .iter()
        .zip(&y[..n])
        .fold((0.0, 0.0), |(sxy, sxx), (xi, yi)| {
            let dx = xi - mean_x;
            (sxy + dx * (yi - mean_y), sxx + dx * dx)
        });
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_table_shape() {
        let t = FuelConsumptionTable::reference();
        assert_eq!(t.columns(), 4);
        assert_eq!(t.sizes_kw.len(), 25);
        assert!((t.litres_per_h[0][3] - 1.6 * LITRES_PER_GALLON).abs() < 1e-12);
    }

    #[test]
    fn test_interpolates_between_rows() {
        let t = FuelConsumptionTable::reference();
        let c = t.interpolate(375.0).unwrap();
        let expected = (25.1 + 28.6) / 2.0 * LITRES_PER_GALLON;
        assert!((c[3] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_exact_row_is_returned() {
        let t = FuelConsumptionTable::reference();
        let c = t.interpolate(100.0).unwrap();
        assert!((c[0] - 2.6 * LITRES_PER_GALLON).abs() < 1e-9);
    }

    #[test]
    fn test_small_generator_uses_zero_row() {
        let t = FuelConsumptionTable::reference();
        let c = t.interpolate(10.0).unwrap();
        assert!((c[3] - 0.8 * LITRES_PER_GALLON).abs() < 1e-9);
    }

    #[test]
    fn test_extrapolation_limits() {
        let t = FuelConsumptionTable::reference();
        assert!(t.interpolate(2500.0).is_some());
        assert!(t.interpolate(3000.0).is_none());
    }

    #[test]
    fn test_linear_fit() {
        let (a, b) = linear_fit(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
        assert!((a - 2.0).abs() < 1e-12);
        assert!((b - 1.0).abs() < 1e-12);
        assert!(linear_fit(&[1.0, 1.0], &[1.0, 2.0]).is_none());
        assert!(linear_fit(&[1.0], &[1.0]).is_none());
    }

    #[test]
    fn test_reads_csv() {
        let data = "size_kw,q1,q2,q3,full\n40,1.6,2.3,3.2,4.0\n20,0.6,0.9,1.3,1.6\n";
        let t = FuelConsumptionTable::from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(t.sizes_kw, vec![20.0, 40.0]);
        assert_eq!(t.columns(), 4);
    }

    #[test]
    fn test_rejects_ragged_csv() {
        let data = "size_kw,q1,q2\n20,0.6,0.9\n40,1.6\n";
        assert!(FuelConsumptionTable::from_csv_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn test_rejects_negative_csv() {
        let data = "size_kw,q1\n20,0.6\n40,-1.6\n";
        assert!(matches!(
            FuelConsumptionTable::from_csv_reader(data.as_bytes()),
            Err(InputError::Negative { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_sizes_csv() {
        let data = "size_kw,q1,q2\n40,1.6,2.3\n20,0.6,0.9\n40,1.5,2.2\n";
        assert!(matches!(
            FuelConsumptionTable::from_csv_reader(data.as_bytes()),
            Err(InputError::DuplicateSize { size_kw }) if size_kw == 40.0
        ));
    }
}
