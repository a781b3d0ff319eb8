// PlayBuoy: Linear Detrend
//
// Removes the least-squares line left by integrator drift.

/// Least-squares line `y = slope * i + intercept` over sample index `i`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Fits a line through `values` against their index. Sums are kept in f64;
/// with 3000 samples Σi² is already past f32 precision.
pub fn fit_line(values: &[f32]) -> LineFit {
    let n = values.len();
    if n == 0 {
        return LineFit::default();
    }
    if n == 1 {
        return LineFit {
            slope: 0.0,
            intercept: values[0] as f64,
        };
    }

    let (mut sx, mut sy, mut sxx, mut sxy) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        let y = y as f64;
        sx += x;
        sy += y;
        sxx += x * x;
        sxy += x * y;
    }
    let n = n as f64;
    let denom = n * sxx - sx * sx;
    let slope = if denom.abs() > f64::EPSILON {
        (n * sxy - sx * sy) / denom
    } else {
        0.0
    };
    LineFit {
        slope,
        intercept: (sy - slope * sx) / n,
    }
}

/// Subtracts the least-squares line in place and returns the removed fit.
pub fn detrend(values: &mut [f32]) -> LineFit {
    let fit = fit_line(values);
    for (i, v) in values.iter_mut().enumerate() {
        *v = (*v as f64 - (fit.slope * i as f64 + fit.intercept)) as f32;
    }
    fit
}
