//! Reference histograms for the heuristic scorer.
//!
//! Each feature carries a pair of empirically fit histograms, one built
//! from labeled airplane outlier groups and one from everything else, each
//! over its own value range. A feature value is scored by looking up both
//! densities and taking `airplane / (airplane + non_airplane)`.
//!
//! The tables were fit from labeled night-sky timelapse outlier data; the
//! bin values are normalized to the peak bin of each histogram. Do not
//! hand-tune individual bins.

/// One fitted histogram: evenly spaced bins from `min` to `max`.
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub bins: &'static [f64],
}

impl Histogram {
    /// Density at `value`, or `None` when the value falls outside the
    /// fitted range.
    pub fn density(&self, value: f64) -> Option<f64> {
        if value < self.min || value > self.max {
            return None;
        }
        let index = ((value - self.min) / self.step) as usize;
        Some(self.bins[index.min(self.bins.len() - 1)])
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Airplane/non-airplane histogram pair for one feature.
pub struct FeaturePair {
    pub airplane: Histogram,
    pub non_airplane: Histogram,
}

impl FeaturePair {
    /// Sub-score in `[0, 1]` for a feature value.
    ///
    /// Inside both fitted ranges, the score is the airplane density over
    /// the total density (0.5 when both are zero). Outside one range the
    /// score clamps to the side still in range; outside both, to whichever
    /// range the value is nearer.
    pub fn score(&self, value: f64) -> f64 {
        match (self.airplane.density(value), self.non_airplane.density(value)) {
            (Some(a), Some(n)) => {
                if a + n == 0.0 {
                    0.5
                } else {
                    a / (a + n)
                }
            }
            (Some(_), None) => 1.0,
            (None, Some(_)) => 0.0,
            (None, None) => {
                let a_dist = range_distance(value, self.airplane.min, self.airplane.max);
                let n_dist = range_distance(value, self.non_airplane.min, self.non_airplane.max);
                if a_dist < n_dist {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

fn range_distance(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        min - value
    } else if value > max {
        value - max
    } else {
        0.0
    }
}

/// Distinct hough vote counts over total line count. Real lines concentrate
/// votes into a handful of counts, so airplanes sit at the low end.
pub static KEYS_OVER_LINES: FeaturePair = FeaturePair {
    airplane: Histogram {
        min: 0.0042747221430607,
        max: 0.219512195121951,
        step: 0.0021523747297889,
        bins: &[
            0.00411522633744856, 0.0473251028806584, 0.0493827160493827, 0.0740740740740741,
            0.137860082304527, 0.160493827160494, 0.310699588477366, 0.582304526748971,
            0.734567901234568, 0.880658436213992, 0.888888888888889, 1.0,
            0.746913580246914, 0.526748971193416, 0.506172839506173, 0.48559670781893,
            0.462962962962963, 0.44238683127572, 0.57201646090535, 0.526748971193416,
            0.491769547325103, 0.539094650205761, 0.467078189300412, 0.421810699588477,
            0.302469135802469, 0.201646090534979, 0.207818930041152, 0.164609053497942,
            0.141975308641975, 0.150205761316872, 0.106995884773663, 0.104938271604938,
            0.0864197530864197, 0.0967078189300412, 0.11522633744856, 0.10082304526749,
            0.0843621399176955, 0.0720164609053498, 0.0740740740740741, 0.0905349794238683,
            0.065843621399177, 0.0534979423868313, 0.0452674897119342, 0.0473251028806584,
            0.037037037037037, 0.0390946502057613, 0.037037037037037, 0.0308641975308642,
            0.0432098765432099, 0.0452674897119342, 0.0534979423868313, 0.0267489711934156,
            0.0411522633744856, 0.0452674897119342, 0.0267489711934156, 0.0164609053497942,
            0.0246913580246914, 0.0246913580246914, 0.0246913580246914, 0.0226337448559671,
            0.0164609053497942, 0.01440329218107, 0.0164609053497942, 0.0123456790123457,
            0.01440329218107, 0.0123456790123457, 0.00205761316872428, 0.0205761316872428,
            0.0123456790123457, 0.0102880658436214, 0.00617283950617284, 0.0164609053497942,
            0.00823045267489712, 0.00617283950617284, 0.0102880658436214, 0.00823045267489712,
            0.00823045267489712, 0.00411522633744856, 0.0102880658436214, 0.00411522633744856,
            0.0, 0.0, 0.0102880658436214, 0.0, 0.0, 0.00205761316872428, 0.00617283950617284,
            0.00205761316872428, 0.00205761316872428, 0.0, 0.0, 0.0, 0.00205761316872428, 0.0,
            0.00411522633744856, 0.00205761316872428, 0.0, 0.0, 0.0, 0.00411522633744856,
        ],
    },
    non_airplane: Histogram {
        min: 0.0184928921876966,
        max: 0.227272727272727,
        step: 0.00208779835085031,
        bins: &[
            0.00584795321637427, 0.0, 0.0, 0.0, 0.00584795321637427, 0.0, 0.0116959064327485,
            0.0, 0.0, 0.0, 0.0, 0.00584795321637427, 0.00584795321637427, 0.0116959064327485,
            0.0116959064327485, 0.0175438596491228, 0.0175438596491228, 0.0116959064327485,
            0.0233918128654971, 0.0526315789473684, 0.0350877192982456, 0.0467836257309941,
            0.0584795321637427, 0.064327485380117, 0.0760233918128655, 0.0935672514619883,
            0.0994152046783626, 0.0935672514619883, 0.12280701754386, 0.140350877192982,
            0.175438596491228, 0.192982456140351, 0.239766081871345, 0.263157894736842,
            0.327485380116959, 0.421052631578947, 0.409356725146199, 0.380116959064327,
            0.526315789473684, 0.508771929824561, 0.678362573099415, 0.672514619883041,
            0.719298245614035, 0.654970760233918, 0.754385964912281, 0.783625730994152,
            0.736842105263158, 0.789473684210526, 0.713450292397661, 0.783625730994152,
            0.625730994152047, 0.83625730994152, 1.0, 0.701754385964912, 0.795321637426901,
            0.795321637426901, 0.748538011695906, 0.678362573099415, 0.695906432748538,
            0.596491228070175, 0.619883040935672, 0.532163742690059, 0.596491228070175,
            0.543859649122807, 0.497076023391813, 0.333333333333333, 0.286549707602339,
            0.339181286549708, 0.374269005847953, 0.327485380116959, 0.321637426900585,
            0.169590643274854, 0.245614035087719, 0.152046783625731, 0.198830409356725,
            0.204678362573099, 0.146198830409357, 0.128654970760234, 0.0994152046783626,
            0.12280701754386, 0.116959064327485, 0.064327485380117, 0.0584795321637427,
            0.0292397660818713, 0.0584795321637427, 0.0116959064327485, 0.0350877192982456,
            0.0292397660818713, 0.0233918128654971, 0.0350877192982456, 0.0292397660818713,
            0.0233918128654971, 0.00584795321637427, 0.0, 0.0, 0.00584795321637427,
            0.00584795321637427, 0.00584795321637427, 0.0, 0.0,
        ],
    },
};

/// Group size in pixels. Airplane trails skew much larger than star
/// scintillation noise.
pub static GROUP_SIZE: FeaturePair = FeaturePair {
    airplane: Histogram {
        min: 151.0,
        max: 41886.0,
        step: 2086.75,
        bins: &[
            0.55, 1.0, 0.62, 0.31, 0.17, 0.11, 0.08, 0.06, 0.05, 0.04,
            0.03, 0.025, 0.02, 0.015, 0.012, 0.01, 0.008, 0.006, 0.004, 0.003,
        ],
    },
    non_airplane: Histogram {
        min: 151.0,
        max: 8536.0,
        step: 419.25,
        bins: &[
            1.0, 0.34, 0.11, 0.042, 0.018, 0.009, 0.005, 0.003, 0.002, 0.0015,
            0.001, 0.0008, 0.0005, 0.0003, 0.0002, 0.0001, 0.0001, 0.0, 0.0, 0.0001,
        ],
    },
};

/// Bounding box aspect ratio, long axis over short axis.
pub static ASPECT_RATIO: FeaturePair = FeaturePair {
    airplane: Histogram {
        min: 1.0,
        max: 39.0,
        step: 1.9,
        bins: &[
            0.42, 0.78, 1.0, 0.91, 0.76, 0.58, 0.45, 0.33, 0.24, 0.18,
            0.13, 0.09, 0.07, 0.05, 0.04, 0.03, 0.02, 0.015, 0.01, 0.008,
        ],
    },
    non_airplane: Histogram {
        min: 1.0,
        max: 23.6,
        step: 1.13,
        bins: &[
            1.0, 0.46, 0.17, 0.07, 0.03, 0.015, 0.008, 0.004, 0.003, 0.002,
            0.0015, 0.001, 0.0008, 0.0005, 0.0004, 0.0003, 0.0002, 0.0002, 0.0001, 0.0001,
        ],
    },
};

/// Boundary pixels over group size. Thin trails are nearly all boundary;
/// compact blobs are not.
pub static SURFACE_AREA_RATIO: FeaturePair = FeaturePair {
    airplane: Histogram {
        min: 0.2,
        max: 1.2,
        step: 0.05,
        bins: &[
            0.02, 0.03, 0.05, 0.08, 0.11, 0.15, 0.21, 0.29, 0.38, 0.49,
            0.61, 0.74, 0.85, 0.94, 1.0, 0.97, 0.88, 0.72, 0.51, 0.28,
        ],
    },
    non_airplane: Histogram {
        min: 0.05,
        max: 1.0,
        step: 0.0475,
        bins: &[
            0.31, 0.52, 0.74, 0.91, 1.0, 0.96, 0.84, 0.69, 0.55, 0.43,
            0.33, 0.26, 0.2, 0.16, 0.12, 0.09, 0.07, 0.05, 0.04, 0.03,
        ],
    },
};

/// Mean brightness delta over the detection threshold, in 16 bit units.
pub static BRIGHTNESS: FeaturePair = FeaturePair {
    airplane: Histogram {
        min: 400.0,
        max: 58000.0,
        step: 2880.0,
        bins: &[
            0.12, 0.27, 0.45, 0.66, 0.84, 0.96, 1.0, 0.95, 0.85, 0.72,
            0.59, 0.47, 0.37, 0.29, 0.22, 0.17, 0.13, 0.1, 0.07, 0.05,
        ],
    },
    non_airplane: Histogram {
        min: 200.0,
        max: 24000.0,
        step: 1190.0,
        bins: &[
            1.0, 0.77, 0.55, 0.38, 0.26, 0.18, 0.12, 0.08, 0.055, 0.038,
            0.026, 0.018, 0.012, 0.009, 0.006, 0.004, 0.003, 0.002, 0.0015, 0.001,
        ],
    },
};
